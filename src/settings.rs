//! Simulation settings
//!
//! Persisted as JSON next to the binary. Missing fields fall back to defaults.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::SettingsError;
use crate::consts::*;

/// Quality preset levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum QualityPreset {
    Low,
    #[default]
    Medium,
    High,
}

impl QualityPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityPreset::Low => "Low",
            QualityPreset::Medium => "Medium",
            QualityPreset::High => "High",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(QualityPreset::Low),
            "medium" | "med" => Some(QualityPreset::Medium),
            "high" => Some(QualityPreset::High),
            _ => None,
        }
    }

    /// Maximum live particles for this preset
    pub fn max_particles(&self) -> usize {
        match self {
            QualityPreset::Low => 100,
            QualityPreset::Medium => 500,
            QualityPreset::High => 2000,
        }
    }

    /// Points per bubble outline
    pub fn body_segments(&self) -> usize {
        match self {
            QualityPreset::Low => 7,
            QualityPreset::Medium => 9,
            QualityPreset::High => 13,
        }
    }
}

/// Physics world tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Point-mass-to-edge distance that counts as a contact
    pub collision_threshold: f32,
    /// Fixed integration sub-step in seconds
    pub sub_step: f32,
    pub max_substeps: u32,
    /// Seed for teleport angles and gameplay wander targets
    pub seed: u64,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            collision_threshold: COLLISION_THRESHOLD,
            sub_step: PHYSICS_DT,
            max_substeps: MAX_SUBSTEPS,
            seed: 0x5EED,
        }
    }
}

impl PhysicsConfig {
    /// Number of equal sub-steps used to cover `dt`
    pub fn substeps_for(&self, dt: f32) -> u32 {
        if dt.is_nan() || dt <= 0.0 || self.sub_step <= 0.0 {
            return 1;
        }
        // Tolerate rounding so 1/60 over 1/240 is 4 and not 5
        let steps = (dt / self.sub_step - 1e-3).ceil();
        (steps as u32).clamp(1, self.max_substeps.max(1))
    }
}

/// Distant-body recycling thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeleportSettings {
    /// Bodies farther than this from the player are recycled
    pub threshold: f32,
    /// Distance from the player at which recycled bodies reappear
    pub distance: f32,
}

impl Default for TeleportSettings {
    fn default() -> Self {
        Self {
            threshold: TELEPORT_THRESHOLD,
            distance: TELEPORT_DISTANCE,
        }
    }
}

/// Simulation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Quality preset
    pub quality: QualityPreset,
    /// Particle effects (explosions, pops)
    pub particles: bool,

    pub physics: PhysicsConfig,
    pub teleport: TeleportSettings,

    // === Pools ===
    /// Slots added when a pool runs dry
    pub pool_growth: usize,
    /// Initial size of the timer and interpolator pools
    pub collection_capacity: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            quality: QualityPreset::Medium,
            particles: true,
            physics: PhysicsConfig::default(),
            teleport: TeleportSettings::default(),
            pool_growth: POOL_GROWTH,
            collection_capacity: COLLECTION_CAPACITY,
        }
    }
}

impl Settings {
    /// Create settings from a quality preset (applies preset defaults)
    pub fn from_preset(preset: QualityPreset) -> Self {
        let mut settings = Self::default();
        settings.apply_preset(preset);
        settings
    }

    /// Apply a quality preset (updates quality-dependent settings)
    pub fn apply_preset(&mut self, preset: QualityPreset) {
        self.quality = preset;

        // Low preset trades collision accuracy for speed
        if preset == QualityPreset::Low {
            self.physics.max_substeps = self.physics.max_substeps.min(4);
        }
    }

    /// Effective particle count cap
    pub fn max_particles(&self) -> usize {
        if !self.particles {
            0
        } else {
            self.quality.max_particles()
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let json = fs::read_to_string(path.as_ref())?;
        let settings = serde_json::from_str(&json)?;
        log::info!("Loaded settings from {}", path.as_ref().display());
        Ok(settings)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), json)?;
        log::info!("Settings saved to {}", path.as_ref().display());
        Ok(())
    }

    /// Load settings, falling back to defaults on any error
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path.as_ref()) {
            Ok(settings) => settings,
            Err(e) => {
                log::info!("Using default settings ({})", e);
                Self::default()
            }
        }
    }
}
