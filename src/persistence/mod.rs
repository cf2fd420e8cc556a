//! Level records
//!
//! A level is a named list of entity records. Only physics-relevant state is
//! kept: kind, asset name, and the position/rotation/size triple. Records are
//! stored as pretty-printed JSON.

use std::fmt;
use std::fs;
use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::SettingsError;

/// What an entity record spawns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    /// The player-controlled character
    Player,
    /// A collectable pressure bubble
    Bubble,
    Enemy,
    /// Static rectangular obstacle
    Wall,
    /// Decoration with no body; carried through untouched
    Scenery,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Player => "player",
            RecordKind::Bubble => "bubble",
            RecordKind::Enemy => "enemy",
            RecordKind::Wall => "wall",
            RecordKind::Scenery => "scenery",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub kind: RecordKind,
    #[serde(default)]
    pub asset: String,
    pub position: Vec3,
    #[serde(default)]
    pub rotation: Vec3,
    #[serde(default = "unit_size")]
    pub size: Vec3,
}

fn unit_size() -> Vec3 {
    Vec3::ONE
}

impl EntityRecord {
    pub fn new(kind: RecordKind, position: Vec3) -> Self {
        Self {
            kind,
            asset: String::new(),
            position,
            rotation: Vec3::ZERO,
            size: Vec3::ONE,
        }
    }

    pub fn with_size(mut self, size: Vec3) -> Self {
        self.size = size;
        self
    }

    pub fn with_rotation(mut self, rotation: Vec3) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_asset(mut self, asset: impl Into<String>) -> Self {
        self.asset = asset.into();
        self
    }
}

/// A complete level
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LevelRecord {
    pub name: String,
    pub number: u32,
    #[serde(default)]
    pub entities: Vec<EntityRecord>,
}

impl LevelRecord {
    pub fn new(name: impl Into<String>, number: u32) -> Self {
        Self {
            name: name.into(),
            number,
            entities: Vec::new(),
        }
    }

    pub fn count_of(&self, kind: RecordKind) -> usize {
        self.entities.iter().filter(|e| e.kind == kind).count()
    }

    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let json = fs::read_to_string(path.as_ref())?;
        let level = Self::from_json(&json)?;
        log::info!(
            "Loaded level '{}' ({} entities) from {}",
            level.name,
            level.entities.len(),
            path.as_ref().display()
        );
        Ok(level)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        fs::write(path.as_ref(), self.to_json()?)?;
        log::info!("Saved level '{}' to {}", self.name, path.as_ref().display());
        Ok(())
    }
}

impl fmt::Display for LevelRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} #{}: ", self.name, self.number)?;
        let kinds = [
            RecordKind::Player,
            RecordKind::Bubble,
            RecordKind::Enemy,
            RecordKind::Wall,
            RecordKind::Scenery,
        ];
        let mut first = true;
        for kind in kinds {
            let count = self.count_of(kind);
            if count == 0 {
                continue;
            }
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{} {}", count, kind.as_str())?;
            first = false;
        }
        if first {
            write!(f, "empty")?;
        }
        Ok(())
    }
}
