//! Bubble Bound headless runner
//!
//! Loads settings and an optional level record, then drives the simulation
//! at a fixed timestep with a scripted input and logs what happened.
//!
//! Usage: `bubble-bound [level.json] [seconds]`

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use bubble_bound::Settings;
    use bubble_bound::persistence::{EntityRecord, LevelRecord, RecordKind};
    use bubble_bound::sim::{Simulation, TickInput, tick};
    use glam::{Vec2, Vec3};

    const SETTINGS_PATH: &str = "bubble-bound.json";
    const FRAME_DT: f32 = 1.0 / 60.0;

    env_logger::init();
    log::info!("Bubble Bound (headless) starting...");

    let mut args = std::env::args().skip(1);
    let level = match args.next() {
        Some(path) => match LevelRecord::load(&path) {
            Ok(level) => level,
            Err(e) => {
                log::error!("Could not load level {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => {
            let mut level = LevelRecord::new("Demo", 0);
            level
                .entities
                .push(EntityRecord::new(RecordKind::Player, Vec3::ZERO));
            for i in 0..12 {
                let angle = i as f32 * 0.52;
                let position = Vec2::from_angle(angle) * (0.6 + i as f32 * 0.25);
                level.entities.push(
                    EntityRecord::new(RecordKind::Bubble, position.extend(0.0))
                        .with_size(Vec3::splat(0.03)),
                );
            }
            level
                .entities
                .push(EntityRecord::new(RecordKind::Enemy, Vec3::new(4.0, 3.0, 0.0)));
            level.entities.push(
                EntityRecord::new(RecordKind::Wall, Vec3::new(0.0, -4.0, 0.0))
                    .with_size(Vec3::new(12.0, 0.5, 1.0)),
            );
            level
        }
    };
    let seconds: f32 = args.next().and_then(|s| s.parse().ok()).unwrap_or(20.0);

    let settings = Settings::load_or_default(SETTINGS_PATH);
    log::info!("Quality: {}, level: {}", settings.quality.as_str(), level);

    let mut sim = match Simulation::from_record(&level, settings) {
        Ok(sim) => sim,
        Err(e) => {
            log::error!("Could not build level: {}", e);
            std::process::exit(1);
        }
    };

    let frames = (seconds / FRAME_DT) as u64;
    for frame in 0..frames {
        // Slow circle so the player sweeps through the bubbles
        let t = frame as f32 * FRAME_DT;
        let input = TickInput {
            direction: Vec2::from_angle(t * 0.4),
            boost: frame % 600 == 599,
        };
        tick(&mut sim, &input, FRAME_DT);

        if frame % 300 == 0 {
            if let (Some(position), Some(character)) = (sim.player_position(), sim.character()) {
                log::info!(
                    "t={:>5.1}s player ({:.2}, {:.2}) tier {} collected {} particles {}",
                    t,
                    position.x,
                    position.y,
                    character.tier,
                    character.num_collected,
                    sim.particles.live_count()
                );
            }
        }
    }

    match sim.character() {
        Some(character) => log::info!(
            "Finished after {} ticks: tier {}, {} collected",
            sim.time_ticks,
            character.tier,
            character.num_collected
        ),
        None => log::info!("Finished after {} ticks without a player", sim.time_ticks),
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The simulation core is a library; there is no wasm runner
}
