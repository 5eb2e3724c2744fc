//! Collision & scoring loop
//!
//! Runs beside the interpreter on the same fixed timestep: spawns trash,
//! animates it, and checks the robot against trash and coral whenever the
//! robot pose changes.

use glam::Vec2;
use rand::Rng;

use super::collision::{self, Contact};
use super::state::{CoralPiece, GameEvent, GameState, Ocean, TrashItem, TrashKind};
use crate::consts::*;
use crate::settings::Settings;

/// Coral colours (0xRRGGBB)
pub const CORAL_PALETTE: [u32; 5] = [0xff7f50, 0xff6f91, 0xf9a03f, 0xc06c84, 0xe84a5f];

/// Smallest and largest target scale a spawned item grows to
const TRASH_SCALE_RANGE: (f32, f32) = (0.8, 1.2);

/// Build the coral border for the ocean's current layout.
///
/// Pieces sit in evenly spaced cells along all four edges, each with a random
/// inset, radius and colour.
pub fn generate_reef(ocean: &mut Ocean) {
    let factor = ocean.layout.factor();
    let size = ocean.layout.canvas_size();
    let spacing = CORAL_SPACING * factor;
    let cells = (size / spacing).floor() as usize;

    ocean.coral.clear();
    ocean.coral.reserve(cells * 4);

    for cell in 0..cells {
        let along = (cell as f32 + 0.5) * spacing;
        for edge in 0..4 {
            let inset = ocean.rng.random_range(0.0..=CORAL_MAX_INSET) * factor;
            let radius = ocean.rng.random_range(CORAL_MIN_RADIUS..=CORAL_MAX_RADIUS) * factor;
            let color = CORAL_PALETTE[ocean.rng.random_range(0..CORAL_PALETTE.len())];

            // Clockwise from the top edge
            let pos = match edge {
                0 => Vec2::new(along, inset),
                1 => Vec2::new(size - inset, along),
                2 => Vec2::new(size - along, size - inset),
                _ => Vec2::new(inset, size - along),
            };

            ocean.coral.push(CoralPiece { pos, radius, color });
        }
    }

    log::debug!(
        "Reef generated: {} coral pieces ({})",
        ocean.coral.len(),
        ocean.layout.as_str()
    );
}

/// Spawn one trash item at a random in-bounds spot. Returns its ID.
pub fn spawn_trash(ocean: &mut Ocean) -> u32 {
    let factor = ocean.layout.factor();
    let size = ocean.layout.canvas_size();
    let margin = SPAWN_MARGIN * factor;

    let x = ocean.rng.random_range(margin..=size - margin);
    let y = ocean.rng.random_range(margin..=size - margin);
    let kind = TrashKind::ALL[ocean.rng.random_range(0..TrashKind::ALL.len())];
    let target_scale = ocean
        .rng
        .random_range(TRASH_SCALE_RANGE.0..=TRASH_SCALE_RANGE.1);
    let float_offset = ocean.rng.random_range(0.0..std::f32::consts::TAU);

    let id = ocean.next_trash_id();
    ocean.trash.push(TrashItem {
        id,
        pos: Vec2::new(x, y),
        kind,
        scale: 0.0,
        target_scale,
        float_offset,
        is_collected: false,
    });
    id
}

/// Advance the spawner and the cosmetic trash animation by one timestep
pub fn tick(
    ocean: &mut Ocean,
    game: &GameState,
    settings: &Settings,
    dt: f32,
    events: &mut Vec<GameEvent>,
) {
    for item in ocean.trash.iter_mut().filter(|t| !t.is_collected) {
        if item.scale < item.target_scale {
            item.scale = (item.scale + TRASH_EXPAND_RATE * dt).min(item.target_scale);
        }
        item.float_offset = (item.float_offset + TRASH_FLOAT_SPEED * dt) % std::f32::consts::TAU;
    }

    if !game.is_spawning_trash {
        return;
    }

    ocean.spawn_timer -= dt;
    if ocean.spawn_timer <= 0.0 {
        ocean.spawn_timer += settings.effective_spawn_interval();
        if ocean.live_trash() < settings.max_trash {
            let id = spawn_trash(ocean);
            log::debug!("Spawned trash #{id}");
            events.push(GameEvent::TrashSpawned { id });
        }
    }
}

/// Check the robot against the reef at `robot_pos`.
///
/// Collects every uncollected item in reach (each exactly once) and returns
/// the first coral contact. Deciding what a coral contact means is up to the
/// caller.
pub fn observe(
    ocean: &mut Ocean,
    game: &mut GameState,
    robot_pos: Vec2,
    events: &mut Vec<GameEvent>,
) -> Option<Contact> {
    let factor = ocean.layout.factor();

    for contact in collision::trash_in_reach(robot_pos, factor, &ocean.trash) {
        let item = &mut ocean.trash[contact.index];
        item.is_collected = true;
        game.trash_collected += 1;
        log::debug!(
            "Collected trash #{} (total {})",
            item.id,
            game.trash_collected
        );
        events.push(GameEvent::TrashCollected {
            id: item.id,
            total: game.trash_collected,
        });
    }

    collision::coral_contact(robot_pos, factor, &ocean.coral)
}
