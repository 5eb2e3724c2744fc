//! Ocean Bot - block-program execution engine for a simulated cleanup robot
//!
//! Core modules:
//! - `program`: Compiled block programs (operation descriptors, conditions)
//! - `sim`: Deterministic simulation (robot, interpreter, collisions, run control)
//! - `platform`: Browser façade for the block editor UI
//! - `settings`: Persisted preferences

pub mod platform;
pub mod program;
pub mod settings;
pub mod sim;

pub use program::{Expr, Op, Program};
pub use settings::{LayoutScale, Settings};
pub use sim::{RunController, RunOutcome, RunPhase, RunReport};

use glam::Vec2;

/// Simulation configuration constants
pub mod consts {
    /// Fixed simulation timestep (120 Hz animation frames)
    pub const SIM_DT: f32 = 1.0 / 120.0;
    /// Maximum substeps per host frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Longest host frame accepted by the frame driver (seconds)
    pub const MAX_FRAME_DT: f32 = 0.1;

    /// Canvas edge length at layout scale 1.0
    pub const CANVAS_SIZE: f32 = 400.0;

    /// Robot body is 40x40, treated as a circle for collisions
    pub const ROBOT_RADIUS: f32 = 20.0;
    /// Drive/turn velocity recorded at reset (percent)
    pub const DEFAULT_VELOCITY: f32 = 50.0;

    /// Millimetres per canvas pixel
    pub const MM_PER_PIXEL: f32 = 5.0;
    /// Distance used by a bare `drive` block (pixels)
    pub const DEFAULT_DRIVE_DISTANCE: f32 = 100.0;
    /// Degrees used by a bare `turn` block
    pub const DEFAULT_TURN_DEGREES: f32 = 90.0;
    /// Duration of turns and distanced drives (seconds)
    pub const MOTION_DURATION: f32 = 0.5;
    /// Duration of a bare `drive` block (seconds)
    pub const DEFAULT_DRIVE_DURATION: f32 = 1.0;

    /// Seconds used when a wait/timeout block has no value
    pub const DEFAULT_WAIT_SECONDS: f32 = 1.0;
    /// Repeat count used when a repeat block has no value
    pub const DEFAULT_REPEAT_TIMES: f32 = 10.0;
    /// `wait until` re-checks its condition at this interval (seconds)
    pub const WAIT_POLL_INTERVAL: f32 = 0.1;
    /// Minimum pause between `forever` iterations (seconds)
    pub const FOREVER_YIELD: f32 = 0.01;

    /// Trash spawner cadence (seconds)
    pub const SPAWN_INTERVAL: f32 = 2.0;
    /// Maximum uncollected trash items alive at once
    pub const MAX_TRASH: usize = 20;
    /// Distance kept between spawned trash and the canvas edge
    pub const SPAWN_MARGIN: f32 = 40.0;
    /// Trash radius at item scale 1.0
    pub const TRASH_RADIUS: f32 = 12.0;
    /// Item scale growth per second while a fresh item pops in
    pub const TRASH_EXPAND_RATE: f32 = 4.0;
    /// Idle bobbing phase speed (radians per second)
    pub const TRASH_FLOAT_SPEED: f32 = 2.0;

    /// Spacing between coral pieces along the border
    pub const CORAL_SPACING: f32 = 36.0;
    pub const CORAL_MIN_RADIUS: f32 = 10.0;
    pub const CORAL_MAX_RADIUS: f32 = 18.0;
    /// Maximum distance a coral centre sits inside the canvas edge
    pub const CORAL_MAX_INSET: f32 = 8.0;
}

/// Unit vector the robot faces at `rotation` degrees.
///
/// Rotation 0 points up the canvas (negative y) and positive rotation turns
/// clockwise, so 90 degrees faces right.
#[inline]
pub fn heading_vector(rotation: f32) -> Vec2 {
    let radians = rotation.to_radians();
    Vec2::new(radians.sin(), -radians.cos())
}

/// Ease-out cubic curve: fast start, gentle arrival
#[inline]
pub fn ease_out_cubic(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(3)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_vector_cardinal_directions() {
        let up = heading_vector(0.0);
        assert!(up.x.abs() < 1e-6 && (up.y + 1.0).abs() < 1e-6);

        let right = heading_vector(90.0);
        assert!((right.x - 1.0).abs() < 1e-6 && right.y.abs() < 1e-6);

        let down = heading_vector(180.0);
        assert!(down.x.abs() < 1e-5 && (down.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_ease_out_cubic_endpoints() {
        assert_eq!(ease_out_cubic(0.0), 0.0);
        assert_eq!(ease_out_cubic(1.0), 1.0);
        assert_eq!(ease_out_cubic(2.0), 1.0);
        // Front-loaded: past the midpoint by half time
        assert!(ease_out_cubic(0.5) > 0.5);
    }
}
