//! Robot, reef and run state
//!
//! Everything the renderer needs to draw a frame lives here.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::error::ExecutionError;
use crate::consts::DEFAULT_VELOCITY;
use crate::program::Readings;
use crate::settings::LayoutScale;

/// Animated part of the robot state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub x: f32,
    pub y: f32,
    /// Degrees, accumulates past 360
    pub rotation: f32,
}

/// The simulated robot
///
/// Pose fields are written only by the animator (and by reset). Velocities and
/// heading are plain settings written by the interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RobotState {
    x: f32,
    y: f32,
    rotation: f32,
    heading: f32,
    drive_velocity: f32,
    turn_velocity: f32,
}

impl RobotState {
    /// Robot at rest at `origin`, facing up
    pub fn at(origin: Vec2) -> Self {
        Self {
            x: origin.x,
            y: origin.y,
            rotation: 0.0,
            heading: 0.0,
            drive_velocity: DEFAULT_VELOCITY,
            turn_velocity: DEFAULT_VELOCITY,
        }
    }

    pub fn reset(&mut self, origin: Vec2) {
        *self = Self::at(origin);
    }

    #[inline]
    pub fn x(&self) -> f32 {
        self.x
    }

    #[inline]
    pub fn y(&self) -> f32 {
        self.y
    }

    #[inline]
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    #[inline]
    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    #[inline]
    pub fn heading(&self) -> f32 {
        self.heading
    }

    #[inline]
    pub fn drive_velocity(&self) -> f32 {
        self.drive_velocity
    }

    #[inline]
    pub fn turn_velocity(&self) -> f32 {
        self.turn_velocity
    }

    pub fn pose(&self) -> Pose {
        Pose {
            x: self.x,
            y: self.y,
            rotation: self.rotation,
        }
    }

    /// Animator-only pose write
    pub(super) fn write_pose(&mut self, pose: Pose) {
        self.x = pose.x;
        self.y = pose.y;
        self.rotation = pose.rotation;
    }

    pub(super) fn set_drive_velocity(&mut self, velocity: f32) {
        self.drive_velocity = velocity;
    }

    pub(super) fn set_turn_velocity(&mut self, velocity: f32) {
        self.turn_velocity = velocity;
    }

    pub(super) fn set_heading(&mut self, heading: f32) {
        self.heading = heading;
    }

    /// Sensor view of the robot
    pub fn readings(&self, timer: f32) -> Readings {
        Readings {
            x: self.x,
            y: self.y,
            rotation: self.rotation,
            heading: self.heading,
            timer,
        }
    }
}

/// Decorative trash skins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrashKind {
    Bottle,
    Can,
    Bag,
    Net,
}

impl TrashKind {
    pub const ALL: [TrashKind; 4] = [
        TrashKind::Bottle,
        TrashKind::Can,
        TrashKind::Bag,
        TrashKind::Net,
    ];
}

/// A collectible piece of trash
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrashItem {
    pub id: u32,
    pub pos: Vec2,
    pub kind: TrashKind,
    /// Current scale, grows from 0 to `target_scale` after spawning
    pub scale: f32,
    pub target_scale: f32,
    /// Idle bobbing phase (radians)
    pub float_offset: f32,
    /// One-way flag
    pub is_collected: bool,
}

/// A static obstacle on the reef border
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoralPiece {
    pub pos: Vec2,
    pub radius: f32,
    /// 0xRRGGBB
    pub color: u32,
}

/// Score and terminal flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    /// Monotonic within a run
    pub trash_collected: u32,
    pub is_game_over: bool,
    pub game_lost: bool,
    pub is_spawning_trash: bool,
}

impl GameState {
    /// Mark the run lost
    pub fn lose(&mut self) {
        self.is_game_over = true;
        self.game_lost = true;
        self.is_spawning_trash = false;
    }
}

/// Trash, coral and the spawner's bookkeeping
#[derive(Debug, Clone)]
pub struct Ocean {
    pub layout: LayoutScale,
    pub trash: Vec<TrashItem>,
    pub coral: Vec<CoralPiece>,
    /// Seconds until the next spawn attempt
    pub spawn_timer: f32,
    pub rng: Pcg32,
    next_id: u32,
}

impl Ocean {
    /// Empty ocean (no reef yet) for the given layout
    pub fn new(layout: LayoutScale, seed: u64) -> Self {
        Self {
            layout,
            trash: Vec::new(),
            coral: Vec::new(),
            spawn_timer: 0.0,
            rng: Pcg32::seed_from_u64(seed),
            next_id: 1,
        }
    }

    /// Allocate a new trash ID
    pub fn next_trash_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Canvas centre for the current layout
    pub fn center(&self) -> Vec2 {
        Vec2::splat(self.layout.canvas_size() / 2.0)
    }

    /// Uncollected items
    pub fn live_trash(&self) -> usize {
        self.trash.iter().filter(|t| !t.is_collected).count()
    }

    /// Drop all trash (full clear/reset)
    pub fn clear_trash(&mut self) {
        self.trash.clear();
    }
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "error", rename_all = "camelCase")]
pub enum RunOutcome {
    /// Program ran to its end
    Completed,
    /// `stop project` block or external stop
    Stopped,
    /// Robot touched the reef
    Collision,
    /// Program raised an execution error
    Failed(ExecutionError),
}

impl RunOutcome {
    pub fn is_loss(&self) -> bool {
        matches!(self, RunOutcome::Collision | RunOutcome::Failed(_))
    }
}

/// Run controller lifecycle
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "phase", content = "outcome", rename_all = "camelCase")]
pub enum RunPhase {
    #[default]
    Idle,
    Running,
    Finished(RunOutcome),
}

/// Delivered to finish listeners once per run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub trash_collected: u32,
}

/// Things that happened during a tick (for sound/effects)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum GameEvent {
    TrashSpawned { id: u32 },
    TrashCollected { id: u32, total: u32 },
    CoralHit { index: usize },
    RunFinished(RunReport),
}
