//! Deterministic simulation module
//!
//! Program execution, robot motion and reef scoring. Like any good sim it
//! must stay deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order
//! - No rendering or platform dependencies

pub mod cancel;
pub mod collision;
pub mod controller;
pub mod error;
pub mod interpreter;
pub mod motion;
pub mod state;
pub mod tick;

pub use cancel::CancelToken;
pub use collision::{Contact, coral_contact, trash_in_reach};
pub use controller::{FinishListener, RunController, Snapshot};
pub use error::{ControlError, ExecutionError};
pub use interpreter::{Hardware, Interpreter, Progress};
pub use motion::{Animator, MotionStatus, MotionTarget};
pub use state::{
    CoralPiece, GameEvent, GameState, Ocean, Pose, RobotState, RunOutcome, RunPhase, RunReport,
    TrashItem, TrashKind,
};
pub use tick::{generate_reef, observe, spawn_trash, tick};
