//! Compiled block programs
//!
//! The block editor hands over an ordered list of operation descriptors.
//! `Script` is the arena form the interpreter walks.

pub mod expr;
pub mod op;
pub mod script;

pub use expr::{CompareOp, EvalError, Expr, LogicOp, Readings, Sensor, Value};
pub use op::{DistanceUnit, DriveDirection, MagnetAction, Op, PenAction, Program, TurnDirection};
pub use script::{Action, BodyId, CondId, Instr, Script};
