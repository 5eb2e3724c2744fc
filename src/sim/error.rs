//! Error types for program execution and run control

use serde::Serialize;
use thiserror::Error;

use crate::program::EvalError;

/// A failure raised while interpreting a program. Ends the run as lost.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ExecutionError {
    #[error("`{op}`: bad condition: {source}")]
    Condition {
        op: &'static str,
        #[source]
        source: EvalError,
    },

    #[error("`{op}`: {field} must be a finite number, got {value}")]
    NonFinite {
        op: &'static str,
        field: &'static str,
        value: f32,
    },

    #[error("`break` used outside of a loop")]
    BreakOutsideLoop,

    #[error("`{op}` started while another motion was still in flight")]
    MotionInFlight { op: &'static str },

    #[error("malformed program: {reason}")]
    Malformed { reason: String },
}

/// Rejected run-controller commands
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("a program is already running")]
    AlreadyRunning,

    #[error("cannot change the layout while a program is running")]
    Busy,

    #[error("malformed program: {0}")]
    Program(#[from] serde_json::Error),
}
