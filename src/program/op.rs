//! Operation descriptors produced by compiling the block workspace
//!
//! Each block in the editor becomes one `Op`. Control blocks carry their
//! nested statements as bodies, so a program is a tree of operations.

use serde::{Deserialize, Serialize};

use super::expr::Expr;

/// Direction field of the drive blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriveDirection {
    Forward,
    Reverse,
}

/// Direction field of the turn blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnDirection {
    Left,
    Right,
}

/// Unit field of the distanced drive block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceUnit {
    Mm,
    Inches,
}

/// Drawing pen blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PenAction {
    Down,
    Up,
    SetColor,
}

/// Magnet blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MagnetAction {
    Boost,
    Drop,
}

/// One compiled block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Op {
    // === Drivetrain ===
    Drive {
        direction: DriveDirection,
        #[serde(default)]
        distance: Option<f32>,
        #[serde(default)]
        unit: Option<DistanceUnit>,
    },
    Turn {
        direction: TurnDirection,
        #[serde(default)]
        degrees: Option<f32>,
    },
    TurnToHeading {
        #[serde(default)]
        heading: Option<f32>,
    },
    TurnToRotation {
        #[serde(default)]
        rotation: Option<f32>,
    },
    StopDriving,
    SetDriveVelocity {
        #[serde(default)]
        velocity: Option<f32>,
    },
    SetTurnVelocity {
        #[serde(default)]
        velocity: Option<f32>,
    },
    SetDriveHeading {
        #[serde(default)]
        heading: Option<f32>,
    },
    SetDriveRotation {
        #[serde(default)]
        rotation: Option<f32>,
    },
    SetDriveTimeout {
        #[serde(default)]
        seconds: Option<f32>,
    },

    // === Control ===
    Wait {
        #[serde(default)]
        seconds: Option<f32>,
    },
    WaitUntil {
        condition: Expr,
    },
    RepeatTimes {
        #[serde(default)]
        times: Option<f32>,
        body: Vec<Op>,
    },
    Forever {
        body: Vec<Op>,
    },
    RepeatUntil {
        condition: Expr,
        body: Vec<Op>,
    },
    While {
        condition: Expr,
        body: Vec<Op>,
    },
    IfThen {
        condition: Expr,
        then: Vec<Op>,
    },
    IfThenElse {
        condition: Expr,
        then: Vec<Op>,
        otherwise: Vec<Op>,
    },
    IfElseIfElse {
        condition: Expr,
        then: Vec<Op>,
        else_if_condition: Expr,
        else_if: Vec<Op>,
        otherwise: Vec<Op>,
    },
    Break,
    StopProject,

    // === Devices (log only) ===
    Pen {
        action: PenAction,
        #[serde(default)]
        color: Option<String>,
    },
    Magnet {
        action: MagnetAction,
    },
    Print {
        text: String,
    },
    ClearConsole,
}

impl Op {
    pub fn drive(direction: DriveDirection, distance: f32, unit: DistanceUnit) -> Self {
        Op::Drive {
            direction,
            distance: Some(distance),
            unit: Some(unit),
        }
    }

    /// Bare drive block (default distance and duration)
    pub fn drive_default(direction: DriveDirection) -> Self {
        Op::Drive {
            direction,
            distance: None,
            unit: None,
        }
    }

    pub fn turn(direction: TurnDirection, degrees: f32) -> Self {
        Op::Turn {
            direction,
            degrees: Some(degrees),
        }
    }

    pub fn turn_to_rotation(rotation: f32) -> Self {
        Op::TurnToRotation {
            rotation: Some(rotation),
        }
    }

    pub fn turn_to_heading(heading: f32) -> Self {
        Op::TurnToHeading {
            heading: Some(heading),
        }
    }

    pub fn wait(seconds: f32) -> Self {
        Op::Wait {
            seconds: Some(seconds),
        }
    }

    pub fn repeat(times: u32, body: Vec<Op>) -> Self {
        Op::RepeatTimes {
            times: Some(times as f32),
            body,
        }
    }

    pub fn forever(body: Vec<Op>) -> Self {
        Op::Forever { body }
    }

    pub fn if_then(condition: Expr, then: Vec<Op>) -> Self {
        Op::IfThen { condition, then }
    }

    pub fn if_else(condition: Expr, then: Vec<Op>, otherwise: Vec<Op>) -> Self {
        Op::IfThenElse {
            condition,
            then,
            otherwise,
        }
    }
}

/// An ordered list of top-level operations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Program {
    pub ops: Vec<Op>,
}

impl Program {
    pub fn new(ops: Vec<Op>) -> Self {
        Self { ops }
    }

    /// Decode a program handed over by the block editor
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
