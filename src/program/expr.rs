//! Condition expressions from the logic and sensing blocks
//!
//! Sensors have no physical model: bumpers, distance and eye sensors read
//! fixed placeholder values, position/rotation/heading read the robot pose.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Comparison operators (`logic_compare`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareOp {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl CompareOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Neq => "≠",
            CompareOp::Lt => "<",
            CompareOp::Lte => "≤",
            CompareOp::Gt => ">",
            CompareOp::Gte => "≥",
        }
    }
}

/// Boolean operators (`logic_operation`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicOp {
    And,
    Or,
}

impl LogicOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            LogicOp::And => "and",
            LogicOp::Or => "or",
        }
    }
}

/// Sensing blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Sensor {
    LeftBumperPressed,
    RightBumperPressed,
    DistanceFound,
    DistanceMm,
    EyeNearObject,
    EyeDetectsColor,
    PositionX,
    PositionY,
    DriveRotation,
    DriveHeading,
    TimerSeconds,
}

/// Values the sensors read from the running robot
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Readings {
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
    pub heading: f32,
    /// Seconds since the run started
    pub timer: f32,
}

impl Sensor {
    pub fn read(&self, readings: &Readings) -> Value {
        match self {
            Sensor::LeftBumperPressed
            | Sensor::RightBumperPressed
            | Sensor::DistanceFound
            | Sensor::EyeNearObject
            | Sensor::EyeDetectsColor => Value::Bool(false),
            Sensor::DistanceMm => Value::Number(0.0),
            Sensor::PositionX => Value::Number(readings.x),
            Sensor::PositionY => Value::Number(readings.y),
            Sensor::DriveRotation => Value::Number(readings.rotation),
            Sensor::DriveHeading => Value::Number(readings.heading),
            Sensor::TimerSeconds => Value::Number(readings.timer),
        }
    }
}

/// Result of evaluating an expression
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Bool(bool),
    Number(f32),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
        }
    }
}

/// Expression typing failures
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum EvalError {
    #[error("cannot apply `{op}` to {lhs} and {rhs}")]
    TypeMismatch {
        op: &'static str,
        lhs: &'static str,
        rhs: &'static str,
    },
    #[error("expected a boolean, found a {found}")]
    ExpectedBoolean { found: &'static str },
    #[error("number literal is not finite")]
    NonFinite,
}

/// A condition or value expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Expr {
    Boolean {
        value: bool,
    },
    Number {
        value: f32,
    },
    Not {
        operand: Box<Expr>,
    },
    Compare {
        op: CompareOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Logic {
        op: LogicOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Sensor {
        sensor: Sensor,
    },
}

impl Expr {
    pub fn boolean(value: bool) -> Self {
        Expr::Boolean { value }
    }

    pub fn number(value: f32) -> Self {
        Expr::Number { value }
    }

    pub fn sensor(sensor: Sensor) -> Self {
        Expr::Sensor { sensor }
    }

    pub fn not(operand: Expr) -> Self {
        Expr::Not {
            operand: Box::new(operand),
        }
    }

    pub fn compare(op: CompareOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Compare {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn logic(op: LogicOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Logic {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Evaluate to a value
    pub fn eval(&self, readings: &Readings) -> Result<Value, EvalError> {
        match self {
            Expr::Boolean { value } => Ok(Value::Bool(*value)),
            Expr::Number { value } => {
                if value.is_finite() {
                    Ok(Value::Number(*value))
                } else {
                    Err(EvalError::NonFinite)
                }
            }
            Expr::Not { operand } => match operand.eval(readings)? {
                Value::Bool(b) => Ok(Value::Bool(!b)),
                other => Err(EvalError::ExpectedBoolean {
                    found: other.type_name(),
                }),
            },
            Expr::Compare { op, lhs, rhs } => {
                let lhs = lhs.eval(readings)?;
                let rhs = rhs.eval(readings)?;
                compare(*op, lhs, rhs).map(Value::Bool)
            }
            Expr::Logic { op, lhs, rhs } => {
                // No short-circuit: both operands are always type-checked
                let l = lhs.eval(readings)?;
                let r = rhs.eval(readings)?;
                match (l, r) {
                    (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(match op {
                        LogicOp::And => a && b,
                        LogicOp::Or => a || b,
                    })),
                    (a, b) => Err(EvalError::TypeMismatch {
                        op: op.symbol(),
                        lhs: a.type_name(),
                        rhs: b.type_name(),
                    }),
                }
            }
            Expr::Sensor { sensor } => Ok(sensor.read(readings)),
        }
    }

    /// Evaluate as a condition
    pub fn test(&self, readings: &Readings) -> Result<bool, EvalError> {
        match self.eval(readings)? {
            Value::Bool(b) => Ok(b),
            other => Err(EvalError::ExpectedBoolean {
                found: other.type_name(),
            }),
        }
    }
}

fn compare(op: CompareOp, lhs: Value, rhs: Value) -> Result<bool, EvalError> {
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => Ok(match op {
            CompareOp::Eq => a == b,
            CompareOp::Neq => a != b,
            CompareOp::Lt => a < b,
            CompareOp::Lte => a <= b,
            CompareOp::Gt => a > b,
            CompareOp::Gte => a >= b,
        }),
        (Value::Bool(a), Value::Bool(b)) => match op {
            CompareOp::Eq => Ok(a == b),
            CompareOp::Neq => Ok(a != b),
            _ => Err(EvalError::TypeMismatch {
                op: op.symbol(),
                lhs: "boolean",
                rhs: "boolean",
            }),
        },
        (a, b) => Err(EvalError::TypeMismatch {
            op: op.symbol(),
            lhs: a.type_name(),
            rhs: b.type_name(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn readings() -> Readings {
        Readings {
            x: 120.0,
            y: 80.0,
            rotation: 450.0,
            heading: 30.0,
            timer: 2.5,
        }
    }

    #[test]
    fn test_placeholder_sensors() {
        let r = readings();
        assert_eq!(Sensor::LeftBumperPressed.read(&r), Value::Bool(false));
        assert_eq!(Sensor::EyeDetectsColor.read(&r), Value::Bool(false));
        assert_eq!(Sensor::DistanceMm.read(&r), Value::Number(0.0));
        assert_eq!(Sensor::PositionX.read(&r), Value::Number(120.0));
        assert_eq!(Sensor::DriveRotation.read(&r), Value::Number(450.0));
    }

    #[test]
    fn test_compare_and_logic() {
        let r = readings();
        let near_left = Expr::compare(
            CompareOp::Lt,
            Expr::sensor(Sensor::PositionX),
            Expr::number(150.0),
        );
        let timed_out = Expr::compare(
            CompareOp::Gte,
            Expr::sensor(Sensor::TimerSeconds),
            Expr::number(3.0),
        );
        assert_eq!(near_left.test(&r), Ok(true));
        assert_eq!(timed_out.test(&r), Ok(false));
        assert_eq!(
            Expr::logic(LogicOp::Or, near_left.clone(), timed_out.clone()).test(&r),
            Ok(true)
        );
        assert_eq!(
            Expr::logic(LogicOp::And, near_left, Expr::not(timed_out)).test(&r),
            Ok(true)
        );
    }

    #[test]
    fn test_boolean_equality() {
        let r = readings();
        let expr = Expr::compare(
            CompareOp::Eq,
            Expr::sensor(Sensor::LeftBumperPressed),
            Expr::boolean(false),
        );
        assert_eq!(expr.test(&r), Ok(true));
    }

    #[test]
    fn test_type_errors() {
        let r = readings();
        let ordered_bools = Expr::compare(CompareOp::Lt, Expr::boolean(true), Expr::boolean(false));
        assert!(matches!(
            ordered_bools.test(&r),
            Err(EvalError::TypeMismatch { op: "<", .. })
        ));

        let mixed = Expr::compare(CompareOp::Eq, Expr::number(1.0), Expr::boolean(true));
        assert_eq!(
            mixed.test(&r),
            Err(EvalError::TypeMismatch {
                op: "=",
                lhs: "number",
                rhs: "boolean"
            })
        );

        let and_numbers = Expr::logic(LogicOp::And, Expr::number(1.0), Expr::boolean(true));
        assert!(and_numbers.test(&r).is_err());

        assert_eq!(
            Expr::number(3.0).test(&r),
            Err(EvalError::ExpectedBoolean { found: "number" })
        );
        assert_eq!(
            Expr::number(f32::NAN).eval(&r),
            Err(EvalError::NonFinite)
        );
    }
}
