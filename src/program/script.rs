//! Arena form of a program
//!
//! The operation tree is flattened into a table of bodies, each a flat list of
//! instructions. Nested bodies and conditions are referred to by index, so an
//! interpreter frame is just `(BodyId, cursor)`.

use super::expr::Expr;
use super::op::{DistanceUnit, DriveDirection, MagnetAction, Op, PenAction, Program, TurnDirection};

/// Index of a body in [`Script`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyId(u32);

impl BodyId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index of a condition in [`Script`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CondId(u32);

impl CondId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Leaf operations (no nested bodies)
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Drive {
        direction: DriveDirection,
        distance: Option<f32>,
        unit: Option<DistanceUnit>,
    },
    Turn {
        direction: TurnDirection,
        degrees: Option<f32>,
    },
    TurnToHeading(Option<f32>),
    TurnToRotation(Option<f32>),
    StopDriving,
    SetDriveVelocity(Option<f32>),
    SetTurnVelocity(Option<f32>),
    SetDriveHeading(Option<f32>),
    SetDriveRotation(Option<f32>),
    SetDriveTimeout(Option<f32>),
    Wait(Option<f32>),
    Pen {
        action: PenAction,
        color: Option<String>,
    },
    Magnet(MagnetAction),
    Print(String),
    ClearConsole,
}

impl Action {
    /// Block name used in logs and error reports
    pub fn name(&self) -> &'static str {
        match self {
            Action::Drive { .. } => "drive",
            Action::Turn { .. } => "turn",
            Action::TurnToHeading(_) => "turnToHeading",
            Action::TurnToRotation(_) => "turnToRotation",
            Action::StopDriving => "stopDriving",
            Action::SetDriveVelocity(_) => "setDriveVelocity",
            Action::SetTurnVelocity(_) => "setTurnVelocity",
            Action::SetDriveHeading(_) => "setDriveHeading",
            Action::SetDriveRotation(_) => "setDriveRotation",
            Action::SetDriveTimeout(_) => "setDriveTimeout",
            Action::Wait(_) => "wait",
            Action::Pen { .. } => "pen",
            Action::Magnet(_) => "magnet",
            Action::Print(_) => "print",
            Action::ClearConsole => "clearConsole",
        }
    }
}

/// One instruction in a body
#[derive(Debug, Clone, PartialEq)]
pub enum Instr {
    Action(Action),
    WaitUntil(CondId),
    RepeatTimes {
        times: Option<f32>,
        body: BodyId,
    },
    Forever {
        body: BodyId,
    },
    RepeatUntil {
        cond: CondId,
        body: BodyId,
    },
    While {
        cond: CondId,
        body: BodyId,
    },
    IfThen {
        cond: CondId,
        then: BodyId,
    },
    IfThenElse {
        cond: CondId,
        then: BodyId,
        otherwise: BodyId,
    },
    IfElseIfElse {
        cond: CondId,
        then: BodyId,
        else_if_cond: CondId,
        else_if: BodyId,
        otherwise: BodyId,
    },
    Break,
    StopProject,
}

impl Instr {
    pub fn name(&self) -> &'static str {
        match self {
            Instr::Action(action) => action.name(),
            Instr::WaitUntil(_) => "waitUntil",
            Instr::RepeatTimes { .. } => "repeatTimes",
            Instr::Forever { .. } => "forever",
            Instr::RepeatUntil { .. } => "repeatUntil",
            Instr::While { .. } => "while",
            Instr::IfThen { .. } => "ifThen",
            Instr::IfThenElse { .. } => "ifThenElse",
            Instr::IfElseIfElse { .. } => "ifElseIfElse",
            Instr::Break => "break",
            Instr::StopProject => "stopProject",
        }
    }
}

/// Flattened program
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Script {
    bodies: Vec<Vec<Instr>>,
    conditions: Vec<Expr>,
}

impl Script {
    /// Top-level body
    pub const ROOT: BodyId = BodyId(0);

    /// Flatten a program tree. Iterative, so nesting depth never touches the call stack.
    pub fn lower(program: &Program) -> Self {
        let mut script = Self::default();
        let root = script.alloc_body();
        let mut pending: Vec<(BodyId, &[Op])> = vec![(root, program.ops.as_slice())];

        while let Some((id, ops)) = pending.pop() {
            let mut instrs = Vec::with_capacity(ops.len());
            for op in ops {
                instrs.push(script.lower_op(op, &mut pending));
            }
            script.bodies[id.index()] = instrs;
        }

        script
    }

    fn alloc_body(&mut self) -> BodyId {
        let id = BodyId(self.bodies.len() as u32);
        self.bodies.push(Vec::new());
        id
    }

    fn alloc_cond(&mut self, expr: &Expr) -> CondId {
        let id = CondId(self.conditions.len() as u32);
        self.conditions.push(expr.clone());
        id
    }

    fn defer<'a>(&mut self, ops: &'a [Op], pending: &mut Vec<(BodyId, &'a [Op])>) -> BodyId {
        let id = self.alloc_body();
        pending.push((id, ops));
        id
    }

    fn lower_op<'a>(&mut self, op: &'a Op, pending: &mut Vec<(BodyId, &'a [Op])>) -> Instr {
        match op {
            Op::Drive {
                direction,
                distance,
                unit,
            } => Instr::Action(Action::Drive {
                direction: *direction,
                distance: *distance,
                unit: *unit,
            }),
            Op::Turn { direction, degrees } => Instr::Action(Action::Turn {
                direction: *direction,
                degrees: *degrees,
            }),
            Op::TurnToHeading { heading } => Instr::Action(Action::TurnToHeading(*heading)),
            Op::TurnToRotation { rotation } => Instr::Action(Action::TurnToRotation(*rotation)),
            Op::StopDriving => Instr::Action(Action::StopDriving),
            Op::SetDriveVelocity { velocity } => Instr::Action(Action::SetDriveVelocity(*velocity)),
            Op::SetTurnVelocity { velocity } => Instr::Action(Action::SetTurnVelocity(*velocity)),
            Op::SetDriveHeading { heading } => Instr::Action(Action::SetDriveHeading(*heading)),
            Op::SetDriveRotation { rotation } => Instr::Action(Action::SetDriveRotation(*rotation)),
            Op::SetDriveTimeout { seconds } => Instr::Action(Action::SetDriveTimeout(*seconds)),
            Op::Wait { seconds } => Instr::Action(Action::Wait(*seconds)),
            Op::WaitUntil { condition } => Instr::WaitUntil(self.alloc_cond(condition)),
            Op::RepeatTimes { times, body } => Instr::RepeatTimes {
                times: *times,
                body: self.defer(body, pending),
            },
            Op::Forever { body } => Instr::Forever {
                body: self.defer(body, pending),
            },
            Op::RepeatUntil { condition, body } => Instr::RepeatUntil {
                cond: self.alloc_cond(condition),
                body: self.defer(body, pending),
            },
            Op::While { condition, body } => Instr::While {
                cond: self.alloc_cond(condition),
                body: self.defer(body, pending),
            },
            Op::IfThen { condition, then } => Instr::IfThen {
                cond: self.alloc_cond(condition),
                then: self.defer(then, pending),
            },
            Op::IfThenElse {
                condition,
                then,
                otherwise,
            } => Instr::IfThenElse {
                cond: self.alloc_cond(condition),
                then: self.defer(then, pending),
                otherwise: self.defer(otherwise, pending),
            },
            Op::IfElseIfElse {
                condition,
                then,
                else_if_condition,
                else_if,
                otherwise,
            } => Instr::IfElseIfElse {
                cond: self.alloc_cond(condition),
                then: self.defer(then, pending),
                else_if_cond: self.alloc_cond(else_if_condition),
                else_if: self.defer(else_if, pending),
                otherwise: self.defer(otherwise, pending),
            },
            Op::Break => Instr::Break,
            Op::StopProject => Instr::StopProject,
            Op::Pen { action, color } => Instr::Action(Action::Pen {
                action: *action,
                color: color.clone(),
            }),
            Op::Magnet { action } => Instr::Action(Action::Magnet(*action)),
            Op::Print { text } => Instr::Action(Action::Print(text.clone())),
            Op::ClearConsole => Instr::Action(Action::ClearConsole),
        }
    }

    #[inline]
    pub fn body(&self, id: BodyId) -> &[Instr] {
        &self.bodies[id.index()]
    }

    #[inline]
    pub fn condition(&self, id: CondId) -> &Expr {
        &self.conditions[id.index()]
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Total instructions across all bodies
    pub fn instr_count(&self) -> usize {
        self.bodies.iter().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lower_flat_program() {
        let program = Program::new(vec![
            Op::turn(TurnDirection::Right, 90.0),
            Op::wait(1.0),
            Op::StopProject,
        ]);
        let script = Script::lower(&program);
        assert_eq!(script.body_count(), 1);
        let root = script.body(Script::ROOT);
        assert_eq!(root.len(), 3);
        assert_eq!(root[0].name(), "turn");
        assert_eq!(root[2], Instr::StopProject);
    }

    #[test]
    fn test_lower_nested_bodies() {
        let program = Program::new(vec![Op::repeat(
            2,
            vec![
                Op::if_else(
                    Expr::boolean(true),
                    vec![Op::turn(TurnDirection::Left, 10.0)],
                    vec![Op::Break],
                ),
                Op::forever(vec![]),
            ],
        )]);
        let script = Script::lower(&program);
        // root, repeat body, then, otherwise, forever body
        assert_eq!(script.body_count(), 5);
        assert_eq!(script.instr_count(), 5);

        let Instr::RepeatTimes { times, body } = script.body(Script::ROOT)[0] else {
            panic!("expected repeat");
        };
        assert_eq!(times, Some(2.0));
        let repeat_body = script.body(body);
        assert_eq!(repeat_body.len(), 2);

        let Instr::IfThenElse {
            cond,
            then,
            otherwise,
        } = repeat_body[0]
        else {
            panic!("expected if/else");
        };
        assert_eq!(script.condition(cond), &Expr::boolean(true));
        assert_eq!(script.body(then)[0].name(), "turn");
        assert_eq!(script.body(otherwise), &[Instr::Break]);

        let Instr::Forever { body } = repeat_body[1] else {
            panic!("expected forever");
        };
        assert!(script.body(body).is_empty());
    }

    #[test]
    fn test_lower_deep_nesting() {
        let mut ops = vec![Op::StopProject];
        for _ in 0..1_000 {
            ops = vec![Op::forever(ops)];
        }
        let script = Script::lower(&Program::new(ops));
        assert_eq!(script.body_count(), 1_001);
    }
}
