//! Operation interpreter
//!
//! Walks a lowered [`Script`] with an explicit stack of frames. Each call to
//! [`Interpreter::advance`] services the pending wait (motion, sleep, poll)
//! and then runs instructions until the next suspension point, so one call
//! is one scheduler tick and nothing ever recurses on the native stack.
//!
//! Every loop iteration ends in a suspension: `forever` sleeps
//! [`FOREVER_YIELD`], the other loops wait for the next tick.

use std::rc::Rc;

use super::cancel::CancelToken;
use super::error::ExecutionError;
use super::motion::{Animator, MotionTarget};
use super::state::RobotState;
use crate::consts::*;
use crate::heading_vector;
use crate::program::{
    Action, BodyId, CondId, DistanceUnit, DriveDirection, Instr, MagnetAction, PenAction, Script,
    TurnDirection,
};

/// Absorbs f32 drift when sleeps are counted down in fixed steps
const SLEEP_EPSILON: f32 = 1e-5;

/// What the robot exposes to a running program for one tick
pub struct Hardware<'a> {
    pub robot: &'a mut RobotState,
    pub animator: &'a mut Animator,
    /// Layout scale applied to drive distances
    pub scale: f32,
    /// Seconds since the run started (timer sensor)
    pub clock: f32,
}

impl Hardware<'_> {
    fn start_motion(
        &mut self,
        op: &'static str,
        target: MotionTarget,
        duration: f32,
    ) -> Result<(), ExecutionError> {
        self.animator
            .start(self.robot, target, duration)
            .map_err(|_| ExecutionError::MotionInFlight { op })
    }
}

/// Where the interpreter stands after a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Suspended, resume next tick
    Pending,
    /// Ran off the end of the program
    Finished,
    /// `stop project` executed
    Stopped,
    /// The run's cancel token was tripped
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum LoopKind {
    Times { remaining: u32 },
    Forever,
    Until(CondId),
    While(CondId),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum FrameKind {
    /// Root body or an if-branch
    Block,
    Loop(LoopKind),
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Frame {
    body: BodyId,
    pc: usize,
    kind: FrameKind,
    /// Conditional loops re-check before each iteration
    check_pending: bool,
}

impl Frame {
    fn block(body: BodyId) -> Self {
        Self {
            body,
            pc: 0,
            kind: FrameKind::Block,
            check_pending: false,
        }
    }

    fn looping(body: BodyId, kind: LoopKind) -> Self {
        Self {
            body,
            pc: 0,
            kind: FrameKind::Loop(kind),
            check_pending: matches!(kind, LoopKind::Until(_) | LoopKind::While(_)),
        }
    }
}

/// Suspension the interpreter is parked on
#[derive(Debug, Clone, Copy, PartialEq)]
enum Wait {
    None,
    /// Until the animator goes idle
    Motion,
    /// Seconds left
    Sleep(f32),
    /// `wait until`: re-check `cond` when `next_check` runs out
    Poll { cond: CondId, next_check: f32 },
    NextTick,
}

/// Outcome of one instruction
enum Flow {
    Next,
    Suspend,
    Stop,
}

#[derive(Debug, Clone)]
pub struct Interpreter {
    script: Rc<Script>,
    frames: Vec<Frame>,
    wait: Wait,
    cancel: CancelToken,
}

impl Interpreter {
    pub fn new(script: Rc<Script>, cancel: CancelToken) -> Self {
        Self {
            script,
            frames: vec![Frame::block(Script::ROOT)],
            wait: Wait::None,
            cancel,
        }
    }

    /// Frames currently on the stack
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_done(&self) -> bool {
        self.frames.is_empty()
    }

    /// Run one scheduler tick
    pub fn advance(&mut self, dt: f32, hw: &mut Hardware) -> Result<Progress, ExecutionError> {
        if self.cancel.is_cancelled() {
            return Ok(Progress::Cancelled);
        }
        if self.frames.is_empty() {
            return Ok(Progress::Finished);
        }

        match self.wait {
            Wait::None | Wait::NextTick => {}
            Wait::Motion => {
                if hw.animator.is_active() {
                    return Ok(Progress::Pending);
                }
            }
            Wait::Sleep(remaining) => {
                let remaining = remaining - dt;
                if remaining > SLEEP_EPSILON {
                    self.wait = Wait::Sleep(remaining);
                    return Ok(Progress::Pending);
                }
            }
            Wait::Poll { cond, next_check } => {
                let next_check = next_check - dt;
                if next_check > SLEEP_EPSILON {
                    self.wait = Wait::Poll { cond, next_check };
                    return Ok(Progress::Pending);
                }
                if !self.test(cond, "waitUntil", hw)? {
                    self.wait = Wait::Poll {
                        cond,
                        next_check: WAIT_POLL_INTERVAL,
                    };
                    return Ok(Progress::Pending);
                }
            }
        }
        self.wait = Wait::None;

        self.run(hw)
    }

    /// Execute until the next suspension point
    fn run(&mut self, hw: &mut Hardware) -> Result<Progress, ExecutionError> {
        let script = Rc::clone(&self.script);

        loop {
            let Some(frame) = self.frames.last_mut() else {
                return Ok(Progress::Finished);
            };

            if frame.check_pending {
                frame.check_pending = false;
                let kind = frame.kind;
                let keep_going = match kind {
                    FrameKind::Loop(LoopKind::Until(cond)) => !self.test(cond, "repeatUntil", hw)?,
                    FrameKind::Loop(LoopKind::While(cond)) => self.test(cond, "while", hw)?,
                    _ => true,
                };
                if !keep_going {
                    self.frames.pop();
                }
                continue;
            }

            let body = script.body(frame.body);
            if frame.pc >= body.len() {
                let kind = frame.kind;
                match kind {
                    FrameKind::Block => {
                        self.frames.pop();
                    }
                    FrameKind::Loop(LoopKind::Times { remaining }) => {
                        if remaining <= 1 {
                            self.frames.pop();
                        } else {
                            frame.kind = FrameKind::Loop(LoopKind::Times {
                                remaining: remaining - 1,
                            });
                            frame.pc = 0;
                            self.wait = Wait::NextTick;
                            return Ok(Progress::Pending);
                        }
                    }
                    FrameKind::Loop(LoopKind::Forever) => {
                        frame.pc = 0;
                        self.wait = Wait::Sleep(FOREVER_YIELD);
                        return Ok(Progress::Pending);
                    }
                    FrameKind::Loop(LoopKind::Until(_) | LoopKind::While(_)) => {
                        frame.pc = 0;
                        frame.check_pending = true;
                        self.wait = Wait::NextTick;
                        return Ok(Progress::Pending);
                    }
                }
                continue;
            }

            let instr = &body[frame.pc];
            frame.pc += 1;

            match self.exec(instr, hw)? {
                Flow::Next => {}
                Flow::Suspend => return Ok(Progress::Pending),
                Flow::Stop => return Ok(Progress::Stopped),
            }
        }
    }

    fn exec(&mut self, instr: &Instr, hw: &mut Hardware) -> Result<Flow, ExecutionError> {
        let op = instr.name();
        match *instr {
            Instr::Action(ref action) => self.act(action, hw),

            Instr::WaitUntil(cond) => {
                if self.test(cond, op, hw)? {
                    return Ok(Flow::Next);
                }
                self.wait = Wait::Poll {
                    cond,
                    next_check: WAIT_POLL_INTERVAL,
                };
                Ok(Flow::Suspend)
            }

            Instr::RepeatTimes { times, body } => {
                let n = finite(op, "times", times.unwrap_or(DEFAULT_REPEAT_TIMES))?.floor();
                if n >= 1.0 {
                    let remaining = n.min(u32::MAX as f32) as u32;
                    self.frames
                        .push(Frame::looping(body, LoopKind::Times { remaining }));
                }
                Ok(Flow::Next)
            }
            Instr::Forever { body } => {
                self.frames.push(Frame::looping(body, LoopKind::Forever));
                Ok(Flow::Next)
            }
            Instr::RepeatUntil { cond, body } => {
                self.frames.push(Frame::looping(body, LoopKind::Until(cond)));
                Ok(Flow::Next)
            }
            Instr::While { cond, body } => {
                self.frames.push(Frame::looping(body, LoopKind::While(cond)));
                Ok(Flow::Next)
            }

            Instr::IfThen { cond, then } => {
                if self.test(cond, op, hw)? {
                    self.frames.push(Frame::block(then));
                }
                Ok(Flow::Next)
            }
            Instr::IfThenElse {
                cond,
                then,
                otherwise,
            } => {
                let branch = if self.test(cond, op, hw)? { then } else { otherwise };
                self.frames.push(Frame::block(branch));
                Ok(Flow::Next)
            }
            Instr::IfElseIfElse {
                cond,
                then,
                else_if_cond,
                else_if,
                otherwise,
            } => {
                let branch = if self.test(cond, op, hw)? {
                    then
                } else if self.test(else_if_cond, op, hw)? {
                    else_if
                } else {
                    otherwise
                };
                self.frames.push(Frame::block(branch));
                Ok(Flow::Next)
            }

            Instr::Break => {
                // Unwind if-branches up to and including the nearest loop
                while let Some(frame) = self.frames.pop() {
                    if matches!(frame.kind, FrameKind::Loop(_)) {
                        return Ok(Flow::Next);
                    }
                }
                Err(ExecutionError::BreakOutsideLoop)
            }
            Instr::StopProject => {
                hw.animator.cancel();
                self.frames.clear();
                log::info!("stop project");
                Ok(Flow::Stop)
            }
        }
    }

    fn act(&mut self, action: &Action, hw: &mut Hardware) -> Result<Flow, ExecutionError> {
        let op = action.name();
        match *action {
            Action::Drive {
                direction,
                distance,
                unit,
            } => {
                let (pixels, duration) = match distance {
                    Some(d) => {
                        let d = finite(op, "distance", d)?;
                        let pixels = match unit {
                            Some(DistanceUnit::Mm) => d / MM_PER_PIXEL,
                            Some(DistanceUnit::Inches) | None => d,
                        };
                        (pixels, MOTION_DURATION)
                    }
                    None => (DEFAULT_DRIVE_DISTANCE, DEFAULT_DRIVE_DURATION),
                };
                let sign = match direction {
                    DriveDirection::Forward => 1.0,
                    DriveDirection::Reverse => -1.0,
                };
                let target = hw.robot.position()
                    + heading_vector(hw.robot.rotation()) * (pixels * hw.scale * sign);
                hw.start_motion(op, MotionTarget::position(target.x, target.y), duration)?;
                self.wait = Wait::Motion;
                Ok(Flow::Suspend)
            }
            Action::Turn { direction, degrees } => {
                let degrees = finite(op, "degrees", degrees.unwrap_or(DEFAULT_TURN_DEGREES))?;
                let delta = match direction {
                    TurnDirection::Right => degrees,
                    TurnDirection::Left => -degrees,
                };
                let target = hw.robot.rotation() + delta;
                hw.start_motion(op, MotionTarget::rotation(target), MOTION_DURATION)?;
                self.wait = Wait::Motion;
                Ok(Flow::Suspend)
            }
            Action::TurnToHeading(value) | Action::TurnToRotation(value) => {
                let field = if matches!(action, Action::TurnToHeading(_)) {
                    "heading"
                } else {
                    "rotation"
                };
                let target = finite(op, field, value.unwrap_or(0.0))?;
                hw.start_motion(op, MotionTarget::rotation(target), MOTION_DURATION)?;
                self.wait = Wait::Motion;
                Ok(Flow::Suspend)
            }
            Action::StopDriving => {
                if hw.animator.cancel() {
                    log::info!("stop driving: motion cancelled");
                }
                Ok(Flow::Next)
            }

            Action::SetDriveVelocity(value) => {
                let v = finite(op, "velocity", value.unwrap_or(DEFAULT_VELOCITY))?;
                hw.robot.set_drive_velocity(v.clamp(0.0, 100.0));
                Ok(Flow::Next)
            }
            Action::SetTurnVelocity(value) => {
                let v = finite(op, "velocity", value.unwrap_or(DEFAULT_VELOCITY))?;
                hw.robot.set_turn_velocity(v.clamp(0.0, 100.0));
                Ok(Flow::Next)
            }
            Action::SetDriveHeading(value) => {
                hw.robot
                    .set_heading(finite(op, "heading", value.unwrap_or(0.0))?);
                Ok(Flow::Next)
            }
            Action::SetDriveRotation(value) => {
                let rotation = finite(op, "rotation", value.unwrap_or(0.0))?;
                // Zero duration: the animator commits it this tick
                hw.start_motion(op, MotionTarget::rotation(rotation), 0.0)?;
                Ok(Flow::Next)
            }

            Action::SetDriveTimeout(seconds) | Action::Wait(seconds) => {
                let seconds = finite(op, "seconds", seconds.unwrap_or(DEFAULT_WAIT_SECONDS))?;
                self.wait = Wait::Sleep(seconds);
                Ok(Flow::Suspend)
            }

            Action::Pen {
                action: pen,
                ref color,
            } => {
                match pen {
                    PenAction::Down => log::info!("pen down"),
                    PenAction::Up => log::info!("pen up"),
                    PenAction::SetColor => {
                        log::info!("pen color: {}", color.as_deref().unwrap_or("black"))
                    }
                }
                Ok(Flow::Next)
            }
            Action::Magnet(magnet) => {
                match magnet {
                    MagnetAction::Boost => log::info!("magnet boost"),
                    MagnetAction::Drop => log::info!("magnet drop"),
                }
                Ok(Flow::Next)
            }
            Action::Print(ref text) => {
                log::info!("print: {text}");
                Ok(Flow::Next)
            }
            Action::ClearConsole => {
                log::info!("console cleared");
                Ok(Flow::Next)
            }
        }
    }

    fn test(&self, cond: CondId, op: &'static str, hw: &Hardware) -> Result<bool, ExecutionError> {
        let readings = hw.robot.readings(hw.clock);
        self.script
            .condition(cond)
            .test(&readings)
            .map_err(|source| ExecutionError::Condition { op, source })
    }
}

fn finite(op: &'static str, field: &'static str, value: f32) -> Result<f32, ExecutionError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ExecutionError::NonFinite { op, field, value })
    }
}
