//! Motion animator
//!
//! Interpolates the robot pose toward a target over a fixed duration with an
//! ease-out cubic curve. One motion at a time; cancelling leaves the pose at
//! whatever value the last tick wrote.

use super::cancel::CancelToken;
use super::state::{Pose, RobotState};
use crate::ease_out_cubic;

/// Remaining time below this counts as arrived (absorbs f32 drift in dt sums)
const ARRIVAL_EPSILON: f32 = 1e-5;

/// Partial target pose; `None` fields are left alone
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MotionTarget {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub rotation: Option<f32>,
}

impl MotionTarget {
    pub fn position(x: f32, y: f32) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            rotation: None,
        }
    }

    pub fn rotation(rotation: f32) -> Self {
        Self {
            rotation: Some(rotation),
            ..Self::default()
        }
    }

    /// Resolve against a start pose
    fn resolve(&self, start: Pose) -> Pose {
        Pose {
            x: self.x.unwrap_or(start.x),
            y: self.y.unwrap_or(start.y),
            rotation: self.rotation.unwrap_or(start.rotation),
        }
    }
}

/// An in-flight motion
#[derive(Debug, Clone, Copy, PartialEq)]
struct Motion {
    start: Pose,
    target: Pose,
    duration: f32,
    elapsed: f32,
}

impl Motion {
    fn lerp(&self, eased: f32) -> Pose {
        Pose {
            x: self.start.x + (self.target.x - self.start.x) * eased,
            y: self.start.y + (self.target.y - self.start.y) * eased,
            rotation: self.start.rotation + (self.target.rotation - self.start.rotation) * eased,
        }
    }
}

/// Result of one animator tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionStatus {
    /// Nothing in flight
    Idle,
    Moving,
    /// Arrived this tick (pose snapped to target)
    Arrived,
    /// Dropped this tick because the run was cancelled
    Cancelled,
}

/// Refused because a motion is already in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionBusy;

#[derive(Debug, Clone)]
pub struct Animator {
    active: Option<Motion>,
    cancel: CancelToken,
}

impl Animator {
    pub fn new(cancel: CancelToken) -> Self {
        Self {
            active: None,
            cancel,
        }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Begin a motion from the robot's current pose.
    ///
    /// A non-positive duration commits the target immediately.
    pub fn start(
        &mut self,
        robot: &mut RobotState,
        target: MotionTarget,
        duration: f32,
    ) -> Result<(), MotionBusy> {
        if self.active.is_some() {
            return Err(MotionBusy);
        }
        if self.cancel.is_cancelled() {
            return Ok(());
        }

        let start = robot.pose();
        let target = target.resolve(start);
        if !(duration > 0.0) {
            robot.write_pose(target);
            return Ok(());
        }

        self.active = Some(Motion {
            start,
            target,
            duration,
            elapsed: 0.0,
        });
        Ok(())
    }

    /// Advance the in-flight motion by `dt` seconds
    pub fn step(&mut self, robot: &mut RobotState, dt: f32) -> MotionStatus {
        let Some(motion) = self.active.as_mut() else {
            return MotionStatus::Idle;
        };

        if self.cancel.is_cancelled() {
            self.active = None;
            return MotionStatus::Cancelled;
        }

        motion.elapsed += dt;
        if motion.elapsed + ARRIVAL_EPSILON >= motion.duration {
            // Snap to the exact target to drop interpolation residue
            robot.write_pose(motion.target);
            self.active = None;
            return MotionStatus::Arrived;
        }

        let t = motion.elapsed / motion.duration;
        robot.write_pose(motion.lerp(ease_out_cubic(t)));
        MotionStatus::Moving
    }

    /// Drop the in-flight motion without touching the pose
    pub fn cancel(&mut self) -> bool {
        self.active.take().is_some()
    }
}
