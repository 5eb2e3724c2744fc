//! Run controller
//!
//! Owns the robot, the reef and the active run. A host calls [`RunController::advance`]
//! once per display frame; everything else happens inside fixed ticks:
//!
//! 1. the animator moves the robot
//! 2. the reef observes the new pose (pickups, coral)
//! 3. the interpreter resumes until its next suspension
//! 4. the reef observes again if the interpreter committed a pose

use std::rc::Rc;

use serde::Serialize;

use super::cancel::CancelToken;
use super::error::{ControlError, ExecutionError};
use super::interpreter::{Hardware, Interpreter, Progress};
use super::motion::Animator;
use super::state::{
    CoralPiece, GameEvent, GameState, Ocean, RobotState, RunOutcome, RunPhase, RunReport,
    TrashItem,
};
use super::tick;
use crate::consts::*;
use crate::program::{Program, Script};
use crate::settings::{LayoutScale, Settings};

/// Called once per run with the final report
pub type FinishListener = Box<dyn FnMut(&RunReport)>;

/// Everything a renderer needs for one frame
#[derive(Debug, Serialize)]
pub struct Snapshot<'a> {
    pub phase: &'a RunPhase,
    pub robot: &'a RobotState,
    pub game: &'a GameState,
    pub trash: &'a [TrashItem],
    pub coral: &'a [CoralPiece],
}

/// Per-run machinery, dropped on teardown
struct ActiveRun {
    interpreter: Interpreter,
    animator: Animator,
    cancel: CancelToken,
    /// Seconds since start
    clock: f32,
}

pub struct RunController {
    settings: Settings,
    robot: RobotState,
    game: GameState,
    ocean: Ocean,
    phase: RunPhase,
    run: Option<ActiveRun>,
    accumulator: f32,
    events: Vec<GameEvent>,
    listeners: Vec<FinishListener>,
}

impl RunController {
    pub fn new(settings: Settings) -> Self {
        let seed = settings.seed.unwrap_or_else(rand::random);
        let mut ocean = Ocean::new(settings.layout, seed);
        tick::generate_reef(&mut ocean);
        log::info!(
            "Playground ready ({} layout, seed {seed})",
            settings.layout.as_str()
        );

        Self {
            robot: RobotState::at(ocean.center()),
            game: GameState::default(),
            ocean,
            phase: RunPhase::Idle,
            run: None,
            accumulator: 0.0,
            events: Vec::new(),
            listeners: Vec::new(),
            settings,
        }
    }

    // === Commands ===

    /// Begin interpreting `program` from the canvas centre
    pub fn start(&mut self, program: &Program) -> Result<(), ControlError> {
        if self.is_running() {
            log::warn!("Start ignored: a program is already running");
            return Err(ControlError::AlreadyRunning);
        }

        self.robot.reset(self.ocean.center());
        self.game = GameState {
            is_spawning_trash: self.settings.trash_spawning,
            ..GameState::default()
        };
        self.ocean.clear_trash();
        self.ocean.spawn_timer = self.settings.effective_spawn_interval();
        self.accumulator = 0.0;

        let script = Rc::new(Script::lower(program));
        log::info!(
            "Run started: {} instructions in {} bodies",
            script.instr_count(),
            script.body_count()
        );

        let cancel = CancelToken::new();
        self.run = Some(ActiveRun {
            interpreter: Interpreter::new(script, cancel.clone()),
            animator: Animator::new(cancel.clone()),
            cancel,
            clock: 0.0,
        });
        self.phase = RunPhase::Running;
        Ok(())
    }

    /// Decode a JSON program and start it.
    ///
    /// A program that fails to decode still counts as a run: it ends at once
    /// as failed, the game is lost and listeners hear about it.
    pub fn start_json(&mut self, json: &str) -> Result<(), ControlError> {
        let err = match Program::from_json(json) {
            Ok(program) => return self.start(&program),
            Err(err) => err,
        };
        if self.is_running() {
            log::warn!("Start ignored: a program is already running");
            return Err(ControlError::AlreadyRunning);
        }

        self.start(&Program::default())?;
        self.finish(RunOutcome::Failed(ExecutionError::Malformed {
            reason: err.to_string(),
        }));
        Err(ControlError::Program(err))
    }

    /// End the active run cleanly. No-op when nothing is running.
    pub fn stop(&mut self) {
        self.finish(RunOutcome::Stopped);
    }

    /// Stop any run and return robot, score and trash to defaults
    pub fn reset(&mut self) {
        self.finish(RunOutcome::Stopped);
        self.robot.reset(self.ocean.center());
        self.game = GameState::default();
        self.ocean.clear_trash();
        self.accumulator = 0.0;
        self.phase = RunPhase::Idle;
    }

    /// [`reset`](Self::reset), and discard undelivered events
    pub fn clear(&mut self) {
        self.reset();
        self.events.clear();
    }

    /// Switch playground size. Rebuilds the reef and recentres the robot.
    pub fn set_layout(&mut self, layout: LayoutScale) -> Result<(), ControlError> {
        if self.is_running() {
            log::warn!("Layout change refused while running");
            return Err(ControlError::Busy);
        }
        self.settings.layout = layout;
        self.ocean.layout = layout;
        tick::generate_reef(&mut self.ocean);
        self.reset();
        log::info!("Layout set to {}", layout.as_str());
        Ok(())
    }

    pub fn on_finish(&mut self, listener: impl FnMut(&RunReport) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    // === Frame driving ===

    /// Feed one host frame. Runs up to [`MAX_SUBSTEPS`] fixed ticks and
    /// returns how many ran.
    pub fn advance(&mut self, frame_dt: f32) -> u32 {
        if !(frame_dt > 0.0) {
            return 0;
        }
        self.accumulator += frame_dt.min(MAX_FRAME_DT);

        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            self.tick(SIM_DT);
            self.accumulator -= SIM_DT;
            substeps += 1;
        }
        if substeps == MAX_SUBSTEPS {
            // Drop backlog the substep cap could not absorb
            self.accumulator = self.accumulator.min(SIM_DT);
        }
        substeps
    }

    /// One fixed simulation tick
    pub fn tick(&mut self, dt: f32) {
        tick::tick(&mut self.ocean, &self.game, &self.settings, dt, &mut self.events);

        let Some(mut run) = self.run.take() else {
            return;
        };
        run.clock += dt;

        let before = self.robot.pose();
        run.animator.step(&mut self.robot, dt);
        if self.robot.pose() != before && self.observe() {
            self.run = Some(run);
            self.finish(RunOutcome::Collision);
            return;
        }

        let before = self.robot.pose();
        let mut hw = Hardware {
            robot: &mut self.robot,
            animator: &mut run.animator,
            scale: self.ocean.layout.factor(),
            clock: run.clock,
        };
        let progress = run.interpreter.advance(dt, &mut hw);
        let moved = self.robot.pose() != before;
        self.run = Some(run);

        if moved && self.observe() {
            self.finish(RunOutcome::Collision);
            return;
        }

        match progress {
            Ok(Progress::Pending) | Ok(Progress::Cancelled) => {}
            Ok(Progress::Finished) => self.finish(RunOutcome::Completed),
            Ok(Progress::Stopped) => self.finish(RunOutcome::Stopped),
            Err(err) => self.finish(RunOutcome::Failed(err)),
        }
    }

    /// Check the committed pose. True on a fatal coral contact.
    fn observe(&mut self) -> bool {
        let contact = tick::observe(
            &mut self.ocean,
            &mut self.game,
            self.robot.position(),
            &mut self.events,
        );
        match contact {
            Some(contact) if self.is_running() => {
                log::warn!(
                    "Robot hit coral #{} at ({:.1}, {:.1})",
                    contact.index,
                    self.robot.x(),
                    self.robot.y()
                );
                self.events.push(GameEvent::CoralHit {
                    index: contact.index,
                });
                true
            }
            _ => false,
        }
    }

    /// Tear down the active run. Idempotent: only the first call per run
    /// records an outcome and notifies listeners.
    fn finish(&mut self, outcome: RunOutcome) {
        let Some(run) = self.run.take() else {
            return;
        };
        run.cancel.cancel();

        self.game.is_spawning_trash = false;
        if outcome.is_loss() {
            self.game.lose();
        }

        match &outcome {
            RunOutcome::Completed => log::info!("Run completed"),
            RunOutcome::Stopped => log::info!("Run stopped"),
            RunOutcome::Collision => log::info!("Run lost: collision"),
            RunOutcome::Failed(err) => log::error!("Run failed: {err}"),
        }

        let report = RunReport {
            outcome: outcome.clone(),
            trash_collected: self.game.trash_collected,
        };
        self.phase = RunPhase::Finished(outcome);
        self.events.push(GameEvent::RunFinished(report.clone()));
        for listener in &mut self.listeners {
            listener(&report);
        }
    }

    // === Observation ===

    #[inline]
    pub fn is_running(&self) -> bool {
        self.phase == RunPhase::Running
    }

    pub fn phase(&self) -> &RunPhase {
        &self.phase
    }

    pub fn robot(&self) -> &RobotState {
        &self.robot
    }

    pub fn game(&self) -> &GameState {
        &self.game
    }

    pub fn ocean(&self) -> &Ocean {
        &self.ocean
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Seconds into the active run
    pub fn run_clock(&self) -> Option<f32> {
        self.run.as_ref().map(|run| run.clock)
    }

    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            phase: &self.phase,
            robot: &self.robot,
            game: &self.game,
            trash: &self.ocean.trash,
            coral: &self.ocean.coral,
        }
    }

    /// Take queued events
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::{
        DistanceUnit, DriveDirection, Expr, Op, Sensor, TurnDirection,
    };
    use glam::Vec2;
    use std::cell::RefCell;

    fn quiet() -> Settings {
        Settings {
            trash_spawning: false,
            seed: Some(7),
            ..Settings::default()
        }
    }

    fn controller() -> RunController {
        RunController::new(quiet())
    }

    fn run_until_done(ctl: &mut RunController, max_ticks: u32) {
        for _ in 0..max_ticks {
            if !ctl.is_running() {
                return;
            }
            ctl.tick(SIM_DT);
        }
    }

    fn record_reports(ctl: &mut RunController) -> Rc<RefCell<Vec<RunReport>>> {
        let reports = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&reports);
        ctl.on_finish(move |report| sink.borrow_mut().push(report.clone()));
        reports
    }

    #[test]
    fn test_drive_then_turn() {
        let mut ctl = controller();
        ctl.start(&Program::new(vec![
            Op::drive(DriveDirection::Forward, 200.0, DistanceUnit::Mm),
            Op::turn(TurnDirection::Right, 90.0),
        ]))
        .unwrap();
        run_until_done(&mut ctl, 1000);

        assert_eq!(ctl.phase(), &RunPhase::Finished(RunOutcome::Completed));
        assert!((ctl.robot().x() - 200.0).abs() < 1e-4);
        assert!((ctl.robot().y() - 160.0).abs() < 1e-4);
        assert_eq!(ctl.robot().rotation(), 90.0);
        assert!(!ctl.game().is_game_over);
    }

    #[test]
    fn test_repeat_three_right_turns() {
        let mut ctl = controller();
        ctl.start(&Program::new(vec![Op::repeat(
            3,
            vec![Op::turn(TurnDirection::Right, 90.0)],
        )]))
        .unwrap();
        run_until_done(&mut ctl, 1000);

        assert_eq!(ctl.robot().rotation(), 270.0);
        assert_eq!(ctl.robot().position(), Vec2::new(200.0, 200.0));
    }

    #[test]
    fn test_stop_mid_turn_leaves_partial_rotation() {
        let mut ctl = controller();
        ctl.start(&Program::new(vec![Op::turn(TurnDirection::Right, 90.0)]))
            .unwrap();
        // First tick issues the turn, then 50 ms of animation
        ctl.tick(SIM_DT);
        for _ in 0..6 {
            ctl.tick(SIM_DT);
        }
        ctl.stop();

        let rotation = ctl.robot().rotation();
        assert!(rotation > 0.0 && rotation < 90.0, "rotation {rotation}");
        assert_eq!(ctl.phase(), &RunPhase::Finished(RunOutcome::Stopped));

        for _ in 0..120 {
            ctl.tick(SIM_DT);
        }
        assert_eq!(ctl.robot().rotation(), rotation);
    }

    #[test]
    fn test_forever_stop_freezes_robot() {
        let mut ctl = controller();
        ctl.start(&Program::new(vec![Op::forever(vec![Op::turn(
            TurnDirection::Left,
            15.0,
        )])]))
        .unwrap();
        for _ in 0..500 {
            ctl.tick(SIM_DT);
        }
        assert!(ctl.is_running());

        ctl.stop();
        let frozen = *ctl.robot();
        for _ in 0..500 {
            ctl.tick(SIM_DT);
        }
        assert_eq!(*ctl.robot(), frozen);
        assert!(!ctl.game().is_game_over);
    }

    #[test]
    fn test_collision_ends_run_once() {
        let mut ctl = controller();
        let reports = record_reports(&mut ctl);
        ctl.start(&Program::new(vec![Op::drive(
            DriveDirection::Forward,
            1000.0,
            DistanceUnit::Inches,
        )]))
        .unwrap();
        run_until_done(&mut ctl, 1000);

        assert_eq!(ctl.phase(), &RunPhase::Finished(RunOutcome::Collision));
        assert!(ctl.game().is_game_over && ctl.game().game_lost);
        assert!(ctl.robot().y() > 0.0, "stopped at the reef, not the target");

        // Further ticks and commands do not re-trigger
        for _ in 0..240 {
            ctl.tick(SIM_DT);
        }
        ctl.stop();

        assert_eq!(reports.borrow().len(), 1);
        assert_eq!(reports.borrow()[0].outcome, RunOutcome::Collision);
        let events = ctl.drain_events();
        let hits = events
            .iter()
            .filter(|e| matches!(e, GameEvent::CoralHit { .. }))
            .count();
        let finishes = events
            .iter()
            .filter(|e| matches!(e, GameEvent::RunFinished(_)))
            .count();
        assert_eq!((hits, finishes), (1, 1));
    }

    #[test]
    fn test_pickup_during_run() {
        let mut ctl = controller();
        ctl.start(&Program::new(vec![Op::drive(
            DriveDirection::Forward,
            60.0,
            DistanceUnit::Inches,
        )]))
        .unwrap();

        let id = tick::spawn_trash(&mut ctl.ocean);
        let item = &mut ctl.ocean.trash[0];
        item.pos = Vec2::new(200.0, 170.0);
        item.scale = 1.0;

        run_until_done(&mut ctl, 1000);
        assert_eq!(ctl.phase(), &RunPhase::Finished(RunOutcome::Completed));
        assert_eq!(ctl.game().trash_collected, 1);
        assert!(ctl.ocean().trash[0].is_collected);

        let collected: Vec<_> = ctl
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, GameEvent::TrashCollected { .. }))
            .collect();
        assert_eq!(collected, vec![GameEvent::TrashCollected { id, total: 1 }]);
    }

    #[test]
    fn test_execution_error_marks_game_lost() {
        let mut ctl = controller();
        let reports = record_reports(&mut ctl);
        ctl.start(&Program::new(vec![Op::if_then(
            Expr::sensor(Sensor::PositionX),
            vec![],
        )]))
        .unwrap();
        run_until_done(&mut ctl, 10);

        let RunPhase::Finished(RunOutcome::Failed(err)) = ctl.phase() else {
            panic!("expected a failed run, got {:?}", ctl.phase());
        };
        assert!(matches!(err, ExecutionError::Condition { op: "ifThen", .. }));
        assert!(ctl.game().is_game_over && ctl.game().game_lost);
        assert_eq!(reports.borrow().len(), 1);
    }

    #[test]
    fn test_stop_project_is_clean() {
        let mut ctl = controller();
        ctl.start(&Program::new(vec![
            Op::turn(TurnDirection::Right, 45.0),
            Op::StopProject,
            Op::turn(TurnDirection::Right, 45.0),
        ]))
        .unwrap();
        run_until_done(&mut ctl, 1000);

        assert_eq!(ctl.phase(), &RunPhase::Finished(RunOutcome::Stopped));
        assert_eq!(ctl.robot().rotation(), 45.0);
        assert!(!ctl.game().is_game_over);
    }

    #[test]
    fn test_start_guard_and_restart() {
        let mut ctl = controller();
        let program = Program::new(vec![Op::wait(0.1)]);
        ctl.start(&program).unwrap();
        assert!(matches!(
            ctl.start(&program),
            Err(ControlError::AlreadyRunning)
        ));

        run_until_done(&mut ctl, 100);
        assert!(!ctl.is_running());
        ctl.start(&program).unwrap();
        assert!(ctl.is_running());
    }

    #[test]
    fn test_start_resets_previous_run() {
        let mut ctl = controller();
        ctl.start(&Program::new(vec![Op::turn(TurnDirection::Right, 30.0)]))
            .unwrap();
        run_until_done(&mut ctl, 100);
        assert_eq!(ctl.robot().rotation(), 30.0);

        ctl.start(&Program::default()).unwrap();
        assert_eq!(ctl.robot().rotation(), 0.0);
        assert_eq!(ctl.game().trash_collected, 0);
    }

    #[test]
    fn test_reset_notifies_and_returns_to_idle() {
        let mut ctl = controller();
        let reports = record_reports(&mut ctl);
        ctl.start(&Program::new(vec![Op::forever(vec![])])).unwrap();
        ctl.tick(SIM_DT);

        ctl.reset();
        ctl.reset();
        assert_eq!(ctl.phase(), &RunPhase::Idle);
        assert_eq!(ctl.robot().position(), Vec2::new(200.0, 200.0));
        assert!(ctl.ocean().trash.is_empty());
        assert_eq!(reports.borrow().len(), 1);

        ctl.clear();
        assert!(ctl.drain_events().is_empty());
    }

    #[test]
    fn test_set_layout() {
        let mut ctl = controller();
        ctl.start(&Program::new(vec![Op::wait(1.0)])).unwrap();
        assert!(matches!(
            ctl.set_layout(LayoutScale::Enlarged),
            Err(ControlError::Busy)
        ));

        ctl.stop();
        ctl.set_layout(LayoutScale::Enlarged).unwrap();
        assert_eq!(ctl.robot().position(), Vec2::new(300.0, 300.0));
        assert_eq!(ctl.settings().layout, LayoutScale::Enlarged);
        assert!(
            ctl.ocean()
                .coral
                .iter()
                .any(|c| c.pos.x > 550.0 || c.pos.y > 550.0)
        );
    }

    #[test]
    fn test_enlarged_drive_scales() {
        let mut ctl = RunController::new(Settings {
            layout: LayoutScale::Enlarged,
            ..quiet()
        });
        ctl.start(&Program::new(vec![Op::drive(
            DriveDirection::Forward,
            200.0,
            DistanceUnit::Mm,
        )]))
        .unwrap();
        run_until_done(&mut ctl, 1000);
        assert!((ctl.robot().y() - 240.0).abs() < 1e-3);
    }

    #[test]
    fn test_spawner_runs_only_during_runs() {
        let mut ctl = RunController::new(Settings {
            trash_spawning: true,
            ..quiet()
        });
        for _ in 0..600 {
            ctl.tick(SIM_DT);
        }
        assert!(ctl.ocean().trash.is_empty());

        ctl.start(&Program::new(vec![Op::wait(5.0)])).unwrap();
        run_until_done(&mut ctl, 1000);
        // Spawns at 2 s and 4 s
        assert_eq!(ctl.ocean().trash.len(), 2);
    }

    #[test]
    fn test_advance_substeps() {
        let mut ctl = controller();
        assert_eq!(ctl.advance(1.0 / 60.0), 2);
        assert_eq!(ctl.advance(5.0), MAX_SUBSTEPS);
        assert_eq!(ctl.advance(0.0), 0);
        assert_eq!(ctl.advance(f32::NAN), 0);
    }

    #[test]
    fn test_run_clock_tracks_ticks() {
        let mut ctl = controller();
        assert_eq!(ctl.run_clock(), None);
        ctl.start(&Program::new(vec![Op::wait(1.0)])).unwrap();
        for _ in 0..60 {
            ctl.tick(SIM_DT);
        }
        let clock = ctl.run_clock().unwrap();
        assert!((clock - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_malformed_program_fails_run() {
        let mut ctl = controller();
        let reports = record_reports(&mut ctl);

        // Drive without its direction
        assert!(matches!(
            ctl.start_json(r#"[{"op": "drive"}]"#),
            Err(ControlError::Program(_))
        ));

        let RunPhase::Finished(RunOutcome::Failed(ExecutionError::Malformed { .. })) = ctl.phase()
        else {
            panic!("expected a malformed-program failure, got {:?}", ctl.phase());
        };
        assert!(ctl.game().is_game_over && ctl.game().game_lost);
        assert_eq!(reports.borrow().len(), 1);
        assert!(matches!(
            reports.borrow()[0].outcome,
            RunOutcome::Failed(ExecutionError::Malformed { .. })
        ));
        let finishes = ctl
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, GameEvent::RunFinished(_)))
            .count();
        assert_eq!(finishes, 1);
    }

    #[test]
    fn test_malformed_program_while_running_is_refused() {
        let mut ctl = controller();
        let reports = record_reports(&mut ctl);
        ctl.start(&Program::new(vec![Op::wait(1.0)])).unwrap();

        assert!(matches!(
            ctl.start_json(r#"[{"op": "teleport"}]"#),
            Err(ControlError::AlreadyRunning)
        ));
        assert!(ctl.is_running());
        assert!(reports.borrow().is_empty());
    }

    #[test]
    fn test_start_json() {
        let mut ctl = controller();
        assert!(matches!(
            ctl.start_json(r#"[{"op": "teleport"}]"#),
            Err(ControlError::Program(_))
        ));
        assert!(!ctl.is_running());

        ctl.start_json(r#"[{"op": "turn", "direction": "right", "degrees": 10}]"#)
            .unwrap();
        run_until_done(&mut ctl, 100);
        assert_eq!(ctl.robot().rotation(), 10.0);
    }

    #[test]
    fn test_snapshot_json_shape() {
        let ctl = controller();
        let json = serde_json::to_value(ctl.snapshot()).unwrap();
        assert_eq!(json["phase"]["phase"], "idle");
        assert_eq!(json["robot"]["x"], 200.0);
        assert!(json["coral"].as_array().is_some_and(|c| !c.is_empty()));
        assert!(json["trash"].as_array().is_some_and(|t| t.is_empty()));
    }
}
