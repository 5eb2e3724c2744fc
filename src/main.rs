//! Ocean Bot entry point
//!
//! Native builds run a compiled program headless and print the final report.
//! The browser build boots from the library's wasm start hook.

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use std::error::Error;

    use ocean_bot::consts::SIM_DT;
    use ocean_bot::program::{DistanceUnit, DriveDirection, Op, TurnDirection};
    use ocean_bot::sim::{GameEvent, RunReport};
    use ocean_bot::{Program, RunController, Settings};

    /// Simulated seconds before a still-running program is stopped
    const RUN_TIME_LIMIT: f32 = 120.0;

    /// Patrol a square around the start position
    fn demo_program() -> Program {
        Program::new(vec![
            Op::Print {
                text: "Starting patrol".into(),
            },
            Op::SetDriveVelocity {
                velocity: Some(75.0),
            },
            Op::repeat(
                4,
                vec![
                    Op::drive(DriveDirection::Forward, 300.0, DistanceUnit::Mm),
                    Op::turn(TurnDirection::Right, 90.0),
                    Op::wait(0.5),
                ],
            ),
            Op::turn_to_rotation(0.0),
        ])
    }

    /// Start the program at `path`, or the patrol when none is given.
    ///
    /// A program that fails to decode still produces a (failed) run report.
    fn start_program(
        controller: &mut RunController,
        path: Option<String>,
    ) -> Result<(), Box<dyn Error>> {
        let Some(path) = path else {
            log::info!("No program given, running the built-in patrol");
            controller.start(&demo_program())?;
            return Ok(());
        };
        let json = std::fs::read_to_string(&path)?;
        log::info!("Loaded {path}");
        if let Err(err) = controller.start_json(&json) {
            log::error!("{path}: {err}");
        }
        Ok(())
    }

    fn log_event(event: &GameEvent) {
        match event {
            GameEvent::TrashSpawned { id } => log::debug!("Trash #{id} spawned"),
            GameEvent::TrashCollected { id, total } => {
                log::info!("Picked up trash #{id} ({total} total)")
            }
            GameEvent::CoralHit { index } => log::warn!("Hit coral #{index}"),
            GameEvent::RunFinished(report) => log::info!("Finished: {:?}", report.outcome),
        }
    }

    pub fn run() -> Result<RunReport, Box<dyn Error>> {
        let mut settings = Settings::load();
        if let Ok(seed) = std::env::var("OCEAN_BOT_SEED") {
            settings.seed = Some(seed.parse()?);
        }

        let mut controller = RunController::new(settings);
        start_program(&mut controller, std::env::args().nth(1))?;

        let mut report = None;
        let mut elapsed = 0.0;
        loop {
            for event in controller.drain_events() {
                log_event(&event);
                if let GameEvent::RunFinished(finished) = event {
                    report = Some(finished);
                }
            }
            if !controller.is_running() {
                break;
            }
            if elapsed >= RUN_TIME_LIMIT {
                log::warn!("Time limit of {RUN_TIME_LIMIT}s reached, stopping");
                controller.stop();
                continue;
            }
            controller.tick(SIM_DT);
            elapsed += SIM_DT;
        }
        let report = report.ok_or("run ended without a report")?;

        let robot = controller.robot();
        log::info!(
            "Robot at ({:.1}, {:.1}) facing {:.1} after {elapsed:.2}s",
            robot.x(),
            robot.y(),
            robot.rotation()
        );
        Ok(report)
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> std::process::ExitCode {
    use std::process::ExitCode;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Ocean Bot (native) starting...");

    match headless::run() {
        Ok(report) => {
            match serde_json::to_string_pretty(&report) {
                Ok(json) => println!("{json}"),
                Err(err) => log::error!("Failed to encode report: {err}"),
            }
            if report.outcome.is_loss() {
                ExitCode::from(2)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is `platform::web::init`, this is just to satisfy the compiler
}
