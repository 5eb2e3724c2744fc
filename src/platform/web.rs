//! Browser façade
//!
//! The block editor compiles its workspace to JSON and drives a [`Playground`]
//! from `requestAnimationFrame`. State crosses the boundary as JSON strings.

use wasm_bindgen::prelude::*;

use super::frame_delta;
use crate::settings::{LayoutScale, Settings};
use crate::sim::RunController;

#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_err() {
        web_sys::console::warn_1(&"Logger already initialized".into());
    }
    log::info!("Ocean Bot starting...");
}

/// One playground: robot, reef and the active run
#[wasm_bindgen]
pub struct Playground {
    controller: RunController,
    last_time: Option<f64>,
}

#[wasm_bindgen]
impl Playground {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Playground {
        Playground {
            controller: RunController::new(Settings::load()),
            last_time: None,
        }
    }

    /// Start a compiled program (JSON array of operations)
    pub fn start(&mut self, program_json: &str) -> Result<(), JsError> {
        self.controller.start_json(program_json)?;
        Ok(())
    }

    pub fn stop(&mut self) {
        self.controller.stop();
    }

    pub fn reset(&mut self) {
        self.controller.reset();
        self.last_time = None;
    }

    /// Switch between the normal and maximised playground. Persisted.
    pub fn set_enlarged(&mut self, enlarged: bool) -> Result<(), JsError> {
        let layout = if enlarged {
            LayoutScale::Enlarged
        } else {
            LayoutScale::Normal
        };
        self.controller.set_layout(layout)?;
        self.controller.settings().save();
        Ok(())
    }

    /// Advance by the time since the previous frame. Returns ticks run.
    pub fn frame(&mut self, time_ms: f64) -> u32 {
        let dt = frame_delta(self.last_time, time_ms);
        self.last_time = Some(time_ms);
        self.controller.advance(dt)
    }

    #[wasm_bindgen(getter)]
    pub fn running(&self) -> bool {
        self.controller.is_running()
    }

    #[wasm_bindgen(getter)]
    pub fn canvas_size(&self) -> f32 {
        self.controller.ocean().layout.canvas_size()
    }

    /// Robot, score, trash and coral as JSON
    pub fn snapshot(&self) -> Result<String, JsError> {
        Ok(serde_json::to_string(&self.controller.snapshot())?)
    }

    /// Events since the last call, as a JSON array
    pub fn drain_events(&mut self) -> Result<String, JsError> {
        Ok(serde_json::to_string(&self.controller.drain_events())?)
    }

    /// Register `callback(reportJson)`, called once per finished run
    pub fn on_finish(&mut self, callback: js_sys::Function) {
        self.controller.on_finish(move |report| {
            let json = match serde_json::to_string(report) {
                Ok(json) => json,
                Err(err) => {
                    log::error!("Failed to encode run report: {err}");
                    return;
                }
            };
            if let Err(err) = callback.call1(&JsValue::NULL, &JsValue::from_str(&json)) {
                log::warn!("Finish callback threw: {err:?}");
            }
        });
    }
}

impl Default for Playground {
    fn default() -> Self {
        Self::new()
    }
}
