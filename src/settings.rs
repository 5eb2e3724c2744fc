//! Playground settings and preferences
//!
//! Persisted in LocalStorage on the web build.

use serde::{Deserialize, Serialize};

use crate::consts::{CANVAS_SIZE, MAX_TRASH, SPAWN_INTERVAL};

/// Playground window size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LayoutScale {
    #[default]
    Normal,
    Enlarged,
}

impl LayoutScale {
    pub fn as_str(&self) -> &'static str {
        match self {
            LayoutScale::Normal => "Normal",
            LayoutScale::Enlarged => "Enlarged",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "normal" => Some(LayoutScale::Normal),
            "enlarged" | "large" | "maximized" => Some(LayoutScale::Enlarged),
            _ => None,
        }
    }

    /// Uniform geometry multiplier (robot, trash, coral, drive distances)
    pub fn factor(&self) -> f32 {
        match self {
            LayoutScale::Normal => 1.0,
            LayoutScale::Enlarged => 1.5,
        }
    }

    /// Canvas edge length in pixels
    pub fn canvas_size(&self) -> f32 {
        CANVAS_SIZE * self.factor()
    }
}

/// Playground settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Playground size
    pub layout: LayoutScale,

    // === Ocean Cleanup ===
    /// Spawn trash while a program runs
    pub trash_spawning: bool,
    /// Seconds between spawn attempts
    pub spawn_interval_secs: f32,
    /// Cap on uncollected trash
    pub max_trash: usize,

    /// Fixed RNG seed (reef layout, spawns). None picks one per session.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            layout: LayoutScale::Normal,

            trash_spawning: true,
            spawn_interval_secs: SPAWN_INTERVAL,
            max_trash: MAX_TRASH,

            seed: None,
        }
    }
}

impl Settings {
    /// Spawn interval guarded against zero/negative values
    pub fn effective_spawn_interval(&self) -> f32 {
        if self.spawn_interval_secs.is_finite() && self.spawn_interval_secs > 0.0 {
            self.spawn_interval_secs
        } else {
            SPAWN_INTERVAL
        }
    }

    /// LocalStorage key
    #[allow(dead_code)]
    const STORAGE_KEY: &'static str = "ocean_bot_settings";

    /// Load settings from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                if let Ok(settings) = serde_json::from_str(&json) {
                    log::info!("Loaded settings from LocalStorage");
                    return settings;
                }
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Save settings to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = serde_json::to_string(self) {
                let _ = storage.set_item(Self::STORAGE_KEY, &json);
                log::info!("Settings saved");
            }
        }
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        // No-op for native
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_from_str() {
        assert_eq!(LayoutScale::from_str("Normal"), Some(LayoutScale::Normal));
        assert_eq!(LayoutScale::from_str("maximized"), Some(LayoutScale::Enlarged));
        assert_eq!(LayoutScale::from_str("huge"), None);
    }

    #[test]
    fn test_layout_geometry() {
        assert_eq!(LayoutScale::Normal.canvas_size(), 400.0);
        assert_eq!(LayoutScale::Enlarged.canvas_size(), 600.0);
    }

    #[test]
    fn test_settings_json_defaults_missing_seed() {
        let json = r#"{"layout":"Enlarged","trash_spawning":false,"spawn_interval_secs":3.0,"max_trash":5}"#;
        let settings: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.layout, LayoutScale::Enlarged);
        assert!(!settings.trash_spawning);
        assert_eq!(settings.seed, None);
    }

    #[test]
    fn test_spawn_interval_guard() {
        let settings = Settings {
            spawn_interval_secs: 0.0,
            ..Settings::default()
        };
        assert_eq!(settings.effective_spawn_interval(), SPAWN_INTERVAL);
    }
}
