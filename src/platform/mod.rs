//! Platform abstraction layer
//!
//! Handles browser/native differences for:
//! - Logger and panic hook setup
//! - The JS-facing playground handle
//! - Storage (LocalStorage on web, see `settings`)

#[cfg(target_arch = "wasm32")]
pub mod web;

/// Milliseconds between two host timestamps as a frame delta in seconds.
///
/// The first frame (no previous timestamp) and clock jumps backwards yield 0.
pub fn frame_delta(previous_ms: Option<f64>, now_ms: f64) -> f32 {
    match previous_ms {
        Some(prev) if now_ms > prev => ((now_ms - prev) / 1000.0) as f32,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_delta() {
        assert_eq!(frame_delta(None, 1234.0), 0.0);
        assert!((frame_delta(Some(1000.0), 1016.0) - 0.016).abs() < 1e-6);
        assert_eq!(frame_delta(Some(2000.0), 1000.0), 0.0);
    }
}
