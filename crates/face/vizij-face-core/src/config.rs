//! Core configuration for vizij-face-core.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Tunables for the blending layers and timers.
/// Every field has a default so hosts can override a subset from JSON.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceConfig {
    /// Per-tick convergence factor for expression shapes.
    pub expression_rate: f32,
    /// Per-tick convergence factor for the two blink shapes.
    pub blink_rate: f32,
    /// Convergence factor toward 1 for the active viseme.
    pub viseme_attack_rate: f32,
    /// Convergence factor toward 0 for every inactive viseme.
    pub viseme_release_rate: f32,

    /// Blink gap is drawn uniformly from `[blink_interval_min, blink_interval_max)`.
    /// Gaps and durations below [`crate::eyes::MIN_EYE_INTERVAL`] are raised to it.
    pub blink_interval_min: f64,
    pub blink_interval_max: f64,
    pub blink_duration: f64,
    pub wink_duration: f64,

    /// Crossfade applied when switching clips (the first activation is immediate).
    pub crossfade_seconds: f32,
    /// Clip selected whenever no explicit selection is pending.
    pub idle_clip: String,

    /// Reserved shape slots owned by the eye-state layer, `[left, right]`.
    pub blink_shapes: [String; 2],

    /// Inspection dump keeps shapes strictly above this weight.
    pub dump_threshold: f32,
    pub dump_decimals: u32,

    /// Fixed seed for the blink generator. `None` seeds from entropy.
    pub rng_seed: Option<u64>,
}

impl Default for FaceConfig {
    fn default() -> Self {
        Self {
            expression_rate: 0.1,
            blink_rate: 0.5,
            viseme_attack_rate: 0.2,
            viseme_release_rate: 0.1,
            blink_interval_min: 1.0,
            blink_interval_max: 5.0,
            blink_duration: 0.2,
            wink_duration: 0.3,
            crossfade_seconds: 0.5,
            idle_clip: "Idle".to_string(),
            blink_shapes: ["eyeBlinkLeft".to_string(), "eyeBlinkRight".to_string()],
            dump_threshold: 0.01,
            dump_decimals: 2,
            rng_seed: None,
        }
    }
}

impl FaceConfig {
    /// Parse a (possibly partial) JSON override on top of the defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    #[inline]
    pub fn is_blink_shape(&self, shape: &str) -> bool {
        self.blink_shapes.iter().any(|s| s == shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = FaceConfig::from_json(r#"{ "blink_rate": 0.8, "rng_seed": 7 }"#).unwrap();
        assert_eq!(cfg.blink_rate, 0.8);
        assert_eq!(cfg.rng_seed, Some(7));
        assert_eq!(cfg.expression_rate, 0.1);
        assert_eq!(cfg.idle_clip, "Idle");
    }

    #[test]
    fn blink_shapes_are_reserved() {
        let cfg = FaceConfig::default();
        assert!(cfg.is_blink_shape("eyeBlinkLeft"));
        assert!(cfg.is_blink_shape("eyeBlinkRight"));
        assert!(!cfg.is_blink_shape("jawOpen"));
    }
}
