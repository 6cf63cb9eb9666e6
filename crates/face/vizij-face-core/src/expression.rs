//! Expression Layer: named facial presets → per-shape targets.
//!
//! Every non-blink shape in the vocabulary gets a target on every tick, so
//! switching presets fully replaces the previous one instead of stacking.

use hashbrown::HashMap;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::config::FaceConfig;
use crate::error::{FaceError, Result};
use crate::schedule::TargetBatch;
use crate::weights::WeightStore;

pub const DEFAULT_EXPRESSION: &str = "default";

/// Immutable shape → weight table for one named expression.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpressionPreset {
    pub name: String,
    pub targets: HashMap<String, f32>,
}

impl ExpressionPreset {
    pub fn new<I, S>(name: impl Into<String>, targets: I) -> Self
    where
        I: IntoIterator<Item = (S, f32)>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            targets: targets
                .into_iter()
                .map(|(k, v)| (k.into(), v.clamp(0.0, 1.0)))
                .collect(),
        }
    }

    /// Preset value for `shape`; shapes the preset does not mention read as 0.
    #[inline]
    pub fn target(&self, shape: &str) -> f32 {
        self.targets.get(shape).copied().unwrap_or(0.0)
    }
}

type PresetRow = (&'static str, &'static [(&'static str, f32)]);

const BUILTIN_PRESETS: &[PresetRow] = &[
    (
        "smile",
        &[
            ("browInnerUp", 0.17),
            ("eyeSquintLeft", 0.4),
            ("eyeSquintRight", 0.44),
            ("noseSneerLeft", 0.17),
            ("noseSneerRight", 0.14),
            ("mouthPressLeft", 0.61),
            ("mouthPressRight", 0.41),
        ],
    ),
    (
        "funnyFace",
        &[
            ("jawLeft", 0.63),
            ("mouthPucker", 0.53),
            ("noseSneerLeft", 1.0),
            ("noseSneerRight", 0.39),
            ("mouthLeft", 1.0),
            ("eyeLookUpLeft", 1.0),
            ("eyeLookUpRight", 1.0),
            ("cheekPuff", 1.0),
            ("mouthDimpleLeft", 0.41),
            ("mouthRollLower", 0.32),
            ("mouthSmileLeft", 0.35),
            ("mouthSmileRight", 0.35),
        ],
    ),
    (
        "sad",
        &[
            ("mouthFrownLeft", 1.0),
            ("mouthFrownRight", 1.0),
            ("mouthShrugLower", 0.78),
            ("browInnerUp", 0.45),
            ("eyeSquintLeft", 0.72),
            ("eyeSquintRight", 0.75),
            ("eyeLookDownLeft", 0.5),
            ("eyeLookDownRight", 0.5),
            ("jawForward", 1.0),
        ],
    ),
    (
        "surprised",
        &[
            ("eyeWideLeft", 0.5),
            ("eyeWideRight", 0.5),
            ("jawOpen", 0.35),
            ("mouthFunnel", 1.0),
            ("browInnerUp", 1.0),
        ],
    ),
    (
        "angry",
        &[
            ("browDownLeft", 1.0),
            ("browDownRight", 1.0),
            ("eyeSquintLeft", 1.0),
            ("eyeSquintRight", 1.0),
            ("jawForward", 1.0),
            ("jawLeft", 1.0),
            ("mouthShrugLower", 1.0),
            ("noseSneerLeft", 1.0),
            ("noseSneerRight", 0.42),
            ("eyeLookDownLeft", 0.16),
            ("eyeLookDownRight", 0.16),
            ("cheekSquintLeft", 1.0),
            ("cheekSquintRight", 1.0),
            ("mouthClose", 0.23),
            ("mouthFunnel", 0.63),
            ("mouthDimpleRight", 1.0),
        ],
    ),
    (
        "crazy",
        &[
            ("browInnerUp", 0.9),
            ("jawForward", 1.0),
            ("noseSneerLeft", 0.57),
            ("noseSneerRight", 0.51),
            ("eyeLookDownLeft", 0.39),
            ("eyeLookUpRight", 0.4),
            ("eyeLookInLeft", 0.96),
            ("eyeLookInRight", 0.96),
            ("jawOpen", 0.96),
            ("mouthDimpleLeft", 0.96),
            ("mouthDimpleRight", 0.96),
            ("mouthStretchLeft", 0.28),
            ("mouthStretchRight", 0.29),
            ("mouthSmileLeft", 0.56),
            ("mouthSmileRight", 0.38),
            ("tongueOut", 0.96),
        ],
    ),
];

/// Lookup table of presets. Always resolves the empty `default` preset.
#[derive(Clone, Debug, PartialEq)]
pub struct ExpressionTable {
    presets: HashMap<String, ExpressionPreset>,
    fallback: ExpressionPreset,
}

impl Default for ExpressionTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ExpressionTable {
    /// Table holding only the empty default preset.
    pub fn empty() -> Self {
        Self {
            presets: HashMap::new(),
            fallback: ExpressionPreset::new(
                DEFAULT_EXPRESSION,
                std::iter::empty::<(String, f32)>(),
            ),
        }
    }

    /// Presets tuned for the stock ARKit-style avatar face.
    pub fn builtin() -> Self {
        let mut table = Self::empty();
        for (name, rows) in BUILTIN_PRESETS {
            table.insert(ExpressionPreset::new(*name, rows.iter().copied()));
        }
        table
    }

    /// Parse `{ "<preset>": { "<shape>": weight, .. }, .. }`.
    /// A `default` entry is rejected unless it is empty.
    pub fn from_json(text: &str) -> Result<Self> {
        let raw: HashMap<String, HashMap<String, f32>> = serde_json::from_str(text)?;
        let mut table = Self::empty();
        for (name, targets) in raw {
            if name == DEFAULT_EXPRESSION && !targets.is_empty() {
                return Err(FaceError::ExpressionTable(
                    "the default preset must be empty".into(),
                ));
            }
            if let Some((shape, w)) = targets.iter().find(|(_, w)| !w.is_finite()) {
                return Err(FaceError::ExpressionTable(format!(
                    "preset '{name}' has non-finite weight {w} for '{shape}'"
                )));
            }
            if name != DEFAULT_EXPRESSION {
                table.insert(ExpressionPreset::new(name, targets));
            }
        }
        Ok(table)
    }

    /// Add or replace a preset. The default preset cannot be replaced.
    pub fn insert(&mut self, preset: ExpressionPreset) {
        if preset.name != DEFAULT_EXPRESSION {
            self.presets.insert(preset.name.clone(), preset);
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        name == DEFAULT_EXPRESSION || self.presets.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(DEFAULT_EXPRESSION).chain(self.presets.keys().map(String::as_str))
    }

    /// Look up `name`, falling back to the default preset.
    pub fn get(&self, name: &str) -> &ExpressionPreset {
        self.presets.get(name).unwrap_or(&self.fallback)
    }
}

/// Holds the active expression and turns it into a target batch.
#[derive(Clone, Debug)]
pub struct ExpressionLayer {
    table: ExpressionTable,
    active: String,
}

impl ExpressionLayer {
    pub fn new(table: ExpressionTable) -> Self {
        Self {
            table,
            active: DEFAULT_EXPRESSION.to_string(),
        }
    }

    pub fn table(&self) -> &ExpressionTable {
        &self.table
    }

    /// Name of the preset actually in effect.
    pub fn active(&self) -> &str {
        &self.active
    }

    /// Switch preset. Unknown names select the default preset; returns
    /// whether the requested name was found.
    pub fn select(&mut self, name: Option<&str>) -> bool {
        let requested = name.unwrap_or(DEFAULT_EXPRESSION);
        let (next, found) = if self.table.contains(requested) {
            (requested, true)
        } else {
            warn!("unknown facial expression '{requested}', using '{DEFAULT_EXPRESSION}'");
            (DEFAULT_EXPRESSION, false)
        };
        if self.active != next {
            debug!("facial expression: {} -> {}", self.active, next);
            self.active = next.to_string();
        }
        found
    }

    /// Targets for every vocabulary shape except the reserved blink slots.
    pub fn targets(&self, store: &WeightStore, cfg: &FaceConfig) -> TargetBatch {
        let preset = self.table.get(&self.active);
        let mut batch = TargetBatch::with_capacity(store.len());
        for shape in store.names() {
            if cfg.is_blink_shape(shape) {
                continue;
            }
            batch.push(shape, preset.target(shape), cfg.expression_rate);
        }
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rig::RigDescriptor;

    fn store() -> WeightStore {
        WeightStore::new(&RigDescriptor::from_names(
            [
                "eyeBlinkLeft",
                "eyeBlinkRight",
                "jawOpen",
                "mouthFunnel",
                "browInnerUp",
                "mouthSmileLeft",
            ],
            ["Idle"],
        ))
    }

    #[test]
    fn builtin_table_has_default_and_presets() {
        let t = ExpressionTable::builtin();
        assert!(t.contains("default"));
        assert!(t.contains("smile"));
        assert!(t.get("default").targets.is_empty());
        assert_eq!(t.get("no-such-face").name, "default");
    }

    #[test]
    fn unknown_expression_falls_back_to_default() {
        let mut layer = ExpressionLayer::new(ExpressionTable::builtin());
        assert!(layer.select(Some("surprised")));
        assert_eq!(layer.active(), "surprised");
        assert!(!layer.select(Some("smug")));
        assert_eq!(layer.active(), "default");
        assert!(layer.select(None));
        assert_eq!(layer.active(), "default");
    }

    #[test]
    fn targets_skip_blink_shapes_and_zero_unmentioned() {
        let cfg = FaceConfig::default();
        let mut layer = ExpressionLayer::new(ExpressionTable::builtin());
        layer.select(Some("surprised"));
        let batch = layer.targets(&store(), &cfg);

        assert_eq!(batch.len(), 4);
        assert_eq!(batch.target_for("eyeBlinkLeft"), None);
        assert_eq!(batch.target_for("eyeBlinkRight"), None);
        assert_eq!(batch.target_for("jawOpen"), Some(0.35));
        assert_eq!(batch.target_for("mouthFunnel"), Some(1.0));
        assert_eq!(batch.target_for("browInnerUp"), Some(1.0));
        assert_eq!(batch.target_for("mouthSmileLeft"), Some(0.0));
        assert!(batch.iter().all(|w| w.rate == cfg.expression_rate));
    }

    #[test]
    fn json_table_replaces_builtins() {
        let t = ExpressionTable::from_json(r#"{ "wry": { "mouthSmileLeft": 0.6 } }"#).unwrap();
        assert!(t.contains("wry"));
        assert!(t.contains("default"));
        assert!(!t.contains("smile"));
        assert_eq!(t.get("wry").target("mouthSmileLeft"), 0.6);

        let bad = ExpressionTable::from_json(r#"{ "default": { "jawOpen": 1.0 } }"#);
        assert!(matches!(bad, Err(FaceError::ExpressionTable(_))));
    }
}
