//! Output contracts from the face rig.
//!
//! A frame carries the converged weight of every shape, the body clip blend,
//! override diagnostics and a list of semantic events. Adapters push the
//! weights into the mesh and forward events to their collaborators.

use serde::{Deserialize, Serialize};

use crate::body::ClipTransition;
use crate::eyes::Eye;
use crate::schedule::{RigMode, ShapeOverride};
use crate::viseme::VisemeSelection;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeightChange {
    pub shape: String,
    pub weight: f32,
}

/// Discrete signals emitted during a tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum FaceEvent {
    ClipTransition(ClipTransition),
    ClipRejected {
        requested: String,
    },
    ExpressionChanged {
        name: String,
        /// The requested preset was unknown and the default was used.
        fallback: bool,
    },
    BlinkStarted {
        at: f64,
    },
    BlinkEnded {
        at: f64,
    },
    WinkStarted {
        eye: Eye,
        at: f64,
    },
    WinkEnded {
        eye: Eye,
        at: f64,
    },
    LipSyncArmed {
        cues: usize,
        audio: bool,
    },
    /// Playback of the current utterance finished; the transport may advance.
    MessageConsumed,
    /// Catch-all for forward-compatible payloads.
    Custom {
        kind: String,
        data: serde_json::Value,
    },
}

/// Result of one `FaceRig::tick`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FaceFrame {
    pub epoch: u64,
    pub dt: f32,
    pub mode: RigMode,
    /// Every shape's weight after this tick, in vocabulary order.
    #[serde(default)]
    pub weights: Vec<WeightChange>,
    /// `(clip, blend weight)`, current clip first.
    #[serde(default)]
    pub clip_weights: Vec<(String, f32)>,
    #[serde(default)]
    pub viseme: Option<VisemeSelection>,
    #[serde(default)]
    pub overrides: Vec<ShapeOverride>,
    #[serde(default)]
    pub events: Vec<FaceEvent>,
}

impl FaceFrame {
    #[inline]
    pub fn clear(&mut self) {
        self.weights.clear();
        self.clip_weights.clear();
        self.viseme = None;
        self.overrides.clear();
        self.events.clear();
    }

    pub fn weight(&self, shape: &str) -> Option<f32> {
        self.weights
            .iter()
            .find(|w| w.shape == shape)
            .map(|w| w.weight)
    }

    pub fn has_event(&self, pred: impl Fn(&FaceEvent) -> bool) -> bool {
        self.events.iter().any(pred)
    }
}
