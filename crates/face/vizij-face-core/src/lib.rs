//! Vizij Face Core (engine-agnostic)
//!
//! Drives one character's face and body from three asynchronous streams: a
//! body-clip selector, a facial-expression selector and a lip-sync cue track
//! tied to an audio clock. Once per rendered frame [`FaceRig::tick`] runs the
//! expression, eye and viseme passes in a fixed order, converges the shared
//! weight store toward their targets and reports the result as a
//! [`FaceFrame`]. Asset loading, rendering and audio playback stay with the
//! host; see [`RigDescriptor`] and the [`audio`] traits for those seams.

pub mod audio;
pub mod body;
pub mod config;
pub mod engine;
pub mod error;
pub mod expression;
pub mod eyes;
pub mod message;
pub mod outputs;
pub mod rig;
pub mod schedule;
mod scheduler;
pub mod timers;
pub mod viseme;
pub mod weights;

// Re-exports for consumers (adapters)
pub use audio::{AudioClock, AudioPlayback, AudioSink, ManualClock, SilentAudio};
pub use body::{BodyAnimationController, ClipSelect, ClipTransition, FadeOut};
pub use config::FaceConfig;
pub use engine::{FaceRig, TickContext};
pub use error::{FaceError, Result};
pub use expression::{ExpressionLayer, ExpressionPreset, ExpressionTable, DEFAULT_EXPRESSION};
pub use eyes::{Eye, EyeLayer, EyeState};
pub use message::{FaceMessage, LipSync, MessageQueue, MouthCue};
pub use outputs::{FaceEvent, FaceFrame, WeightChange};
pub use rig::{RigDescriptor, ShapeDecl};
pub use schedule::{
    LayerPass, RigMode, ShapeOverride, TargetBatch, TargetWrite, DEFAULT_PASS_ORDER,
};
pub use viseme::{CueTrack, VisemeCue, VisemeLayer, VisemeMap, VisemeSelection};
pub use weights::{converge, WeightStore};
