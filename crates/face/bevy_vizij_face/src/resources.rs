use bevy::prelude::*;
use vizij_face_core::{
    AudioPlayback, FaceConfig, FaceMessage, FaceRig, MessageQueue, RigDescriptor, RigMode,
    SilentAudio, WeightChange,
};

/// The rig driven by the plugin. Empty until the host has loaded its asset
/// and built a descriptor.
#[derive(Resource, Default, Debug)]
pub struct VizijFaceRig(pub Option<FaceRig>);

impl VizijFaceRig {
    pub fn new(rig: FaceRig) -> Self {
        Self(Some(rig))
    }

    pub fn from_descriptor(desc: RigDescriptor, cfg: FaceConfig) -> vizij_face_core::Result<Self> {
        Ok(Self::new(FaceRig::new(desc, cfg)?))
    }
}

/// Live or inspection. Passed into every tick.
#[derive(Resource, Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceRigMode(pub RigMode);

/// Audio playback collaborator. Defaults to [`SilentAudio`], which finishes
/// every utterance at once and never drives lip sync.
#[derive(Resource)]
pub struct FaceAudio(pub Box<dyn AudioPlayback + Send + Sync>);

impl FaceAudio {
    pub fn new(audio: impl AudioPlayback + Send + Sync + 'static) -> Self {
        Self(Box::new(audio))
    }
}

impl Default for FaceAudio {
    fn default() -> Self {
        Self::new(SilentAudio::default())
    }
}

/// Inbound utterances. The head of the queue is performed; it is popped
/// when the rig reports it consumed.
#[derive(Resource, Debug)]
pub struct FaceMessages {
    pub queue: MessageQueue,
    pub(crate) delivered: bool,
    pub(crate) idle: bool,
}

impl Default for FaceMessages {
    fn default() -> Self {
        Self {
            queue: MessageQueue::new(),
            delivered: false,
            idle: true,
        }
    }
}

impl FaceMessages {
    pub fn push(&mut self, msg: FaceMessage) {
        self.queue.push(msg);
    }

    /// Whether the head of the queue has been handed to the rig.
    pub fn is_performing(&self) -> bool {
        self.delivered
    }
}

/// Weights staged by the tick system for the apply system
/// (keeps ordering explicit: Tick -> Apply).
#[derive(Resource, Default, Debug)]
pub struct PendingWeights {
    pub weights: Vec<WeightChange>,
}
