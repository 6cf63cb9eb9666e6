//! Bevy adapter for the Vizij face core.
//!
//! Add [`VizijFacePlugin`], insert a [`VizijFaceRig`] once the character's
//! shape vocabulary is known, tag its morph meshes with [`FaceMorphBinding`]
//! and push [`FaceMessage`](vizij_face_core::FaceMessage)s into
//! [`FaceMessages`]. Every `Update` the plugin feeds the queue, ticks the rig
//! and copies the converged weights into `MorphWeights`.

use bevy::prelude::*;
use vizij_face_core::{ClipTransition, Eye};

pub mod components;
pub mod resources;
pub mod systems;

pub use components::FaceMorphBinding;
pub use resources::{FaceAudio, FaceMessages, FaceRigMode, PendingWeights, VizijFaceRig};

/// Operator and host commands, applied before the tick.
#[derive(Event, Debug, Clone, PartialEq)]
pub enum FaceCommand {
    Wink(Eye),
    EnterInspection,
    ExitInspection,
    /// Direct weight write; only honored in inspection mode.
    SetWeight { shape: String, weight: f32 },
    /// Emit a [`WeightDumpEvent`] with every shape above the dump threshold.
    DumpWeights,
    SelectAnimation(Option<String>),
    SelectExpression(Option<String>),
}

/// The current body clip changed; the renderer should crossfade accordingly.
#[derive(Event, Debug, Clone, PartialEq)]
pub struct ClipTransitionEvent(pub ClipTransition);

/// Playback of the head message finished and it was removed from the queue.
#[derive(Event, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageConsumedEvent;

#[derive(Event, Debug, Clone, PartialEq)]
pub struct WeightDumpEvent {
    pub weights: Vec<(String, f32)>,
    pub json: String,
}

pub struct VizijFacePlugin;

impl Plugin for VizijFacePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<VizijFaceRig>()
            .init_resource::<FaceRigMode>()
            .init_resource::<FaceAudio>()
            .init_resource::<FaceMessages>()
            .init_resource::<PendingWeights>()
            .add_event::<FaceCommand>()
            .add_event::<ClipTransitionEvent>()
            .add_event::<MessageConsumedEvent>()
            .add_event::<WeightDumpEvent>()
            .add_systems(
                Update,
                (
                    systems::face_command_system,
                    systems::feed_messages_system,
                    systems::tick_face_system,
                    systems::apply_morph_weights_system,
                )
                    .chain(),
            );
    }
}
