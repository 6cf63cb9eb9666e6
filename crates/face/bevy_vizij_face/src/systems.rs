use std::collections::HashMap;

use bevy::prelude::*;
use bevy::render::mesh::morph::MorphWeights;
use log::{debug, warn};

use crate::components::FaceMorphBinding;
use crate::resources::{FaceAudio, FaceMessages, FaceRigMode, PendingWeights, VizijFaceRig};
use crate::{ClipTransitionEvent, FaceCommand, MessageConsumedEvent, WeightDumpEvent};
use vizij_face_core::{FaceEvent, RigMode, TickContext};

/// Applies queued [`FaceCommand`]s. Mode switches take effect on this frame's tick.
pub fn face_command_system(
    mut commands: EventReader<FaceCommand>,
    mut rig: ResMut<VizijFaceRig>,
    mut mode: ResMut<FaceRigMode>,
    mut dumps: EventWriter<WeightDumpEvent>,
) {
    for cmd in commands.read() {
        match cmd {
            FaceCommand::EnterInspection => {
                debug!("face rig: entering inspection mode");
                mode.0 = RigMode::Inspection;
                continue;
            }
            FaceCommand::ExitInspection => {
                debug!("face rig: leaving inspection mode");
                mode.0 = RigMode::Live;
                continue;
            }
            _ => {}
        }

        let Some(rig) = rig.0.as_mut() else {
            debug!("no face rig loaded, dropping {cmd:?}");
            continue;
        };
        match cmd {
            FaceCommand::Wink(eye) => rig.wink(*eye),
            FaceCommand::SetWeight { shape, weight } => {
                if mode.0 != RigMode::Inspection {
                    warn!("ignoring manual write to '{shape}' outside inspection mode");
                } else if !rig.set_weight(shape, *weight) {
                    warn!("rig has no shape '{shape}'");
                }
            }
            FaceCommand::DumpWeights => match rig.dump_non_zero_weights_json() {
                Ok(json) => {
                    debug!("weight dump:\n{json}");
                    dumps.send(WeightDumpEvent {
                        weights: rig.dump_non_zero_weights().into_iter().collect(),
                        json,
                    });
                }
                Err(e) => warn!("weight dump failed: {e}"),
            },
            FaceCommand::SelectAnimation(name) => rig.select_animation(name.as_deref()),
            FaceCommand::SelectExpression(name) => rig.select_expression(name.as_deref()),
            FaceCommand::EnterInspection | FaceCommand::ExitInspection => {}
        }
    }
}

/// Hands the head of the message queue to the rig once; falls back to the
/// neutral state when the queue drains.
pub fn feed_messages_system(
    mut rig: ResMut<VizijFaceRig>,
    mut messages: ResMut<FaceMessages>,
    mut audio: ResMut<FaceAudio>,
) {
    let Some(rig) = rig.0.as_mut() else {
        return;
    };
    let messages = &mut *messages;
    if messages.delivered {
        return;
    }
    match messages.queue.current() {
        Some(msg) => {
            rig.receive(msg, audio.0.as_sink());
            messages.delivered = true;
            messages.idle = false;
        }
        None if !messages.idle => {
            rig.receive_none();
            messages.idle = true;
        }
        None => {}
    }
}

/// Ticks the rig with this frame's delta and stages its weights.
#[allow(clippy::too_many_arguments)]
pub fn tick_face_system(
    time: Res<Time>,
    mode: Res<FaceRigMode>,
    mut rig: ResMut<VizijFaceRig>,
    mut audio: ResMut<FaceAudio>,
    mut messages: ResMut<FaceMessages>,
    mut pending: ResMut<PendingWeights>,
    mut transitions: EventWriter<ClipTransitionEvent>,
    mut consumed: EventWriter<MessageConsumedEvent>,
) {
    let Some(rig) = rig.0.as_mut() else {
        return;
    };
    let ctx = TickContext::new(time.delta_seconds())
        .with_mode(mode.0)
        .with_audio(audio.0.as_clock());
    let frame = rig.tick(ctx);

    for event in &frame.events {
        match event {
            FaceEvent::ClipTransition(t) => {
                transitions.send(ClipTransitionEvent(t.clone()));
            }
            FaceEvent::MessageConsumed => {
                if messages.delivered {
                    messages.queue.message_consumed();
                    messages.delivered = false;
                }
                consumed.send(MessageConsumedEvent);
            }
            _ => {}
        }
    }

    pending.weights.clear();
    pending.weights.extend(frame.weights.iter().cloned());
}

/// Copies staged weights into every bound `MorphWeights` component.
pub fn apply_morph_weights_system(
    pending: Res<PendingWeights>,
    mut meshes: Query<(&FaceMorphBinding, &mut MorphWeights)>,
) {
    if pending.weights.is_empty() {
        return;
    }
    let by_name: HashMap<&str, f32> = pending
        .weights
        .iter()
        .map(|w| (w.shape.as_str(), w.weight))
        .collect();

    for (binding, mut morph) in meshes.iter_mut() {
        let weights = morph.weights_mut();
        for (slot, name) in weights.iter_mut().zip(binding.shape_names.iter()) {
            if let Some(w) = by_name.get(name.as_str()) {
                *slot = *w;
            }
        }
    }
}
