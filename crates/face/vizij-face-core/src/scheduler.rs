//! Frame Scheduler: runs the layer passes in order against the weight store.
//!
//!   Expression -> merge -> Eyes -> merge -> Viseme -> merge -> frame
//!
//! Each pass only proposes a [`TargetBatch`]; this module is the sole path
//! from a proposal into the store. A shape written by an earlier pass and
//! retargeted by a later one is logged as a [`ShapeOverride`].

use crate::config::FaceConfig;
use crate::expression::ExpressionLayer;
use crate::eyes::EyeLayer;
use crate::outputs::FaceFrame;
use crate::schedule::{LayerPass, ShapeOverride, TargetBatch};
use crate::viseme::VisemeLayer;
use crate::weights::WeightStore;

/// Borrowed view of the layers for one tick.
pub(crate) struct Layers<'a> {
    pub expression: &'a ExpressionLayer,
    pub eyes: &'a EyeLayer,
    pub visemes: &'a mut VisemeLayer,
}

/// Merge one pass into the store (last writer wins). An override is logged
/// only when a later pass changes a target an earlier pass set this tick.
pub(crate) fn apply_batch(
    store: &mut WeightStore,
    pass: LayerPass,
    batch: TargetBatch,
    overrides: &mut Vec<ShapeOverride>,
) {
    for write in batch {
        let earlier_target = store.target(&write.shape);
        // Shapes outside the vocabulary are skipped silently.
        let outcome = store.advance_from(pass, &write.shape, write.target, write.rate);
        if let Some(Some(previous)) = outcome {
            // Agreeing writes (e.g. both passes releasing a viseme) are not conflicts.
            let retargeted = earlier_target != Some(write.target.clamp(0.0, 1.0));
            if previous != pass && retargeted {
                overrides.push(ShapeOverride {
                    shape: write.shape,
                    previous,
                    winner: pass,
                });
            }
        }
    }
}

/// Run every pass in `order`, recording the viseme selection and any
/// overrides on `frame`.
pub(crate) fn run_passes(
    order: &[LayerPass],
    store: &mut WeightStore,
    layers: Layers<'_>,
    cfg: &FaceConfig,
    audio_position: Option<f64>,
    frame: &mut FaceFrame,
) {
    store.begin_tick();
    for pass in order {
        let batch = match pass {
            LayerPass::Expression => layers.expression.targets(store, cfg),
            LayerPass::Eyes => layers.eyes.targets(cfg),
            LayerPass::Viseme => {
                let (batch, selection) = layers.visemes.targets(audio_position, cfg);
                frame.viseme = Some(selection);
                batch
            }
        };
        apply_batch(store, *pass, batch, &mut frame.overrides);
    }
}
