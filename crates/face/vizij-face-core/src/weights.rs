//! Weight Store: the live shape-name → weight mapping for one rig instance.
//!
//! Layers never write here directly. The frame scheduler forwards their
//! target batches through [`WeightStore::advance_from`], which converges the
//! current weight one step and records which layer wrote the target this tick
//! (last writer wins).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::rig::RigDescriptor;
use crate::schedule::LayerPass;

/// State for one declared shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShapeSlot {
    pub weight: f32,
    pub target: f32,
    pub initial: f32,
    /// Layer that set `target` during the current tick, if any.
    #[serde(skip)]
    pub writer: Option<LayerPass>,
}

/// One linear-interpolation step from `current` toward `target`.
#[inline]
pub fn converge(current: f32, target: f32, rate: f32) -> f32 {
    let rate = rate.clamp(0.0, 1.0);
    (current + (target - current) * rate).clamp(0.0, 1.0)
}

fn round_to(value: f32, decimals: u32) -> f32 {
    let scale = 10f32.powi(decimals as i32);
    (value * scale).round() / scale
}

#[derive(Clone, Debug, Default)]
pub struct WeightStore {
    slots: IndexMap<String, ShapeSlot>,
}

impl WeightStore {
    /// Build a store from the rig vocabulary. Keys are fixed from here on.
    pub fn new(desc: &RigDescriptor) -> Self {
        let slots = desc
            .shapes
            .iter()
            .map(|s| {
                let w = s.initial.clamp(0.0, 1.0);
                (
                    s.name.clone(),
                    ShapeSlot {
                        weight: w,
                        target: w,
                        initial: w,
                        writer: None,
                    },
                )
            })
            .collect();
        Self { slots }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[inline]
    pub fn contains(&self, shape: &str) -> bool {
        self.slots.contains_key(shape)
    }

    /// Shape names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }

    /// `(name, current weight)` in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.slots.iter().map(|(k, s)| (k.as_str(), s.weight))
    }

    /// Last converged weight. Unknown shapes read as `None`.
    pub fn get(&self, shape: &str) -> Option<f32> {
        self.slots.get(shape).map(|s| s.weight)
    }

    pub fn target(&self, shape: &str) -> Option<f32> {
        self.slots.get(shape).map(|s| s.target)
    }

    pub fn writer(&self, shape: &str) -> Option<LayerPass> {
        self.slots.get(shape).and_then(|s| s.writer)
    }

    pub fn slot(&self, shape: &str) -> Option<&ShapeSlot> {
        self.slots.get(shape)
    }

    /// Direct write (inspection mode). Snaps weight and target; returns false
    /// for shapes outside the vocabulary.
    pub fn set(&mut self, shape: &str, weight: f32) -> bool {
        match self.slots.get_mut(shape) {
            Some(slot) => {
                let w = weight.clamp(0.0, 1.0);
                slot.weight = w;
                slot.target = w;
                true
            }
            None => false,
        }
    }

    /// Record a target without moving the weight.
    pub fn set_target(&mut self, shape: &str, target: f32) -> bool {
        match self.slots.get_mut(shape) {
            Some(slot) => {
                slot.target = target.clamp(0.0, 1.0);
                true
            }
            None => false,
        }
    }

    /// Retarget and converge one step with the per-call `rate`.
    pub fn advance(&mut self, shape: &str, target: f32, rate: f32) -> bool {
        match self.slots.get_mut(shape) {
            Some(slot) => {
                slot.target = target.clamp(0.0, 1.0);
                slot.weight = converge(slot.weight, slot.target, rate);
                true
            }
            None => false,
        }
    }

    /// Scheduler write path. Returns `None` for unknown shapes, otherwise the
    /// layer that had already written this shape during the tick.
    pub(crate) fn advance_from(
        &mut self,
        pass: LayerPass,
        shape: &str,
        target: f32,
        rate: f32,
    ) -> Option<Option<LayerPass>> {
        let slot = self.slots.get_mut(shape)?;
        let previous = slot.writer.replace(pass);
        slot.target = target.clamp(0.0, 1.0);
        slot.weight = converge(slot.weight, slot.target, rate);
        Some(previous)
    }

    /// Forget per-tick provenance.
    pub(crate) fn begin_tick(&mut self) {
        for slot in self.slots.values_mut() {
            slot.writer = None;
        }
    }

    /// Snap every shape back to its declared rest weight.
    pub fn reset_to_initial(&mut self) {
        for slot in self.slots.values_mut() {
            slot.weight = slot.initial;
            slot.target = slot.initial;
            slot.writer = None;
        }
    }

    /// Shapes with weight strictly above `threshold`, rounded to `decimals`.
    /// Used to author expression presets from hand-tuned poses.
    pub fn dump_non_zero(&self, threshold: f32, decimals: u32) -> IndexMap<String, f32> {
        self.slots
            .iter()
            .filter(|(_, s)| s.weight > threshold)
            .map(|(k, s)| (k.clone(), round_to(s.weight, decimals)))
            .collect()
    }

    pub fn dump_non_zero_json(&self, threshold: f32, decimals: u32) -> Result<String> {
        Ok(serde_json::to_string_pretty(
            &self.dump_non_zero(threshold, decimals),
        )?)
    }
}
