//! Layer passes and the per-tick write order.
//!
//! Several layers claim overlapping shapes (jaw/mouth, eyelids). Ownership is
//! resolved by running the passes in a fixed order and letting the last
//! writer win; [`ShapeOverride`] records each time that happened.

use serde::{Deserialize, Serialize};

/// A layer that proposes shape targets during a tick.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum LayerPass {
    Expression,
    Eyes,
    Viseme,
}

/// expression → eyes → viseme
pub const DEFAULT_PASS_ORDER: [LayerPass; 3] =
    [LayerPass::Expression, LayerPass::Eyes, LayerPass::Viseme];

/// Who owns the weight store for a tick.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum RigMode {
    /// Layers drive the weights.
    #[default]
    Live,
    /// An operator edits weights directly; every layer is suspended.
    Inspection,
}

/// A proposed target for one shape plus the convergence rate to use.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TargetWrite {
    pub shape: String,
    pub target: f32,
    pub rate: f32,
}

/// Ordered list of writes produced by one pass.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetBatch {
    writes: Vec<TargetWrite>,
}

impl TargetBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(n: usize) -> Self {
        Self {
            writes: Vec::with_capacity(n),
        }
    }

    #[inline]
    pub fn push(&mut self, shape: impl Into<String>, target: f32, rate: f32) {
        self.writes.push(TargetWrite {
            shape: shape.into(),
            target,
            rate,
        });
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TargetWrite> {
        self.writes.iter()
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// Target proposed for `shape`, if this batch mentions it (last one wins).
    pub fn target_for(&self, shape: &str) -> Option<f32> {
        self.writes
            .iter()
            .rev()
            .find(|w| w.shape == shape)
            .map(|w| w.target)
    }
}

impl IntoIterator for TargetBatch {
    type Item = TargetWrite;
    type IntoIter = std::vec::IntoIter<TargetWrite>;

    fn into_iter(self) -> Self::IntoIter {
        self.writes.into_iter()
    }
}

/// A later pass moved the target of a shape an earlier pass had already
/// written this tick to a different value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShapeOverride {
    pub shape: String,
    pub previous: LayerPass,
    pub winner: LayerPass,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_order_puts_viseme_last() {
        assert_eq!(DEFAULT_PASS_ORDER[0], LayerPass::Expression);
        assert_eq!(DEFAULT_PASS_ORDER[2], LayerPass::Viseme);
    }

    #[test]
    fn batch_target_lookup_uses_last_write() {
        let mut b = TargetBatch::new();
        b.push("jawOpen", 0.3, 0.1);
        b.push("jawOpen", 0.7, 0.1);
        assert_eq!(b.target_for("jawOpen"), Some(0.7));
        assert_eq!(b.target_for("mouthClose"), None);
        assert_eq!(b.len(), 2);
    }
}
