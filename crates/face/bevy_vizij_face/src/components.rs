use bevy::prelude::*;

/// Binds a morph-target mesh to the face rig.
///
/// `shape_names[i]` is the rig shape that drives morph target `i` of the
/// entity's `MorphWeights`. Indices past the component's weight count and
/// names the rig does not declare are left untouched.
#[derive(Component, Debug, Clone, Default)]
pub struct FaceMorphBinding {
    pub shape_names: Vec<String>,
}

impl FaceMorphBinding {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            shape_names: names.into_iter().map(Into::into).collect(),
        }
    }
}
