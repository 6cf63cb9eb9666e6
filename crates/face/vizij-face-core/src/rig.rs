//! Rig descriptor handed over by the asset loader.
//!
//! The core never parses model bytes. A loader enumerates the rig's shape
//! vocabulary and clip names once and passes them in here.

use hashbrown::HashSet;
use serde::{Deserialize, Serialize};

use crate::error::{FaceError, Result};

/// One declared morph target and its rest weight.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShapeDecl {
    pub name: String,
    #[serde(default)]
    pub initial: f32,
}

impl ShapeDecl {
    pub fn new(name: impl Into<String>, initial: f32) -> Self {
        Self {
            name: name.into(),
            initial,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RigDescriptor {
    /// Ordered shape vocabulary. Fixed for the lifetime of the rig.
    pub shapes: Vec<ShapeDecl>,
    /// Names of the loaded body clips.
    #[serde(default)]
    pub clips: Vec<String>,
    /// Opaque skinned mesh / skeleton handle owned by the renderer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mesh: Option<String>,
}

impl RigDescriptor {
    /// Convenience constructor: every shape starts at 0.
    pub fn from_names<S, C>(shapes: S, clips: C) -> Self
    where
        S: IntoIterator,
        S::Item: Into<String>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        Self {
            shapes: shapes
                .into_iter()
                .map(|n| ShapeDecl::new(n, 0.0))
                .collect(),
            clips: clips.into_iter().map(Into::into).collect(),
            mesh: None,
        }
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let desc: RigDescriptor = serde_json::from_str(text)?;
        desc.validate()?;
        Ok(desc)
    }

    /// Reject descriptors the core cannot drive: an empty vocabulary or
    /// duplicate names.
    pub fn validate(&self) -> Result<()> {
        if self.shapes.is_empty() {
            return Err(FaceError::EmptyVocabulary);
        }
        let mut seen = HashSet::with_capacity(self.shapes.len());
        for s in &self.shapes {
            if !seen.insert(s.name.as_str()) {
                return Err(FaceError::DuplicateShape(s.name.clone()));
            }
        }
        let mut seen_clips = HashSet::with_capacity(self.clips.len());
        for c in &self.clips {
            if !seen_clips.insert(c.as_str()) {
                return Err(FaceError::DuplicateClip(c.clone()));
            }
        }
        Ok(())
    }

    pub fn has_shape(&self, name: &str) -> bool {
        self.shapes.iter().any(|s| s.name == name)
    }
}
