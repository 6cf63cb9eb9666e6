use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::Deserialize;

static MANIFEST: Lazy<Manifest> = Lazy::new(|| {
    let raw = include_str!("../../../../fixtures/manifest.json");
    serde_json::from_str(raw).expect("fixtures manifest should parse")
});

#[derive(Debug, Deserialize)]
struct Manifest {
    rigs: HashMap<String, String>,
    messages: HashMap<String, MessageEntry>,
    expressions: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MessageEntry {
    Path(String),
    /// Message plus the playback length a scripted clock should use for it.
    Detailed { path: String, audio_seconds: f64 },
}

impl MessageEntry {
    fn as_path(&self) -> &str {
        match self {
            MessageEntry::Path(path) => path,
            MessageEntry::Detailed { path, .. } => path,
        }
    }

    fn audio_seconds(&self) -> Option<f64> {
        match self {
            MessageEntry::Path(_) => None,
            MessageEntry::Detailed { audio_seconds, .. } => Some(*audio_seconds),
        }
    }
}

fn fixtures_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../fixtures")
}

fn resolve_path(rel: &str) -> PathBuf {
    fixtures_root().join(rel)
}

fn read_to_string(rel: &str) -> Result<String> {
    let path = resolve_path(rel);
    fs::read_to_string(&path)
        .with_context(|| format!("failed to read fixture at {}", path.display()))
}

fn load_json<T: DeserializeOwned>(rel: &str) -> Result<T> {
    let text = read_to_string(rel)?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse JSON fixture {rel}"))
}

fn lookup<'a, T>(map: &'a HashMap<String, T>, kind: &str, name: &str) -> Result<&'a T> {
    map.get(name)
        .ok_or_else(|| anyhow!("unknown {kind} fixture '{name}'"))
}

/// Rig descriptors as a loader would hand them over.
pub mod rigs {
    use super::*;

    pub fn keys() -> Vec<String> {
        MANIFEST.rigs.keys().cloned().collect()
    }

    pub fn json(name: &str) -> Result<String> {
        let rel = lookup(&MANIFEST.rigs, "rig", name)?;
        read_to_string(rel)
    }

    pub fn load<T: DeserializeOwned>(name: &str) -> Result<T> {
        let rel = lookup(&MANIFEST.rigs, "rig", name)?;
        super::load_json(rel)
    }

    pub fn path(name: &str) -> Result<PathBuf> {
        let rel = lookup(&MANIFEST.rigs, "rig", name)?;
        Ok(resolve_path(rel))
    }
}

/// Inbound utterance payloads.
pub mod messages {
    use super::*;

    pub fn keys() -> Vec<String> {
        MANIFEST.messages.keys().cloned().collect()
    }

    pub fn json(name: &str) -> Result<String> {
        let entry = lookup(&MANIFEST.messages, "message", name)?;
        read_to_string(entry.as_path())
    }

    pub fn load<T: DeserializeOwned>(name: &str) -> Result<T> {
        let entry = lookup(&MANIFEST.messages, "message", name)?;
        super::load_json(entry.as_path())
    }

    /// Playback length recorded for the message's audio, if any.
    pub fn audio_seconds(name: &str) -> Result<Option<f64>> {
        let entry = lookup(&MANIFEST.messages, "message", name)?;
        Ok(entry.audio_seconds())
    }
}

/// Expression preset tables.
pub mod expressions {
    use super::*;

    pub fn keys() -> Vec<String> {
        MANIFEST.expressions.keys().cloned().collect()
    }

    pub fn json(name: &str) -> Result<String> {
        let rel = lookup(&MANIFEST.expressions, "expression table", name)?;
        read_to_string(rel)
    }
}
