//! Body Animation Controller: exactly one current clip, crossfaded on switch.
//!
//! The controller owns no skeleton. It decides which clip is current and
//! integrates simple linear fades so the renderer can read per-clip blend
//! weights; sampling the clips is the renderer's job.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::config::FaceConfig;

/// Outgoing half of a crossfade.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FadeOut {
    pub clip: String,
    pub seconds: f32,
}

/// Emitted whenever the current clip changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClipTransition {
    pub clip: String,
    /// 0 on the very first activation.
    pub fade_in: f32,
    pub fade_out: Option<FadeOut>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ClipSelect {
    Started(ClipTransition),
    /// Requested clip is already current.
    Unchanged,
    /// No loaded clip has that name; the previous clip keeps playing.
    Rejected,
}

#[derive(Clone, Debug, PartialEq)]
struct ClipFade {
    clip: String,
    weight: f32,
    from: f32,
    to: f32,
    duration: f32,
    elapsed: f32,
}

impl ClipFade {
    fn start(clip: String, from: f32, to: f32, duration: f32) -> Self {
        let mut fade = Self {
            clip,
            weight: from,
            from,
            to,
            duration: duration.max(0.0),
            elapsed: 0.0,
        };
        fade.step(0.0);
        fade
    }

    fn step(&mut self, dt: f32) {
        self.elapsed += dt.max(0.0);
        let u = if self.duration <= 0.0 {
            1.0
        } else {
            (self.elapsed / self.duration).min(1.0)
        };
        self.weight = self.from + (self.to - self.from) * u;
    }

    fn finished(&self) -> bool {
        self.duration <= 0.0 || self.elapsed >= self.duration
    }
}

#[derive(Clone, Debug)]
pub struct BodyAnimationController {
    clips: Vec<String>,
    default_clip: Option<String>,
    current: Option<String>,
    fades: Vec<ClipFade>,
    crossfade: f32,
}

impl BodyAnimationController {
    pub fn new(clips: Vec<String>, cfg: &FaceConfig) -> Self {
        let default_clip = if clips.iter().any(|c| *c == cfg.idle_clip) {
            Some(cfg.idle_clip.clone())
        } else {
            clips.first().cloned()
        };
        Self {
            clips,
            default_clip,
            current: None,
            fades: Vec::new(),
            crossfade: cfg.crossfade_seconds.max(0.0),
        }
    }

    pub fn clips(&self) -> &[String] {
        &self.clips
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Idle/rest clip if loaded, else the first clip.
    pub fn default_clip(&self) -> Option<&str> {
        self.default_clip.as_deref()
    }

    pub fn select_default(&mut self) -> ClipSelect {
        match self.default_clip.clone() {
            Some(name) => self.select(&name),
            None => ClipSelect::Rejected,
        }
    }

    /// Make `name` the current clip.
    pub fn select(&mut self, name: &str) -> ClipSelect {
        if !self.clips.iter().any(|c| c == name) {
            warn!("unknown animation '{name}', keeping {:?}", self.current);
            return ClipSelect::Rejected;
        }
        if self.current.as_deref() == Some(name) {
            return ClipSelect::Unchanged;
        }

        let previous = self.current.replace(name.to_string());
        let fade_in = if previous.is_some() { self.crossfade } else { 0.0 };

        // A clip still fading out is revived from its present weight.
        let start_weight = self.take_fade(name).map(|f| f.weight).unwrap_or(0.0);
        self.fades
            .push(ClipFade::start(name.to_string(), start_weight, 1.0, fade_in));

        let fade_out = previous.map(|prev| {
            let from = self.take_fade(&prev).map(|f| f.weight).unwrap_or(1.0);
            self.fades
                .push(ClipFade::start(prev.clone(), from, 0.0, self.crossfade));
            FadeOut {
                clip: prev,
                seconds: self.crossfade,
            }
        });

        let transition = ClipTransition {
            clip: name.to_string(),
            fade_in,
            fade_out,
        };
        debug!("animation transition: {transition:?}");
        ClipSelect::Started(transition)
    }

    fn take_fade(&mut self, clip: &str) -> Option<ClipFade> {
        let idx = self.fades.iter().position(|f| f.clip == clip)?;
        Some(self.fades.remove(idx))
    }

    /// Integrate fades by `dt` and drop clips that have fully faded out.
    pub fn advance(&mut self, dt: f32) {
        for fade in &mut self.fades {
            fade.step(dt);
        }
        self.fades.retain(|f| !(f.to == 0.0 && f.finished()));
    }

    /// Blend weight of every clip with nonzero influence, current clip first.
    pub fn clip_weights(&self) -> Vec<(String, f32)> {
        let mut out: Vec<(String, f32)> = Vec::with_capacity(self.fades.len());
        if let Some(cur) = self.current.as_deref() {
            if let Some(f) = self.fades.iter().find(|f| f.clip == cur) {
                out.push((f.clip.clone(), f.weight));
            }
        }
        for f in &self.fades {
            if Some(f.clip.as_str()) != self.current.as_deref() {
                out.push((f.clip.clone(), f.weight));
            }
        }
        out
    }

    pub fn weight_of(&self, clip: &str) -> f32 {
        self.fades
            .iter()
            .find(|f| f.clip == clip)
            .map(|f| f.weight)
            .unwrap_or(0.0)
    }
}
