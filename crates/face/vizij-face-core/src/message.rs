//! Inbound utterance messages and the pending-message queue.
//!
//! Wire shape (one message per utterance, every field optional):
//!
//! ```json
//! { "animation": "Talking", "facialExpression": "smile",
//!   "lipsync": { "mouthCues": [ { "start": 0.0, "end": 0.2, "value": "X" } ] },
//!   "audio": "<base64>" }
//! ```

use std::collections::VecDeque;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::viseme::{CueTrack, VisemeCue, UNREADABLE_SYMBOL};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MouthCue {
    pub start: f64,
    pub end: f64,
    pub value: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LipSync {
    #[serde(default)]
    pub mouth_cues: Vec<MouthCue>,
}

impl LipSync {
    /// Cue values are single-letter symbols; longer values keep their first
    /// letter and empty ones become an unmappable placeholder.
    pub fn to_track(&self) -> CueTrack {
        CueTrack::new(
            self.mouth_cues
                .iter()
                .map(|c| {
                    let symbol = c.value.chars().next().unwrap_or(UNREADABLE_SYMBOL);
                    VisemeCue::new(c.start, c.end, symbol)
                })
                .collect(),
        )
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facial_expression: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lipsync: Option<LipSync>,
    /// Base64-encoded audio bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
}

impl FaceMessage {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Decoded audio payload, `Ok(None)` when the message carries none.
    pub fn decode_audio(&self) -> Result<Option<Vec<u8>>> {
        match self.audio.as_deref() {
            Some(b64) if !b64.trim().is_empty() => Ok(Some(STANDARD.decode(b64.trim())?)),
            _ => Ok(None),
        }
    }

    pub fn cue_track(&self) -> Option<CueTrack> {
        self.lipsync.as_ref().map(LipSync::to_track)
    }
}

/// FIFO of utterances waiting to be played. The head is the message being
/// performed; it is popped when playback reports completion.
#[derive(Clone, Debug, Default)]
pub struct MessageQueue {
    pending: VecDeque<FaceMessage>,
}

impl MessageQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, msg: FaceMessage) {
        self.pending.push_back(msg);
    }

    /// Message currently being performed, if any.
    pub fn current(&self) -> Option<&FaceMessage> {
        self.pending.front()
    }

    /// Drop the head after its playback finished; returns it.
    pub fn message_consumed(&mut self) -> Option<FaceMessage> {
        self.pending.pop_front()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
