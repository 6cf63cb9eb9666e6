//! Audio collaborator seams.
//!
//! The core only needs a non-blocking playback position and a one-shot
//! completion signal. Decoding and the output device live with the host.

use crate::error::Result;

/// Read side of an audio playback collaborator.
pub trait AudioClock {
    /// Current playback position in seconds, or `None` when nothing is playing.
    fn position(&self) -> Option<f64>;

    /// Returns true exactly once after the current clip finished playing.
    fn take_finished(&mut self) -> bool;
}

/// Write side: accepts the decoded payload of an utterance and starts playback.
pub trait AudioSink {
    fn play(&mut self, bytes: Vec<u8>) -> Result<()>;

    /// Stop playback without reporting completion.
    fn stop(&mut self) {}
}

/// Both halves, as most hosts implement them on one object.
pub trait AudioPlayback: AudioClock + AudioSink {
    fn as_clock(&mut self) -> &mut dyn AudioClock;
    fn as_sink(&mut self) -> &mut dyn AudioSink;
}

impl<T: AudioClock + AudioSink> AudioPlayback for T {
    fn as_clock(&mut self) -> &mut dyn AudioClock {
        self
    }

    fn as_sink(&mut self) -> &mut dyn AudioSink {
        self
    }
}

/// Host without audio output. Never reports a position, so lip sync stays
/// inactive; finishes every clip immediately so the transport keeps moving.
#[derive(Debug, Default, Clone)]
pub struct SilentAudio {
    finished: bool,
}

impl AudioClock for SilentAudio {
    fn position(&self) -> Option<f64> {
        None
    }

    fn take_finished(&mut self) -> bool {
        std::mem::take(&mut self.finished)
    }
}

impl AudioSink for SilentAudio {
    fn play(&mut self, _bytes: Vec<u8>) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}

/// Scripted clock: advances only when told to. Reports completion once the
/// position passes `length`. Used for headless hosts, replays and tests.
#[derive(Debug, Default, Clone)]
pub struct ManualClock {
    position: Option<f64>,
    length: f64,
    finished: bool,
    last_payload: usize,
}

impl ManualClock {
    pub fn new(length: f64) -> Self {
        Self {
            length,
            ..Self::default()
        }
    }

    /// Playback length applied to the next `play` call.
    pub fn set_length(&mut self, length: f64) {
        self.length = length;
    }

    /// Move the playhead forward; flags completion when it passes the end.
    pub fn advance(&mut self, dt: f64) {
        if let Some(p) = self.position.as_mut() {
            *p += dt;
            if *p >= self.length {
                self.position = None;
                self.finished = true;
            }
        }
    }

    pub fn seek(&mut self, t: f64) {
        self.position = Some(t);
    }

    pub fn is_playing(&self) -> bool {
        self.position.is_some()
    }

    /// Size in bytes of the last payload handed to `play`.
    pub fn last_payload_len(&self) -> usize {
        self.last_payload
    }
}

impl AudioClock for ManualClock {
    fn position(&self) -> Option<f64> {
        self.position
    }

    fn take_finished(&mut self) -> bool {
        std::mem::take(&mut self.finished)
    }
}

impl AudioSink for ManualClock {
    fn play(&mut self, bytes: Vec<u8>) -> Result<()> {
        self.last_payload = bytes.len();
        self.position = Some(0.0);
        self.finished = false;
        Ok(())
    }

    fn stop(&mut self) {
        self.position = None;
        self.finished = false;
    }
}
