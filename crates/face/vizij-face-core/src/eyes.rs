//! Eye-State Layer: autonomous blinking plus operator winks.
//!
//! Both timers run on the rig clock through a [`TimerQueue`]. The blink cycle
//! is `wait U[min, max) → close → wait blink_duration → open → repeat`; a wink
//! closes one eye for `wink_duration`. Each eyelid target is the OR of the
//! blink flag and that eye's wink flag.

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::FaceConfig;
use crate::outputs::FaceEvent;
use crate::schedule::TargetBatch;
use crate::timers::TimerQueue;

/// Shortest blink gap or blink length the cycle accepts, in seconds. Keeps
/// every rescheduled event strictly after the one that posted it.
pub const MIN_EYE_INTERVAL: f64 = 1e-3;

pub const MAX_EYE_EVENTS_PER_TICK: usize = 256;

fn at_least_min(seconds: f64) -> f64 {
    if seconds.is_nan() {
        MIN_EYE_INTERVAL
    } else {
        seconds.max(MIN_EYE_INTERVAL)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Eye {
    Left,
    Right,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct EyeState {
    pub blinking: bool,
    pub wink_left: bool,
    pub wink_right: bool,
}

impl EyeState {
    #[inline]
    pub fn left_closed(&self) -> bool {
        self.blinking || self.wink_left
    }

    #[inline]
    pub fn right_closed(&self) -> bool {
        self.blinking || self.wink_right
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum EyeEvent {
    BlinkStart,
    BlinkEnd,
    WinkStart(Eye),
    WinkEnd(Eye),
}

#[derive(Debug)]
pub struct EyeLayer {
    state: EyeState,
    timers: TimerQueue<EyeEvent>,
    rng: StdRng,
    now: f64,
    interval: (f64, f64),
    blink_duration: f64,
    wink_duration: f64,
}

impl EyeLayer {
    /// Start the blink cycle at clock 0.
    pub fn new(cfg: &FaceConfig) -> Self {
        let rng = match cfg.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut layer = Self {
            state: EyeState::default(),
            timers: TimerQueue::new(),
            rng,
            now: 0.0,
            interval: (cfg.blink_interval_min, cfg.blink_interval_max),
            blink_duration: at_least_min(cfg.blink_duration),
            wink_duration: at_least_min(cfg.wink_duration),
        };
        let first = layer.next_gap();
        layer.timers.schedule(first, EyeEvent::BlinkStart);
        layer
    }

    pub fn state(&self) -> EyeState {
        self.state
    }

    /// Rig clock in seconds.
    pub fn now(&self) -> f64 {
        self.now
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn is_shut_down(&self) -> bool {
        self.timers.is_cancelled()
    }

    fn next_gap(&mut self) -> f64 {
        let (min, max) = self.interval;
        let gap = if min.is_finite() && max.is_finite() && max > min {
            self.rng.gen_range(min..max)
        } else {
            min
        };
        at_least_min(gap)
    }

    /// Close one eye for `wink_duration`. The flag flips at the next tick
    /// boundary; re-winking an eye that is already closed extends the wink.
    pub fn wink(&mut self, eye: Eye) {
        if self.timers.is_cancelled() {
            return;
        }
        self.timers
            .retain(|e| *e != EyeEvent::WinkEnd(eye) && *e != EyeEvent::WinkStart(eye));
        self.timers.schedule(self.now, EyeEvent::WinkStart(eye));
        self.timers
            .schedule(self.now + self.wink_duration, EyeEvent::WinkEnd(eye));
    }

    /// Advance the rig clock and apply the events that came due, in order.
    /// At most [`MAX_EYE_EVENTS_PER_TICK`] are applied; a backlog left by a
    /// long stall drains over the following ticks. Non-finite `dt` is ignored.
    pub fn advance(&mut self, dt: f64, events: &mut Vec<FaceEvent>) {
        if dt.is_finite() {
            self.now += dt.max(0.0);
        }
        for _ in 0..MAX_EYE_EVENTS_PER_TICK {
            let Some(timed) = self.timers.pop_due(self.now) else {
                break;
            };
            let at = timed.due;
            match timed.event {
                EyeEvent::BlinkStart => {
                    self.state.blinking = true;
                    self.timers
                        .schedule(at + self.blink_duration, EyeEvent::BlinkEnd);
                    events.push(FaceEvent::BlinkStarted { at });
                }
                EyeEvent::BlinkEnd => {
                    self.state.blinking = false;
                    let gap = self.next_gap();
                    self.timers.schedule(at + gap, EyeEvent::BlinkStart);
                    events.push(FaceEvent::BlinkEnded { at });
                }
                EyeEvent::WinkStart(eye) => {
                    self.set_wink(eye, true);
                    events.push(FaceEvent::WinkStarted { eye, at });
                }
                EyeEvent::WinkEnd(eye) => {
                    self.set_wink(eye, false);
                    events.push(FaceEvent::WinkEnded { eye, at });
                }
            }
        }
    }

    fn set_wink(&mut self, eye: Eye, on: bool) {
        match eye {
            Eye::Left => self.state.wink_left = on,
            Eye::Right => self.state.wink_right = on,
        }
    }

    /// Eyelid targets for the two reserved blink shapes.
    pub fn targets(&self, cfg: &FaceConfig) -> TargetBatch {
        let closed = |c: bool| if c { 1.0 } else { 0.0 };
        let mut batch = TargetBatch::with_capacity(2);
        batch.push(
            cfg.blink_shapes[0].as_str(),
            closed(self.state.left_closed()),
            cfg.blink_rate,
        );
        batch.push(
            cfg.blink_shapes[1].as_str(),
            closed(self.state.right_closed()),
            cfg.blink_rate,
        );
        batch
    }

    /// Cancel the blink cycle and any pending wink auto-clear. Both eyes
    /// are left open.
    pub fn shutdown(&mut self) {
        if !self.timers.is_cancelled() {
            let n = self.timers.cancel_all();
            debug!("eye timers cancelled ({n} pending)");
        }
        self.state = EyeState::default();
    }
}

impl Drop for EyeLayer {
    fn drop(&mut self) {
        self.shutdown();
    }
}
