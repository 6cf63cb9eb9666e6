//! FaceRig: data ownership and public API for one animated character.
//!
//! Methods:
//! - new, receive / receive_none (selector updates), wink, set_weight (inspection),
//!   tick (timers → audio completion → layer passes → body fades → frame)

use indexmap::IndexMap;
use log::{debug, warn};

use crate::audio::{AudioClock, AudioSink};
use crate::body::{BodyAnimationController, ClipSelect};
use crate::config::FaceConfig;
use crate::error::Result;
use crate::expression::{ExpressionLayer, ExpressionTable};
use crate::eyes::{Eye, EyeLayer, EyeState};
use crate::message::FaceMessage;
use crate::outputs::{FaceEvent, FaceFrame, WeightChange};
use crate::rig::RigDescriptor;
use crate::schedule::{LayerPass, RigMode, DEFAULT_PASS_ORDER};
use crate::scheduler::{run_passes, Layers};
use crate::viseme::{CueTrack, VisemeLayer, VisemeMap};
use crate::weights::WeightStore;

/// Per-tick inputs. The mode travels with the tick instead of living in
/// shared state, so several rigs can run side by side.
pub struct TickContext<'a> {
    pub dt: f32,
    pub mode: RigMode,
    pub audio: Option<&'a mut dyn AudioClock>,
}

impl<'a> TickContext<'a> {
    pub fn new(dt: f32) -> Self {
        Self {
            dt,
            mode: RigMode::Live,
            audio: None,
        }
    }

    pub fn with_mode(mut self, mode: RigMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_audio(mut self, audio: &'a mut dyn AudioClock) -> Self {
        self.audio = Some(audio);
        self
    }
}

/// Completion state of the utterance being performed.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Utterance {
    None,
    /// Waiting for the audio collaborator's completion signal.
    Playing,
    /// Nothing to play; report consumption on the next tick.
    Immediate,
}

type ConsumedFn = Box<dyn FnMut() + Send + Sync>;

struct ConsumedCallback(ConsumedFn);

impl std::fmt::Debug for ConsumedCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ConsumedCallback")
    }
}

#[derive(Debug)]
pub struct FaceRig {
    cfg: FaceConfig,
    desc: RigDescriptor,
    store: WeightStore,
    expression: ExpressionLayer,
    eyes: EyeLayer,
    visemes: VisemeLayer,
    body: BodyAnimationController,
    pass_order: Vec<LayerPass>,

    utterance: Utterance,
    on_consumed: Option<ConsumedCallback>,
    pending_events: Vec<FaceEvent>,

    epoch: u64,
    frame: FaceFrame,
}

impl FaceRig {
    /// Build a rig from a loader-supplied descriptor. The default clip starts
    /// immediately (reported on the first frame).
    pub fn new(desc: RigDescriptor, cfg: FaceConfig) -> Result<Self> {
        desc.validate()?;
        let store = WeightStore::new(&desc);
        for shape in cfg.blink_shapes.iter() {
            if !store.contains(shape) {
                debug!("rig has no '{shape}' shape; eyelid writes will be skipped");
            }
        }
        let mut rig = Self {
            store,
            expression: ExpressionLayer::new(ExpressionTable::builtin()),
            eyes: EyeLayer::new(&cfg),
            visemes: VisemeLayer::new(VisemeMap::default()),
            body: BodyAnimationController::new(desc.clips.clone(), &cfg),
            pass_order: DEFAULT_PASS_ORDER.to_vec(),
            utterance: Utterance::None,
            on_consumed: None,
            pending_events: Vec::new(),
            epoch: 0,
            frame: FaceFrame::default(),
            desc,
            cfg,
        };
        rig.select_animation(None);
        Ok(rig)
    }

    /// Replace the expression preset table.
    pub fn with_expressions(mut self, table: ExpressionTable) -> Self {
        let active = self.expression.active().to_string();
        self.expression = ExpressionLayer::new(table);
        self.expression.select(Some(&active));
        self
    }

    pub fn with_viseme_map(mut self, map: VisemeMap) -> Self {
        self.visemes = VisemeLayer::new(map);
        self
    }

    /// Override the write order; passes missing from `order` do not run.
    pub fn with_pass_order(mut self, order: Vec<LayerPass>) -> Self {
        self.pass_order = order;
        self
    }

    /// Callback fired once per utterance when playback completes.
    pub fn on_message_consumed(&mut self, f: impl FnMut() + Send + Sync + 'static) {
        self.on_consumed = Some(ConsumedCallback(Box::new(f)));
    }

    pub fn config(&self) -> &FaceConfig {
        &self.cfg
    }

    pub fn descriptor(&self) -> &RigDescriptor {
        &self.desc
    }

    pub fn weights(&self) -> &WeightStore {
        &self.store
    }

    pub fn body(&self) -> &BodyAnimationController {
        &self.body
    }

    pub fn expression(&self) -> &str {
        self.expression.active()
    }

    pub fn eye_state(&self) -> EyeState {
        self.eyes.state()
    }

    pub fn cue_track(&self) -> Option<&CueTrack> {
        self.visemes.track()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Seconds on the rig clock that drives blink/wink timers.
    pub fn clock(&self) -> f64 {
        self.eyes.now()
    }

    /// Whether an utterance is still waiting to be reported consumed.
    pub fn is_busy(&self) -> bool {
        self.utterance != Utterance::None
    }

    /// Apply one inbound utterance: selectors, cue track and audio.
    pub fn receive(&mut self, msg: &FaceMessage, sink: &mut dyn AudioSink) {
        self.select_animation(msg.animation.as_deref());
        self.select_expression(msg.facial_expression.as_deref());

        let playing = match msg.decode_audio() {
            Ok(Some(bytes)) => match sink.play(bytes) {
                Ok(()) => true,
                Err(e) => {
                    warn!("audio playback failed, lip sync disabled: {e}");
                    false
                }
            },
            Ok(None) => false,
            Err(e) => {
                warn!("dropping undecodable audio: {e}");
                false
            }
        };

        match (msg.cue_track(), playing) {
            (Some(track), true) => {
                self.pending_events.push(FaceEvent::LipSyncArmed {
                    cues: track.len(),
                    audio: true,
                });
                debug!("lip sync armed with {} cues", track.len());
                self.visemes.arm(track);
            }
            _ => self.visemes.disarm(),
        }

        self.utterance = if playing {
            Utterance::Playing
        } else {
            Utterance::Immediate
        };
    }

    /// The transport has nothing pending: fall back to the neutral state.
    pub fn receive_none(&mut self) {
        self.select_animation(None);
        self.select_expression(None);
        self.visemes.disarm();
        self.utterance = Utterance::None;
    }

    /// `None` selects the idle/rest clip.
    pub fn select_animation(&mut self, name: Option<&str>) {
        let outcome = match name {
            Some(n) => self.body.select(n),
            None => self.body.select_default(),
        };
        match outcome {
            ClipSelect::Started(t) => self.pending_events.push(FaceEvent::ClipTransition(t)),
            ClipSelect::Rejected => {
                if let Some(n) = name {
                    self.pending_events.push(FaceEvent::ClipRejected {
                        requested: n.to_string(),
                    });
                }
            }
            ClipSelect::Unchanged => {}
        }
    }

    /// `None` selects the default (empty) preset.
    pub fn select_expression(&mut self, name: Option<&str>) {
        let before = self.expression.active().to_string();
        let found = self.expression.select(name);
        if !found || before != self.expression.active() {
            self.pending_events.push(FaceEvent::ExpressionChanged {
                name: self.expression.active().to_string(),
                fallback: !found,
            });
        }
    }

    /// Arm a cue track without going through a message (e.g. replays).
    pub fn arm_lipsync(&mut self, track: CueTrack) {
        self.visemes.arm(track);
    }

    pub fn wink(&mut self, eye: Eye) {
        self.eyes.wink(eye);
    }

    /// Operator write. Meant for inspection mode; in live mode the layers
    /// pull the shape back toward their targets on the next tick.
    pub fn set_weight(&mut self, shape: &str, weight: f32) -> bool {
        self.store.set(shape, weight)
    }

    pub fn dump_non_zero_weights(&self) -> IndexMap<String, f32> {
        self.store
            .dump_non_zero(self.cfg.dump_threshold, self.cfg.dump_decimals)
    }

    pub fn dump_non_zero_weights_json(&self) -> Result<String> {
        self.store
            .dump_non_zero_json(self.cfg.dump_threshold, self.cfg.dump_decimals)
    }

    /// Cancel the blink cycle and pending wink timers. Weights stay where
    /// they are; further ticks no longer blink.
    pub fn shutdown(&mut self) {
        self.eyes.shutdown();
        self.visemes.disarm();
        self.utterance = Utterance::None;
    }

    /// Advance one rendered frame.
    ///
    /// In [`RigMode::Inspection`] no layer writes the store and the eye timers
    /// hold still; only body fades and audio completion are processed.
    pub fn tick(&mut self, ctx: TickContext<'_>) -> &FaceFrame {
        let TickContext { dt, mode, mut audio } = ctx;
        let dt = dt.max(0.0);

        self.epoch = self.epoch.wrapping_add(1);
        self.frame.clear();
        self.frame.epoch = self.epoch;
        self.frame.dt = dt;
        self.frame.mode = mode;
        self.frame.events.append(&mut self.pending_events);

        // 1) Timers post their state changes at the tick boundary.
        if mode == RigMode::Live {
            self.eyes.advance(dt as f64, &mut self.frame.events);
        }

        // 2) Audio completion
        // Without a clock there is no completion signal to wait for.
        let finished = audio.as_deref_mut().map(|a| a.take_finished()).unwrap_or(true);
        let consumed = match self.utterance {
            Utterance::Playing => finished,
            Utterance::Immediate => true,
            Utterance::None => false,
        };
        if consumed {
            if audio.is_none() && self.utterance == Utterance::Playing {
                debug!("ticked without an audio clock; utterance ends without lip sync");
            }
            self.utterance = Utterance::None;
            self.visemes.disarm();
            self.frame.events.push(FaceEvent::MessageConsumed);
            if let Some(cb) = self.on_consumed.as_mut() {
                (cb.0)();
            }
        }

        // 3) Layer passes
        if mode == RigMode::Live {
            let position = audio.as_deref().and_then(|a| a.position());
            run_passes(
                &self.pass_order,
                &mut self.store,
                Layers {
                    expression: &self.expression,
                    eyes: &self.eyes,
                    visemes: &mut self.visemes,
                },
                &self.cfg,
                position,
                &mut self.frame,
            );
        }

        // 4) Body fades
        self.body.advance(dt);
        self.frame.clip_weights = self.body.clip_weights();

        // 5) Snapshot
        self.frame.weights.extend(self.store.iter().map(|(shape, weight)| WeightChange {
            shape: shape.to_string(),
            weight,
        }));

        &self.frame
    }

    /// Last frame produced by `tick`.
    pub fn last_frame(&self) -> &FaceFrame {
        &self.frame
    }
}
