use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use vizij_face_core::{
    CueTrack, ExpressionTable, FaceConfig, FaceEvent, FaceMessage, FaceRig, LayerPass,
    ManualClock, MessageQueue, RigDescriptor, SilentAudio, TickContext, VisemeCue,
    VisemeSelection,
};
use vizij_test_fixtures::{expressions, messages, rigs};

const DT: f32 = 1.0 / 60.0;

fn rig(name: &str) -> FaceRig {
    let desc = RigDescriptor::from_json(&rigs::json(name).unwrap()).unwrap();
    FaceRig::new(
        desc,
        FaceConfig {
            rng_seed: Some(11),
            ..FaceConfig::default()
        },
    )
    .unwrap()
}

fn message(name: &str) -> FaceMessage {
    FaceMessage::from_json(&messages::json(name).unwrap()).unwrap()
}

fn clock_for(name: &str) -> ManualClock {
    ManualClock::new(messages::audio_seconds(name).unwrap().unwrap_or(0.0))
}

#[test]
fn every_fixture_rig_loads() {
    for key in rigs::keys() {
        let desc = RigDescriptor::from_json(&rigs::json(&key).unwrap())
            .unwrap_or_else(|e| panic!("rig {key}: {e}"));
        assert!(!desc.shapes.is_empty(), "rig {key} has no shapes");
        assert!(desc.has_shape("eyeBlinkLeft"), "rig {key} has no eyelids");
    }
}

#[test]
fn every_fixture_message_parses() {
    for key in messages::keys() {
        let msg = message(&key);
        msg.decode_audio()
            .unwrap_or_else(|e| panic!("message {key}: {e}"));
    }
}

#[test]
fn greeting_plays_lipsync_then_reports_consumed() {
    let mut rig = rig("avatar");
    let mut clock = clock_for("greeting");
    let consumed = Arc::new(AtomicUsize::new(0));
    let counter = consumed.clone();
    rig.on_message_consumed(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    rig.receive(&message("greeting"), &mut clock);
    assert_eq!(clock.last_payload_len(), 64);
    assert_eq!(rig.cue_track().map(|t| t.len()), Some(6));
    assert_eq!(rig.body().current(), Some("Talking_1"));
    assert_eq!(rig.expression(), "smile");

    let mut symbols = Vec::new();
    let mut consumed_at = None;
    for i in 0..200 {
        clock.advance(DT as f64);
        let frame = rig.tick(TickContext::new(DT).with_audio(&mut clock));
        if i == 0 {
            assert!(frame.has_event(|e| matches!(e, FaceEvent::LipSyncArmed { cues: 6, audio: true })));
        }
        if let Some(VisemeSelection::Active { symbol, .. }) = &frame.viseme {
            if symbols.last() != Some(symbol) {
                symbols.push(*symbol);
            }
        }
        if frame.has_event(|e| matches!(e, FaceEvent::MessageConsumed)) {
            assert!(consumed_at.is_none(), "consumed twice");
            consumed_at = Some(i);
        }
    }

    assert_eq!(symbols, vec!['X', 'D', 'C', 'E', 'B', 'X']);
    let at = consumed_at.expect("greeting never finished");
    assert!((70..=73).contains(&at), "consumed at tick {at}");
    assert_eq!(consumed.load(Ordering::SeqCst), 1);
    assert!(!rig.is_busy());
    assert!(rig.cue_track().is_none());
    assert_eq!(rig.last_frame().viseme, Some(VisemeSelection::Inactive));
    for shape in ["viseme_PP", "viseme_AA", "viseme_I", "viseme_O", "viseme_kk"] {
        assert!(rig.weights().get(shape).unwrap() < 0.01, "{shape} still open");
    }
}

#[test]
fn overlapping_cues_pick_the_earlier_one() {
    let mut rig = rig("avatar");
    let mut clock = clock_for("overlap");
    rig.receive(&message("overlap"), &mut clock);

    clock.seek(0.7);
    let frame = rig.tick(TickContext::new(DT).with_audio(&mut clock));
    assert_eq!(frame.viseme.as_ref().and_then(|s| s.shape()), Some("viseme_PP"));

    clock.seek(1.2);
    let frame = rig.tick(TickContext::new(DT).with_audio(&mut clock));
    assert_eq!(frame.viseme.as_ref().and_then(|s| s.shape()), Some("viseme_kk"));

    clock.seek(1.8);
    let frame = rig.tick(TickContext::new(DT).with_audio(&mut clock));
    assert_eq!(frame.viseme, Some(VisemeSelection::Idle));
}

#[test]
fn message_without_audio_skips_lipsync() {
    let mut rig = rig("avatar");
    let mut clock = ManualClock::new(5.0);
    rig.receive(&message("silent"), &mut clock);
    assert!(rig.cue_track().is_none());
    assert!(!clock.is_playing());

    let frame = rig.tick(TickContext::new(DT).with_audio(&mut clock));
    assert!(frame.has_event(|e| matches!(e, FaceEvent::MessageConsumed)));
    assert!(frame.has_event(|e| matches!(
        e,
        FaceEvent::ExpressionChanged { name, fallback: false } if name == "funnyFace"
    )));
    assert_eq!(rig.body().current(), Some("Laughing"));
}

#[test]
fn undecodable_audio_is_dropped() {
    let mut rig = rig("minimal");
    let mut clock = ManualClock::new(1.0);
    let msg = FaceMessage {
        audio: Some("%%% not base64 %%%".into()),
        ..message("greeting")
    };
    rig.receive(&msg, &mut clock);
    assert!(!clock.is_playing());
    assert!(rig.cue_track().is_none());
    let frame = rig.tick(TickContext::new(DT).with_audio(&mut clock));
    assert!(frame.has_event(|e| matches!(e, FaceEvent::MessageConsumed)));
}

#[test]
fn ticking_without_a_clock_does_not_stall_the_queue() {
    let mut rig = rig("avatar");
    let mut sink = clock_for("greeting");
    let consumed = Arc::new(AtomicUsize::new(0));
    let counter = consumed.clone();
    rig.on_message_consumed(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    rig.receive(&message("greeting"), &mut sink);
    assert!(sink.is_playing());
    assert!(rig.is_busy());

    let frame = rig.tick(TickContext::new(DT));
    assert!(frame.has_event(|e| matches!(e, FaceEvent::MessageConsumed)));
    assert_eq!(frame.viseme, Some(VisemeSelection::Inactive));
    assert!(!rig.is_busy());
    assert!(rig.cue_track().is_none());

    for _ in 0..60 {
        let frame = rig.tick(TickContext::new(DT));
        assert!(!frame.has_event(|e| matches!(e, FaceEvent::MessageConsumed)));
    }
    assert_eq!(consumed.load(Ordering::SeqCst), 1);
}

#[test]
fn silent_host_finishes_on_first_tick() {
    let mut rig = rig("avatar");
    let mut audio = SilentAudio::default();
    rig.receive(&message("greeting"), &mut audio);
    let frame = rig.tick(TickContext::new(DT).with_audio(&mut audio));
    assert!(frame.has_event(|e| matches!(e, FaceEvent::MessageConsumed)));
    // No playback position, so lip sync never activates.
    assert_eq!(frame.viseme, Some(VisemeSelection::Inactive));
}

#[test]
fn queue_drains_in_order() {
    let mut rig = rig("avatar");
    let mut clock = ManualClock::new(0.0);
    let mut queue = MessageQueue::new();
    for name in ["greeting", "silent", "empty"] {
        queue.push(message(name));
    }

    let mut delivered = false;
    let mut clips = Vec::new();
    for _ in 0..400 {
        if !delivered {
            match queue.current() {
                Some(msg) => {
                    clock.set_length(if msg.audio.is_some() { 1.2 } else { 0.0 });
                    rig.receive(msg, &mut clock);
                    delivered = true;
                }
                None => rig.receive_none(),
            }
        }
        clock.advance(DT as f64);
        let frame = rig.tick(TickContext::new(DT).with_audio(&mut clock));
        for e in &frame.events {
            if let FaceEvent::ClipTransition(t) = e {
                clips.push(t.clip.clone());
            }
        }
        if frame.has_event(|e| matches!(e, FaceEvent::MessageConsumed)) {
            queue.message_consumed();
            delivered = false;
        }
    }

    assert!(queue.is_empty());
    assert_eq!(clips, vec!["Idle", "Talking_1", "Laughing", "Idle"]);
    assert_eq!(rig.expression(), "default");
    assert!(!rig.is_busy());
}

#[test]
fn studio_table_ignores_eyelids() {
    let table = ExpressionTable::from_json(&expressions::json("studio").unwrap()).unwrap();
    let mut rig = rig("avatar").with_expressions(table);
    rig.select_expression(Some("wince"));

    for _ in 0..120 {
        rig.tick(TickContext::new(DT));
        let state = rig.eye_state();
        let lid = rig.weights().target("eyeBlinkLeft").unwrap();
        assert_eq!(lid == 1.0, state.left_closed());
    }
    assert!((rig.weights().get("eyeSquintLeft").unwrap() - 0.9).abs() < 0.01);
    assert!((rig.weights().get("jawOpen").unwrap() - 0.15).abs() < 0.01);
}

#[test]
fn custom_pass_order_lets_expression_win() {
    let desc = RigDescriptor::from_json(&rigs::json("minimal").unwrap()).unwrap();
    let table = ExpressionTable::from_json(r#"{ "ooh": { "viseme_O": 0.6 } }"#).unwrap();
    let mut rig = FaceRig::new(desc, FaceConfig::default())
        .unwrap()
        .with_expressions(table)
        .with_pass_order(vec![LayerPass::Viseme, LayerPass::Eyes, LayerPass::Expression]);
    rig.select_expression(Some("ooh"));

    let frame = rig.tick(TickContext::new(DT));
    assert!(frame
        .overrides
        .iter()
        .any(|o| o.shape == "viseme_O" && o.winner == LayerPass::Expression));
    assert_eq!(rig.weights().target("viseme_O"), Some(0.6));
}

#[test]
fn released_visemes_do_not_report_overrides() {
    let mut rig = rig("avatar");
    for _ in 0..30 {
        let frame = rig.tick(TickContext::new(DT));
        assert!(frame.overrides.is_empty(), "{:?}", frame.overrides);
    }

    rig.arm_lipsync(CueTrack::new(vec![VisemeCue::new(0.0, 5.0, 'D')]));
    let mut clock = ManualClock::new(10.0);
    clock.seek(1.0);
    let frame = rig.tick(TickContext::new(DT).with_audio(&mut clock));
    assert_eq!(frame.overrides.len(), 1);
    assert_eq!(frame.overrides[0].shape, "viseme_AA");
    assert_eq!(frame.overrides[0].previous, LayerPass::Expression);
    assert_eq!(frame.overrides[0].winner, LayerPass::Viseme);
}

#[test]
fn minimal_rig_keeps_rest_pose_until_driven() {
    let mut rig = rig("minimal");
    assert_eq!(rig.weights().get("mouthSmileLeft"), Some(0.2));
    let dump = rig.dump_non_zero_weights();
    assert_eq!(dump.len(), 1);
    let json: serde_json::Value =
        serde_json::from_str(&rig.dump_non_zero_weights_json().unwrap()).unwrap();
    assert_eq!(json["mouthSmileLeft"], serde_json::json!(0.2));

    rig.tick(TickContext::new(DT));
    // Default expression pulls everything it owns toward zero.
    assert!(rig.weights().get("mouthSmileLeft").unwrap() < 0.2);
}

#[test]
fn shutdown_stops_blinking() {
    let mut rig = rig("minimal");
    rig.shutdown();
    for _ in 0..(20.0 / DT) as usize {
        let frame = rig.tick(TickContext::new(DT));
        assert!(!frame.has_event(|e| matches!(e, FaceEvent::BlinkStarted { .. })));
    }
    assert_eq!(rig.weights().get("eyeBlinkLeft"), Some(0.0));
}
