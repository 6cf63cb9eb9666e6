use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use vizij_face_core::{
    CueTrack, FaceConfig, FaceRig, ManualClock, RigDescriptor, RigMode, TickContext, VisemeCue,
};
use vizij_test_fixtures::rigs;

const DT: f32 = 1.0 / 60.0;

fn avatar() -> FaceRig {
    let desc = RigDescriptor::from_json(&rigs::json("avatar").expect("avatar fixture"))
        .expect("avatar descriptor");
    FaceRig::new(
        desc,
        FaceConfig {
            rng_seed: Some(1),
            ..FaceConfig::default()
        },
    )
    .expect("rig")
}

fn talking_track(cues: usize) -> CueTrack {
    let symbols = ['A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'X'];
    CueTrack::new(
        (0..cues)
            .map(|i| {
                let start = i as f64 * 0.1;
                VisemeCue::new(start, start + 0.1, symbols[i % symbols.len()])
            })
            .collect(),
    )
}

fn bench_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("face_tick");

    group.bench_function("live_idle", |b| {
        let mut rig = avatar();
        rig.select_expression(Some("smile"));
        b.iter(|| {
            let frame = rig.tick(TickContext::new(DT));
            black_box(frame.weights.len());
        });
    });

    for cues in [16usize, 256, 4096] {
        group.bench_with_input(BenchmarkId::new("live_lipsync", cues), &cues, |b, &n| {
            let mut rig = avatar();
            let track = talking_track(n);
            let length = track.duration();
            rig.arm_lipsync(track);
            let mut clock = ManualClock::new(f64::MAX);
            clock.seek(0.0);
            let mut t = 0.0f64;
            b.iter(|| {
                t = (t + DT as f64) % length;
                clock.seek(t);
                let frame = rig.tick(TickContext::new(DT).with_audio(&mut clock));
                black_box(frame.viseme.clone());
            });
        });
    }

    group.bench_function("inspection", |b| {
        let mut rig = avatar();
        b.iter(|| {
            let frame = rig.tick(TickContext::new(DT).with_mode(RigMode::Inspection));
            black_box(frame.epoch);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_tick);
criterion_main!(benches);
