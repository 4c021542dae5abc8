//! Snapshot Pipeline Benchmark
//!
//! Measures the per-snapshot cost of normalize → adjust → apply. Snapshots
//! arrive at most a few times per second, so anything in the microsecond
//! range leaves the pipeline invisible next to element work.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;

use room_sync_client::{
    config::SyncTuning,
    error::PlaybackError,
    player::{MediaElement, ReadyState, Reconciler, Tick},
    protocol::{InboundEvent, RawSnapshot, TransportEvent},
    queue::{MediaUrlResolver, QueueManager},
    sync::{normalize, DriftCompensator},
};

/// Element that accepts everything instantly
struct NullElement {
    src: Option<String>,
    time: f64,
    paused: bool,
    volume: f64,
}

impl MediaElement for NullElement {
    fn source(&self) -> Option<&str> {
        self.src.as_deref()
    }
    fn load(&mut self, url: &str) {
        self.src = Some(url.to_string());
        self.time = 0.0;
        self.paused = true;
    }
    fn clear_source(&mut self) {
        self.src = None;
    }
    fn current_time(&self) -> f64 {
        self.time
    }
    fn set_current_time(&mut self, seconds: f64) {
        self.time = seconds;
    }
    fn duration(&self) -> Option<f64> {
        Some(240.0)
    }
    fn paused(&self) -> bool {
        self.paused
    }
    fn play(&mut self) -> Result<(), PlaybackError> {
        self.paused = false;
        Ok(())
    }
    fn pause(&mut self) {
        self.paused = true;
    }
    fn ready_state(&self) -> ReadyState {
        ReadyState::HaveEnoughData
    }
    fn volume(&self) -> f64 {
        self.volume
    }
    fn set_volume(&mut self, volume: f64) {
        self.volume = volume;
    }
}

fn raw_snapshot(queue_len: usize, current_time: f64) -> RawSnapshot {
    let queue: Vec<_> = (0..queue_len)
        .map(|i| json!({"id": i, "title": format!("Song {}", i), "mp3Url": format!("/media/{}.mp3", i), "duration": 200}))
        .collect();
    let line = json!({
        "event": "music-state",
        "data": {
            "isPlaying": true,
            "currentTime": current_time,
            "serverTimestamp": 1_700_000_000_000i64,
            "queue": queue,
            "currentTrackIndex": queue_len / 2
        }
    })
    .to_string();

    match TransportEvent::parse(&line) {
        Ok(TransportEvent::Inbound(InboundEvent::MusicState(raw))) => raw,
        other => panic!("unexpected parse result: {:?}", other),
    }
}

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");
    for queue_len in [1usize, 20, 200] {
        let raw = raw_snapshot(queue_len, 42.0);
        group.bench_with_input(BenchmarkId::from_parameter(queue_len), &raw, |b, raw| {
            let mut queue = QueueManager::new(MediaUrlResolver::new("http://music.local"));
            b.iter(|| normalize(black_box(raw.clone()), &mut queue));
        });
    }
    group.finish();
}

fn bench_adjust(c: &mut Criterion) {
    let mut queue = QueueManager::new(MediaUrlResolver::new("http://music.local"));
    let snapshot = normalize(raw_snapshot(20, 42.0), &mut queue);
    let compensator = DriftCompensator::default();

    c.bench_function("adjust", |b| {
        b.iter(|| compensator.adjust(black_box(snapshot.clone()), 1_700_000_000_450))
    });
}

fn bench_apply_steady_state(c: &mut Criterion) {
    let mut queue = QueueManager::new(MediaUrlResolver::new("http://music.local"));
    let snapshot = normalize(raw_snapshot(20, 42.0), &mut queue);
    let tick = Tick {
        at: tokio::time::Instant::now(),
        epoch_ms: 1_700_000_000_000,
    };

    let element = NullElement {
        src: None,
        time: 0.0,
        paused: true,
        volume: 1.0,
    };
    let mut reconciler = Reconciler::new(element, SyncTuning::desktop());
    reconciler.apply(snapshot.clone(), tick);
    reconciler.on_timer(tick.after(std::time::Duration::from_secs(1)));

    c.bench_function("apply_synced", |b| {
        b.iter(|| reconciler.apply(black_box(snapshot.clone()), tick))
    });
}

criterion_group!(benches, bench_normalize, bench_adjust, bench_apply_steady_state);
criterion_main!(benches);
