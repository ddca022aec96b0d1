mod capture;

use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use capture::CaptureSource;
use crystal_core::spectrum::AudioSource;
use crystal_core::{
    Camera, ClusterConfig, ClusterEvent, CrystalCluster, CrystalObject, FrameInput, HeadlessMesh,
    TrackRecord,
};
use glam::Vec2;

const DEFAULT_FRAMES: u64 = 600;
const FRAME_TIME: Duration = Duration::from_micros(16_667);
const TRACK_COUNT: usize = 24;
const TRACK_SECONDS: f64 = 20.0;
const CLICK_EVERY_FRAMES: u64 = 240;
const STATS_EVERY_FRAMES: u64 = 60;

const DEMO_GENRES: [&str; 8] = [
    "metal",
    "jazz",
    "pop",
    "Indie Rock",
    "electronic",
    "classical",
    "hip-hop",
    "ambient",
];

// Known tempos for a few tracks; the rest use the popularity heuristic.
const DEMO_TEMPOS: [(usize, f32); 4] = [(0, 172.0), (5, 92.0), (10, 128.0), (17, 128.0)];

/// Per-crystal record as a renderer would upload it.
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct InstanceData {
    pos: [f32; 3],
    scale: f32,
    color: [f32; 4],
    pulse: f32,
    emissive: f32,
    hover: f32,
    _pad: f32,
}

fn hue_to_rgb(h: f32) -> [f32; 3] {
    let k = |n: f32| {
        let k = (n + h * 6.0) % 6.0;
        1.0 - k.min(4.0 - k).clamp(0.0, 1.0)
    };
    [k(5.0), k(3.0), k(1.0)]
}

fn demo_tracks() -> Vec<TrackRecord> {
    (0..TRACK_COUNT)
        .map(|i| {
            let mut t = TrackRecord::new(
                format!("demo-{i:02}"),
                DEMO_GENRES[i % DEMO_GENRES.len()],
                ((i * 41) % 100) as f32,
            );
            t.name = format!("Demo Track {}", i + 1);
            t.artist = format!("Artist {}", i % 5 + 1);
            t.album = (i % 3 == 0).then(|| format!("Album {}", i / 3 + 1));
            t.duration = TRACK_SECONDS as f32;
            t.color = hue_to_rgb(i as f32 / TRACK_COUNT as f32);
            t.size = 0.8 + (i % 4) as f32 * 0.15;
            t
        })
        .collect()
}

fn instance_data(cluster: &CrystalCluster<HeadlessMesh>) -> Vec<InstanceData> {
    cluster
        .objects()
        .iter()
        .zip(cluster.meshes())
        .map(|(o, m): (&CrystalObject, &HeadlessMesh)| InstanceData {
            pos: cluster.world_position(o.index).unwrap_or(o.position).to_array(),
            scale: m.scale,
            color: m.uniforms.color,
            pulse: o.pulse_value,
            emissive: o.emissive,
            hover: m.uniforms.hover,
            _pad: 0.0,
        })
        .collect()
}

fn log_event(ev: &ClusterEvent) {
    match ev {
        ClusterEvent::Clicked { id } => log::info!("[demo] clicked {id}"),
        ClusterEvent::SpectrumModeChanged { mode } => log::info!("[demo] spectrum mode {mode:?}"),
        other => log::debug!("[demo] {other:?}"),
    }
}

fn start_track(cluster: &mut CrystalCluster<HeadlessMesh>, index: usize) -> CaptureSource {
    let id = format!("demo-{:02}", index % TRACK_COUNT);
    let mut source = CaptureSource::new(&id, TRACK_SECONDS);
    cluster.on_play_start(&id, &mut source);
    source
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let frames = std::env::args()
        .nth(1)
        .map(|s| s.parse::<u64>())
        .transpose()
        .context("FRAMES must be a non-negative integer")?
        .unwrap_or(DEFAULT_FRAMES);

    let tracks = demo_tracks();
    let meshes: Vec<HeadlessMesh> = tracks.iter().map(|t| HeadlessMesh::new(0.9 * t.size)).collect();
    let mut cluster = CrystalCluster::build(tracks, meshes, ClusterConfig::default())
        .context("building demo cluster")?;
    for (i, bpm) in DEMO_TEMPOS {
        cluster.set_track_tempo(&format!("demo-{i:02}"), Some(bpm));
    }

    let camera = Camera::default();
    let mut playing = 3;
    let mut source = start_track(&mut cluster, playing);

    log::info!("[demo] running {frames} frames over {TRACK_COUNT} crystals");
    let start = Instant::now();
    let mut last = start;
    for frame in 0..frames {
        let now = Instant::now();
        let dt_ms = (now - last).as_secs_f32() * 1000.0;
        last = now;

        source.advance(dt_ms);
        if source.ended() {
            let finished = source.track_id().to_string();
            cluster.on_play_end(&finished, Some(&mut source));
            playing += 1;
            source = start_track(&mut cluster, playing);
        }

        let angle = frame as f32 * 0.01;
        cluster.pointer_move(Vec2::new(0.45 * angle.cos(), 0.3 * angle.sin()));
        if frame > 0 && frame % CLICK_EVERY_FRAMES == 0 {
            // corner of the screen: background
            cluster.pointer_click(Vec2::new(0.97, -0.97), &camera, false);
        }

        cluster.update(FrameInput {
            dt_ms,
            camera: &camera,
            focus_animating: false,
            audio: Some(&mut source),
        });
        for ev in cluster.drain_events() {
            log_event(&ev);
        }

        if frame % STATS_EVERY_FRAMES == 0 {
            let stats = cluster.pulse_stats();
            let levels = cluster.spectrum_levels();
            let instances = instance_data(&cluster);
            let bytes: &[u8] = bytemuck::cast_slice(&instances);
            log::info!(
                "[demo] t={:.1}s speed={:.3} rad/s pulse avg={:.2}Hz groups={} bass={:.2} mid={:.2} treble={:.2} fallback={} hovered={} instances={}B",
                start.elapsed().as_secs_f32(),
                cluster.rotation_speed(),
                stats.avg_speed,
                stats.sync_groups,
                levels.bass,
                levels.mid,
                levels.treble,
                cluster.is_using_fallback(),
                cluster.hovered_object().map_or("-", |o| o.id.as_str()),
                bytes.len(),
            );
        }

        if let Some(rest) = FRAME_TIME.checked_sub(now.elapsed()) {
            thread::sleep(rest);
        }
    }

    cluster.dispose(Some(&mut source));
    log::info!("[demo] done after {:.1}s", start.elapsed().as_secs_f32());
    Ok(())
}
