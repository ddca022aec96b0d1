// Host-side tests for the spectrum analyzer and its procedural fallback.

mod common;

use common::ScriptedSource;
use crystal_core::spectrum::{
    analyze_bins, band_averages, FallbackGenerator, SpectrumAnalyzer, SpectrumConfig,
    SpectrumLevels, SpectrumMode,
};

const FRAME_MS: f32 = 1000.0 / 60.0;

fn analyzer() -> SpectrumAnalyzer {
    SpectrumAnalyzer::new(SpectrumConfig::default(), 42)
}

fn run(a: &mut SpectrumAnalyzer, src: &mut ScriptedSource, frames: usize) -> SpectrumLevels {
    let mut levels = SpectrumLevels::ZERO;
    for _ in 0..frames {
        src.advance(FRAME_MS);
        levels = a.update(Some(&mut *src), FRAME_MS);
    }
    levels
}

fn assert_sane(l: SpectrumLevels) {
    for v in [l.bass, l.mid, l.treble] {
        assert!(v.is_finite() && (0.0..=1.0).contains(&v), "level {v} out of range");
    }
}

#[test]
fn silent_source_switches_to_fallback_after_window() {
    let mut a = analyzer();
    let mut src = ScriptedSource::live(1024, 0);
    assert_eq!(a.connect(&mut src), SpectrumMode::Live);

    run(&mut a, &mut src, 30);
    assert_eq!(a.mode(), SpectrumMode::Live, "half a window is not enough");
    assert_eq!(a.levels(), SpectrumLevels::ZERO);

    run(&mut a, &mut src, 31);
    assert!(a.is_using_fallback());

    let levels = run(&mut a, &mut src, 120);
    assert!(a.is_using_fallback());
    assert_sane(levels);
    assert!(levels.bass > 0.0);
}

#[test]
fn any_signal_resets_the_silence_window() {
    let mut a = analyzer();
    let mut src = ScriptedSource::live(256, 0);
    a.connect(&mut src);
    for round in 0..5 {
        run(&mut a, &mut src, 50);
        src.fill = 10;
        run(&mut a, &mut src, 1);
        src.fill = 0;
        assert_eq!(a.mode(), SpectrumMode::Live, "round {round}");
    }
}

#[test]
fn failed_taps_fall_back_without_error() {
    let mut a = analyzer();
    let mut src = ScriptedSource::untappable();
    assert_eq!(a.connect(&mut src), SpectrumMode::Fallback);
    assert_eq!(src.stream_attempts, 1);
    assert!(a.is_connected());
    assert_sane(run(&mut a, &mut src, 10));
    assert_eq!(src.reads, 0);
}

#[test]
fn stream_tap_is_the_second_attempt() {
    let mut a = analyzer();
    let mut src = ScriptedSource {
        direct_ok: false,
        stream_ok: true,
        ..ScriptedSource::live(512, 200)
    };
    assert_eq!(a.connect(&mut src), SpectrumMode::Live);
    assert_eq!(src.stream_attempts, 1);
}

#[test]
fn source_without_analyser_uses_fallback() {
    let mut a = analyzer();
    let mut src = ScriptedSource {
        bins: None,
        ..ScriptedSource::live(0, 0)
    };
    assert_eq!(a.connect(&mut src), SpectrumMode::Fallback);
}

#[test]
fn read_failure_switches_to_fallback() {
    let mut a = analyzer();
    let mut src = ScriptedSource::live(512, 128);
    a.connect(&mut src);
    run(&mut a, &mut src, 3);
    src.read_fails = true;
    let levels = run(&mut a, &mut src, 3);
    assert!(a.is_using_fallback());
    assert_sane(levels);
}

#[test]
fn live_levels_are_smoothed() {
    let cfg = SpectrumConfig::default();
    let mut a = analyzer();
    let mut src = ScriptedSource::live(1024, 255);
    a.connect(&mut src);
    let first = run(&mut a, &mut src, 1);
    assert!((first.bass - cfg.smoothing).abs() < 1e-5);
    let settled = run(&mut a, &mut src, 100);
    assert!(settled.bass > 0.99 && settled.mid > 0.99);
    // amplified top bands clamp at 1
    assert!(settled.treble <= 1.0 && settled.treble > 0.99);
    assert_eq!(a.pulse(), settled.bass);
}

#[test]
fn stopped_source_disconnects_and_zeroes() {
    let mut a = analyzer();
    let mut src = ScriptedSource::live(512, 180);
    a.connect(&mut src);
    run(&mut a, &mut src, 10);
    assert!(a.levels().bass > 0.0);

    src.paused = true;
    let levels = a.update(Some(&mut src), FRAME_MS);
    assert_eq!(levels, SpectrumLevels::ZERO);
    assert_eq!(a.mode(), SpectrumMode::Disconnected);
    assert_eq!(src.disconnects, 1);

    // nothing happens until the next connect
    src.paused = false;
    assert_eq!(a.update(Some(&mut src), FRAME_MS), SpectrumLevels::ZERO);
}

#[test]
fn ended_source_disconnects_fallback_too() {
    let mut a = analyzer();
    let mut src = ScriptedSource::untappable();
    a.connect(&mut src);
    run(&mut a, &mut src, 5);
    src.ended = true;
    a.update(Some(&mut src), FRAME_MS);
    assert!(!a.is_connected());
    assert!(!a.is_using_fallback());
}

#[test]
fn missing_source_keeps_levels() {
    let mut a = analyzer();
    let mut src = ScriptedSource::live(256, 90);
    a.connect(&mut src);
    let before = run(&mut a, &mut src, 5);
    assert_eq!(a.update(None, FRAME_MS), before);
}

#[test]
fn band_partition_follows_edges() {
    let mut bins = vec![0u8; 100];
    bins[..6].fill(255);
    let bands = band_averages(&bins, &SpectrumConfig::default().band_edges);
    assert_eq!(bands, [1.0, 0.0, 0.0, 0.0, 0.0]);

    let mut top = vec![0u8; 100];
    top[65..].fill(255);
    let levels = analyze_bins(&top, &SpectrumConfig::default());
    assert_eq!(levels.bass, 0.0);
    assert_eq!(levels.mid, 0.0);
    // (0 * 1.5 + 1 * 2.0) / 2
    assert!((levels.treble - 1.0).abs() < 1e-6);

    assert_eq!(band_averages(&[], &SpectrumConfig::default().band_edges), [0.0; 5]);
}

#[test]
fn fallback_tracks_volume_and_seed() {
    let mut a = FallbackGenerator::new(5, 0.04);
    let mut b = FallbackGenerator::new(5, 0.04);
    for i in 0..200 {
        let t = i as f64 * 0.05;
        let x = a.sample(t, 0.8, 50.0);
        let y = b.sample(t, 0.8, 50.0);
        assert_eq!(x, y);
        for v in [x.bass, x.mid, x.treble, x.pulse] {
            assert!((0.0..=1.0).contains(&v));
        }
    }

    let mut muted = FallbackGenerator::new(6, 0.04);
    for i in 0..100 {
        let s = muted.sample(i as f64 * 0.1, 0.0, 100.0);
        assert!(s.bass <= 0.04 + 1e-6 && s.treble <= 0.04 + 1e-6);
    }
}

#[test]
fn fallback_uses_own_clock_without_playback_time() {
    let mut g = FallbackGenerator::new(7, 0.0);
    let first = g.sample(0.0, 1.0, 100.0);
    let second = g.sample(f64::NAN, 1.0, 100.0);
    assert_ne!(first, second);
}
