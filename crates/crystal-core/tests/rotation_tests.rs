// Host-side tests for the rotation controller and its logical-clock
// scheduler.

use crystal_core::rotation::{RotationConfig, RotationController, RotationPhase};
use crystal_core::scheduler::Scheduler;
use crystal_core::ClusterEvent;
use std::f32::consts::TAU;

const FRAME_MS: f32 = 16.0;

fn controller() -> RotationController {
    RotationController::new(RotationConfig::default())
}

fn spin_down(r: &mut RotationController, events: &mut Vec<ClusterEvent>) {
    for _ in 0..200 {
        r.update(FRAME_MS, events);
    }
    assert_eq!(r.speed(), 0.0);
}

#[test]
fn audio_pause_decreases_strictly_then_holds() {
    let mut r = controller();
    let mut events = Vec::new();
    r.pause_for_audio();
    assert!(r.is_audio_paused());

    let mut last = r.speed();
    let mut ticks = 0;
    while r.speed() > 0.0 {
        r.update(FRAME_MS, &mut events);
        assert!(r.speed() < last, "speed did not drop at tick {ticks}");
        last = r.speed();
        ticks += 1;
        assert!(ticks < 1000);
    }
    let rot = r.rotation();
    for _ in 0..300 {
        r.update(FRAME_MS, &mut events);
        assert_eq!(r.speed(), 0.0);
    }
    assert_eq!(r.rotation(), rot);
    assert_eq!(r.phase(), RotationPhase::Paused);
    assert_eq!(events, vec![ClusterEvent::RotationStopped]);
}

#[test]
fn background_click_resumes_within_one_tick() {
    let cfg = RotationConfig::default();
    let mut r = controller();
    let mut events = Vec::new();
    r.pause_for_audio();
    spin_down(&mut r, &mut events);

    assert!(r.handle_click(false, false));
    assert_eq!(r.target_speed(), cfg.base_speed);
    r.update(FRAME_MS, &mut events);
    assert!(r.speed() > 0.0);
    assert_eq!(r.phase(), RotationPhase::Accelerating);
    assert_eq!(events.last(), Some(&ClusterEvent::RotationStarted));
    assert!(!r.is_audio_paused());
}

#[test]
fn clicks_on_crystals_or_during_zoom_do_not_resume() {
    let mut r = controller();
    let mut events = Vec::new();
    r.pause_for_audio();
    spin_down(&mut r, &mut events);
    assert!(!r.handle_click(true, false));
    assert!(!r.handle_click(false, true));
    assert!(!r.handle_click(true, true));
    r.update(FRAME_MS, &mut events);
    assert_eq!(r.speed(), 0.0);
    assert!(r.is_paused());
}

#[test]
fn plain_pause_ignores_background_clicks() {
    let mut r = controller();
    r.pause();
    assert!(!r.handle_click(false, false));
    assert!(!r.resume_from_audio());
    assert!(r.is_paused());
}

#[test]
fn manual_pause_supersedes_audio_hooks() {
    let mut r = controller();
    let mut events = Vec::new();
    r.pause_for_audio();
    r.pause();
    assert!(!r.is_audio_paused());
    assert!(!r.handle_click(false, false));
    assert!(!r.handle_playback_finished());
    assert!(!r.resume_from_audio());
    spin_down(&mut r, &mut events);
    assert!(r.is_paused());
}

#[test]
fn delayed_pause_supersedes_audio_hooks() {
    let cfg = RotationConfig::default();
    let mut r = controller();
    let mut events = Vec::new();
    r.pause_for_audio();
    r.pause_with_delay(800.0);
    assert!(!r.handle_click(false, false));
    assert!(!r.handle_playback_finished());
    r.update(500.0, &mut events);
    assert!(r.is_paused());
    // only the timer resumes
    r.update(300.0, &mut events);
    assert!(!r.is_paused());
    assert_eq!(r.target_speed(), cfg.base_speed);
}

#[test]
fn audio_pause_after_manual_pause_arms_hooks() {
    let mut r = controller();
    r.pause();
    r.pause_for_audio();
    assert!(r.is_audio_paused());
    assert!(r.handle_click(false, false));
    assert!(!r.is_paused());
}

#[test]
fn playback_end_resumes_once() {
    let cfg = RotationConfig::default();
    let mut r = controller();
    let mut events = Vec::new();
    r.pause_for_audio();
    spin_down(&mut r, &mut events);
    assert!(r.handle_playback_finished());
    assert!(!r.handle_playback_finished());
    assert_eq!(r.target_speed(), cfg.base_speed);
    for _ in 0..200 {
        r.update(FRAME_MS, &mut events);
    }
    assert_eq!(r.phase(), RotationPhase::Running(cfg.base_speed));
}

#[test]
fn resume_from_audio_releases_the_gate() {
    let mut r = controller();
    r.pause_for_audio();
    assert!(r.resume_from_audio());
    assert!(!r.is_paused());
    assert!(!r.handle_click(false, false));
}

#[test]
fn delayed_resume_fires_after_the_delay() {
    let cfg = RotationConfig::default();
    let mut r = controller();
    let mut events = Vec::new();
    r.pause_with_delay(500.0);
    r.update(400.0, &mut events);
    assert!(r.is_paused());
    assert_eq!(r.target_speed(), 0.0);

    r.update(100.0, &mut events);
    assert!(!r.is_paused());
    assert!(!r.has_pending_resume());
    assert_eq!(r.target_speed(), cfg.base_speed);
}

#[test]
fn a_second_delayed_pause_replaces_the_first() {
    let mut r = controller();
    let mut events = Vec::new();
    r.pause_with_delay(100.0);
    r.pause_with_delay(1000.0);
    r.update(500.0, &mut events);
    assert!(r.is_paused());
    r.update(600.0, &mut events);
    assert!(!r.is_paused());
}

#[test]
fn ramp_is_linear_in_both_directions() {
    let cfg = RotationConfig::default();
    let mut r = controller();
    let mut events = Vec::new();
    r.pause();
    r.update(100.0, &mut events);
    let expected = cfg.base_speed - cfg.ramp_per_ms * 100.0;
    assert!((r.speed() - expected).abs() < 1e-6);

    r.resume();
    r.update(50.0, &mut events);
    let expected = expected + cfg.ramp_per_ms * 50.0;
    assert!((r.speed() - expected).abs() < 1e-6);
    // never overshoots
    r.update(10_000.0, &mut events);
    assert_eq!(r.speed(), cfg.base_speed);
}

#[test]
fn angles_wrap_to_a_full_turn() {
    let mut r = controller();
    let mut events = Vec::new();
    for _ in 0..200 {
        r.update(1000.0, &mut events);
    }
    let rot = r.rotation();
    assert!(rot.y >= 0.0 && rot.y < TAU);
    assert!(rot.x >= 0.0 && rot.x < TAU);
    assert!(events.is_empty());
}

#[test]
fn dispose_drops_hooks_and_timers() {
    let mut r = controller();
    let mut events = Vec::new();
    r.pause_for_audio();
    r.pause_with_delay(100.0);
    r.dispose();
    assert!(!r.handle_click(false, false));
    assert!(!r.handle_playback_finished());
    r.update(1000.0, &mut events);
    assert!(r.is_paused());

    r.reset();
    assert_eq!(r.phase(), RotationPhase::Running(RotationConfig::default().base_speed));
}

#[test]
fn transform_follows_orientation() {
    let mut r = controller();
    let mut events = Vec::new();
    let p = glam::Vec3::new(3.0, 1.0, -2.0);
    assert!((r.transform_point(p) - p).length() < 1e-6);
    r.update(2000.0, &mut events);
    let moved = r.transform_point(p);
    assert!((moved.length() - p.length()).abs() < 1e-4);
    assert!((moved - p).length() > 1e-3);
}

#[test]
fn scheduler_cancel_and_clear() {
    let mut s: Scheduler<u32> = Scheduler::new();
    let a = s.schedule(10.0, 1);
    let b = s.schedule(20.0, 2);
    assert!(s.cancel(a));
    assert!(!s.cancel(a));
    assert!(s.is_pending(b));
    assert_eq!(s.advance(25.0), vec![2]);
    assert!(!s.is_pending(b));
    s.schedule(5.0, 3);
    s.clear();
    assert!(s.advance(100.0).is_empty());
    assert_eq!(s.now_ms(), 125.0);
}
