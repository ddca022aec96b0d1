//! Cluster spin with ramped speed changes.
//!
//! The actual angular velocity always moves linearly toward a target, so
//! pausing and resuming read as a slow-down and a spin-up. Pauses can be
//! plain, audio-gated (released by a background click or by playback
//! finishing) or timed.

use crate::constants::{ROTATION_BASE_SPEED, ROTATION_RAMP_PER_MS, ROTATION_SECONDARY_AXIS_RATE};
use crate::events::ClusterEvent;
use crate::scheduler::{Scheduler, TaskHandle};
use glam::{EulerRot, Quat, Vec2, Vec3};
use std::f32::consts::TAU;

#[derive(Clone, Debug, PartialEq)]
pub struct RotationConfig {
    /// Radians per second around Y while running.
    pub base_speed: f32,
    /// Maximum change of angular velocity, (radians per second) per millisecond.
    pub ramp_per_ms: f32,
    /// X-axis rate as a fraction of the Y rate.
    pub secondary_axis_rate: f32,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            base_speed: ROTATION_BASE_SPEED,
            ramp_per_ms: ROTATION_RAMP_PER_MS,
            secondary_axis_rate: ROTATION_SECONDARY_AXIS_RATE,
        }
    }
}

impl RotationConfig {
    pub(crate) fn check(&self) -> Result<(), String> {
        if !(self.base_speed >= 0.0 && self.base_speed.is_finite()) {
            return Err(format!("rotation base_speed must be >= 0, got {}", self.base_speed));
        }
        if !(self.ramp_per_ms > 0.0 && self.ramp_per_ms.is_finite()) {
            return Err(format!("rotation ramp_per_ms must be > 0, got {}", self.ramp_per_ms));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RotationPhase {
    Running(f32),
    Decelerating,
    Paused,
    Accelerating,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RotationTask {
    Resume,
}

pub struct RotationController {
    cfg: RotationConfig,
    speed: f32,
    target: f32,
    rotation: Vec2,
    paused: bool,
    audio_gated: bool,
    resume_on_click: bool,
    resume_on_playback_end: bool,
    pending_resume: Option<TaskHandle>,
    scheduler: Scheduler<RotationTask>,
}

impl RotationController {
    pub fn new(cfg: RotationConfig) -> Self {
        let base = cfg.base_speed;
        Self {
            cfg,
            speed: base,
            target: base,
            rotation: Vec2::ZERO,
            paused: false,
            audio_gated: false,
            resume_on_click: false,
            resume_on_playback_end: false,
            pending_resume: None,
            scheduler: Scheduler::new(),
        }
    }

    /// Pause until resumed. Supersedes any earlier pause, so pending
    /// auto-resume timers and audio click/playback hooks are dropped.
    pub fn pause(&mut self) {
        self.cancel_pending_resume();
        self.audio_gated = false;
        self.resume_on_click = false;
        self.resume_on_playback_end = false;
        self.paused = true;
        self.target = 0.0;
        log::debug!("[rotation] pause");
    }

    pub fn resume(&mut self) {
        self.cancel_pending_resume();
        self.paused = false;
        self.audio_gated = false;
        self.resume_on_click = false;
        self.resume_on_playback_end = false;
        self.target = self.cfg.base_speed;
        log::debug!("[rotation] resume -> {:.3} rad/s", self.target);
    }

    /// Pause while a track plays. Released by a click that misses every
    /// crystal (outside a camera zoom), by playback ending or failing, or by
    /// [`resume_from_audio`](Self::resume_from_audio).
    pub fn pause_for_audio(&mut self) {
        self.pause();
        self.audio_gated = true;
        self.resume_on_click = true;
        self.resume_on_playback_end = true;
        log::info!("[rotation] paused for audio");
    }

    /// Returns `true` if an audio-gated pause was lifted.
    pub fn resume_from_audio(&mut self) -> bool {
        if !self.audio_gated {
            return false;
        }
        self.resume();
        true
    }

    /// Pause and schedule an automatic resume. A later pause cancels it.
    pub fn pause_with_delay(&mut self, delay_ms: f32) -> TaskHandle {
        self.pause();
        let handle = self.scheduler.schedule(delay_ms, RotationTask::Resume);
        self.pending_resume = Some(handle);
        log::debug!("[rotation] auto-resume in {delay_ms:.0} ms");
        handle
    }

    /// Background-click hook. Returns `true` if the click resumed rotation.
    pub fn handle_click(&mut self, hit_crystal: bool, zoom_in_progress: bool) -> bool {
        if !self.resume_on_click || hit_crystal || zoom_in_progress {
            return false;
        }
        log::info!("[rotation] background click, resuming");
        self.resume();
        true
    }

    /// Playback ended/error hook. Fires at most once per audio pause.
    pub fn handle_playback_finished(&mut self) -> bool {
        if !self.resume_on_playback_end {
            return false;
        }
        log::info!("[rotation] playback finished, resuming");
        self.resume();
        true
    }

    pub fn update(&mut self, dt_ms: f32, events: &mut Vec<ClusterEvent>) {
        let dt_ms = dt_ms.max(0.0);
        for task in self.scheduler.advance(dt_ms) {
            match task {
                RotationTask::Resume => {
                    self.pending_resume = None;
                    self.resume();
                }
            }
        }

        let was_moving = self.speed > 0.0;
        let step = self.cfg.ramp_per_ms * dt_ms;
        if self.speed < self.target {
            self.speed = (self.speed + step).min(self.target);
        } else if self.speed > self.target {
            self.speed = (self.speed - step).max(self.target);
        }
        let moving = self.speed > 0.0;
        if was_moving && !moving {
            events.push(ClusterEvent::RotationStopped);
        } else if !was_moving && moving {
            events.push(ClusterEvent::RotationStarted);
        }

        if moving {
            let dt_sec = dt_ms / 1000.0;
            self.rotation.y = (self.rotation.y + self.speed * dt_sec).rem_euclid(TAU);
            self.rotation.x =
                (self.rotation.x + self.cfg.secondary_axis_rate * self.speed * dt_sec).rem_euclid(TAU);
        }
    }

    fn cancel_pending_resume(&mut self) {
        if let Some(h) = self.pending_resume.take() {
            self.scheduler.cancel(h);
        }
    }

    pub fn phase(&self) -> RotationPhase {
        if self.speed == self.target {
            if self.target == 0.0 {
                RotationPhase::Paused
            } else {
                RotationPhase::Running(self.speed)
            }
        } else if self.speed > self.target {
            RotationPhase::Decelerating
        } else {
            RotationPhase::Accelerating
        }
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn target_speed(&self) -> f32 {
        self.target
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_audio_paused(&self) -> bool {
        self.audio_gated
    }

    pub fn has_pending_resume(&self) -> bool {
        self.pending_resume.is_some()
    }

    /// Euler angles (x, y) in radians.
    pub fn rotation(&self) -> Vec2 {
        self.rotation
    }

    pub fn orientation(&self) -> Quat {
        Quat::from_euler(EulerRot::XYZ, self.rotation.x, self.rotation.y, 0.0)
    }

    pub fn transform_point(&self, local: Vec3) -> Vec3 {
        self.orientation() * local
    }

    /// Back to the just-built state: spinning at base speed, no pauses.
    pub fn reset(&mut self) {
        self.dispose();
        self.paused = false;
        self.audio_gated = false;
        self.speed = self.cfg.base_speed;
        self.target = self.cfg.base_speed;
        self.rotation = Vec2::ZERO;
    }

    /// Cancel timers and drop click/playback hooks.
    pub fn dispose(&mut self) {
        self.scheduler.clear();
        self.pending_resume = None;
        self.resume_on_click = false;
        self.resume_on_playback_end = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_running_at_base_speed() {
        let r = RotationController::new(RotationConfig::default());
        assert_eq!(r.phase(), RotationPhase::Running(ROTATION_BASE_SPEED));
        assert!(!r.is_paused());
    }

    #[test]
    fn pause_ramps_linearly() {
        let mut r = RotationController::new(RotationConfig::default());
        let mut ev = Vec::new();
        r.pause();
        r.update(10.0, &mut ev);
        let expected = ROTATION_BASE_SPEED - ROTATION_RAMP_PER_MS * 10.0;
        assert!((r.speed() - expected).abs() < 1e-6);
        assert_eq!(r.phase(), RotationPhase::Decelerating);
    }

    #[test]
    fn rotation_advances_secondary_axis_at_thirty_percent() {
        let mut r = RotationController::new(RotationConfig::default());
        let mut ev = Vec::new();
        r.update(100.0, &mut ev);
        let rot = r.rotation();
        assert!((rot.x / rot.y - ROTATION_SECONDARY_AXIS_RATE).abs() < 1e-4);
    }

    #[test]
    fn pause_cancels_pending_delayed_resume() {
        let mut r = RotationController::new(RotationConfig::default());
        let mut ev = Vec::new();
        r.pause_with_delay(100.0);
        assert!(r.has_pending_resume());
        r.pause();
        assert!(!r.has_pending_resume());
        r.update(500.0, &mut ev);
        assert!(r.is_paused());
        assert_eq!(r.target_speed(), 0.0);
    }
}
