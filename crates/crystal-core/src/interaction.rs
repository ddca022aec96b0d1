//! Pointer hover and focus state for crystals.
//!
//! Pointer moves are coalesced and hit-tested at most `max_rate_hz` times per
//! second, and only against crystals whose bounding sphere survives the
//! frustum test. At most one crystal is hovered; focus is set from outside.

use crate::constants::{
    BASE_EMISSIVE, EMISSIVE_CEILING, HOVER_AMPLITUDE_BOOST, HOVER_DURATION_MS,
    HOVER_EMISSIVE_BOOST, HOVER_MAX_RATE_HZ, HOVER_SCALE,
};
use crate::events::ClusterEvent;
use crate::input::{ray_sphere, ScaleTween};
use crate::state::Camera;
use crate::track::CrystalObject;
use glam::{Vec2, Vec3};

const RATE_LIMIT_SLACK_MS: f64 = 1e-3;

#[derive(Clone, Debug, PartialEq)]
pub struct HoverConfig {
    pub max_rate_hz: f32,
    pub hover_scale: f32,
    pub duration_ms: f32,
    pub base_emissive: f32,
    pub emissive_boost: f32,
    pub emissive_ceiling: f32,
    pub amplitude_boost: f32,
}

impl Default for HoverConfig {
    fn default() -> Self {
        Self {
            max_rate_hz: HOVER_MAX_RATE_HZ,
            hover_scale: HOVER_SCALE,
            duration_ms: HOVER_DURATION_MS,
            base_emissive: BASE_EMISSIVE,
            emissive_boost: HOVER_EMISSIVE_BOOST,
            emissive_ceiling: EMISSIVE_CEILING,
            amplitude_boost: HOVER_AMPLITUDE_BOOST,
        }
    }
}

impl HoverConfig {
    pub(crate) fn check(&self) -> Result<(), String> {
        if !(self.max_rate_hz > 0.0) {
            return Err(format!("hover max_rate_hz must be > 0, got {}", self.max_rate_hz));
        }
        if !(self.duration_ms >= 0.0 && self.hover_scale > 0.0) {
            return Err("hover duration must be >= 0 and scale > 0".into());
        }
        if !(self.emissive_ceiling >= self.base_emissive) {
            return Err("emissive_ceiling must be >= base_emissive".into());
        }
        Ok(())
    }

    /// Minimum time between two hit-tests.
    pub fn interval_ms(&self) -> f64 {
        1000.0 / self.max_rate_hz as f64
    }
}

/// World-space bounding sphere of one crystal.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PickTarget {
    pub center: Vec3,
    pub radius: f32,
}

/// Index of the nearest crystal hit by the pointer ray, ignoring crystals
/// outside the view frustum.
pub fn pick_nearest(camera: &Camera, ndc: Vec2, targets: &[PickTarget]) -> Option<usize> {
    let ray = camera.ray_from_ndc(ndc);
    let frustum = camera.frustum();
    targets
        .iter()
        .enumerate()
        .filter(|(_, t)| frustum.contains_sphere(t.center, t.radius))
        .filter_map(|(i, t)| ray_sphere(ray.origin, ray.dir, t.center, t.radius).map(|d| (i, d)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
}

pub struct HoverController {
    cfg: HoverConfig,
    hovered: Option<usize>,
    pending: Option<Vec2>,
    last_eval_ms: Option<f64>,
    tweens: Vec<Option<ScaleTween>>,
}

impl HoverController {
    pub fn new(cfg: HoverConfig, count: usize) -> Self {
        Self {
            cfg,
            hovered: None,
            pending: None,
            last_eval_ms: None,
            tweens: vec![None; count],
        }
    }

    pub fn config(&self) -> &HoverConfig {
        &self.cfg
    }

    pub fn hovered(&self) -> Option<usize> {
        self.hovered
    }

    /// Record the latest pointer position; earlier unprocessed moves are
    /// dropped.
    pub fn pointer_move(&mut self, ndc: Vec2) {
        self.pending = Some(ndc);
    }

    pub fn has_pending_move(&self) -> bool {
        self.pending.is_some()
    }

    /// Run animations and, if the rate limit allows, resolve the pending
    /// pointer position. While the camera animates a focus transition no
    /// hit-testing or hover change happens.
    pub fn update(
        &mut self,
        now_ms: f64,
        objects: &mut [CrystalObject],
        targets: &[PickTarget],
        camera: &Camera,
        focus_animating: bool,
        events: &mut Vec<ClusterEvent>,
    ) {
        self.advance_tweens(now_ms, objects);
        if focus_animating {
            return;
        }
        let Some(ndc) = self.pending else {
            return;
        };
        if let Some(last) = self.last_eval_ms {
            // frame deltas arrive as f32; tolerate their rounding
            if now_ms - last + RATE_LIMIT_SLACK_MS < self.cfg.interval_ms() {
                return;
            }
        }
        self.pending = None;
        self.last_eval_ms = Some(now_ms);
        let hit = pick_nearest(camera, ndc, targets);
        self.set_hovered(hit, now_ms, objects, events);
    }

    /// Move hover to `next`, exiting the previous crystal first.
    pub fn set_hovered(
        &mut self,
        next: Option<usize>,
        now_ms: f64,
        objects: &mut [CrystalObject],
        events: &mut Vec<ClusterEvent>,
    ) {
        if next == self.hovered {
            return;
        }
        if let Some(prev) = self.hovered.take() {
            self.exit(prev, now_ms, objects, events);
        }
        if let Some(i) = next {
            if i < objects.len() {
                self.enter(i, now_ms, objects, events);
            } else {
                log::warn!("[hover] ignoring out-of-range crystal {i}");
            }
        }
    }

    fn enter(&mut self, i: usize, now_ms: f64, objects: &mut [CrystalObject], events: &mut Vec<ClusterEvent>) {
        let obj = &mut objects[i];
        obj.is_hovered = true;
        obj.emissive = (self.cfg.base_emissive * self.cfg.emissive_boost).min(self.cfg.emissive_ceiling);
        obj.amplitude_boost = self.cfg.amplitude_boost;
        let from = obj.hover_scale;
        events.push(ClusterEvent::HoverEnter { id: obj.id.clone() });
        self.start_tween(i, from, self.cfg.hover_scale, now_ms);
        self.hovered = Some(i);
        log::debug!("[hover] enter {}", objects[i].id);
    }

    fn exit(&mut self, i: usize, now_ms: f64, objects: &mut [CrystalObject], events: &mut Vec<ClusterEvent>) {
        let Some(obj) = objects.get_mut(i) else {
            return;
        };
        obj.is_hovered = false;
        obj.emissive = self.cfg.base_emissive;
        obj.amplitude_boost = 1.0;
        let from = obj.hover_scale;
        events.push(ClusterEvent::HoverExit { id: obj.id.clone() });
        self.start_tween(i, from, 1.0, now_ms);
        log::debug!("[hover] exit {}", objects[i].id);
    }

    // Replaces any tween already running on this crystal.
    fn start_tween(&mut self, i: usize, from: f32, to: f32, now_ms: f64) {
        if i >= self.tweens.len() {
            self.tweens.resize(i + 1, None);
        }
        self.tweens[i] = Some(ScaleTween::new(from, to, now_ms, self.cfg.duration_ms));
    }

    fn advance_tweens(&mut self, now_ms: f64, objects: &mut [CrystalObject]) {
        for (slot, obj) in self.tweens.iter_mut().zip(objects.iter_mut()) {
            if let Some(tw) = *slot {
                let (v, done) = tw.sample(now_ms);
                obj.hover_scale = v;
                if done {
                    *slot = None;
                }
            }
        }
    }

    pub fn is_animating(&self, i: usize) -> bool {
        self.tweens.get(i).is_some_and(|t| t.is_some())
    }

    /// Returns `true` if the focus flag changed.
    pub fn set_focused(
        &mut self,
        objects: &mut [CrystalObject],
        i: usize,
        focused: bool,
        events: &mut Vec<ClusterEvent>,
    ) -> bool {
        let Some(obj) = objects.get_mut(i) else {
            log::warn!("[hover] focus on out-of-range crystal {i}");
            return false;
        };
        if obj.is_focused == focused {
            return false;
        }
        obj.is_focused = focused;
        events.push(ClusterEvent::FocusChanged {
            id: obj.id.clone(),
            focused,
        });
        true
    }

    /// Exit any hover and forget pending pointer input.
    pub fn clear(&mut self, now_ms: f64, objects: &mut [CrystalObject], events: &mut Vec<ClusterEvent>) {
        self.pending = None;
        self.set_hovered(None, now_ms, objects, events);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(x: f32, z: f32) -> PickTarget {
        PickTarget {
            center: Vec3::new(x, 0.0, z),
            radius: 1.0,
        }
    }

    #[test]
    fn pick_prefers_the_nearest_overlapping_sphere() {
        let cam = Camera::default();
        let targets = [target(0.0, -5.0), target(0.0, 5.0), target(8.0, 0.0)];
        assert_eq!(pick_nearest(&cam, Vec2::ZERO, &targets), Some(1));
    }

    #[test]
    fn pick_skips_culled_spheres() {
        let cam = Camera::default();
        // on the ray, but beyond the far plane
        let targets = [target(0.0, -175.0)];
        assert_eq!(pick_nearest(&cam, Vec2::ZERO, &targets), None);
    }

    #[test]
    fn interval_matches_rate() {
        let cfg = HoverConfig::default();
        assert!((cfg.interval_ms() - 1000.0 / 60.0).abs() < 1e-9);
    }
}
