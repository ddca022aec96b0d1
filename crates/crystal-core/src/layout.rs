//! Fibonacci-sphere placement of crystals.
//!
//! Each crystal gets a polar angle from an even-area spiral and a radius and
//! height jittered by the supplied RNG. Pass a seeded RNG for reproducible
//! layouts.

use crate::constants::{
    LAYOUT_BASE_RADIUS, LAYOUT_HEIGHT_VARIATION, LAYOUT_RADIUS_JITTER_MAX,
    LAYOUT_RADIUS_JITTER_MIN,
};
use glam::Vec3;
use rand::Rng;
use std::f32::consts::PI;

#[derive(Clone, Debug, PartialEq)]
pub struct LayoutConfig {
    pub base_radius: f32,
    pub height_variation: f32,
    pub radius_jitter: (f32, f32),
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            base_radius: LAYOUT_BASE_RADIUS,
            height_variation: LAYOUT_HEIGHT_VARIATION,
            radius_jitter: (LAYOUT_RADIUS_JITTER_MIN, LAYOUT_RADIUS_JITTER_MAX),
        }
    }
}

impl LayoutConfig {
    pub(crate) fn check(&self) -> Result<(), String> {
        let (lo, hi) = self.radius_jitter;
        if !(self.base_radius > 0.0) {
            return Err(format!("base_radius must be > 0, got {}", self.base_radius));
        }
        if !(lo > 0.0 && lo <= hi) {
            return Err(format!("radius_jitter must satisfy 0 < min <= max, got ({lo}, {hi})"));
        }
        if !(self.height_variation >= 0.0) {
            return Err("height_variation must be >= 0".into());
        }
        Ok(())
    }
}

/// Position of crystal `index` out of `track_count`.
///
/// `phi = acos(1 - 2i/n)`, `theta = sqrt(n * PI) * phi`, using the
/// `r sin(phi) sin(theta), r cos(phi), r sin(phi) cos(theta)` spherical
/// convention with an extra vertical offset.
pub fn fibonacci_position<R: Rng + ?Sized>(
    track_count: usize,
    index: usize,
    cfg: &LayoutConfig,
    rng: &mut R,
) -> Vec3 {
    let n = track_count.max(1) as f32;
    let i = index.min(track_count.saturating_sub(1)) as f32;
    let phi = (1.0 - 2.0 * i / n).clamp(-1.0, 1.0).acos();
    let theta = (n * PI).sqrt() * phi;

    let (lo, hi) = cfg.radius_jitter;
    let radius = cfg.base_radius * sample_range(rng, lo, hi);
    let half = cfg.height_variation * 0.5;
    let y_offset = sample_range(rng, -half, half);

    let sin_phi = phi.sin();
    Vec3::new(
        radius * sin_phi * theta.sin(),
        radius * phi.cos() + y_offset,
        radius * sin_phi * theta.cos(),
    )
}

/// Positions for a whole cluster, in index order.
pub fn layout_cluster<R: Rng + ?Sized>(count: usize, cfg: &LayoutConfig, rng: &mut R) -> Vec<Vec3> {
    let positions: Vec<Vec3> = (0..count)
        .map(|i| fibonacci_position(count, i, cfg, rng))
        .collect();
    log::debug!("[layout] placed {} crystals, r={:.1}", count, cfg.base_radius);
    positions
}

#[inline]
fn sample_range<R: Rng + ?Sized>(rng: &mut R, lo: f32, hi: f32) -> f32 {
    if hi > lo {
        rng.gen_range(lo..hi)
    } else {
        lo
    }
}
