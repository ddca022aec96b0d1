use glam::Vec3;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit length.
    pub dir: Vec3,
}

/// Distance along the ray to the first sphere hit in front of the origin.
#[inline]
pub fn ray_sphere(ray_origin: Vec3, ray_dir: Vec3, center: Vec3, radius: f32) -> Option<f32> {
    let oc = ray_origin - center;
    let b = oc.dot(ray_dir);
    let c = oc.dot(oc) - radius * radius;
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let t = -b - disc.sqrt();
    (t >= 0.0).then_some(t)
}

/// `1 - (1 - t)^3`, with `t` clamped to 0..=1.
#[inline]
pub fn ease_out_cubic(t: f32) -> f32 {
    let inv = 1.0 - t.clamp(0.0, 1.0);
    1.0 - inv * inv * inv
}

/// Eased scalar animation driven by the frame clock.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScaleTween {
    pub from: f32,
    pub to: f32,
    pub start_ms: f64,
    pub duration_ms: f32,
}

impl ScaleTween {
    pub fn new(from: f32, to: f32, start_ms: f64, duration_ms: f32) -> Self {
        Self {
            from,
            to,
            start_ms,
            duration_ms,
        }
    }

    /// Value at `now_ms` and whether the tween has finished.
    pub fn sample(&self, now_ms: f64) -> (f32, bool) {
        if self.duration_ms <= 0.0 {
            return (self.to, true);
        }
        let t = ((now_ms - self.start_ms) as f32 / self.duration_ms).clamp(0.0, 1.0);
        (self.from + (self.to - self.from) * ease_out_cubic(t), t >= 1.0)
    }
}
