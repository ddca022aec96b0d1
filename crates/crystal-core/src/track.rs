use crate::constants::{BASE_EMISSIVE, DEFAULT_CRYSTAL_SIZE, UNKNOWN_GENRE};
use glam::Vec3;

/// Track metadata as delivered by the track-list collaborator.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackRecord {
    pub id: String,
    pub name: String,
    pub artist: String,
    pub album: Option<String>,
    pub genre: String,
    /// Seconds.
    pub duration: f32,
    /// 0..=100.
    pub popularity: f32,
    pub color: [f32; 3],
    pub size: f32,
}

impl TrackRecord {
    pub fn new(id: impl Into<String>, genre: impl Into<String>, popularity: f32) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            artist: String::new(),
            album: None,
            genre: genre.into(),
            duration: 0.0,
            popularity,
            color: [1.0, 1.0, 1.0],
            size: DEFAULT_CRYSTAL_SIZE,
        }
    }

    /// Copy with out-of-range numbers clamped instead of rejected.
    pub fn sanitized(&self) -> Self {
        let mut t = self.clone();
        t.popularity = finite_or(self.popularity, 0.0).clamp(0.0, 100.0);
        t.duration = finite_or(self.duration, 0.0).max(0.0);
        t.size = if self.size.is_finite() && self.size > 0.0 {
            self.size
        } else {
            DEFAULT_CRYSTAL_SIZE
        };
        t.color = self.color.map(|c| finite_or(c, 1.0).clamp(0.0, 1.0));
        if self.genre.trim().is_empty() {
            t.genre = UNKNOWN_GENRE.to_string();
        }
        if t != *self {
            log::debug!("[track] clamped malformed fields on `{}`", self.id);
        }
        t
    }
}

#[inline]
fn finite_or(v: f32, fallback: f32) -> f32 {
    if v.is_finite() {
        v
    } else {
        fallback
    }
}

/// Per-track visual entity. Every component reads and writes its own slice of
/// these fields; the cluster owns the storage.
#[derive(Clone, Debug)]
pub struct CrystalObject {
    pub id: String,
    pub index: usize,
    /// Cluster-local position from the layout pass.
    pub position: Vec3,
    pub distance_from_center: f32,
    pub base_scale: f32,
    pub color: [f32; 3],

    // pulsation
    pub pulse_speed: f32,
    pub pulse_amplitude: f32,
    pub pulse_phase: f32,
    pub sharpness: f32,
    pub bpm: Option<f32>,
    pub estimated_bpm: f32,
    pub pulse_value: f32,

    // interaction
    pub is_hovered: bool,
    pub is_focused: bool,
    pub emissive: f32,
    pub amplitude_boost: f32,
    pub hover_scale: f32,
}

impl CrystalObject {
    pub fn new(index: usize, track: &TrackRecord, position: Vec3) -> Self {
        Self {
            id: track.id.clone(),
            index,
            position,
            distance_from_center: position.length(),
            base_scale: track.size,
            color: track.color,
            pulse_speed: 0.0,
            pulse_amplitude: 0.0,
            pulse_phase: 0.0,
            sharpness: 1.0,
            bpm: None,
            estimated_bpm: 0.0,
            pulse_value: 0.0,
            is_hovered: false,
            is_focused: false,
            emissive: BASE_EMISSIVE,
            amplitude_boost: 1.0,
            hover_scale: 1.0,
        }
    }

    /// Amplitude after the hover boost, capped at `max_amplitude`.
    #[inline]
    pub fn effective_amplitude(&self, max_amplitude: f32) -> f32 {
        (self.pulse_amplitude * self.amplitude_boost).min(max_amplitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitized_clamps_bad_numbers() {
        let mut t = TrackRecord::new("a", "  ", 140.0);
        t.duration = -3.0;
        t.size = f32::NAN;
        t.color = [2.0, -1.0, f32::INFINITY];
        let s = t.sanitized();
        assert_eq!(s.popularity, 100.0);
        assert_eq!(s.duration, 0.0);
        assert_eq!(s.size, DEFAULT_CRYSTAL_SIZE);
        assert_eq!(s.color, [1.0, 0.0, 1.0]);
        assert_eq!(s.genre, UNKNOWN_GENRE);
    }

    #[test]
    fn sanitized_keeps_valid_records() {
        let t = TrackRecord::new("b", "Jazz", 42.0);
        assert_eq!(t.sanitized(), t);
    }
}
