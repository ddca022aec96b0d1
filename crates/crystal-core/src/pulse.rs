//! Per-crystal oscillators derived from tempo, popularity and genre.
//!
//! Crystals whose estimated tempo is close are put in a [`SyncGroup`] and
//! start from nearly the same phase, so related tracks throb together without
//! moving in exact lockstep.

use crate::constants::{
    AUDIO_REACTIVITY, BASE_PULSE_AMPLITUDE, ENERGY_AMPLITUDE_WEIGHT, MAX_PULSE_AMPLITUDE,
    MAX_PULSE_SPEED, MIN_PULSE_SPEED, POPULARITY_AMPLITUDE_WEIGHT, SCALE_PULSE_FRACTION,
    SECOND_HARMONIC_WEIGHT, SLOW_HARMONIC_WEIGHT, SYNC_BPM_THRESHOLD, SYNC_PHASE_JITTER,
};
use crate::spectrum::SpectrumLevels;
use crate::track::{CrystalObject, TrackRecord};
use rand::prelude::*;
use smallvec::SmallVec;
use std::f64::consts::TAU;

/// Genre-derived multipliers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GenreProfile {
    pub speed: f32,
    pub amplitude: f32,
    /// Values above 1 flatten the sine's shoulders into sharper peaks.
    pub sharpness: f32,
    /// 0..=1 heuristic intensity feeding the amplitude.
    pub energy: f32,
}

impl GenreProfile {
    pub const NEUTRAL: Self = Self::new(1.0, 1.0, 1.0, 0.5);

    pub const fn new(speed: f32, amplitude: f32, sharpness: f32, energy: f32) -> Self {
        Self {
            speed,
            amplitude,
            sharpness,
            energy,
        }
    }
}

const BUILTIN_GENRES: &[(&str, GenreProfile)] = &[
    ("metal", GenreProfile::new(1.2, 1.3, 1.4, 0.95)),
    ("rock", GenreProfile::new(1.1, 1.2, 1.2, 0.8)),
    ("punk", GenreProfile::new(1.25, 1.2, 1.3, 0.9)),
    ("electronic", GenreProfile::new(1.15, 1.1, 1.3, 0.85)),
    ("dance", GenreProfile::new(1.15, 1.1, 1.2, 0.85)),
    ("techno", GenreProfile::new(1.2, 1.1, 1.35, 0.9)),
    ("house", GenreProfile::new(1.1, 1.05, 1.2, 0.8)),
    ("hip-hop", GenreProfile::new(1.0, 1.1, 1.1, 0.7)),
    ("rap", GenreProfile::new(1.0, 1.1, 1.1, 0.7)),
    ("pop", GenreProfile::new(1.0, 1.0, 1.0, 0.6)),
    ("r&b", GenreProfile::new(0.9, 0.95, 0.9, 0.55)),
    ("soul", GenreProfile::new(0.9, 0.95, 0.9, 0.5)),
    ("indie", GenreProfile::new(0.95, 0.95, 1.0, 0.55)),
    ("folk", GenreProfile::new(0.85, 0.85, 0.8, 0.4)),
    ("jazz", GenreProfile::new(0.8, 0.9, 0.8, 0.45)),
    ("blues", GenreProfile::new(0.8, 0.9, 0.8, 0.45)),
    ("classical", GenreProfile::new(0.7, 0.7, 0.6, 0.3)),
    ("ambient", GenreProfile::new(0.6, 0.8, 0.5, 0.2)),
    ("soundtrack", GenreProfile::new(0.75, 0.85, 0.7, 0.4)),
];

/// Case-insensitive genre lookup: exact key first, then whole words
/// ("Heavy Metal" -> metal), then the first key contained in the genre
/// string ("synthpop" -> pop), then the default.
#[derive(Clone, Debug, PartialEq)]
pub struct GenreTable {
    entries: Vec<(String, GenreProfile)>,
    default: GenreProfile,
}

impl Default for GenreTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl GenreTable {
    pub fn builtin() -> Self {
        Self {
            entries: BUILTIN_GENRES
                .iter()
                .map(|(k, p)| (k.to_string(), *p))
                .collect(),
            default: GenreProfile::NEUTRAL,
        }
    }

    pub fn empty(default: GenreProfile) -> Self {
        Self {
            entries: Vec::new(),
            default,
        }
    }

    /// Add or replace a row.
    pub fn insert(&mut self, genre: &str, profile: GenreProfile) {
        let key = genre.trim().to_lowercase();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(row) => row.1 = profile,
            None => self.entries.push((key, profile)),
        }
    }

    pub fn lookup(&self, genre: &str) -> GenreProfile {
        let key = genre.trim().to_lowercase();
        if let Some((_, p)) = self.entries.iter().find(|(k, _)| *k == key) {
            return *p;
        }
        if let Some(p) = self.lookup_words(&key) {
            return p;
        }
        self.entries
            .iter()
            .find(|(k, _)| !k.is_empty() && key.contains(k.as_str()))
            .map(|(_, p)| *p)
            .unwrap_or(self.default)
    }

    // Whole-word match; the key ending last wins ("pop punk" -> punk).
    fn lookup_words(&self, key: &str) -> Option<GenreProfile> {
        let words = split_words(key);
        let mut best: Option<(usize, GenreProfile)> = None;
        for (k, p) in &self.entries {
            let kw = split_words(k);
            if kw.is_empty() || kw.len() > words.len() {
                continue;
            }
            let end = (kw.len()..=words.len())
                .rev()
                .find(|&end| words[end - kw.len()..end] == kw[..]);
            if let Some(end) = end {
                if best.map_or(true, |(e, _)| end > e) {
                    best = Some((end, *p));
                }
            }
        }
        best.map(|(_, p)| p)
    }

    pub fn default_profile(&self) -> GenreProfile {
        self.default
    }
}

fn split_words(s: &str) -> Vec<&str> {
    s.split(|c: char| c.is_whitespace() || c == '-')
        .filter(|w| !w.is_empty())
        .collect()
}

#[derive(Clone, Debug, PartialEq)]
pub struct PulseConfig {
    pub min_speed: f32,
    pub max_speed: f32,
    pub base_amplitude: f32,
    pub max_amplitude: f32,
    pub popularity_weight: f32,
    pub energy_weight: f32,
    pub sync_bpm_threshold: f32,
    pub sync_phase_jitter: f32,
    pub second_harmonic: f32,
    /// Adds a slow half-rate term to the waveform.
    pub slow_harmonic: bool,
    pub scale_pulse_fraction: f32,
    /// How strongly bass lifts the amplitude of the playing crystal.
    pub audio_reactivity: f32,
    pub genres: GenreTable,
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            min_speed: MIN_PULSE_SPEED,
            max_speed: MAX_PULSE_SPEED,
            base_amplitude: BASE_PULSE_AMPLITUDE,
            max_amplitude: MAX_PULSE_AMPLITUDE,
            popularity_weight: POPULARITY_AMPLITUDE_WEIGHT,
            energy_weight: ENERGY_AMPLITUDE_WEIGHT,
            sync_bpm_threshold: SYNC_BPM_THRESHOLD,
            sync_phase_jitter: SYNC_PHASE_JITTER,
            second_harmonic: SECOND_HARMONIC_WEIGHT,
            slow_harmonic: true,
            scale_pulse_fraction: SCALE_PULSE_FRACTION,
            audio_reactivity: AUDIO_REACTIVITY,
            genres: GenreTable::builtin(),
        }
    }
}

impl PulseConfig {
    pub(crate) fn check(&self) -> Result<(), String> {
        if !(self.min_speed > 0.0 && self.min_speed <= self.max_speed) {
            return Err(format!(
                "pulse speed range must satisfy 0 < min <= max, got {}..{}",
                self.min_speed, self.max_speed
            ));
        }
        if !(self.max_amplitude > 0.0 && self.max_amplitude <= 1.0) {
            return Err(format!("max_amplitude must be in (0, 1], got {}", self.max_amplitude));
        }
        if !(self.sync_bpm_threshold >= 0.0 && self.sync_phase_jitter >= 0.0) {
            return Err("sync threshold and jitter must be >= 0".into());
        }
        Ok(())
    }
}

/// Crystals sharing a tempo band. Built once per cluster.
#[derive(Clone, Debug, PartialEq)]
pub struct SyncGroup {
    pub anchor_bpm: f32,
    pub phase: f32,
    pub members: SmallVec<[usize; 8]>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PulseStats {
    pub object_count: usize,
    pub sync_groups: usize,
    pub synced_objects: usize,
    pub min_speed: f32,
    pub avg_speed: f32,
    pub max_speed: f32,
    pub avg_amplitude: f32,
    pub elapsed_sec: f64,
    pub speed_multiplier: f32,
    pub amplitude_multiplier: f32,
}

/// `sin(2π·speed·t + phase)`, sharpened and enriched with harmonics, in -1..=1.
pub fn pulse_value(
    speed: f32,
    phase: f32,
    sharpness: f32,
    t_sec: f64,
    second_harmonic: f32,
    slow_harmonic: bool,
) -> f32 {
    let arg = (TAU * speed as f64 * t_sec + phase as f64) as f32;
    let mut v = arg.sin();
    if sharpness > 1.0 {
        v = v.signum() * v.abs().powf(1.0 / sharpness);
    }
    v += (2.0 * arg).sin() * second_harmonic;
    if slow_harmonic {
        v += (0.5 * arg).sin() * SLOW_HARMONIC_WEIGHT;
    }
    v.clamp(-1.0, 1.0)
}

#[inline]
fn valid_bpm(bpm: Option<f32>) -> Option<f32> {
    bpm.filter(|b| b.is_finite() && *b > 0.0)
}

#[inline]
fn wrap_phase(p: f32) -> f32 {
    p.rem_euclid(std::f32::consts::TAU)
}

pub struct PulsationEngine {
    cfg: PulseConfig,
    rng: StdRng,
    groups: Vec<SyncGroup>,
    elapsed_sec: f64,
    speed_multiplier: f32,
    amplitude_multiplier: f32,
}

impl PulsationEngine {
    pub fn new(cfg: PulseConfig, seed: u64) -> Self {
        Self {
            cfg,
            rng: StdRng::seed_from_u64(seed),
            groups: Vec::new(),
            elapsed_sec: 0.0,
            speed_multiplier: 1.0,
            amplitude_multiplier: 1.0,
        }
    }

    pub fn config(&self) -> &PulseConfig {
        &self.cfg
    }

    /// Derive oscillator parameters for every crystal and build sync groups.
    /// `objects[i]` must belong to `tracks[i]`.
    pub fn initialize(&mut self, objects: &mut [CrystalObject], tracks: &[TrackRecord]) {
        self.elapsed_sec = 0.0;
        self.speed_multiplier = 1.0;
        self.amplitude_multiplier = 1.0;
        for (obj, track) in objects.iter_mut().zip(tracks) {
            self.set_from_tempo(obj, track, None);
            obj.pulse_phase = self.rng.gen_range(0.0..std::f32::consts::TAU);
            obj.pulse_value = 0.0;
        }
        self.build_sync_groups(objects);
        log::info!(
            "[pulse] initialized {} crystals, {} sync groups",
            objects.len(),
            self.groups.len()
        );
    }

    /// Recompute one crystal's speed and amplitude. An unknown or invalid BPM
    /// falls back to the popularity heuristic.
    pub fn set_from_tempo(&self, obj: &mut CrystalObject, track: &TrackRecord, bpm: Option<f32>) {
        let profile = self.cfg.genres.lookup(&track.genre);
        let bpm = valid_bpm(bpm);
        obj.bpm = bpm;
        obj.pulse_speed = self.speed_for(track, bpm, &profile);
        obj.pulse_amplitude = self.amplitude_for(track, &profile);
        obj.sharpness = profile.sharpness.max(0.1);
        obj.estimated_bpm = bpm.unwrap_or(obj.pulse_speed * 60.0);
    }

    fn speed_for(&self, track: &TrackRecord, bpm: Option<f32>, profile: &GenreProfile) -> f32 {
        let c = &self.cfg;
        let raw = match bpm {
            Some(b) => b / 60.0,
            None => {
                let pop = (track.popularity / 100.0).clamp(0.0, 1.0);
                c.min_speed + (c.max_speed - c.min_speed) * pop
            }
        };
        (raw * profile.speed * self.speed_multiplier).clamp(c.min_speed, c.max_speed)
    }

    fn amplitude_for(&self, track: &TrackRecord, profile: &GenreProfile) -> f32 {
        let c = &self.cfg;
        let pop = (track.popularity / 100.0).clamp(0.0, 1.0);
        let amp = c.base_amplitude + pop * c.popularity_weight + profile.energy * c.energy_weight;
        (amp * profile.amplitude * self.amplitude_multiplier).clamp(0.0, c.max_amplitude)
    }

    fn build_sync_groups(&mut self, objects: &mut [CrystalObject]) {
        self.groups.clear();
        let mut order: Vec<usize> = (0..objects.len()).collect();
        order.sort_by(|&a, &b| {
            objects[a]
                .estimated_bpm
                .total_cmp(&objects[b].estimated_bpm)
                .then(a.cmp(&b))
        });

        let threshold = self.cfg.sync_bpm_threshold;
        let mut current: Option<SyncGroup> = None;
        for idx in order {
            let bpm = objects[idx].estimated_bpm;
            let joins = matches!(&current, Some(g) if (bpm - g.anchor_bpm).abs() <= threshold);
            if joins {
                if let Some(g) = current.as_mut() {
                    g.members.push(idx);
                }
                continue;
            }
            if let Some(done) = current.take() {
                self.push_group(done);
            }
            let mut members = SmallVec::new();
            members.push(idx);
            current = Some(SyncGroup {
                anchor_bpm: bpm,
                phase: objects[idx].pulse_phase,
                members,
            });
        }
        if let Some(done) = current.take() {
            self.push_group(done);
        }

        let jitter = self.cfg.sync_phase_jitter;
        for g in &self.groups {
            for &m in g.members.iter().skip(1) {
                let offset = if jitter > 0.0 {
                    self.rng.gen_range(-jitter..=jitter)
                } else {
                    0.0
                };
                objects[m].pulse_phase = wrap_phase(g.phase + offset);
            }
        }
    }

    fn push_group(&mut self, g: SyncGroup) {
        if g.members.len() > 1 {
            log::debug!(
                "[pulse] sync group @{:.0} bpm with {} members",
                g.anchor_bpm,
                g.members.len()
            );
            self.groups.push(g);
        }
    }

    /// Advance the oscillators and store each crystal's current pulse value.
    pub fn update(&mut self, dt_ms: f32, objects: &mut [CrystalObject]) {
        self.elapsed_sec += dt_ms.max(0.0) as f64 / 1000.0;
        let t = self.elapsed_sec;
        for obj in objects.iter_mut() {
            obj.pulse_value = pulse_value(
                obj.pulse_speed,
                obj.pulse_phase,
                obj.sharpness,
                t,
                self.cfg.second_harmonic,
                self.cfg.slow_harmonic,
            );
        }
    }

    /// Amplitude to render with: hover boost applied, and the playing crystal
    /// lifted by bass. Never exceeds `max_amplitude`.
    pub fn render_amplitude(&self, obj: &CrystalObject, levels: SpectrumLevels, active: bool) -> f32 {
        let base = obj.effective_amplitude(self.cfg.max_amplitude);
        let lift = if active {
            1.0 + levels.bass * self.cfg.audio_reactivity
        } else {
            1.0
        };
        (base * lift).min(self.cfg.max_amplitude)
    }

    /// Scale factor contributed by the pulse, around 1.0.
    pub fn scale_factor(&self, obj: &CrystalObject, amplitude: f32) -> f32 {
        1.0 + obj.pulse_value * amplitude * self.cfg.scale_pulse_fraction
    }

    /// Rescale every crystal's speed so the global factor becomes `k`.
    /// Speeds clamped at the bounds stay clamped, so raising `k` and
    /// setting it back does not always restore the earlier values.
    pub fn set_global_speed_multiplier(&mut self, objects: &mut [CrystalObject], k: f32) {
        if !(k.is_finite() && k > 0.0) {
            log::warn!("[pulse] ignoring speed multiplier {k}");
            return;
        }
        let ratio = k / self.speed_multiplier;
        for obj in objects.iter_mut() {
            obj.pulse_speed = (obj.pulse_speed * ratio).clamp(self.cfg.min_speed, self.cfg.max_speed);
        }
        self.speed_multiplier = k;
    }

    /// Rescale every crystal's amplitude so the global factor becomes `k`.
    /// Amplitudes cut at the ceiling are not recovered when `k` drops again.
    pub fn set_global_amplitude_multiplier(&mut self, objects: &mut [CrystalObject], k: f32) {
        if !(k.is_finite() && k > 0.0) {
            log::warn!("[pulse] ignoring amplitude multiplier {k}");
            return;
        }
        let ratio = k / self.amplitude_multiplier;
        for obj in objects.iter_mut() {
            obj.pulse_amplitude = (obj.pulse_amplitude * ratio).clamp(0.0, self.cfg.max_amplitude);
        }
        self.amplitude_multiplier = k;
    }

    pub fn sync_groups(&self) -> &[SyncGroup] {
        &self.groups
    }

    pub fn elapsed_sec(&self) -> f64 {
        self.elapsed_sec
    }

    pub fn stats(&self, objects: &[CrystalObject]) -> PulseStats {
        let n = objects.len();
        let mut stats = PulseStats {
            object_count: n,
            sync_groups: self.groups.len(),
            synced_objects: self.groups.iter().map(|g| g.members.len()).sum(),
            elapsed_sec: self.elapsed_sec,
            speed_multiplier: self.speed_multiplier,
            amplitude_multiplier: self.amplitude_multiplier,
            ..PulseStats::default()
        };
        if n == 0 {
            return stats;
        }
        stats.min_speed = f32::MAX;
        stats.max_speed = f32::MIN;
        for o in objects {
            stats.min_speed = stats.min_speed.min(o.pulse_speed);
            stats.max_speed = stats.max_speed.max(o.pulse_speed);
            stats.avg_speed += o.pulse_speed;
            stats.avg_amplitude += o.pulse_amplitude;
        }
        stats.avg_speed /= n as f32;
        stats.avg_amplitude /= n as f32;
        stats
    }
}
