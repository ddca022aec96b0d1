//! Spectrum analysis: live frequency bins -> smoothed bass/mid/treble.
//!
//! When no usable frequency data arrives (the tap cannot be connected, the
//! source has no analyser, or every bin stays at zero for a whole silence
//! window) the analyzer switches to a procedural generator driven by playback
//! time and volume. Callers never see a connection error.

use crate::constants::{
    BAND_EDGES, FALLBACK_NOISE, HIGH_MID_GAIN, SILENCE_WINDOW_MS, SPECTRUM_SMOOTHING_NEW,
    TREBLE_GAIN,
};
use crate::error::SourceError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A playing audio element as seen by the analyzer.
///
/// Only `connect_direct` is mandatory for tapping; sources without a
/// frequency-domain accessor leave the defaults in place and get the
/// procedural fallback.
pub trait AudioSource {
    /// Playback position in seconds.
    fn current_time(&self) -> f64;
    /// Track length in seconds.
    fn duration(&self) -> f64;
    /// 0..=1.
    fn volume(&self) -> f32;
    fn paused(&self) -> bool;
    fn ended(&self) -> bool;

    /// Attach an analyser directly to the source.
    fn connect_direct(&mut self) -> Result<(), SourceError>;

    /// Second attempt through a captured stream. Tried once when the direct
    /// tap fails.
    fn connect_stream(&mut self) -> Result<(), SourceError> {
        Err(SourceError::Unsupported)
    }

    /// Number of frequency bins, or `None` when the source has no analyser.
    fn frequency_bin_count(&self) -> Option<usize> {
        None
    }

    /// Fill `out` with byte magnitudes (0..=255), one per bin.
    fn read_frequency_data(&mut self, _out: &mut [u8]) -> Result<(), SourceError> {
        Err(SourceError::Unsupported)
    }

    fn disconnect(&mut self) -> Result<(), SourceError> {
        Ok(())
    }
}

/// Smoothed intensities in 0..=1.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SpectrumLevels {
    pub bass: f32,
    pub mid: f32,
    pub treble: f32,
}

impl SpectrumLevels {
    pub const ZERO: Self = Self {
        bass: 0.0,
        mid: 0.0,
        treble: 0.0,
    };

    /// `self * (1 - alpha) + next * alpha`, per band.
    #[inline]
    pub fn blend(self, next: Self, alpha: f32) -> Self {
        let keep = 1.0 - alpha;
        Self {
            bass: self.bass * keep + next.bass * alpha,
            mid: self.mid * keep + next.mid * alpha,
            treble: self.treble * keep + next.treble * alpha,
        }
    }

    #[inline]
    pub fn energy(&self) -> f32 {
        (self.bass + self.mid + self.treble) / 3.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpectrumMode {
    Disconnected,
    Live,
    Fallback,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SpectrumConfig {
    /// Weight of the newest sample in the exponential smoothing.
    pub smoothing: f32,
    pub high_mid_gain: f32,
    pub treble_gain: f32,
    /// How long an all-zero bin buffer is tolerated before falling back.
    pub silence_window_ms: f32,
    pub fallback_noise: f32,
    pub band_edges: [f32; 6],
}

impl Default for SpectrumConfig {
    fn default() -> Self {
        Self {
            smoothing: SPECTRUM_SMOOTHING_NEW,
            high_mid_gain: HIGH_MID_GAIN,
            treble_gain: TREBLE_GAIN,
            silence_window_ms: SILENCE_WINDOW_MS,
            fallback_noise: FALLBACK_NOISE,
            band_edges: BAND_EDGES,
        }
    }
}

impl SpectrumConfig {
    pub(crate) fn check(&self) -> Result<(), String> {
        if !(self.smoothing > 0.0 && self.smoothing <= 1.0) {
            return Err(format!("smoothing must be in (0, 1], got {}", self.smoothing));
        }
        if !(self.silence_window_ms >= 0.0) {
            return Err("silence_window_ms must be >= 0".into());
        }
        if self.band_edges.windows(2).any(|w| w[0] > w[1])
            || self.band_edges[0] < 0.0
            || self.band_edges[5] > 1.0
        {
            return Err("band_edges must be ascending fractions within 0..=1".into());
        }
        Ok(())
    }
}

/// Average byte magnitude of each of the five bands, in 0..=1.
pub fn band_averages(bins: &[u8], edges: &[f32; 6]) -> [f32; 5] {
    let n = bins.len();
    let mut out = [0.0f32; 5];
    if n == 0 {
        return out;
    }
    for (b, slot) in out.iter_mut().enumerate() {
        let start = ((edges[b] * n as f32).floor() as usize).min(n - 1);
        let end = ((edges[b + 1] * n as f32).floor() as usize).clamp(start + 1, n);
        let sum: u32 = bins[start..end].iter().map(|&v| v as u32).sum();
        *slot = sum as f32 / ((end - start) as f32 * 255.0);
    }
    out
}

/// Unsmoothed levels for one frame of bins.
///
/// The two top bands are amplified before being merged into treble since
/// high frequencies carry far less energy than the low end.
pub fn analyze_bins(bins: &[u8], cfg: &SpectrumConfig) -> SpectrumLevels {
    let [bass, low_mid, mid, high_mid, treble] = band_averages(bins, &cfg.band_edges);
    SpectrumLevels {
        bass: bass.clamp(0.0, 1.0),
        mid: ((low_mid + mid) * 0.5).clamp(0.0, 1.0),
        treble: ((high_mid * cfg.high_mid_gain + treble * cfg.treble_gain) * 0.5).clamp(0.0, 1.0),
    }
}

/// One synthetic frame from the fallback generator.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FallbackSample {
    pub bass: f32,
    pub mid: f32,
    pub treble: f32,
    pub pulse: f32,
}

// (baseline, [(weight, angular frequency, phase offset); 3]) for bass, mid, treble, pulse
const FALLBACK_TERMS: [(f32, [(f32, f32, f32); 3]); 4] = [
    (0.45, [(0.25, 2.1, 0.0), (0.15, 4.7, 1.3), (0.08, 9.3, 0.4)]),
    (0.35, [(0.20, 3.3, 0.7), (0.12, 6.1, 2.1), (0.08, 11.7, 1.1)]),
    (0.30, [(0.18, 5.9, 2.4), (0.12, 13.1, 0.9), (0.08, 17.3, 3.1)]),
    (0.50, [(0.30, 12.566, 0.0), (0.12, 25.13, 0.5), (0.06, 3.7, 1.9)]),
];

/// Procedural spectrum driven by playback time and volume.
pub struct FallbackGenerator {
    rng: StdRng,
    noise: f32,
    elapsed_sec: f64,
}

impl FallbackGenerator {
    pub fn new(seed: u64, noise: f32) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            noise: noise.max(0.0),
            elapsed_sec: 0.0,
        }
    }

    pub fn reset(&mut self) {
        self.elapsed_sec = 0.0;
    }

    /// Sample at the given playback time. When the source reports no usable
    /// time, the generator's own accumulator is used instead.
    pub fn sample(&mut self, playback_time: f64, volume: f32, dt_ms: f32) -> FallbackSample {
        self.elapsed_sec += (dt_ms.max(0.0) as f64) / 1000.0;
        let t_sec = if playback_time.is_finite() && playback_time > 0.0 {
            playback_time
        } else {
            self.elapsed_sec
        };
        let t = t_sec as f32;
        let vol = if volume.is_finite() {
            volume.clamp(0.0, 1.0)
        } else {
            1.0
        };
        let mut band = |idx: usize| {
            let (base, terms) = FALLBACK_TERMS[idx];
            let wave: f32 = terms
                .iter()
                .map(|&(w, freq, phase)| w * (t * freq + phase).sin())
                .sum();
            let noise = if self.noise > 0.0 {
                self.rng.gen_range(-self.noise..=self.noise)
            } else {
                0.0
            };
            ((base + wave) * vol + noise).clamp(0.0, 1.0)
        };
        FallbackSample {
            bass: band(0),
            mid: band(1),
            treble: band(2),
            pulse: band(3),
        }
    }
}

/// Snapshot of analyzer health for overlays and logs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpectrumStats {
    pub mode: SpectrumMode,
    pub levels: SpectrumLevels,
    pub bin_count: usize,
    pub silent_ms: f32,
}

pub struct SpectrumAnalyzer {
    cfg: SpectrumConfig,
    mode: SpectrumMode,
    levels: SpectrumLevels,
    pulse: f32,
    bins: Vec<u8>,
    silent_ms: f32,
    fallback: FallbackGenerator,
}

impl SpectrumAnalyzer {
    pub fn new(cfg: SpectrumConfig, seed: u64) -> Self {
        let fallback = FallbackGenerator::new(seed, cfg.fallback_noise);
        Self {
            cfg,
            mode: SpectrumMode::Disconnected,
            levels: SpectrumLevels::ZERO,
            pulse: 0.0,
            bins: Vec::new(),
            silent_ms: 0.0,
            fallback,
        }
    }

    /// Tap `source`. Never fails: if neither the direct tap nor the stream tap
    /// works, or the source has no analyser, the fallback generator takes over.
    pub fn connect(&mut self, source: &mut dyn AudioSource) -> SpectrumMode {
        self.reset_levels();
        let tapped = match source.connect_direct() {
            Ok(()) => true,
            Err(e) => {
                log::warn!("[spectrum] direct tap failed: {e}; retrying via stream");
                match source.connect_stream() {
                    Ok(()) => true,
                    Err(e2) => {
                        log::warn!("[spectrum] stream tap failed: {e2}");
                        false
                    }
                }
            }
        };
        let bin_count = if tapped {
            source.frequency_bin_count().unwrap_or(0)
        } else {
            0
        };
        if bin_count == 0 {
            self.enter_fallback("no frequency data available");
        } else {
            self.bins.clear();
            self.bins.resize(bin_count, 0);
            self.mode = SpectrumMode::Live;
            log::info!("[spectrum] live analysis over {bin_count} bins");
        }
        self.mode
    }

    /// Advance one frame. `source` is the element that was passed to
    /// [`connect`](Self::connect); `None` keeps the current levels.
    pub fn update(&mut self, source: Option<&mut dyn AudioSource>, dt_ms: f32) -> SpectrumLevels {
        if self.mode == SpectrumMode::Disconnected {
            return self.levels;
        }
        let Some(src) = source else {
            return self.levels;
        };
        if src.paused() || src.ended() {
            log::debug!("[spectrum] source stopped, disconnecting");
            self.disconnect(Some(src));
            return self.levels;
        }
        match self.mode {
            SpectrumMode::Live => self.update_live(src, dt_ms),
            SpectrumMode::Fallback => self.update_fallback(src, dt_ms),
            SpectrumMode::Disconnected => {}
        }
        self.levels
    }

    fn update_live(&mut self, src: &mut dyn AudioSource, dt_ms: f32) {
        if let Err(e) = src.read_frequency_data(&mut self.bins) {
            log::warn!("[spectrum] read failed: {e}");
            self.enter_fallback("frequency read failed");
            self.update_fallback(src, 0.0);
            return;
        }
        let silent = self.bins.iter().all(|&b| b == 0);
        if silent {
            self.silent_ms += dt_ms.max(0.0);
            if self.silent_ms >= self.cfg.silence_window_ms {
                self.enter_fallback("silent source");
                self.update_fallback(src, dt_ms);
                return;
            }
        } else {
            self.silent_ms = 0.0;
        }
        let raw = analyze_bins(&self.bins, &self.cfg);
        self.levels = self.levels.blend(raw, self.cfg.smoothing);
        self.pulse = self.levels.bass;
    }

    fn update_fallback(&mut self, src: &mut dyn AudioSource, dt_ms: f32) {
        let s = self.fallback.sample(src.current_time(), src.volume(), dt_ms);
        let raw = SpectrumLevels {
            bass: s.bass,
            mid: s.mid,
            treble: s.treble,
        };
        self.levels = self.levels.blend(raw, self.cfg.smoothing);
        self.pulse = s.pulse;
    }

    fn enter_fallback(&mut self, reason: &str) {
        if self.mode != SpectrumMode::Fallback {
            log::info!("[spectrum] switching to procedural fallback ({reason})");
        }
        self.mode = SpectrumMode::Fallback;
        self.silent_ms = 0.0;
        self.fallback.reset();
    }

    /// Drop the tap and zero all levels.
    pub fn disconnect(&mut self, source: Option<&mut dyn AudioSource>) {
        if self.mode == SpectrumMode::Live {
            if let Some(src) = source {
                if let Err(e) = src.disconnect() {
                    log::debug!("[spectrum] disconnect: {e}");
                }
            }
        }
        if self.mode != SpectrumMode::Disconnected {
            log::debug!("[spectrum] disconnected");
        }
        self.mode = SpectrumMode::Disconnected;
        self.reset_levels();
    }

    fn reset_levels(&mut self) {
        self.levels = SpectrumLevels::ZERO;
        self.pulse = 0.0;
        self.silent_ms = 0.0;
        self.fallback.reset();
    }

    pub fn levels(&self) -> SpectrumLevels {
        self.levels
    }

    /// Beat-like signal: the fallback pulse band, or bass in live mode.
    pub fn pulse(&self) -> f32 {
        self.pulse
    }

    pub fn mode(&self) -> SpectrumMode {
        self.mode
    }

    pub fn is_connected(&self) -> bool {
        self.mode != SpectrumMode::Disconnected
    }

    pub fn is_using_fallback(&self) -> bool {
        self.mode == SpectrumMode::Fallback
    }

    pub fn stats(&self) -> SpectrumStats {
        SpectrumStats {
            mode: self.mode,
            levels: self.levels,
            bin_count: self.bins.len(),
            silent_ms: self.silent_ms,
        }
    }
}
