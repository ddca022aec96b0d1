//! Default input device exposed to the cluster as a playing track.
//!
//! Samples from the cpal input callback land in a ring buffer; each
//! `read_frequency_data` call windows the most recent `FFT_SIZE` samples and
//! maps magnitudes to bytes over a fixed decibel range, like a browser
//! analyser node. Playback clock and volume are simulated.

use anyhow::{anyhow, bail, Context};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crystal_core::error::SourceError;
use crystal_core::spectrum::AudioSource;
use num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

const FFT_SIZE: usize = 2048;
const MIN_DB: f32 = -100.0;
const MAX_DB: f32 = -30.0;

type SampleRing = Arc<Mutex<VecDeque<f32>>>;

pub struct CaptureSource {
    track_id: String,
    time: f64,
    duration: f64,
    volume: f32,
    paused: bool,
    ring: SampleRing,
    stream: Option<cpal::Stream>,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,
}

impl CaptureSource {
    pub fn new(track_id: &str, duration: f64) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(FFT_SIZE);
        // Hann window
        let window = (0..FFT_SIZE)
            .map(|i| 0.5 * (1.0 - (std::f32::consts::TAU * i as f32 / FFT_SIZE as f32).cos()))
            .collect();
        Self {
            track_id: track_id.to_string(),
            time: 0.0,
            duration,
            volume: 0.8,
            paused: false,
            ring: Arc::new(Mutex::new(VecDeque::with_capacity(FFT_SIZE))),
            stream: None,
            fft,
            window,
            buffer: vec![Complex::new(0.0, 0.0); FFT_SIZE],
        }
    }

    pub fn track_id(&self) -> &str {
        &self.track_id
    }

    /// Move the simulated playhead.
    pub fn advance(&mut self, dt_ms: f32) {
        if !self.paused {
            self.time = (self.time + dt_ms as f64 / 1000.0).min(self.duration);
        }
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    fn open_stream(&self) -> anyhow::Result<cpal::Stream> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| anyhow!("no default input device"))?;
        let name = device.name().unwrap_or_else(|_| "unknown".into());
        let supported = device
            .default_input_config()
            .with_context(|| format!("querying input config of `{name}`"))?;
        if supported.sample_format() != cpal::SampleFormat::F32 {
            bail!("unsupported sample format {:?}", supported.sample_format());
        }
        let config: cpal::StreamConfig = supported.into();
        let channels = config.channels.max(1) as usize;

        let ring = Arc::clone(&self.ring);
        let stream = device.build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let Ok(mut ring) = ring.lock() else {
                    return;
                };
                for frame in data.chunks(channels) {
                    let mono = frame.iter().sum::<f32>() / channels as f32;
                    if ring.len() == FFT_SIZE {
                        ring.pop_front();
                    }
                    ring.push_back(mono);
                }
            },
            |err| log::warn!("[capture] stream error: {err}"),
            None,
        )?;
        stream.play().context("starting input stream")?;
        log::info!(
            "[capture] listening on `{name}` ({} Hz, {channels} ch)",
            config.sample_rate.0
        );
        Ok(stream)
    }
}

impl AudioSource for CaptureSource {
    fn current_time(&self) -> f64 {
        self.time
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn paused(&self) -> bool {
        self.paused
    }

    fn ended(&self) -> bool {
        self.time >= self.duration
    }

    fn connect_direct(&mut self) -> Result<(), SourceError> {
        let stream = self
            .open_stream()
            .map_err(|e| SourceError::ConnectFailed(format!("{e:#}")))?;
        self.stream = Some(stream);
        Ok(())
    }

    fn frequency_bin_count(&self) -> Option<usize> {
        self.stream.as_ref().map(|_| FFT_SIZE / 2)
    }

    fn read_frequency_data(&mut self, out: &mut [u8]) -> Result<(), SourceError> {
        if self.stream.is_none() {
            return Err(SourceError::Unsupported);
        }
        {
            let ring = self
                .ring
                .lock()
                .map_err(|_| SourceError::Read("sample buffer poisoned".into()))?;
            // newest samples at the end, zero-padded at the front
            let pad = FFT_SIZE - ring.len();
            for (i, slot) in self.buffer.iter_mut().enumerate() {
                let s = if i < pad { 0.0 } else { ring[i - pad] };
                *slot = Complex::new(s * self.window[i], 0.0);
            }
        }
        self.fft.process(&mut self.buffer);

        let norm = 1.0 / FFT_SIZE as f32;
        for (byte, c) in out.iter_mut().zip(&self.buffer[..FFT_SIZE / 2]) {
            let db = 20.0 * (c.norm() * norm + 1e-12).log10();
            let level = ((db - MIN_DB) / (MAX_DB - MIN_DB)).clamp(0.0, 1.0);
            *byte = (level * 255.0) as u8;
        }
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), SourceError> {
        if self.stream.take().is_some() {
            log::debug!("[capture] input stream closed");
        }
        if let Ok(mut ring) = self.ring.lock() {
            ring.clear();
        }
        Ok(())
    }
}
