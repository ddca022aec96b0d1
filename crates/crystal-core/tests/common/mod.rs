// Shared test doubles for the host-side integration tests.

#![allow(dead_code)]

use crystal_core::error::SourceError;
use crystal_core::spectrum::AudioSource;
use crystal_core::TrackRecord;

/// Audio element whose every answer is set by the test.
#[derive(Clone, Debug)]
pub struct ScriptedSource {
    pub time: f64,
    pub duration: f64,
    pub volume: f32,
    pub paused: bool,
    pub ended: bool,
    pub direct_ok: bool,
    pub stream_ok: bool,
    pub bins: Option<usize>,
    pub fill: u8,
    pub read_fails: bool,
    pub stream_attempts: usize,
    pub reads: usize,
    pub disconnects: usize,
}

impl ScriptedSource {
    /// Tappable source that reports `bins` bins all holding `fill`.
    pub fn live(bins: usize, fill: u8) -> Self {
        Self {
            time: 0.0,
            duration: 180.0,
            volume: 1.0,
            paused: false,
            ended: false,
            direct_ok: true,
            stream_ok: false,
            bins: Some(bins),
            fill,
            read_fails: false,
            stream_attempts: 0,
            reads: 0,
            disconnects: 0,
        }
    }

    /// Source that refuses every tap.
    pub fn untappable() -> Self {
        Self {
            direct_ok: false,
            stream_ok: false,
            ..Self::live(1024, 0)
        }
    }

    pub fn advance(&mut self, dt_ms: f32) {
        self.time += dt_ms as f64 / 1000.0;
    }
}

impl AudioSource for ScriptedSource {
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
        self.ended
    }

    fn connect_direct(&mut self) -> Result<(), SourceError> {
        if self.direct_ok {
            Ok(())
        } else {
            Err(SourceError::ConnectFailed("element already routed".into()))
        }
    }

    fn connect_stream(&mut self) -> Result<(), SourceError> {
        self.stream_attempts += 1;
        if self.stream_ok {
            Ok(())
        } else {
            Err(SourceError::ConnectFailed("capture refused".into()))
        }
    }

    fn frequency_bin_count(&self) -> Option<usize> {
        self.bins
    }

    fn read_frequency_data(&mut self, out: &mut [u8]) -> Result<(), SourceError> {
        self.reads += 1;
        if self.read_fails {
            return Err(SourceError::Read("analyser detached".into()));
        }
        out.fill(self.fill);
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), SourceError> {
        self.disconnects += 1;
        Ok(())
    }
}

pub const GENRES: [&str; 10] = [
    "metal", "jazz", "metal", "pop", "jazz", "rock", "metal", "classical", "jazz", "pop",
];

/// `n` tracks cycling through [`GENRES`] with spread-out popularity.
pub fn demo_tracks(n: usize) -> Vec<TrackRecord> {
    (0..n)
        .map(|i| {
            let mut t = TrackRecord::new(
                format!("track-{i}"),
                GENRES[i % GENRES.len()],
                (i * 37 % 101) as f32,
            );
            t.name = format!("Track {i}");
            t.artist = "Test Artist".into();
            t.duration = 200.0;
            t
        })
        .collect()
}
