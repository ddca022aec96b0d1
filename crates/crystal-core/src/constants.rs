// Shared tuning constants. Config structs take their defaults from here.

// Spatial layout
pub const LAYOUT_BASE_RADIUS: f32 = 14.0; // mean sphere radius in world units
pub const LAYOUT_HEIGHT_VARIATION: f32 = 4.0; // full span of the vertical jitter
pub const LAYOUT_RADIUS_JITTER_MIN: f32 = 0.7;
pub const LAYOUT_RADIUS_JITTER_MAX: f32 = 1.3;

// Pulsation
pub const MIN_PULSE_SPEED: f32 = 0.5; // Hz
pub const MAX_PULSE_SPEED: f32 = 3.0; // Hz
pub const BASE_PULSE_AMPLITUDE: f32 = 0.3;
pub const MAX_PULSE_AMPLITUDE: f32 = 1.0;
pub const POPULARITY_AMPLITUDE_WEIGHT: f32 = 0.4;
pub const ENERGY_AMPLITUDE_WEIGHT: f32 = 0.3;
pub const SYNC_BPM_THRESHOLD: f32 = 8.0; // tracks within this many BPM share a group
pub const SYNC_PHASE_JITTER: f32 = 0.25; // radians, +/- around the group anchor
pub const SECOND_HARMONIC_WEIGHT: f32 = 0.2;
pub const SLOW_HARMONIC_WEIGHT: f32 = 0.1;
pub const SCALE_PULSE_FRACTION: f32 = 0.1; // share of amplitude applied to mesh scale
pub const AUDIO_REACTIVITY: f32 = 0.5; // bass lift applied to the playing crystal

// Spectrum analysis
pub const SPECTRUM_SMOOTHING_NEW: f32 = 0.3; // weight of the new sample, previous gets 1 - this
pub const HIGH_MID_GAIN: f32 = 1.5;
pub const TREBLE_GAIN: f32 = 2.0;
pub const SILENCE_WINDOW_MS: f32 = 1000.0;
pub const FALLBACK_NOISE: f32 = 0.04;
// Band split points as fractions of the bin count: bass, low-mid, mid, high-mid, treble
pub const BAND_EDGES: [f32; 6] = [0.0, 0.06, 0.18, 0.40, 0.65, 1.0];

// Hover / focus
pub const HOVER_MAX_RATE_HZ: f32 = 60.0;
pub const HOVER_SCALE: f32 = 1.1;
pub const HOVER_DURATION_MS: f32 = 250.0;
pub const BASE_EMISSIVE: f32 = 0.4;
pub const HOVER_EMISSIVE_BOOST: f32 = 2.5;
pub const EMISSIVE_CEILING: f32 = 1.5;
pub const HOVER_AMPLITUDE_BOOST: f32 = 1.5;

// Rotation
pub const ROTATION_BASE_SPEED: f32 = 0.12; // radians per second around Y
pub const ROTATION_RAMP_PER_MS: f32 = 0.0004; // (radians per second) per millisecond
pub const ROTATION_SECONDARY_AXIS_RATE: f32 = 0.3; // X spins at 30% of Y

// Cluster
pub const DEFAULT_CRYSTAL_SIZE: f32 = 1.0;
pub const UNKNOWN_GENRE: &str = "unknown";
