pub mod cluster;
pub mod constants;
pub mod error;
pub mod events;
pub mod input;
pub mod interaction;
pub mod layout;
pub mod pulse;
pub mod rotation;
pub mod scheduler;
pub mod spectrum;
pub mod state;
pub mod track;
pub mod uniforms;

pub use cluster::*;
pub use error::*;
pub use events::*;
pub use interaction::{HoverConfig, PickTarget};
pub use layout::LayoutConfig;
pub use pulse::{GenreProfile, GenreTable, PulseConfig, PulseStats};
pub use rotation::{RotationConfig, RotationPhase};
pub use spectrum::{AudioSource, SpectrumConfig, SpectrumLevels, SpectrumMode};
pub use state::*;
pub use track::*;
pub use uniforms::*;
