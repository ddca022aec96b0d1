use thiserror::Error;

/// Failures that can only happen while a cluster is being constructed.
///
/// Nothing on the per-frame path returns these; runtime problems are logged
/// and degrade the visuals instead.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ClusterError {
    #[error("mesh count {meshes} does not match track count {tracks}")]
    MeshCountMismatch { tracks: usize, meshes: usize },
    #[error("duplicate track id `{0}`")]
    DuplicateTrackId(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Errors reported by an [`AudioSource`](crate::AudioSource).
///
/// The spectrum analyzer absorbs all of these and switches to its procedural
/// fallback, so callers of the cluster never see them.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SourceError {
    #[error("audio connection failed: {0}")]
    ConnectFailed(String),
    #[error("operation not supported by this audio source")]
    Unsupported,
    #[error("failed to read frequency data: {0}")]
    Read(String),
}
