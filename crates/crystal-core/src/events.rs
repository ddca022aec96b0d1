use crate::spectrum::SpectrumMode;

/// Notifications produced by the cluster during a tick or an input call.
///
/// They are buffered in order and handed out by
/// [`CrystalCluster::drain_events`](crate::CrystalCluster::drain_events).
#[derive(Clone, Debug, PartialEq)]
pub enum ClusterEvent {
    HoverEnter { id: String },
    HoverExit { id: String },
    Clicked { id: String },
    FocusChanged { id: String, focused: bool },
    RotationStarted,
    RotationStopped,
    SpectrumModeChanged { mode: SpectrumMode },
}
