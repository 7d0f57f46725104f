use artrack_types::TargetStatus;

/// Mutable per-target tracking state, kept separate from the immutable
/// [`artrack_types::Target`] so the latter can be shared (`Arc`) across
/// detector calls without interior mutability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuntimeState {
    pub status: TargetStatus,
    /// Frame timestamp (`Frame::acquired_at_ms`) this target was last
    /// successfully located at, by either detection or flow.
    pub last_seen_at: Option<u64>,
    pub last_score: f32,
}

impl Default for RuntimeState {
    fn default() -> Self {
        Self {
            status: TargetStatus::Idle,
            last_seen_at: None,
            last_score: 0.0,
        }
    }
}
