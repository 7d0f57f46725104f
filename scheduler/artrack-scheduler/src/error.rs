use thiserror::Error;

/// Errors surfaced by the scheduler itself, as opposed to per-target
/// recoverable failures (those become a `PerTarget::reason` and never reach
/// here).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A scheduler-internal invariant was violated (e.g. an active target id
    /// that no longer exists in the registry). Fatal: the engine drops to a
    /// stopped state and every subsequent call returns this error.
    #[error("scheduler state invariant violated: {0}")]
    StateInvariant(&'static str),
    /// `process_frame` was called after `Engine::stop`.
    #[error("engine is stopped")]
    Stopped,
}

pub type Result<T> = std::result::Result<T, Error>;
