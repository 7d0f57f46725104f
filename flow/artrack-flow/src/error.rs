use thiserror::Error;

/// Recoverable per-target flow failures. None of these escape
/// `FlowTracker::track` as an `Err` — each becomes a `PerTarget::reason`
/// string for the target it applies to.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error("too_few_surviving_points")]
    TooFewSurvivingPoints,
    #[error("transform_fit_failed")]
    TransformFitFailed,
    #[error("quad_invariant")]
    QuadInvariant,
}
