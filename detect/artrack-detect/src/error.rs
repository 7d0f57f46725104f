use thiserror::Error;

/// Recoverable per-candidate detection failures. None of these escape
/// `Detector::detect_frame` as an `Err` — each becomes a `PerTarget::reason`
/// string (`to_string()` on the variant) for the target it applies to.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error("insufficient_features")]
    InsufficientFeatures,
    #[error("filtered")]
    Filtered,
    #[error("match_failure")]
    MatchFailure,
    #[error("degenerate_homography")]
    DegenerateHomography,
    #[error("quad_invariant")]
    QuadInvariant,
}
