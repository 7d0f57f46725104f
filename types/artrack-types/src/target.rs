use crate::bow::SparseBow;
use crate::descriptor::Descriptor;
use crate::keypoint::Keypoint;
use serde::{Deserialize, Serialize};

/// Immutable per-target data, loaded once at startup and never mutated.
///
/// Runtime state (`status`, `last_seen_at`, `last_score`) is intentionally
/// not on this struct — it lives in `artrack-registry`'s `RuntimeState`,
/// keyed by target id, so that the immutable reference data can be shared
/// (`Arc<Target>`) across detector invocations without interior mutability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    pub id: String,
    pub ref_width: u32,
    pub ref_height: u32,
    pub keypoints: Vec<Keypoint>,
    pub descriptors: Vec<Descriptor>,
    pub bow: SparseBow,
}

impl Target {
    pub fn new(
        id: impl Into<String>,
        ref_width: u32,
        ref_height: u32,
        keypoints: Vec<Keypoint>,
        descriptors: Vec<Descriptor>,
        bow: SparseBow,
    ) -> Self {
        Self {
            id: id.into(),
            ref_width,
            ref_height,
            keypoints,
            descriptors,
            bow,
        }
    }

    pub fn num_descriptors(&self) -> usize {
        self.descriptors.len()
    }
}

/// Lifecycle status of a target's tracking, held by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetStatus {
    /// No tracking state; the target has not been seen recently (or ever).
    Idle,
    /// The target has an active `prev_frame`/`prev_quad`/Kalman state.
    Tracked,
    /// Previously tracked, now lost after sustained failure.
    Lost,
}

impl Default for TargetStatus {
    fn default() -> Self {
        TargetStatus::Idle
    }
}
