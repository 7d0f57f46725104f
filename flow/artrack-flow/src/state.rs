use adskalman::StateAndCovariance;
use artrack_types::{GrayImage, Quad};
use nalgebra::{OMatrix, OVector, U2};

use crate::geometry::ShapeParams;

/// Initial state variance for a freshly detected target: small, since the
/// detector's homography fit is trusted far more than a flow prediction.
const INITIAL_VALUE_VARIANCE: f64 = 1.0;
const INITIAL_VELOCITY_VARIANCE: f64 = 1.0;

/// Per-target tracking state carried between calls to
/// [`crate::tracker::FlowTracker::track`]. Reset wholesale on every
/// successful detection.
pub struct TrackerState {
    pub(crate) prev_frame: GrayImage,
    pub(crate) prev_quad: Quad,
    pub(crate) frames_since_detection: u32,
    pub(crate) consecutive_poor_frames: u32,
    pub(crate) scale: StateAndCovariance<f64, U2>,
    pub(crate) rotation: StateAndCovariance<f64, U2>,
    pub(crate) aspect: StateAndCovariance<f64, U2>,
    /// Raw (unfiltered) aspect ratio at the moment of detection, the
    /// baseline "poor frame" drift is measured against for this target's
    /// whole tracked lifetime.
    pub(crate) initial_aspect: f32,
    /// Raw (unfiltered) scale from the previous frame, the baseline
    /// per-frame scale-change check is measured against.
    pub(crate) prev_scale: f32,
}

impl TrackerState {
    /// Resets tracking state from a fresh detector result: the posterior
    /// mean is set directly to the measured shape, velocity zeroed, with a
    /// small initial covariance.
    pub fn from_detection(frame: GrayImage, quad: Quad) -> Self {
        let params = ShapeParams::of(&quad);
        Self {
            prev_frame: frame,
            prev_quad: quad,
            frames_since_detection: 0,
            consecutive_poor_frames: 0,
            scale: initial_estimate(params.scale as f64),
            rotation: initial_estimate(params.rotation as f64),
            aspect: initial_estimate(params.aspect as f64),
            initial_aspect: params.aspect,
            prev_scale: params.scale,
        }
    }
}

fn initial_estimate(value: f64) -> StateAndCovariance<f64, U2> {
    let state = OVector::<f64, U2>::new(value, 0.0);
    let covariance = OMatrix::<f64, U2, U2>::new(
        INITIAL_VALUE_VARIANCE,
        0.0,
        0.0,
        INITIAL_VELOCITY_VARIANCE,
    );
    StateAndCovariance::new(state, covariance)
}
