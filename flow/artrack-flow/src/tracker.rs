use adskalman::{CovarianceUpdateMethod, ObservationModel, StateAndCovariance, TransitionModelLinearNoControl};
use artrack_features::{HomographyEstimator, OpticalFlow, SimilarityEstimator};
use artrack_types::{Config, GrayImage, Mode, PerTarget, Quad, QuadBounds};
use artrack_kalman1d::motion_model_1d::ConstantVelocity1DModel;
use artrack_kalman1d::observation_model_1d::ObservationModel1D;
use nalgebra::{OMatrix, OVector, U1, U2};
use tracing::debug;

use crate::error::Error;
use crate::geometry::{apply_homography, reconstruct, ShapeParams};
use crate::result::FlowResult;
use crate::sampling::sample_points;
use crate::state::TrackerState;

/// Forward-backward reprojection error, in pixels, above which a tracked
/// point is dropped rather than used for the transform fit.
const FB_ERROR_THRESHOLD: f32 = 2.0;

/// A homography fit with fewer inliers than this fraction is considered too
/// weak to trust over the similarity fallback.
const MIN_HOMOGRAPHY_INLIER_RATIO: f32 = 0.6;

/// An inlier ratio below this, even on a successful fit, immediately asks the
/// scheduler for a fresh detection rather than waiting on consecutive poor
/// frames — a single very weak fit is reason enough not to trust this quad.
const INLIER_RATIO_REDETECT_THRESHOLD: f32 = 0.5;

/// A frame counts as "poor" if the raw (unfiltered) aspect has drifted this
/// much from the aspect measured at detection time...
const ASPECT_DRIFT_THRESHOLD: f32 = 0.10;

/// ...or if the raw scale has changed this much from the previous frame.
const SCALE_CHANGE_THRESHOLD: f32 = 0.20;

const SCALE_MOTION_NOISE: f64 = 1e-2;
const ROTATION_MOTION_NOISE: f64 = 1e-4;
const ASPECT_MOTION_NOISE: f64 = 1e-4;

const SCALE_OBSERVATION_VARIANCE: f64 = 4.0;
const ROTATION_OBSERVATION_VARIANCE: f64 = 0.0025;
const ASPECT_OBSERVATION_VARIANCE: f64 = 0.0025;

const MAX_CONSECUTIVE_POOR_FRAMES: u32 = 3;

/// Per-target optical-flow tracker: samples points from the previous quad,
/// tracks them with pyramidal LK, fits a homography (falling back to a
/// similarity transform) between frames, and Kalman-smooths the resulting
/// scale/rotation/aspect triple. See [`TrackerState`] for the state this
/// carries between calls.
pub struct FlowTracker<O, S, H> {
    flow: O,
    similarity: S,
    homography: H,
    scale_motion: ConstantVelocity1DModel<f64>,
    rotation_motion: ConstantVelocity1DModel<f64>,
    aspect_motion: ConstantVelocity1DModel<f64>,
    scale_observation: ObservationModel1D<f64>,
    rotation_observation: ObservationModel1D<f64>,
    aspect_observation: ObservationModel1D<f64>,
}

impl<O, S, H> FlowTracker<O, S, H>
where
    O: OpticalFlow,
    S: SimilarityEstimator,
    H: HomographyEstimator,
{
    pub fn new(flow: O, similarity: S, homography: H) -> Self {
        Self {
            flow,
            similarity,
            homography,
            scale_motion: ConstantVelocity1DModel::new(SCALE_MOTION_NOISE),
            rotation_motion: ConstantVelocity1DModel::new(ROTATION_MOTION_NOISE),
            aspect_motion: ConstantVelocity1DModel::new(ASPECT_MOTION_NOISE),
            scale_observation: ObservationModel1D::new(OMatrix::<f64, U1, U1>::new(SCALE_OBSERVATION_VARIANCE)),
            rotation_observation: ObservationModel1D::new(OMatrix::<f64, U1, U1>::new(ROTATION_OBSERVATION_VARIANCE)),
            aspect_observation: ObservationModel1D::new(OMatrix::<f64, U1, U1>::new(ASPECT_OBSERVATION_VARIANCE)),
        }
    }

    /// Advances `state` by one frame, returning the per-target result and
    /// whether the scheduler should force a redetect. `state.prev_frame` and
    /// `state.prev_quad` are always updated to reflect this frame's pixels
    /// (pyramidal LK needs a true previous frame even after a failure), but
    /// the shape Kalman filters only advance on a successful transform fit.
    pub fn track(&self, state: &mut TrackerState, target_id: &str, curr_gray: GrayImage, config: &Config) -> FlowResult {
        state.frames_since_detection += 1;

        let prev_points = sample_points(&state.prev_quad, config.max_tracking_points, state.prev_frame.width, state.prev_frame.height);
        let flow_results = self.flow.track(&state.prev_frame, &curr_gray, &prev_points);

        let mut prev_survivors = Vec::with_capacity(prev_points.len());
        let mut curr_survivors = Vec::with_capacity(prev_points.len());
        for (p, r) in prev_points.iter().zip(flow_results.iter()) {
            if r.status && r.fb_error <= FB_ERROR_THRESHOLD {
                prev_survivors.push(*p);
                curr_survivors.push(r.point);
            }
        }

        if curr_survivors.len() < config.min_points_for_homography {
            debug!(target = target_id, survivors = curr_survivors.len(), "too few surviving flow points");
            state.prev_frame = curr_gray;
            state.consecutive_poor_frames += 1;
            return self.failure(target_id, Error::TooFewSurvivingPoints);
        }

        let homography_fit = self.homography.estimate(&prev_survivors, &curr_survivors, config.ransac_reproj_threshold);
        let (transform, inlier_ratio) = match homography_fit {
            Some((h, inliers)) => {
                let ratio = inliers.iter().filter(|ok| **ok).count() as f32 / inliers.len().max(1) as f32;
                if ratio >= MIN_HOMOGRAPHY_INLIER_RATIO {
                    (Some(h), ratio)
                } else {
                    (self.similarity.fit(&prev_survivors, &curr_survivors), ratio)
                }
            }
            None => (self.similarity.fit(&prev_survivors, &curr_survivors), 0.0),
        };

        let Some(h) = transform else {
            debug!(target = target_id, "neither homography nor similarity fit converged");
            state.prev_frame = curr_gray;
            state.consecutive_poor_frames += 1;
            return self.failure(target_id, Error::TransformFitFailed);
        };

        let raw_corners = state.prev_quad.corners.map(|c| apply_homography(&h, c));
        let raw_quad = Quad { corners: raw_corners };
        let raw_params = ShapeParams::of(&raw_quad);
        let centroid = raw_quad.centroid();

        let poor_geometry = is_poor_geometry(raw_params, state.initial_aspect, state.prev_scale);
        state.prev_scale = raw_params.scale;

        let filtered = ShapeParams {
            scale: self.filter_one(&self.scale_motion, &self.scale_observation, &mut state.scale, raw_params.scale as f64) as f32,
            rotation: self.filter_one(&self.rotation_motion, &self.rotation_observation, &mut state.rotation, raw_params.rotation as f64) as f32,
            aspect: self.filter_one(&self.aspect_motion, &self.aspect_observation, &mut state.aspect, raw_params.aspect as f64) as f32,
        };

        let final_quad = reconstruct(filtered, centroid);
        state.prev_frame = curr_gray;
        state.prev_quad = final_quad;

        if final_quad.validate(&QuadBounds::default()).is_err() {
            state.consecutive_poor_frames += 1;
            return self.failure(target_id, Error::QuadInvariant);
        }

        if poor_geometry {
            state.consecutive_poor_frames += 1;
        } else {
            state.consecutive_poor_frames = 0;
        }
        let should_redetect = inlier_ratio < INLIER_RATIO_REDETECT_THRESHOLD
            || state.frames_since_detection >= config.max_frames_without_detection
            || state.consecutive_poor_frames >= MAX_CONSECUTIVE_POOR_FRAMES;

        FlowResult {
            per_target: PerTarget::success(target_id, final_quad.corners, inlier_ratio, Mode::Flow),
            should_redetect,
        }
    }

    fn filter_one(
        &self,
        motion: &ConstantVelocity1DModel<f64>,
        observation: &ObservationModel1D<f64>,
        estimate: &mut StateAndCovariance<f64, U2>,
        measurement: f64,
    ) -> f64 {
        let prior = motion.calc_for_dt(1.0).predict(estimate);
        let value = OVector::<f64, U1>::new(measurement);
        *estimate = observation
            .update(&prior, &value, CovarianceUpdateMethod::JosephForm)
            .unwrap_or(prior);
        estimate.state()[0]
    }

    fn failure(&self, target_id: &str, error: Error) -> FlowResult {
        FlowResult {
            per_target: PerTarget::failure(target_id, Mode::Flow, error.to_string()),
            should_redetect: true,
        }
    }
}

/// A frame is "poor" when its raw (pre-Kalman) aspect has drifted more than
/// [`ASPECT_DRIFT_THRESHOLD`] from the aspect at detection time, or its raw
/// scale has changed more than [`SCALE_CHANGE_THRESHOLD`] from the previous
/// frame.
fn is_poor_geometry(raw: ShapeParams, initial_aspect: f32, prev_scale: f32) -> bool {
    let aspect_drift = (raw.aspect - initial_aspect).abs() / initial_aspect.abs().max(1e-6);
    let scale_change = (raw.scale - prev_scale).abs() / prev_scale.abs().max(1e-6);
    aspect_drift > ASPECT_DRIFT_THRESHOLD || scale_change > SCALE_CHANGE_THRESHOLD
}
