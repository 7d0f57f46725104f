use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Runtime tunables, matching the defaults table in the spec's external
/// interfaces section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Longer side of the processing frame, in pixels.
    pub max_dimension: u32,
    /// Top-response cap on frame keypoints.
    pub max_features_per_frame: usize,
    /// Frames between full detections.
    pub detection_interval: u32,
    /// If false, detect every frame (optical flow disabled entirely).
    pub use_optical_flow: bool,
    /// Lowe's ratio test threshold.
    pub lowe_ratio: f32,
    /// Minimum good matches required before attempting a homography fit.
    pub min_good_matches: usize,
    /// RANSAC inlier threshold, in pixels.
    pub ransac_reproj_threshold: f32,
    /// Flow points sampled per target, capped at this value.
    pub max_tracking_points: usize,
    /// Minimum surviving flow points required to attempt a homography fit.
    pub min_points_for_homography: usize,
    /// Force a redetect once a target has gone this many frames without one.
    pub max_frames_without_detection: u32,
    /// Minimum time the active target is kept before another may replace it.
    pub min_switch_delay_ms: u64,
    /// A candidate must be closer than `switch_hysteresis * current_distance`
    /// to replace the currently active target.
    pub switch_hysteresis: f32,
    /// Top-K candidates returned by the vocabulary query.
    pub vocab_candidates: usize,
    /// Minimum similarity score for a vocabulary query candidate.
    pub min_similarity: f32,
    /// Minimum keypoints/descriptors a frame or target needs before being
    /// usable (below this, `InsufficientFeatures` is raised).
    pub min_features: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_dimension: 640,
            max_features_per_frame: 800,
            detection_interval: 12,
            use_optical_flow: true,
            lowe_ratio: 0.7,
            min_good_matches: 12,
            ransac_reproj_threshold: 5.0,
            max_tracking_points: 100,
            min_points_for_homography: 8,
            max_frames_without_detection: 30,
            min_switch_delay_ms: 500,
            switch_hysteresis: 0.7,
            vocab_candidates: 3,
            min_similarity: 0.05,
            min_features: 10,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("vocab_candidates must be at least 1")]
    ZeroVocabCandidates,
    #[error("lowe_ratio must be in (0, 1), got {0}")]
    LoweRatioOutOfRange(f32),
    #[error("switch_hysteresis must be in (0, 1], got {0}")]
    SwitchHysteresisOutOfRange(f32),
    #[error("min_similarity must be in [0, 1], got {0}")]
    MinSimilarityOutOfRange(f32),
    #[error("max_features_per_frame must be at least min_features ({min_features})")]
    MaxFeaturesBelowMinFeatures { min_features: usize },
    #[error("detection_interval must be at least 1")]
    ZeroDetectionInterval,
    #[error("could not parse config TOML: {0}")]
    Toml(String),
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.vocab_candidates == 0 {
            return Err(ConfigError::ZeroVocabCandidates);
        }
        if !(self.lowe_ratio > 0.0 && self.lowe_ratio < 1.0) {
            return Err(ConfigError::LoweRatioOutOfRange(self.lowe_ratio));
        }
        if !(self.switch_hysteresis > 0.0 && self.switch_hysteresis <= 1.0) {
            return Err(ConfigError::SwitchHysteresisOutOfRange(
                self.switch_hysteresis,
            ));
        }
        if !(0.0..=1.0).contains(&self.min_similarity) {
            return Err(ConfigError::MinSimilarityOutOfRange(self.min_similarity));
        }
        if self.max_features_per_frame < self.min_features {
            return Err(ConfigError::MaxFeaturesBelowMinFeatures {
                min_features: self.min_features,
            });
        }
        if self.detection_interval == 0 {
            return Err(ConfigError::ZeroDetectionInterval);
        }
        Ok(())
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: Config = toml::from_str(s).map_err(|e| ConfigError::Toml(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn zero_vocab_candidates_rejected() {
        let mut cfg = Config::default();
        cfg.vocab_candidates = 0;
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroVocabCandidates));
    }

    #[test]
    fn from_toml_round_trips_overrides() {
        let toml_str = "detection_interval = 20\nmax_dimension = 1280\n";
        let cfg = Config::from_toml_str(toml_str).unwrap();
        assert_eq!(cfg.detection_interval, 20);
        assert_eq!(cfg.max_dimension, 1280);
        // untouched fields keep their defaults
        assert_eq!(cfg.vocab_candidates, 3);
    }
}
