use std::collections::HashSet;
use std::sync::Arc;

use artrack_features::{DescriptorMatch, DescriptorMatcher, FeatureExtractor, HomographyEstimator};
use artrack_types::{Config, Descriptor, Frame, Keypoint, Mode, PerTarget, Quad, QuadBounds, Target};
use artrack_vocab::Candidate;
use tracing::{debug, warn};

use crate::error::Error;

#[cfg(feature = "parallel-matching")]
use rayon::prelude::*;

/// Per-frame detector: extracts frame features once, then checks each
/// vocabulary-shortlisted candidate target via KNN matching, Lowe's ratio
/// test, RANSAC homography and quad validation.
///
/// `matcher` is constructed once, at `Detector` construction, and reused
/// across every candidate of every call — matchers are assumed cheap to
/// query and (for the `parallel-matching` feature) safe to share across
/// threads.
pub struct Detector<E, M, H> {
    extractor: E,
    matcher: M,
    homography: H,
    config: Config,
}

impl<E, M, H> Detector<E, M, H>
where
    E: FeatureExtractor,
    M: DescriptorMatcher,
    H: HomographyEstimator,
{
    pub fn new(extractor: E, matcher: M, homography: H, config: Config) -> Self {
        Self {
            extractor,
            matcher,
            homography,
            config,
        }
    }

    /// Runs detection for every target in `targets`; only those present in
    /// `candidates` (the vocabulary query's shortlist) get full geometric
    /// verification. Every other target still gets a `PerTarget` entry with
    /// `reason = "filtered"`.
    ///
    /// Convenience wrapper around [`Detector::extract_frame_features`] +
    /// [`Detector::verify_candidates`] for callers (tests, the demo CLI) that
    /// have no separate use for the frame's features. `artrack-scheduler`
    /// calls the two steps directly, since it also needs the extracted
    /// features to quantize the frame's vocabulary word.
    pub fn detect_frame(&self, frame: &Frame, targets: &[Arc<Target>], candidates: &[Candidate]) -> Vec<PerTarget> {
        match self.extract_frame_features(frame) {
            Ok((keypoints, descriptors)) => self.verify_candidates(targets, candidates, &keypoints, &descriptors),
            Err(_) => targets
                .iter()
                .map(|t| PerTarget::failure(t.id.clone(), Mode::Detection, Error::InsufficientFeatures.to_string()))
                .collect(),
        }
    }

    /// Grayscale-converts `frame`, detects keypoints, keeps the top
    /// `max_features_per_frame` by response, and computes their descriptors.
    pub fn extract_frame_features(&self, frame: &Frame) -> Result<(Vec<Keypoint>, Vec<Descriptor>), Error> {
        let gray = frame.to_grayscale();
        let mut keypoints = self.extractor.detect(&gray);
        keypoints.sort_by(|a, b| b.response.partial_cmp(&a.response).unwrap_or(std::cmp::Ordering::Equal));
        keypoints.truncate(self.config.max_features_per_frame);

        if keypoints.len() < self.config.min_features {
            warn!(num_keypoints = keypoints.len(), min_features = self.config.min_features, "frame has insufficient features");
            return Err(Error::InsufficientFeatures);
        }

        let descriptors = self.extractor.compute(&gray, &keypoints);
        debug!(num_keypoints = keypoints.len(), "extracted frame features");
        Ok((keypoints, descriptors))
    }

    /// Verifies every target in `targets` against already-extracted frame
    /// features; only those present in `candidates` get full geometric
    /// verification, the rest are returned with `reason = "filtered"`.
    pub fn verify_candidates(&self, targets: &[Arc<Target>], candidates: &[Candidate], keypoints: &[Keypoint], descriptors: &[Descriptor]) -> Vec<PerTarget> {
        let candidate_ids: HashSet<&str> = candidates.iter().map(|c| c.target_id.as_str()).collect();
        self.verify_all(targets, &candidate_ids, keypoints, descriptors)
    }

    #[cfg(not(feature = "parallel-matching"))]
    fn verify_all(&self, targets: &[Arc<Target>], candidate_ids: &HashSet<&str>, keypoints: &[Keypoint], descriptors: &[Descriptor]) -> Vec<PerTarget> {
        targets
            .iter()
            .map(|target| self.verify_one(target, candidate_ids, keypoints, descriptors))
            .collect()
    }

    #[cfg(feature = "parallel-matching")]
    fn verify_all(&self, targets: &[Arc<Target>], candidate_ids: &HashSet<&str>, keypoints: &[Keypoint], descriptors: &[Descriptor]) -> Vec<PerTarget>
    where
        E: Sync,
        M: Sync,
        H: Sync,
    {
        targets
            .par_iter()
            .map(|target| self.verify_one(target, candidate_ids, keypoints, descriptors))
            .collect()
    }

    fn verify_one(&self, target: &Arc<Target>, candidate_ids: &HashSet<&str>, keypoints: &[Keypoint], descriptors: &[Descriptor]) -> PerTarget {
        if !candidate_ids.contains(target.id.as_str()) {
            return PerTarget::failure(target.id.clone(), Mode::Detection, Error::Filtered.to_string());
        }
        self.verify_candidate(target, keypoints, descriptors)
    }

    fn verify_candidate(&self, target: &Target, frame_keypoints: &[Keypoint], frame_descriptors: &[Descriptor]) -> PerTarget {
        let knn = self.matcher.knn_match(&target.descriptors, frame_descriptors, 2);
        let good_matches = self.filter_good_matches(&knn);

        if good_matches.len() < self.config.min_good_matches {
            return PerTarget::failure(target.id.clone(), Mode::Detection, Error::MatchFailure.to_string());
        }

        let src: Vec<_> = good_matches.iter().map(|m| target.keypoints[m.query_idx].position).collect();
        let dst: Vec<_> = good_matches.iter().map(|m| frame_keypoints[m.train_idx].position).collect();

        let Some((homography, _inliers)) = self.homography.estimate(&src, &dst, self.config.ransac_reproj_threshold) else {
            return PerTarget::failure(target.id.clone(), Mode::Detection, Error::DegenerateHomography.to_string());
        };

        let Some(quad) = Quad::from_homography(&homography, target.ref_width as f32, target.ref_height as f32) else {
            return PerTarget::failure(target.id.clone(), Mode::Detection, Error::DegenerateHomography.to_string());
        };

        if quad.validate(&QuadBounds::default()).is_err() {
            return PerTarget::failure(target.id.clone(), Mode::Detection, Error::QuadInvariant.to_string());
        }

        let score = good_matches.len() as f32 / target.num_descriptors().max(1) as f32;
        PerTarget::success(target.id.clone(), quad.corners, score, Mode::Detection)
    }

    /// Lowe's ratio test when two nearest neighbors are available; a single
    /// nearest neighbor (the matcher ran out of train candidates) is
    /// accepted unconditionally rather than discarded.
    fn filter_good_matches(&self, knn: &[Vec<DescriptorMatch>]) -> Vec<DescriptorMatch> {
        knn.iter()
            .filter_map(|per_query| match per_query.as_slice() {
                [] => None,
                [only] => Some(*only),
                [best, second, ..] => {
                    if (best.distance as f32) < self.config.lowe_ratio * (second.distance as f32) {
                        Some(*best)
                    } else {
                        None
                    }
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use artrack_features::reference::{BruteForceMatcher, ReferenceExtractor, RansacHomography};
    use artrack_types::{Point2D, SparseBow};

    fn detector() -> Detector<ReferenceExtractor, BruteForceMatcher, RansacHomography> {
        let mut config = Config::default();
        config.min_good_matches = 12;
        Detector::new(ReferenceExtractor::new(8), BruteForceMatcher, RansacHomography::default(), config)
    }

    fn synthetic_target_and_frame(offset: (f32, f32)) -> (Target, Vec<Keypoint>, Vec<Descriptor>) {
        let grid: Vec<Point2D> = (0..5)
            .flat_map(|row| (0..4).map(move |col| Point2D::new(col as f32 * 20.0 + 5.0, row as f32 * 15.0 + 5.0)))
            .collect();

        let target_keypoints: Vec<Keypoint> = grid.iter().map(|p| Keypoint::new(p.x, p.y, 1.0)).collect();
        let target_descriptors: Vec<Descriptor> = (0..grid.len()).map(|i| Descriptor::new(vec![(i * 12) as u8])).collect();

        let frame_keypoints: Vec<Keypoint> = grid
            .iter()
            .map(|p| Keypoint::new(p.x + offset.0, p.y + offset.1, 1.0))
            .collect();
        let frame_descriptors = target_descriptors.clone();

        let target = Target::new("t0", 100, 80, target_keypoints, target_descriptors, SparseBow::new());
        (target, frame_keypoints, frame_descriptors)
    }

    #[test]
    fn verify_candidate_succeeds_on_pure_translation() {
        let detector = detector();
        let (target, frame_keypoints, frame_descriptors) = synthetic_target_and_frame((50.0, 30.0));
        let result = detector.verify_candidate(&target, &frame_keypoints, &frame_descriptors);
        assert!(result.success, "reason: {:?}", result.reason);
        assert!(result.score.unwrap() > 0.5);
    }

    #[test]
    fn verify_candidate_fails_with_too_few_matches() {
        let detector = detector();
        let (target, frame_keypoints, frame_descriptors) = synthetic_target_and_frame((50.0, 30.0));
        let result = detector.verify_candidate(&target, &frame_keypoints[..3], &frame_descriptors[..3]);
        assert!(!result.success);
        assert_eq!(result.reason.as_deref(), Some("match_failure"));
    }

    #[test]
    fn non_candidate_targets_are_marked_filtered() {
        let detector = detector();
        let (target, frame_keypoints, frame_descriptors) = synthetic_target_and_frame((50.0, 30.0));
        let targets = vec![Arc::new(target)];
        let empty_candidates: Vec<Candidate> = Vec::new();
        let candidate_ids: HashSet<&str> = empty_candidates.iter().map(|c| c.target_id.as_str()).collect();
        let result = detector.verify_one(&targets[0], &candidate_ids, &frame_keypoints, &frame_descriptors);
        assert!(!result.success);
        assert_eq!(result.reason.as_deref(), Some("filtered"));
    }
}
