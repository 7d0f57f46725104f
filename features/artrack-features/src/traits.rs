use artrack_types::{Descriptor, GrayImage, Keypoint, Point2D};

/// A keypoint detector/descriptor pair of the BRISK family: rotation- and
/// scale-aware keypoints with a scalar response, a fixed-length binary
/// descriptor. Detector and descriptor computation are split into two calls
/// so callers can select the top-response keypoints (§4.3 step 3) before
/// paying for descriptor computation.
pub trait FeatureExtractor: Send + Sync {
    /// Detect keypoints in a grayscale image. No cap is applied here; the
    /// caller selects top-response keypoints before calling
    /// [`FeatureExtractor::compute`].
    fn detect(&self, image: &GrayImage) -> Vec<Keypoint>;

    /// Compute descriptors for the given keypoints, in the same order.
    fn compute(&self, image: &GrayImage, keypoints: &[Keypoint]) -> Vec<Descriptor>;

    /// Descriptor length in bytes (64 for the BRISK family).
    fn descriptor_length(&self) -> usize;
}

/// A single KNN match result: `train_idx` indexes the matcher's `train` set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorMatch {
    pub query_idx: usize,
    pub train_idx: usize,
    pub distance: u32,
}

/// A brute-force Hamming matcher. Implementations are expected to be
/// expensive to construct and cheap to reuse — the detector constructs one
/// per call and reuses it across every candidate target (§4.3 "Reuse").
pub trait DescriptorMatcher {
    /// For each query descriptor, return up to `k` nearest train descriptors
    /// ordered by ascending distance. A query with fewer than `k` candidates
    /// available returns as many as it found.
    fn knn_match(&self, query: &[Descriptor], train: &[Descriptor], k: usize) -> Vec<Vec<DescriptorMatch>>;
}

/// A 3x3 row-major projective transform.
pub type HomographyMatrix = [[f64; 3]; 3];

/// RANSAC-based homography estimation between two point sets of equal
/// length, `src[i] <-> dst[i]`.
pub trait HomographyEstimator {
    /// Returns the estimated homography and an inlier mask (same length as
    /// `src`/`dst`), or `None` if no homography could be estimated (too few
    /// points, or RANSAC found no consensus set).
    fn estimate(
        &self,
        src: &[Point2D],
        dst: &[Point2D],
        reproj_threshold: f32,
    ) -> Option<(HomographyMatrix, Vec<bool>)>;
}

/// Least-squares similarity (uniform scale + rotation + translation) fit,
/// used by the flow tracker as a fallback when a full homography is
/// unavailable or degenerate (§4.4 step 4).
pub trait SimilarityEstimator {
    fn fit(&self, src: &[Point2D], dst: &[Point2D]) -> Option<HomographyMatrix>;
}

/// Result of tracking one point with pyramidal Lucas-Kanade.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowPoint {
    pub point: Point2D,
    pub status: bool,
    /// Forward-backward reprojection error in pixels; only meaningful when
    /// `status` is true.
    pub fb_error: f32,
}

/// Pyramidal sparse optical flow.
pub trait OpticalFlow {
    /// Track `prev_points` from `prev` into `curr`, one output per input
    /// point, in the same order.
    fn track(&self, prev: &GrayImage, curr: &GrayImage, prev_points: &[Point2D]) -> Vec<FlowPoint>;
}
