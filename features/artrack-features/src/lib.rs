//! Trait abstractions over the BRISK-family detector, descriptor matcher,
//! RANSAC homography estimator, similarity fallback fit, and pyramidal
//! optical flow tracker that the rest of artrack is built against, plus a
//! deterministic reference implementation of each for tests and the demo
//! CLI.

mod traits;

pub mod reference;

pub use traits::{
    DescriptorMatch, DescriptorMatcher, FeatureExtractor, FlowPoint, HomographyEstimator,
    HomographyMatrix, OpticalFlow, SimilarityEstimator,
};
