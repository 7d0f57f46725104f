//! Per-target optical-flow tracking between detections: samples points from
//! the previous quad, tracks them with pyramidal Lucas-Kanade, fits a
//! homography (or a similarity transform when the homography is weak or
//! degenerate) and Kalman-smooths the resulting scale/rotation/aspect triple.

mod error;
mod geometry;
mod result;
mod sampling;
mod state;
mod tracker;

pub use error::Error;
pub use geometry::ShapeParams;
pub use result::FlowResult;
pub use state::TrackerState;
pub use tracker::FlowTracker;
