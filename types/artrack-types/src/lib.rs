//! Shared data model for the artrack planar target tracking engine.
//!
//! This crate has no knowledge of detection, flow, or scheduling; it only
//! defines the value types those crates pass to each other, so that none of
//! them need to depend on one another just to share a struct definition.

mod bow;
mod config;
mod descriptor;
mod frame;
mod keypoint;
mod quad;
mod target;
pub mod wire;

pub use bow::SparseBow;
pub use config::{Config, ConfigError};
pub use descriptor::Descriptor;
pub use frame::{Frame, FrameResult, GrayImage, Mode, PerTarget};
pub use keypoint::{Keypoint, Point2D};
pub use quad::{Quad, QuadBounds, QuadError};
pub use target::{Target, TargetStatus};
