//! Per-frame orchestrator: downscaling, the detect-vs-flow branch, active
//! target selection with hysteresis, and per-target lifecycle management.
//! `Engine` is the single owned value that replaces scattered global mutable
//! state — construct one per tracked video stream.

mod engine;
mod error;
mod resize;
mod selection;
mod stats;
mod traits;

pub use engine::Engine;
pub use error::{Error, Result};
pub use resize::downscale;
pub use selection::{select_active, SelectionInput};
pub use stats::Stats;
pub use traits::{FrameSource, RenderSink};
