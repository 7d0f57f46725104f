//! Target database loading/validation and per-target runtime tracking
//! state, kept separate from the immutable `artrack_types::Target` data so
//! the latter can be shared cheaply via `Arc`.

mod error;
mod registry;
mod runtime;

pub use error::{Error, Result};
pub use registry::Registry;
pub use runtime::RuntimeState;
