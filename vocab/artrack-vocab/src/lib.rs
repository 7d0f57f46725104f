//! Vocabulary-tree retrieval: an offline hierarchical k-means builder
//! ([`builder`]) and a runtime TF-IDF weighted cosine similarity query
//! ([`query`]) over the resulting flat leaf codebook ([`tree::Vocabulary`]).

pub mod builder;
mod error;
mod query;
mod tree;

pub use builder::{to_database, BuildReport, BuildWarning, TargetSource, MIN_KEYPOINTS_FOR_QUERY, VOCAB_BUILD_SEED};
pub use error::{Error, Result};
pub use query::Candidate;
pub use tree::{Vocabulary, Word};
