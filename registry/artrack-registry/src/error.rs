use thiserror::Error;

/// A loaded database that fails to round-trip its own invariants is treated
/// as corrupt and fatal — `Registry::load` is the only place this surfaces;
/// once loaded, a `Registry` is assumed sound for the rest of the process.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("unsupported schema version {found}, expected {expected}")]
    SchemaVersionMismatch { found: u16, expected: u16 },
    #[error("database declares {declared} targets but carries {actual}")]
    TargetCountMismatch { declared: u32, actual: usize },
    #[error("target {target_id} has {keypoints} keypoints but {descriptor_bytes} descriptor bytes, not a multiple of descriptor_length {descriptor_length}")]
    TruncatedDescriptors {
        target_id: String,
        keypoints: usize,
        descriptor_bytes: usize,
        descriptor_length: u32,
    },
    #[error("target {target_id} bow references word {word_id}, but the vocabulary only has {vocab_size} words")]
    DanglingBowWordReference {
        target_id: String,
        word_id: u32,
        vocab_size: usize,
    },
    #[error("vocabulary has {vocab_words} words but idf table has {idf_entries} entries")]
    IdfTableSizeMismatch { vocab_words: usize, idf_entries: usize },
    #[error("database declares zero targets")]
    EmptyDatabase,
    #[error("target id {target_id:?} is not unique")]
    DuplicateTargetId { target_id: String },
}

pub type Result<T> = std::result::Result<T, Error>;
