use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("cannot build a vocabulary from zero descriptors")]
    EmptyCorpus,
    #[error("branching_factor must be at least 2, got {0}")]
    InvalidBranchingFactor(u32),
    #[error("levels must be at least 1, got {0}")]
    InvalidLevels(u32),
}

pub type Result<T> = std::result::Result<T, Error>;
