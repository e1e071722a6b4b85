//! Crate-wide error type.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SolverError {
    #[error("Invalid rank: {0}")]
    InvalidRank(char),

    #[error("Invalid suit: {0}")]
    InvalidSuit(char),

    #[error("Invalid rank index: {0} (expected 0-12)")]
    InvalidRankIndex(u8),

    #[error("Invalid suit index: {0} (expected 0-3)")]
    InvalidSuitIndex(u8),

    #[error("Invalid card string: {0}")]
    InvalidCardString(String),

    #[error("Board must have 3-5 cards, got {0}")]
    InvalidBoardSize(usize),

    #[error("Duplicate card: {0}")]
    DuplicateCard(String),

    #[error("Invalid hand notation: {0}")]
    InvalidHandNotation(String),

    #[error("Weight must be in [0, 1]: {0}")]
    InvalidWeight(f32),

    #[error("Invalid betting config: {0}")]
    InvalidConfig(String),

    #[error("MmapBuffer overflow in file: {file} (limit: {limit})")]
    BufferOverflow { file: String, limit: usize },

    #[error("No tree has been built")]
    TreeNotBuilt,

    #[error("The {0} range is empty")]
    EmptyRange(&'static str),

    #[error("Unknown node id: {0}")]
    UnknownNode(i32),

    #[error("Failed to build thread pool: {0}")]
    ThreadPool(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SolverResult<T> = Result<T, SolverError>;
