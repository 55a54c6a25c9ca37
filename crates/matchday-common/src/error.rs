//! Error types shared across Matchday crates

use thiserror::Error;

/// Result type alias for Matchday operations
pub type Result<T> = std::result::Result<T, MatchdayError>;

/// Main error type for Matchday
#[derive(Error, Debug)]
pub enum MatchdayError {
    #[error("Unknown subject kind: {0}")]
    UnknownSubjectKind(String),
}

