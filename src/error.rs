use thiserror::Error;

/// Reasons a single entry is rejected before it reaches the table.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid date: {0}")]
    InvalidDate(String),

    #[error("missing student id")]
    MissingStudentId,

    /// Only raised under [`crate::normalize::StatusPolicy::Strict`].
    #[error("unknown status: {0}")]
    UnknownStatus(String),
}
