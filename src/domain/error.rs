//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent malformed input, failed lookups and rejected edits.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid weight: {0:?}")]
    InvalidWeight(String),

    #[error("invalid grade {text:?}: {reason}")]
    InvalidGrade { text: String, reason: String },

    #[error("invalid letter grade: {0:?}")]
    UnknownLetter(String),

    #[error("invalid assignment heading: {0:?}")]
    InvalidHeading(String),

    #[error("invalid header row: {0}")]
    InvalidHeader(String),

    #[error("invalid student cell: {0:?}")]
    InvalidStudent(String),

    #[error("row {row} has {found} grade cells, expected {expected}")]
    CellCount {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("invalid name: {0:?}")]
    InvalidName(String),

    #[error("invalid letter scale: {0}")]
    InvalidScale(String),

    #[error("duplicate student alias: {0}")]
    DuplicateStudent(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unknown student: {0}")]
    UnknownStudent(String),

    #[error("name already exists: {0}")]
    DuplicateName(String),

    #[error("the root node cannot be removed")]
    RootImmutable,

    #[error("grade of {0} is computed from its children")]
    ComputedGrade(String),
}

impl DomainError {
    /// Malformed text anywhere in the input.
    pub fn is_parse(&self) -> bool {
        matches!(
            self,
            DomainError::InvalidWeight(_)
                | DomainError::InvalidGrade { .. }
                | DomainError::UnknownLetter(_)
                | DomainError::InvalidHeading(_)
                | DomainError::InvalidHeader(_)
                | DomainError::InvalidStudent(_)
                | DomainError::CellCount { .. }
                | DomainError::InvalidName(_)
                | DomainError::InvalidScale(_)
                | DomainError::DuplicateStudent(_)
        )
    }

    /// Qualified name or student alias that does not resolve.
    pub fn is_lookup(&self) -> bool {
        matches!(
            self,
            DomainError::NotFound(_) | DomainError::UnknownStudent(_)
        )
    }

    pub(crate) fn grade(text: &str, reason: impl Into<String>) -> Self {
        DomainError::InvalidGrade {
            text: text.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
