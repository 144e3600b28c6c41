use thiserror::Error;

/// Validation failures for memory candidates.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MemoryError {
    #[error("Importance must be within [0, 1], got {0}")]
    InvalidImportance(f64),
    #[error("Memory content must not be blank")]
    EmptyContent,
    #[error("Unknown memory type: {0}")]
    UnknownType(String),
}
