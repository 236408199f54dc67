// Error types for boxed value access.

use thiserror::Error;

use crate::handles::SexpType;

/// Misuse of the boxed value capability.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SexpError {
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: SexpType, found: SexpType },

    #[error("index {index} out of range for vector of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("length mismatch: expected {expected}, found {found}")]
    LengthMismatch { expected: usize, found: usize },

    #[error("names attribute has length {names}, vector has length {len}")]
    NamesLength { names: usize, len: usize },

    #[error("cannot unprotect {requested} values with {depth} protected")]
    Unprotect { requested: usize, depth: usize },

    #[error("cannot allocate a vector of kind {0}")]
    NotAllocatable(SexpType),

    #[error("invalid handle {0}")]
    InvalidHandle(u32),
}

/// Result alias for boxed value operations.
pub type SexpResult<T> = Result<T, SexpError>;
