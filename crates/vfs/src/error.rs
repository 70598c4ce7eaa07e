use thiserror::Error;

pub type Result<T> = std::result::Result<T, PoolError>;

/// Errors raised by the bounded reader pool
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// The pool was configured with fewer than one concurrent reader
    #[error("invalid ConcurrentReaders value {0}: at least 1 concurrent reader is required")]
    InvalidCapacity(usize),
}
