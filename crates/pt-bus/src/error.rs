//! Error types for bus operations.

use std::sync::PoisonError;
use thiserror::Error;

/// Result type for bus operations.
pub type BusResult<T> = Result<T, BusError>;

/// Errors that can occur accessing the variable bus.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    /// The bus lock was poisoned by a panicking writer.
    #[error("variable bus lock poisoned")]
    Poisoned,
}

impl<T> From<PoisonError<T>> for BusError {
    fn from(_: PoisonError<T>) -> Self {
        BusError::Poisoned
    }
}
