//! Error types for control law configuration.

use thiserror::Error;

/// Result type for control operations.
pub type ControlResult<T> = Result<T, ControlError>;

/// Errors that can occur configuring a controller.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ControlError {
    /// Invalid argument provided to a control constructor.
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },
}
