//! Error types for the firmware boundary.

use thiserror::Error;

/// Result type for firmware operations.
pub type FirmwareResult<T> = Result<T, FirmwareError>;

/// Errors crossing the firmware boundary.
///
/// Read and write failures carry the declared module id so faults in a
/// running system can be traced back to one line of the declaration.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FirmwareError {
    /// A command reaching an actuator was not a usable number.
    #[error("Non-finite command for '{device}': {value}")]
    NonFiniteCommand { device: String, value: f64 },

    /// A sensor read failed at the device level.
    #[error("Read failed on '{device}': {reason}")]
    ReadFailed { device: String, reason: String },

    /// An actuator write failed at the device level.
    #[error("Write failed on '{device}': {reason}")]
    WriteFailed { device: String, reason: String },

    /// A backend was asked for a device its kind cannot provide.
    #[error("Unsupported device request for '{device}': {reason}")]
    UnsupportedDevice { device: String, reason: String },

    /// Invalid argument provided to a firmware constructor.
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },
}
