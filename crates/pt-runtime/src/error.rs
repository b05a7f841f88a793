//! Error types for the pt-runtime assembly and control loop.

use pt_bus::BusError;
use pt_core::PtError;
use pt_firmware::FirmwareError;
use pt_manifest::ManifestError;

use crate::resolve::ResolveError;

/// Runtime error type that wraps errors from the backend crates and the
/// resolver into a single interface for the control loop and the CLI.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    #[error("Resolve error: {0}")]
    Resolve(#[from] ResolveError),

    #[error("Firmware error: {0}")]
    Firmware(#[from] FirmwareError),

    #[error("Variable bus error: {0}")]
    Bus(#[from] BusError),

    #[error(transparent)]
    Core(#[from] PtError),

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Unknown variable '{variable}' in environment '{environment}'")]
    UnknownKey {
        environment: String,
        variable: String,
    },
}

/// Result type for pt-runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
