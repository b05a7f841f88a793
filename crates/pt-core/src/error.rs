use thiserror::Error;

pub type PtResult<T> = Result<T, PtError>;

/// Errors shared across the phytotron crates.
#[derive(Error, Debug)]
pub enum PtError {
    #[error("Non-finite {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("Unknown {what} {index} (catalog holds {len})")]
    UnknownId {
        what: &'static str,
        index: usize,
        len: usize,
    },
}
