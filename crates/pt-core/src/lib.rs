//! pt-core: shared foundation for the phytotron workspace.
//!
//! Interned-name handles for plan catalogs, the common error type, and
//! the finite-value guard applied wherever numbers cross a crate
//! boundary.

pub mod error;
pub mod ids;
pub mod numeric;

pub use error::{PtError, PtResult};
pub use ids::{EnvId, Id, VarId};
pub use numeric::ensure_finite;
