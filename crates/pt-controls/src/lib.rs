//! Control law implementations for phytotron.
//!
//! Controllers are pure functions over explicit state:
//! - Configuration structs carry the tuning and are validated at creation
//! - State structs carry what persists between cycles
//! - `update` maps (state, inputs) to (new state, output) without side effects
//!
//! The scheduler owns when controllers run and what they read; this crate
//! owns only the arithmetic. Stale-input policy therefore lives outside:
//! a controller that is not updated keeps its state untouched.

pub mod direct;
pub mod error;
pub mod kind;
pub mod pid;

pub use direct::DirectController;
pub use error::{ControlError, ControlResult};
pub use kind::{ControllerKind, ControllerState};
pub use pid::{PidConfig, PidState};
