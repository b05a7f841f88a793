//! Controller kinds and their per-loop state.

use crate::direct::DirectController;
use crate::pid::{PidConfig, PidState};
use serde::{Deserialize, Serialize};

/// A configured controller of some kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ControllerKind {
    /// Passthrough of the desired value.
    Direct(DirectController),
    /// Three-term feedback controller.
    Pid(PidConfig),
}

impl ControllerKind {
    /// Registry name, as declared in a manifest.
    pub fn type_name(&self) -> &'static str {
        match self {
            ControllerKind::Direct(_) => "direct_controller",
            ControllerKind::Pid(_) => "pid",
        }
    }

    /// Fresh state matching this kind.
    pub fn initial_state(&self) -> ControllerState {
        match self {
            ControllerKind::Direct(_) => ControllerState::Direct,
            ControllerKind::Pid(_) => ControllerState::Pid(PidState::default()),
        }
    }

    /// Whether this kind consumes a measured process variable.
    pub fn needs_measurement(&self) -> bool {
        matches!(self, ControllerKind::Pid(_))
    }
}

/// Per-loop controller state, paired with a [`ControllerKind`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ControllerState {
    Direct,
    Pid(PidState),
}
