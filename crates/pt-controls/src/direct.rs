//! Direct (passthrough) controller.

use serde::{Deserialize, Serialize};

/// Forwards its input unchanged.
///
/// Exists so a setpoint can be routed through the module graph to an
/// actuator like any other command: the graph stays uniform (every actuator
/// is fed by a software module) and per-binding multipliers still apply at
/// the consuming end. Scaling is deliberately not done here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DirectController;

impl DirectController {
    pub fn new() -> Self {
        Self
    }

    /// Pass the input through.
    pub fn update(&self, input: f64) -> f64 {
        input
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn passes_values_through() {
        let direct = DirectController::new();
        assert_eq!(direct.update(0.75), 0.75);
        assert_eq!(direct.update(-3.0), -3.0);
    }

    proptest! {
        #[test]
        fn passthrough_is_exact(value in -1e6..1e6f64) {
            prop_assert_eq!(DirectController::new().update(value), value);
        }
    }
}
