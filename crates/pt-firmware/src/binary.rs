//! On/off actuator conditioning.

use crate::error::{FirmwareError, FirmwareResult};
use crate::traits::{Actuator, SwitchDevice};

/// Threshold above which a command reads as logical "on".
pub const ON_THRESHOLD: f64 = 0.0;

/// Conditions a continuous command onto an on/off output line.
///
/// A command strictly above [`ON_THRESHOLD`] switches the device on. With
/// `active_low` set, the electrical level representing "on" is inverted,
/// matching relay boards that energize on a low pin.
pub struct BinaryActuator {
    id: String,
    active_low: bool,
    device: Box<dyn SwitchDevice>,
}

impl BinaryActuator {
    pub fn new(id: impl Into<String>, active_low: bool, device: Box<dyn SwitchDevice>) -> Self {
        Self {
            id: id.into(),
            active_low,
            device,
        }
    }

    fn level_for(&self, on: bool) -> bool {
        on != self.active_low
    }
}

impl Actuator for BinaryActuator {
    fn id(&self) -> &str {
        &self.id
    }

    fn apply(&mut self, command: f64) -> FirmwareResult<()> {
        if !command.is_finite() {
            return Err(FirmwareError::NonFiniteCommand {
                device: self.id.clone(),
                value: command,
            });
        }
        let on = command > ON_THRESHOLD;
        let level = self.level_for(on);
        self.device.set_level(level)
    }

    fn safe(&mut self) -> FirmwareResult<()> {
        let level = self.level_for(false);
        self.device.set_level(level)
    }
}
