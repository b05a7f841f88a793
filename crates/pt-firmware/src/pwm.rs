//! PWM actuator conditioning.

use crate::error::{FirmwareError, FirmwareResult};
use crate::traits::{Actuator, PwmDevice};

/// Conditions a continuous command onto a PWM output line.
///
/// Commands are clamped into `[0, 1]` duty so an aggressive controller
/// cannot ask the hardware for more than full scale.
pub struct PwmActuator {
    id: String,
    device: Box<dyn PwmDevice>,
}

impl PwmActuator {
    pub fn new(id: impl Into<String>, device: Box<dyn PwmDevice>) -> Self {
        Self {
            id: id.into(),
            device,
        }
    }
}

impl Actuator for PwmActuator {
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
        let duty = command.clamp(0.0, 1.0);
        self.device.set_duty(duty)
    }

    fn safe(&mut self) -> FirmwareResult<()> {
        self.device.set_duty(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockPwm;

    #[test]
    fn duty_is_clamped_to_unit_range() {
        let pwm = MockPwm::new();
        let mut act = PwmActuator::new("light_1", Box::new(pwm.clone()));

        act.apply(0.6).unwrap();
        assert_eq!(pwm.duty(), 0.6);

        act.apply(1.8).unwrap();
        assert_eq!(pwm.duty(), 1.0);

        act.apply(-0.4).unwrap();
        assert_eq!(pwm.duty(), 0.0);
    }

    #[test]
    fn safe_state_is_zero_duty() {
        let pwm = MockPwm::new();
        let mut act = PwmActuator::new("light_1", Box::new(pwm.clone()));
        act.apply(0.9).unwrap();

        act.safe().unwrap();
        assert_eq!(pwm.duty(), 0.0);
    }

    #[test]
    fn non_finite_command_is_rejected() {
        let pwm = MockPwm::new();
        let mut act = PwmActuator::new("light_1", Box::new(pwm.clone()));

        assert!(act.apply(f64::INFINITY).is_err());
        assert!(act.apply(f64::NAN).is_err());
        assert!(pwm.history().is_empty());
    }
}
