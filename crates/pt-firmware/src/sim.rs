//! Simulated backend for running declarations without hardware.
//!
//! Sensors produce slow sinusoidal drifts around plausible baselines so a
//! demo run shows moving numbers; actuator writes go to the log.

use crate::error::FirmwareResult;
use crate::kind::FirmwareKind;
use crate::traits::{DriverBackend, PwmDevice, Sensor, SwitchDevice};
use std::time::Instant;
use tracing::{debug, info};

/// Backend producing synthetic readings and logging actuator writes.
#[derive(Debug, Clone)]
pub struct SimBackend {
    start: Instant,
}

impl Default for SimBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SimBackend {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

/// Per-channel (baseline, amplitude) for the synthetic drift.
fn channel_profiles(kind: &FirmwareKind) -> &'static [(f64, f64)] {
    match kind {
        FirmwareKind::Am2315 => &[(22.0, 1.5), (55.0, 5.0)],
        FirmwareKind::Mhz16 => &[(450.0, 40.0)],
        FirmwareKind::AtlasPh => &[(6.4, 0.2)],
        FirmwareKind::AtlasEc => &[(1.6, 0.15)],
        _ => &[],
    }
}

impl DriverBackend for SimBackend {
    fn sensor(&self, id: &str, kind: &FirmwareKind) -> FirmwareResult<Box<dyn Sensor>> {
        if !kind.is_sensor() {
            return Err(crate::error::FirmwareError::UnsupportedDevice {
                device: id.to_string(),
                reason: format!("kind '{}' produces no channels", kind.type_name()),
            });
        }
        Ok(Box::new(SimSensor {
            id: id.to_string(),
            kind: kind.clone(),
            start: self.start,
        }))
    }

    fn switch(&self, id: &str, pin: u32) -> FirmwareResult<Box<dyn SwitchDevice>> {
        Ok(Box::new(SimSwitch {
            id: id.to_string(),
            pin,
        }))
    }

    fn pwm(&self, id: &str, pin: u32) -> FirmwareResult<Box<dyn PwmDevice>> {
        Ok(Box::new(SimPwm {
            id: id.to_string(),
            pin,
        }))
    }

    fn open_bridge(&self, id: &str, port: &str) -> FirmwareResult<()> {
        info!(id, port, "simulated serial bridge opened");
        Ok(())
    }
}

struct SimSensor {
    id: String,
    kind: FirmwareKind,
    start: Instant,
}

impl Sensor for SimSensor {
    fn id(&self) -> &str {
        &self.id
    }

    fn sample(&mut self) -> FirmwareResult<Vec<f64>> {
        let t = self.start.elapsed().as_secs_f64();
        let values: Vec<f64> = channel_profiles(&self.kind)
            .iter()
            .enumerate()
            .map(|(i, (baseline, amplitude))| {
                baseline + amplitude * (0.05 * t + 1.3 * i as f64).sin()
            })
            .collect();
        Ok(values)
    }
}

struct SimSwitch {
    id: String,
    pin: u32,
}

impl SwitchDevice for SimSwitch {
    fn set_level(&mut self, high: bool) -> FirmwareResult<()> {
        debug!(id = %self.id, pin = self.pin, high, "switch level set");
        Ok(())
    }
}

struct SimPwm {
    id: String,
    pin: u32,
}

impl PwmDevice for SimPwm {
    fn set_duty(&mut self, duty: f64) -> FirmwareResult<()> {
        debug!(id = %self.id, pin = self.pin, duty, "pwm duty set");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sim_sensor_produces_one_value_per_channel() {
        let backend = SimBackend::new();
        let mut am2315 = backend.sensor("am2315_1", &FirmwareKind::Am2315).unwrap();
        let values = am2315.sample().unwrap();
        assert_eq!(values.len(), 2);
        // Near the baselines, within the drift amplitude.
        assert!((values[0] - 22.0).abs() <= 1.5);
        assert!((values[1] - 55.0).abs() <= 5.0);

        let mut mhz16 = backend.sensor("mhz16_1", &FirmwareKind::Mhz16).unwrap();
        assert_eq!(mhz16.sample().unwrap().len(), 1);
    }

    #[test]
    fn sim_actuators_accept_writes() {
        let backend = SimBackend::new();
        let mut switch = backend.switch("heater_1", 7).unwrap();
        assert!(switch.set_level(true).is_ok());
        let mut pwm = backend.pwm("light_1", 9).unwrap();
        assert!(pwm.set_duty(0.5).is_ok());
        assert!(backend.open_bridge("serial_1", "/dev/ttyACM0").is_ok());
    }
}
