//! The closed registry of firmware module kinds.
//!
//! Each kind names a concrete peripheral the runtime knows how to drive.
//! Sensors declare which variables they produce and how often they are
//! polled; actuators declare how commands are conditioned. Positional
//! arguments from the declaration are decoded per kind before one of these
//! is constructed, never interpreted generically.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A firmware module kind with its decoded arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FirmwareKind {
    /// Pulse-width actuator: duty cycle command in `[0, 1]`.
    PwmActuator { pin: u32 },
    /// On/off actuator: command above the threshold switches on.
    /// `active_low` inverts the electrical level that represents "on".
    BinaryActuator { pin: u32, active_low: bool },
    /// Combined air temperature and humidity sensor.
    Am2315,
    /// NDIR carbon dioxide sensor.
    Mhz16,
    /// Potential-of-hydrogen probe.
    AtlasPh,
    /// Electrical conductivity probe.
    AtlasEc,
    /// Serial transport to an attached peripheral board. Produces and
    /// consumes no variables itself.
    SerialBridge { port: String },
}

impl FirmwareKind {
    /// The declaration type string this kind answers to.
    pub fn type_name(&self) -> &'static str {
        match self {
            FirmwareKind::PwmActuator { .. } => "pwm_actuator",
            FirmwareKind::BinaryActuator { .. } => "binary_actuator",
            FirmwareKind::Am2315 => "am2315",
            FirmwareKind::Mhz16 => "mhz16",
            FirmwareKind::AtlasPh => "atlas_ph",
            FirmwareKind::AtlasEc => "atlas_ec",
            FirmwareKind::SerialBridge { .. } => "serial_bridge",
        }
    }

    /// Measured variables this kind produces, in channel order.
    pub fn channels(&self) -> &'static [&'static str] {
        match self {
            FirmwareKind::Am2315 => &["air_temperature", "air_humidity"],
            FirmwareKind::Mhz16 => &["air_carbon_dioxide"],
            FirmwareKind::AtlasPh => &["water_potential_hydrogen"],
            FirmwareKind::AtlasEc => &["water_electrical_conductivity"],
            _ => &[],
        }
    }

    /// Poll interval for producing kinds.
    pub fn poll_interval(&self) -> Option<Duration> {
        match self {
            FirmwareKind::Am2315 | FirmwareKind::AtlasPh | FirmwareKind::AtlasEc => {
                Some(Duration::from_secs(2))
            }
            FirmwareKind::Mhz16 => Some(Duration::from_secs(5)),
            _ => None,
        }
    }

    pub fn is_sensor(&self) -> bool {
        !self.channels().is_empty()
    }

    pub fn is_actuator(&self) -> bool {
        matches!(
            self,
            FirmwareKind::PwmActuator { .. } | FirmwareKind::BinaryActuator { .. }
        )
    }

    pub fn is_bridge(&self) -> bool {
        matches!(self, FirmwareKind::SerialBridge { .. })
    }
}
