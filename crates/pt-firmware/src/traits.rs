//! Traits at the firmware boundary.
//!
//! Two layers:
//! - [`Sensor`] and [`Actuator`] are what the runtime schedules against.
//! - [`SwitchDevice`] and [`PwmDevice`] are the raw electrical operations a
//!   backend provides; the conditioning adapters in this crate sit between
//!   the two.
//!
//! A [`DriverBackend`] turns resolved module declarations into live device
//! handles. Swapping the backend swaps the hardware story (mock, simulated,
//! real) without touching the control side.

use crate::error::FirmwareResult;
use crate::kind::FirmwareKind;

/// A polled input device producing one value per declared channel.
pub trait Sensor: Send {
    /// Declared module id, for logs and fault reports.
    fn id(&self) -> &str;

    /// Take one reading.
    ///
    /// Values align positionally with the kind's [`channels`]. A sensor that
    /// cannot currently produce a reading fails the call rather than
    /// repeating an old value; staleness accounting happens upstream.
    ///
    /// [`channels`]: FirmwareKind::channels
    fn sample(&mut self) -> FirmwareResult<Vec<f64>>;
}

/// A command-consuming output device.
pub trait Actuator: Send {
    /// Declared module id, for logs and fault reports.
    fn id(&self) -> &str;

    /// Apply a conditioned command.
    fn apply(&mut self, command: f64) -> FirmwareResult<()>;

    /// Drive the device to its safe state (off, zero duty).
    fn safe(&mut self) -> FirmwareResult<()>;
}

/// Raw on/off output line.
pub trait SwitchDevice: Send {
    /// Set the electrical level: `true` = high.
    fn set_level(&mut self, high: bool) -> FirmwareResult<()>;
}

/// Raw PWM output line.
pub trait PwmDevice: Send {
    /// Set the duty cycle. Callers guarantee `duty` is in `[0, 1]`.
    fn set_duty(&mut self, duty: f64) -> FirmwareResult<()>;
}

/// Factory for live device handles.
pub trait DriverBackend {
    /// Instantiate the driver for a producing (sensor) kind.
    fn sensor(&self, id: &str, kind: &FirmwareKind) -> FirmwareResult<Box<dyn Sensor>>;

    /// Instantiate the on/off line behind a binary actuator.
    fn switch(&self, id: &str, pin: u32) -> FirmwareResult<Box<dyn SwitchDevice>>;

    /// Instantiate the PWM line behind a pwm actuator.
    fn pwm(&self, id: &str, pin: u32) -> FirmwareResult<Box<dyn PwmDevice>>;

    /// Open a serial transport to an attached peripheral board.
    fn open_bridge(&self, id: &str, port: &str) -> FirmwareResult<()>;
}
