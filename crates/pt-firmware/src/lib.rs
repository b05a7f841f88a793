//! pt-firmware: the boundary between the control runtime and peripherals.
//!
//! The control side deals only in [`Sensor`] and [`Actuator`]: polled inputs
//! producing channel values and conditioned outputs consuming commands.
//! Behind those sit raw device traits ([`SwitchDevice`], [`PwmDevice`]) a
//! [`DriverBackend`] provides per declared module. This crate ships two
//! backends: a scriptable mock for tests and a simulated one for running
//! declarations without hardware. Real hardware backends implement the same
//! traits out of tree.

pub mod binary;
pub mod error;
pub mod kind;
pub mod mock;
pub mod pwm;
pub mod retry;
pub mod sim;
pub mod traits;

pub use binary::{BinaryActuator, ON_THRESHOLD};
pub use error::{FirmwareError, FirmwareResult};
pub use kind::FirmwareKind;
pub use mock::{MockBackend, MockPwm, MockSensor, MockSwitch};
pub use pwm::PwmActuator;
pub use retry::RetryPolicy;
pub use sim::SimBackend;
pub use traits::{Actuator, DriverBackend, PwmDevice, Sensor, SwitchDevice};
