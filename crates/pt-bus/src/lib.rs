//! pt-bus: the shared variable bus.
//!
//! Every environmental quantity lives here as a timestamped sample keyed by
//! `(environment, plane, variable)`. Sensor tasks write the measured plane,
//! setpoints sit on the desired plane, controllers publish to the commanded
//! plane. Readers work from whole-bus snapshots so a control cycle sees one
//! consistent set of values, and staleness is always surfaced explicitly
//! rather than hidden behind a reused number.

pub mod bus;
pub mod error;
pub mod key;

pub use bus::{BusSnapshot, Sample, VariableBus};
pub use error::{BusError, BusResult};
pub use key::{Plane, VarKey};
