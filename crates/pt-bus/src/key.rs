//! Bus addressing: variable keys and planes.

use pt_core::{EnvId, VarId};

/// Which face of a variable a key addresses.
///
/// One variable name carries up to three values at a time: what the sensors
/// last measured, what the operator asked for, and what the controllers are
/// commanding. Keeping the planes apart means a controller can never mistake
/// its own output for a measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Plane {
    /// Written by sensor tasks; subject to staleness.
    Measured,
    /// Setpoints written from outside the module graph; persist until replaced.
    Desired,
    /// Written by controllers; consumed by actuator bindings.
    Commanded,
}

/// Bus address of a single value: environment, plane, variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarKey {
    pub env: EnvId,
    pub plane: Plane,
    pub var: VarId,
}

impl VarKey {
    pub fn new(env: EnvId, plane: Plane, var: VarId) -> Self {
        Self { env, plane, var }
    }

    /// Key for the measured plane of `var` in `env`.
    pub fn measured(env: EnvId, var: VarId) -> Self {
        Self::new(env, Plane::Measured, var)
    }

    /// Key for the desired plane of `var` in `env`.
    pub fn desired(env: EnvId, var: VarId) -> Self {
        Self::new(env, Plane::Desired, var)
    }

    /// Key for the commanded plane of `var` in `env`.
    pub fn commanded(env: EnvId, var: VarId) -> Self {
        Self::new(env, Plane::Commanded, var)
    }
}
