//! Discrete PID controller.
//!
//! Implements the classic three-term law on sampled data:
//! - **Proportional** on the current error
//! - **Integral** accumulated as `error * dt`, clamped to a windup limit
//! - **Derivative** from the backward difference of the error
//!
//! Two practical refinements:
//! - A deadband zeroes the error near the setpoint so actuators are not
//!   chattered by measurement noise
//! - Output is clamped to configured limits so commands stay inside the
//!   range downstream actuators accept

use crate::error::{ControlError, ControlResult};
use serde::{Deserialize, Serialize};

/// PID controller configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidConfig {
    /// Proportional gain.
    pub kp: f64,
    /// Integral gain (applied to the time-weighted error sum).
    pub ki: f64,
    /// Derivative gain (applied to the error rate of change).
    pub kd: f64,
    /// Maximum output value.
    pub upper_limit: f64,
    /// Minimum output value.
    pub lower_limit: f64,
    /// Magnitude bound on the integral accumulator.
    pub windup_limit: f64,
    /// Half-width of the band around the setpoint where error reads as zero.
    pub deadband_width: f64,
}

impl Default for PidConfig {
    fn default() -> Self {
        Self {
            kp: 0.0,
            ki: 0.0,
            kd: 0.0,
            upper_limit: 1.0,
            lower_limit: -1.0,
            windup_limit: 1000.0,
            deadband_width: 0.0,
        }
    }
}

impl PidConfig {
    /// Create a PID configuration with the given gains and default limits.
    ///
    /// # Arguments
    ///
    /// * `kp` - Proportional gain
    /// * `ki` - Integral gain
    /// * `kd` - Derivative gain
    pub fn new(kp: f64, ki: f64, kd: f64) -> ControlResult<Self> {
        if !kp.is_finite() {
            return Err(ControlError::InvalidArg {
                what: "kp must be finite",
            });
        }
        if !ki.is_finite() {
            return Err(ControlError::InvalidArg {
                what: "ki must be finite",
            });
        }
        if !kd.is_finite() {
            return Err(ControlError::InvalidArg {
                what: "kd must be finite",
            });
        }
        Ok(Self {
            kp,
            ki,
            kd,
            ..Self::default()
        })
    }

    /// Set the output limits.
    pub fn with_limits(mut self, lower: f64, upper: f64) -> ControlResult<Self> {
        if !lower.is_finite() || !upper.is_finite() {
            return Err(ControlError::InvalidArg {
                what: "output limits must be finite",
            });
        }
        if lower > upper {
            return Err(ControlError::InvalidArg {
                what: "lower_limit must not exceed upper_limit",
            });
        }
        self.lower_limit = lower;
        self.upper_limit = upper;
        Ok(self)
    }

    /// Set the integral windup limit.
    pub fn with_windup_limit(mut self, limit: f64) -> ControlResult<Self> {
        if !limit.is_finite() || limit < 0.0 {
            return Err(ControlError::InvalidArg {
                what: "windup_limit must be non-negative and finite",
            });
        }
        self.windup_limit = limit;
        Ok(self)
    }

    /// Set the deadband half-width.
    pub fn with_deadband(mut self, width: f64) -> ControlResult<Self> {
        if !width.is_finite() || width < 0.0 {
            return Err(ControlError::InvalidArg {
                what: "deadband_width must be non-negative and finite",
            });
        }
        self.deadband_width = width;
        Ok(self)
    }

    /// Compute one controller update.
    ///
    /// # Arguments
    ///
    /// * `state` - Controller state from the previous cycle
    /// * `measurement` - Process variable (measured value)
    /// * `setpoint` - Desired value
    /// * `dt` - Time since the previous update (seconds)
    ///
    /// A `dt` that is zero, negative, or non-finite contributes no integral
    /// and no derivative: the update degrades to a clamped proportional
    /// output. The first update after a reset behaves the same way for the
    /// derivative term because there is no previous error to difference
    /// against.
    ///
    /// # Returns
    ///
    /// Updated state and the clamped output command.
    pub fn update(
        &self,
        state: &PidState,
        measurement: f64,
        setpoint: f64,
        dt: f64,
    ) -> (PidState, f64) {
        let raw_error = setpoint - measurement;

        // Inside the deadband the whole law sees zero error. Integral
        // history accumulated before entering the band still contributes
        // through the Ki term.
        let error = if raw_error.abs() < self.deadband_width {
            0.0
        } else {
            raw_error
        };

        let dt_usable = dt.is_finite() && dt > 0.0;

        let integral = if dt_usable {
            (state.integral + error * dt).clamp(-self.windup_limit, self.windup_limit)
        } else {
            state.integral
        };

        let derivative = match state.previous_error {
            Some(prev) if dt_usable => (error - prev) / dt,
            _ => 0.0,
        };

        let output_raw = if dt_usable {
            self.kp * error + self.ki * integral + self.kd * derivative
        } else {
            self.kp * error
        };
        let output = output_raw.clamp(self.lower_limit, self.upper_limit);

        let new_state = PidState {
            integral,
            previous_error: Some(error),
        };

        (new_state, output)
    }
}

/// PID controller state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidState {
    /// Time-weighted error accumulator.
    pub integral: f64,
    /// Error from the previous update, if one has happened.
    pub previous_error: Option<f64>,
}

impl Default for PidState {
    fn default() -> Self {
        Self {
            integral: 0.0,
            previous_error: None,
        }
    }
}
