//! The variable bus and its snapshots.

use crate::error::BusResult;
use crate::key::{Plane, VarKey};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// One published value and the instant it was published.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub value: f64,
    pub at: Instant,
}

/// Shared, thread-safe variable store.
///
/// Writes replace the keyed sample atomically (value and timestamp move
/// together). Reads for control purposes should go through [`snapshot`]
/// so one cycle evaluates against one consistent view.
///
/// [`snapshot`]: VariableBus::snapshot
#[derive(Debug, Default)]
pub struct VariableBus {
    inner: RwLock<HashMap<VarKey, Sample>>,
}

impl VariableBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `value` under `key`, timestamped `now`.
    pub fn set(&self, key: VarKey, value: f64, now: Instant) -> BusResult<()> {
        let mut map = self.inner.write()?;
        map.insert(key, Sample { value, at: now });
        Ok(())
    }

    /// Read back a single sample. Control paths should prefer [`snapshot`].
    ///
    /// [`snapshot`]: VariableBus::snapshot
    pub fn get(&self, key: VarKey) -> BusResult<Option<Sample>> {
        let map = self.inner.read()?;
        Ok(map.get(&key).copied())
    }

    /// Capture the whole bus as of `now`.
    ///
    /// Writes that land after the snapshot is taken are not visible through
    /// it, so a controller never observes another controller's same-cycle
    /// output.
    pub fn snapshot(&self, now: Instant) -> BusResult<BusSnapshot> {
        let map = self.inner.read()?;
        Ok(BusSnapshot {
            taken_at: now,
            values: map.clone(),
        })
    }

    pub fn len(&self) -> BusResult<usize> {
        Ok(self.inner.read()?.len())
    }

    pub fn is_empty(&self) -> BusResult<bool> {
        Ok(self.inner.read()?.is_empty())
    }
}

/// Immutable view of the bus at one instant.
#[derive(Debug, Clone)]
pub struct BusSnapshot {
    taken_at: Instant,
    values: HashMap<VarKey, Sample>,
}

impl BusSnapshot {
    /// The instant this snapshot was captured.
    pub fn taken_at(&self) -> Instant {
        self.taken_at
    }

    /// Raw sample under `key`, regardless of age.
    pub fn sample(&self, key: VarKey) -> Option<Sample> {
        self.values.get(&key).copied()
    }

    /// Age of the keyed sample relative to the snapshot instant.
    pub fn age(&self, key: VarKey) -> Option<Duration> {
        self.values
            .get(&key)
            .map(|s| self.taken_at.saturating_duration_since(s.at))
    }

    /// Value under `key` if present and no older than `max_age`.
    ///
    /// A stale sample yields `None`, never a silently reused number.
    /// Desired-plane keys are exempt from aging: a setpoint stands until
    /// it is replaced.
    pub fn fresh(&self, key: VarKey, max_age: Duration) -> Option<f64> {
        let sample = self.values.get(&key)?;
        if key.plane == Plane::Desired {
            return Some(sample.value);
        }
        if self.taken_at.saturating_duration_since(sample.at) <= max_age {
            Some(sample.value)
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
