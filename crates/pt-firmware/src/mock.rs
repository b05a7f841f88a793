//! Scriptable mock backend for tests.
//!
//! Every handle is a cheap clone around shared state: tests keep one clone
//! to script readings and inspect writes while the runtime owns the other.

use crate::error::{FirmwareError, FirmwareResult};
use crate::kind::FirmwareKind;
use crate::traits::{DriverBackend, PwmDevice, Sensor, SwitchDevice};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A poisoned mock just means some other test thread panicked; the
    // recorded state is still the best evidence available.
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Mock sensor with a scripted queue of readings and failures.
#[derive(Debug, Clone)]
pub struct MockSensor {
    id: String,
    inner: Arc<Mutex<SensorInner>>,
}

#[derive(Debug, Default)]
struct SensorInner {
    script: VecDeque<Result<Vec<f64>, String>>,
    last: Option<Vec<f64>>,
    hold_last: bool,
    reads: usize,
}

impl MockSensor {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            inner: Arc::new(Mutex::new(SensorInner::default())),
        }
    }

    /// Queue one successful reading.
    pub fn push_reading(&self, values: impl Into<Vec<f64>>) {
        lock(&self.inner).script.push_back(Ok(values.into()));
    }

    /// Queue one failed reading.
    pub fn push_failure(&self, reason: impl Into<String>) {
        lock(&self.inner).script.push_back(Err(reason.into()));
    }

    /// When the script runs out, keep returning the last good reading
    /// instead of failing.
    pub fn hold_last(&self, hold: bool) {
        lock(&self.inner).hold_last = hold;
    }

    /// Number of `sample` calls seen so far.
    pub fn reads(&self) -> usize {
        lock(&self.inner).reads
    }
}

impl Sensor for MockSensor {
    fn id(&self) -> &str {
        &self.id
    }

    fn sample(&mut self) -> FirmwareResult<Vec<f64>> {
        let mut inner = lock(&self.inner);
        inner.reads += 1;
        if let Some(next) = inner.script.pop_front() {
            return match next {
                Ok(values) => {
                    inner.last = Some(values.clone());
                    Ok(values)
                }
                Err(reason) => Err(FirmwareError::ReadFailed {
                    device: self.id.clone(),
                    reason,
                }),
            };
        }
        if inner.hold_last && let Some(last) = &inner.last {
            return Ok(last.clone());
        }
        Err(FirmwareError::ReadFailed {
            device: self.id.clone(),
            reason: "no scripted reading".to_string(),
        })
    }
}

/// Mock on/off line recording every level written.
#[derive(Debug, Clone, Default)]
pub struct MockSwitch {
    inner: Arc<Mutex<SwitchInner>>,
}

#[derive(Debug, Default)]
struct SwitchInner {
    level: bool,
    history: Vec<bool>,
    failures: u32,
}

impl MockSwitch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current electrical level.
    pub fn level(&self) -> bool {
        lock(&self.inner).level
    }

    /// Every level written, in order.
    pub fn history(&self) -> Vec<bool> {
        lock(&self.inner).history.clone()
    }

    /// Make the next `times` writes fail.
    pub fn fail_next(&self, times: u32) {
        lock(&self.inner).failures = times;
    }
}

impl SwitchDevice for MockSwitch {
    fn set_level(&mut self, high: bool) -> FirmwareResult<()> {
        let mut inner = lock(&self.inner);
        if inner.failures > 0 {
            inner.failures -= 1;
            return Err(FirmwareError::WriteFailed {
                device: "mock switch".to_string(),
                reason: "scripted failure".to_string(),
            });
        }
        inner.level = high;
        inner.history.push(high);
        Ok(())
    }
}

/// Mock PWM line recording every duty written.
#[derive(Debug, Clone, Default)]
pub struct MockPwm {
    inner: Arc<Mutex<PwmInner>>,
}

#[derive(Debug, Default)]
struct PwmInner {
    duty: f64,
    history: Vec<f64>,
    failures: u32,
}

impl MockPwm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current duty cycle.
    pub fn duty(&self) -> f64 {
        lock(&self.inner).duty
    }

    /// Every duty written, in order.
    pub fn history(&self) -> Vec<f64> {
        lock(&self.inner).history.clone()
    }

    /// Make the next `times` writes fail.
    pub fn fail_next(&self, times: u32) {
        lock(&self.inner).failures = times;
    }
}

impl PwmDevice for MockPwm {
    fn set_duty(&mut self, duty: f64) -> FirmwareResult<()> {
        let mut inner = lock(&self.inner);
        if inner.failures > 0 {
            inner.failures -= 1;
            return Err(FirmwareError::WriteFailed {
                device: "mock pwm".to_string(),
                reason: "scripted failure".to_string(),
            });
        }
        inner.duty = duty;
        inner.history.push(duty);
        Ok(())
    }
}

/// Backend handing out mock devices and remembering every handle by
/// module id, so tests can reach devices the runtime constructed.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    inner: Arc<Mutex<BackendInner>>,
}

#[derive(Debug, Default)]
struct BackendInner {
    sensors: HashMap<String, MockSensor>,
    switches: HashMap<String, MockSwitch>,
    pwms: HashMap<String, MockPwm>,
    bridges: Vec<(String, String)>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to the mock sensor created for `id`, if any.
    pub fn sensor_handle(&self, id: &str) -> Option<MockSensor> {
        lock(&self.inner).sensors.get(id).cloned()
    }

    /// Handle to the mock switch created for `id`, if any.
    pub fn switch_handle(&self, id: &str) -> Option<MockSwitch> {
        lock(&self.inner).switches.get(id).cloned()
    }

    /// Handle to the mock PWM line created for `id`, if any.
    pub fn pwm_handle(&self, id: &str) -> Option<MockPwm> {
        lock(&self.inner).pwms.get(id).cloned()
    }

    /// Bridges opened so far as `(module id, port)`.
    pub fn bridge_log(&self) -> Vec<(String, String)> {
        lock(&self.inner).bridges.clone()
    }
}

impl DriverBackend for MockBackend {
    fn sensor(&self, id: &str, kind: &FirmwareKind) -> FirmwareResult<Box<dyn Sensor>> {
        if !kind.is_sensor() {
            return Err(FirmwareError::UnsupportedDevice {
                device: id.to_string(),
                reason: format!("kind '{}' produces no channels", kind.type_name()),
            });
        }
        let sensor = MockSensor::new(id);
        lock(&self.inner)
            .sensors
            .insert(id.to_string(), sensor.clone());
        Ok(Box::new(sensor))
    }

    fn switch(&self, id: &str, _pin: u32) -> FirmwareResult<Box<dyn SwitchDevice>> {
        let switch = MockSwitch::new();
        lock(&self.inner)
            .switches
            .insert(id.to_string(), switch.clone());
        Ok(Box::new(switch))
    }

    fn pwm(&self, id: &str, _pin: u32) -> FirmwareResult<Box<dyn PwmDevice>> {
        let pwm = MockPwm::new();
        lock(&self.inner).pwms.insert(id.to_string(), pwm.clone());
        Ok(Box::new(pwm))
    }

    fn open_bridge(&self, id: &str, port: &str) -> FirmwareResult<()> {
        lock(&self.inner)
            .bridges
            .push((id.to_string(), port.to_string()));
        Ok(())
    }
}
