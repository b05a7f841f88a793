//! Sensor acquisition pump: one polling thread per physical driver.
//!
//! Each driver publishes into the measured plane on its own schedule and
//! never reads anything back. A slow or failing sensor cannot stall the
//! control loop; its variable simply ages into staleness and the consuming
//! controllers hold.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use pt_bus::VariableBus;
use pt_core::ensure_finite;
use pt_firmware::{RetryPolicy, Sensor};
use tracing::{debug, error, warn};

use crate::plan::PlannedSensor;

/// A sensor driver paired with its plan entry.
pub struct PumpSensor {
    pub planned: PlannedSensor,
    pub driver: Box<dyn Sensor>,
}

struct Worker {
    module_id: String,
    handle: JoinHandle<()>,
}

/// Running acquisition threads, joined on [`SensorPump::stop`].
pub struct SensorPump {
    stop: Arc<AtomicBool>,
    workers: Vec<Worker>,
}

impl SensorPump {
    /// Starts one polling thread per sensor.
    pub fn start(sensors: Vec<PumpSensor>, bus: Arc<VariableBus>, retry: RetryPolicy) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let workers = sensors
            .into_iter()
            .map(|sensor| {
                let module_id = sensor.planned.module_id.clone();
                let bus = Arc::clone(&bus);
                let stop_flag = Arc::clone(&stop);
                let handle = thread::spawn(move || poll_loop(sensor, bus, retry, stop_flag));
                Worker { module_id, handle }
            })
            .collect();
        Self { stop, workers }
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Signals every thread to stop and joins them.
    pub fn stop(mut self) {
        self.stop.store(true, Ordering::Relaxed);
        for worker in self.workers.drain(..) {
            if worker.handle.join().is_err() {
                error!(module = %worker.module_id, "sensor thread panicked");
            }
        }
    }
}

fn poll_loop(
    mut sensor: PumpSensor,
    bus: Arc<VariableBus>,
    retry: RetryPolicy,
    stop: Arc<AtomicBool>,
) {
    let interval = sensor.planned.poll_interval;
    debug!(module = %sensor.planned.module_id, ?interval, "sensor thread started");
    while !stop.load(Ordering::Relaxed) {
        match retry.run("sensor read", || sensor.driver.sample()) {
            Ok(values) => publish(&sensor.planned, &values, &bus),
            Err(e) => {
                // The variable ages into staleness; consumers hold.
                error!(module = %sensor.planned.module_id, error = %e, "sensor read failed");
            }
        }
        sleep_or_stop(interval, &stop);
    }
    debug!(module = %sensor.planned.module_id, "sensor thread stopped");
}

fn publish(planned: &PlannedSensor, values: &[f64], bus: &VariableBus) {
    if values.len() != planned.outputs.len() {
        warn!(
            module = %planned.module_id,
            got = values.len(),
            want = planned.outputs.len(),
            "channel count mismatch"
        );
    }
    let now = Instant::now();
    for (key, value) in planned.outputs.iter().zip(values) {
        if ensure_finite(*value, "sensor reading").is_err() {
            warn!(module = %planned.module_id, value, "discarding non-finite reading");
            continue;
        }
        if let Err(e) = bus.set(*key, *value, now) {
            error!(module = %planned.module_id, error = %e, "bus write failed");
            return;
        }
    }
}

/// Sleeps in short slices so shutdown stays responsive.
fn sleep_or_stop(total: Duration, stop: &AtomicBool) {
    const SLICE: Duration = Duration::from_millis(25);
    let mut remaining = total;
    while !remaining.is_zero() && !stop.load(Ordering::Relaxed) {
        let nap = remaining.min(SLICE);
        thread::sleep(nap);
        remaining -= nap;
    }
}
