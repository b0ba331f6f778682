// src/sample_source.rs
//
// Collaborator boundaries for sensors and location, plus the simulated
// drive used by the demo binary and the session tests.
//
// Sensors are a message-passing boundary: a source pushes typed
// `SensorSample` messages into the pipeline's ingestion sink at its own
// rate and is never polled. Location is a pure read: the source
// publishes displacement-filtered fixes into a shared `LatestFix` cell
// that the segmenter reads at tick time without blocking.

use crate::types::{Coordinate, PositionFix, SensorChannel, SensorSample};
use anyhow::Result;
use chrono::Utc;
use parking_lot::RwLock;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Ingestion entry point handed to sensor sources.
pub type SampleSink = mpsc::Sender<SensorSample>;

/// Shared cell holding the most recent position fix.
#[derive(Clone, Default)]
pub struct LatestFix {
    inner: Arc<RwLock<Option<PositionFix>>>,
}

impl LatestFix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, fix: PositionFix) {
        *self.inner.write() = Some(fix);
    }

    pub fn get(&self) -> Option<PositionFix> {
        *self.inner.read()
    }

    /// Forget the current fix. Session start calls this so a new session
    /// never anchors on the previous session's last coordinate.
    pub fn clear(&self) {
        *self.inner.write() = None;
    }
}

/// A sensor collaborator: can be started against a sink and stopped.
pub trait SampleSource {
    fn start(&mut self, sink: SampleSink) -> Result<()>;
    fn stop(&mut self);
}

/// A location collaborator: publishes filtered fixes until stopped.
pub trait LocationSource {
    fn start(&mut self, fixes: LatestFix) -> Result<()>;
    fn stop(&mut self);
}

/// Upstream minimum-displacement filter: a new fix is reported only when
/// the vehicle has moved at least `min_distance_m` from the last one.
pub struct MinDistanceFilter {
    min_distance_m: f64,
    last: Option<Coordinate>,
}

impl MinDistanceFilter {
    pub fn new(min_distance_m: f64) -> Self {
        Self {
            min_distance_m,
            last: None,
        }
    }

    pub fn accept(&mut self, coordinate: Coordinate) -> bool {
        match self.last {
            None => {
                self.last = Some(coordinate);
                true
            }
            Some(previous) => {
                if haversine_meters(previous, coordinate) >= self.min_distance_m {
                    self.last = Some(coordinate);
                    true
                } else {
                    false
                }
            }
        }
    }
}

/// Great-circle distance in meters.
pub fn haversine_meters(a: Coordinate, b: Coordinate) -> f64 {
    const EARTH_RADIUS_M: f64 = 6_371_000.0;
    let (lat1, lon1) = (a.latitude.to_radians(), a.longitude.to_radians());
    let (lat2, lon2) = (b.latitude.to_radians(), b.longitude.to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

/// Noise amplitudes and ground speed for one stretch of the simulated
/// drive. Phases cycle so a demo run exercises several behaviors.
#[derive(Debug, Clone, Copy)]
struct DrivePhase {
    accel_noise: f64,
    gyro_noise: f64,
    speed_mps: f64,
}

const PHASES: [(f64, DrivePhase); 4] = [
    // steady cruise
    (40.0, DrivePhase { accel_noise: 0.08, gyro_noise: 0.10, speed_mps: 18.0 }),
    // overtake burst: strong lateral acceleration
    (10.0, DrivePhase { accel_noise: 0.50, gyro_noise: 0.30, speed_mps: 25.0 }),
    // stop-and-go traffic
    (40.0, DrivePhase { accel_noise: 0.25, gyro_noise: 0.10, speed_mps: 4.0 }),
    // standing still
    (30.0, DrivePhase { accel_noise: 0.005, gyro_noise: 0.005, speed_mps: 0.0 }),
];

fn phase_at(elapsed_secs: f64) -> DrivePhase {
    let cycle: f64 = PHASES.iter().map(|(d, _)| d).sum();
    let mut t = elapsed_secs % cycle;
    for (duration, phase) in PHASES {
        if t < duration {
            return phase;
        }
        t -= duration;
    }
    PHASES[0].1
}

/// Simulated IMU: one task per sensor group (accelerometer, gyroscope,
/// magnetometer), each delivering its three axes at the configured rate.
pub struct SimulatedImu {
    rate_hz: f64,
    tasks: Vec<JoinHandle<()>>,
}

impl SimulatedImu {
    pub fn new(rate_hz: f64) -> Self {
        Self {
            rate_hz,
            tasks: Vec::new(),
        }
    }

    fn spawn_group(
        &mut self,
        sink: SampleSink,
        channels: [SensorChannel; 3],
        offsets: [f64; 3],
        noise_for: fn(DrivePhase) -> f64,
    ) {
        let period = Duration::from_secs_f64(1.0 / self.rate_hz);
        let handle = tokio::spawn(async move {
            let mut rng = SmallRng::from_entropy();
            let started = std::time::Instant::now();
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let phase = phase_at(started.elapsed().as_secs_f64());
                let amplitude = noise_for(phase);
                let now = Utc::now();
                for (channel, offset) in channels.iter().zip(offsets) {
                    let value = offset + amplitude * (rng.gen::<f64>() * 2.0 - 1.0);
                    let sample = SensorSample {
                        channel: *channel,
                        value,
                        timestamp: now,
                    };
                    // Delivery never blocks the source; a full sink means
                    // ingestion has stalled and the sample is dropped loudly.
                    if let Err(e) = sink.try_send(sample) {
                        warn!(channel = channel.name(), "sample dropped: {e}");
                    }
                }
            }
        });
        self.tasks.push(handle);
    }
}

impl SampleSource for SimulatedImu {
    fn start(&mut self, sink: SampleSink) -> Result<()> {
        use SensorChannel::*;
        debug!(rate_hz = self.rate_hz, "starting simulated IMU");
        // Gravity on z, quiet rotation, ambient field in microtesla.
        self.spawn_group(sink.clone(), [AccX, AccY, AccZ], [0.0, 0.0, -1.0], |p| {
            p.accel_noise
        });
        self.spawn_group(sink.clone(), [GyrX, GyrY, GyrZ], [0.0, 0.0, 0.0], |p| {
            p.gyro_noise
        });
        self.spawn_group(sink, [MagX, MagY, MagZ], [22.0, 5.0, -41.0], |p| {
            p.gyro_noise * 0.5
        });
        Ok(())
    }

    fn stop(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

/// Simulated GPS: advances north at the current phase's ground speed and
/// publishes a fix whenever the displacement filter passes.
pub struct SimulatedGps {
    min_distance_m: f64,
    report_interval: Duration,
    tasks: Vec<JoinHandle<()>>,
}

impl SimulatedGps {
    pub fn new(min_distance_m: f64, report_interval_seconds: f64) -> Self {
        Self {
            min_distance_m,
            report_interval: Duration::from_secs_f64(report_interval_seconds),
            tasks: Vec::new(),
        }
    }
}

impl LocationSource for SimulatedGps {
    fn start(&mut self, fixes: LatestFix) -> Result<()> {
        // Degrees of latitude per meter travelled north.
        const LAT_DEG_PER_M: f64 = 1.0 / 111_320.0;

        let min_distance_m = self.min_distance_m;
        let interval = self.report_interval;
        let handle = tokio::spawn(async move {
            let mut filter = MinDistanceFilter::new(min_distance_m);
            let mut position = Coordinate {
                latitude: 44.4949,
                longitude: 11.3426,
            };
            let started = std::time::Instant::now();
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let phase = phase_at(started.elapsed().as_secs_f64());
                position.latitude += phase.speed_mps * interval.as_secs_f64() * LAT_DEG_PER_M;
                if filter.accept(position) {
                    fixes.publish(PositionFix {
                        coordinate: position,
                        timestamp: Utc::now(),
                    });
                }
            }
        });
        self.tasks.push(handle);
        Ok(())
    }

    fn stop(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_known_distance() {
        // One degree of latitude is about 111.2 km.
        let a = Coordinate {
            latitude: 44.0,
            longitude: 11.0,
        };
        let b = Coordinate {
            latitude: 45.0,
            longitude: 11.0,
        };
        let d = haversine_meters(a, b);
        assert!((d - 111_195.0).abs() < 200.0, "got {d}");
    }

    #[test]
    fn test_min_distance_filter() {
        let mut filter = MinDistanceFilter::new(5.0);
        let origin = Coordinate {
            latitude: 44.0,
            longitude: 11.0,
        };
        // First fix always passes.
        assert!(filter.accept(origin));

        // ~1.1 m north: below threshold.
        let near = Coordinate {
            latitude: 44.00001,
            longitude: 11.0,
        };
        assert!(!filter.accept(near));

        // ~11 m north of the origin: passes, and rebases the filter.
        let far = Coordinate {
            latitude: 44.0001,
            longitude: 11.0,
        };
        assert!(filter.accept(far));
        assert!(!filter.accept(far));
    }

    #[test]
    fn test_latest_fix_read_is_nonblocking_and_latest() {
        let fixes = LatestFix::new();
        assert!(fixes.get().is_none());

        let first = PositionFix {
            coordinate: Coordinate {
                latitude: 1.0,
                longitude: 1.0,
            },
            timestamp: Utc::now(),
        };
        let second = PositionFix {
            coordinate: Coordinate {
                latitude: 2.0,
                longitude: 2.0,
            },
            timestamp: Utc::now(),
        };
        fixes.publish(first);
        fixes.publish(second);
        assert_eq!(fixes.get().unwrap().coordinate.latitude, 2.0);

        fixes.clear();
        assert!(fixes.get().is_none());
    }

    #[test]
    fn test_phase_cycle_wraps() {
        let cycle: f64 = PHASES.iter().map(|(d, _)| d).sum();
        let first = phase_at(0.0);
        let wrapped = phase_at(cycle);
        assert_eq!(first.speed_mps, wrapped.speed_mps);
    }

    #[tokio::test]
    async fn test_simulated_imu_delivers_all_channels() {
        let (tx, mut rx) = mpsc::channel(4096);
        let mut imu = SimulatedImu::new(200.0);
        imu.start(tx).unwrap();

        let mut seen = std::collections::HashSet::new();
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while seen.len() < 9 && tokio::time::Instant::now() < deadline {
            if let Ok(Some(sample)) =
                tokio::time::timeout(Duration::from_millis(200), rx.recv()).await
            {
                seen.insert(sample.channel);
            }
        }
        imu.stop();
        assert_eq!(seen.len(), 9, "missing channels: saw {seen:?}");
    }
}
