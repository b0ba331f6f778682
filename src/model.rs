// src/model.rs
//
// Deterministic stand-in for the trained behavior classifier. Keeps the
// binary and the tests runnable without a model artifact; swapping in a
// real model means replacing this implementation of `BehaviorModel`,
// nothing else.
//
// The rules read motion energy off the feature vector: gyroscope spread
// separates spirited driving from cruising, accelerometer spread
// separates stop-and-go traffic from a standstill, and a lateral
// acceleration burst marks an overtake.

use crate::classifier::{BehaviorModel, Prediction};
use crate::features::{FeatureVector, Stat};
use crate::types::SensorChannel;

pub struct ThresholdModel {
    /// Below this mean accelerometer spread the vehicle is standing still.
    pub wait_accel_std: f64,
    /// Above this mean gyroscope spread the driving counts as spirited.
    pub fun_gyro_std: f64,
    /// Lateral (x-axis) acceleration spread that marks an overtake burst.
    pub overtake_lateral_std: f64,
    /// Accelerometer spread typical of stop-and-go traffic.
    pub traffic_accel_std: f64,
}

impl Default for ThresholdModel {
    fn default() -> Self {
        Self {
            wait_accel_std: 0.02,
            fun_gyro_std: 0.60,
            overtake_lateral_std: 0.35,
            traffic_accel_std: 0.18,
        }
    }
}

impl ThresholdModel {
    fn accel_std(&self, f: &FeatureVector) -> f64 {
        (f.stat(SensorChannel::AccX, Stat::Std)
            + f.stat(SensorChannel::AccY, Stat::Std)
            + f.stat(SensorChannel::AccZ, Stat::Std))
            / 3.0
    }

    fn gyro_std(&self, f: &FeatureVector) -> f64 {
        (f.stat(SensorChannel::GyrX, Stat::Std)
            + f.stat(SensorChannel::GyrY, Stat::Std)
            + f.stat(SensorChannel::GyrZ, Stat::Std))
            / 3.0
    }
}

impl BehaviorModel for ThresholdModel {
    fn predict(&self, features: &FeatureVector) -> anyhow::Result<Prediction> {
        let accel_std = self.accel_std(features);
        let gyro_std = self.gyro_std(features);
        let lateral_std = features.stat(SensorChannel::AccX, Stat::Std);

        let (label, probability) = if accel_std < self.wait_accel_std && gyro_std < 0.05 {
            ("wait", 0.90)
        } else if gyro_std > self.fun_gyro_std {
            ("fun", 0.70)
        } else if lateral_std > self.overtake_lateral_std {
            ("overtake", 0.75)
        } else if accel_std > self.traffic_accel_std {
            ("traffic", 0.65)
        } else {
            ("cruise", 0.80)
        };

        Ok(Prediction {
            label: label.to_string(),
            probability,
        })
    }
}
