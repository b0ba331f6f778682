use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub sampling: SamplingConfig,
    pub classification: ClassificationConfig,
    pub location: LocationConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    pub demo: DemoConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingConfig {
    pub rate_hz: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationConfig {
    pub tick_seconds: f64,
    pub min_window_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    pub min_distance_meters: f64,
    pub report_interval_seconds: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoConfig {
    pub duration_seconds: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sampling: SamplingConfig { rate_hz: 40.0 },
            classification: ClassificationConfig {
                tick_seconds: 10.0,
                min_window_size: 500,
            },
            location: LocationConfig {
                min_distance_meters: 5.0,
                report_interval_seconds: 1.0,
            },
            storage: StorageConfig {
                data_dir: "paths".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
            demo: DemoConfig {
                duration_seconds: 120.0,
            },
        }
    }
}

/// One scalar sensor stream. The declaration order here is the fixed
/// channel order of the classifier's feature vector contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorChannel {
    AccX,
    AccY,
    AccZ,
    GyrX,
    GyrY,
    GyrZ,
    MagX,
    MagY,
    MagZ,
}

impl SensorChannel {
    pub const ALL: [SensorChannel; 9] = [
        Self::AccX,
        Self::AccY,
        Self::AccZ,
        Self::GyrX,
        Self::GyrY,
        Self::GyrZ,
        Self::MagX,
        Self::MagY,
        Self::MagZ,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::AccX => "acc_x",
            Self::AccY => "acc_y",
            Self::AccZ => "acc_z",
            Self::GyrX => "gyr_x",
            Self::GyrY => "gyr_y",
            Self::GyrZ => "gyr_z",
            Self::MagX => "mag_x",
            Self::MagY => "mag_y",
            Self::MagZ => "mag_z",
        }
    }

    pub fn index(&self) -> usize {
        *self as usize
    }
}

/// One reading delivered by a sensor collaborator.
#[derive(Debug, Clone, Copy)]
pub struct SensorSample {
    pub channel: SensorChannel,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

/// Closed set of driving-behavior labels, plus the `Unknown` fallback for
/// degraded classifications and out-of-vocabulary model output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BehaviorLabel {
    Cruise,
    Fun,
    Overtake,
    Traffic,
    Wait,
    Unknown,
}

impl BehaviorLabel {
    /// The labels the trained model can emit. `Unknown` is not part of the
    /// model vocabulary.
    pub const CLOSED_SET: [BehaviorLabel; 5] = [
        Self::Cruise,
        Self::Fun,
        Self::Overtake,
        Self::Traffic,
        Self::Wait,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cruise => "cruise",
            Self::Fun => "fun",
            Self::Overtake => "overtake",
            Self::Traffic => "traffic",
            Self::Wait => "wait",
            Self::Unknown => "unknown",
        }
    }

    /// Any string outside the closed set maps to `Unknown`.
    pub fn parse_or_unknown(s: &str) -> Self {
        match s {
            "cruise" => Self::Cruise,
            "fun" => Self::Fun,
            "overtake" => Self::Overtake,
            "traffic" => Self::Traffic,
            "wait" => Self::Wait,
            _ => Self::Unknown,
        }
    }

    /// Presentation color for summary output and map consumers.
    pub fn color_name(&self) -> &'static str {
        match self {
            Self::Cruise => "green",
            Self::Fun => "yellow",
            Self::Overtake => "orange",
            Self::Traffic => "red",
            Self::Wait => "gray",
            Self::Unknown => "black",
        }
    }
}

impl std::fmt::Display for BehaviorLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

/// Latest known geographic fix, already displacement-filtered upstream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionFix {
    pub coordinate: Coordinate,
    pub timestamp: DateTime<Utc>,
}

/// One classification result as seen by subscribers and the segmenter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub label: BehaviorLabel,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
}

/// A maximal run of consecutive route coordinates under one behavior label.
/// Sealed segments are immutable; adjacent segments in a path never share
/// a label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub behavior: BehaviorLabel,
    pub coordinates: Vec<Coordinate>,
}

/// Cumulative elapsed seconds per behavior label for one session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BehaviorTimes(HashMap<BehaviorLabel, f64>);

impl BehaviorTimes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accrue(&mut self, label: BehaviorLabel, seconds: f64) {
        *self.0.entry(label).or_insert(0.0) += seconds;
    }

    pub fn seconds(&self, label: BehaviorLabel) -> f64 {
        self.0.get(&label).copied().unwrap_or(0.0)
    }

    pub fn total_seconds(&self) -> f64 {
        self.0.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The complete, immutable record of one tracking session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedPath {
    pub id: Uuid,
    pub segments: Vec<Segment>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub behavior_times: BehaviorTimes,
}

impl RecordedPath {
    pub fn coordinate_count(&self) -> usize {
        self.segments.iter().map(|s| s.coordinates.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_string_round_trip() {
        for label in BehaviorLabel::CLOSED_SET {
            assert_eq!(BehaviorLabel::parse_or_unknown(label.as_str()), label);
        }
    }

    #[test]
    fn test_unrecognized_label_maps_to_unknown() {
        assert_eq!(
            BehaviorLabel::parse_or_unknown("drifting"),
            BehaviorLabel::Unknown
        );
        assert_eq!(BehaviorLabel::parse_or_unknown(""), BehaviorLabel::Unknown);
    }

    #[test]
    fn test_channel_order_matches_model_contract() {
        let names: Vec<&str> = SensorChannel::ALL.iter().map(|c| c.name()).collect();
        assert_eq!(
            names,
            vec![
                "acc_x", "acc_y", "acc_z", "gyr_x", "gyr_y", "gyr_z", "mag_x", "mag_y", "mag_z"
            ]
        );
        for (i, channel) in SensorChannel::ALL.iter().enumerate() {
            assert_eq!(channel.index(), i);
        }
    }

    #[test]
    fn test_behavior_times_accrual() {
        let mut times = BehaviorTimes::new();
        times.accrue(BehaviorLabel::Cruise, 10.0);
        times.accrue(BehaviorLabel::Cruise, 5.0);
        times.accrue(BehaviorLabel::Traffic, 2.5);
        assert_eq!(times.seconds(BehaviorLabel::Cruise), 15.0);
        assert_eq!(times.seconds(BehaviorLabel::Wait), 0.0);
        assert!((times.total_seconds() - 17.5).abs() < 1e-9);
    }
}
