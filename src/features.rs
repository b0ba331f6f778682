// src/features.rs
//
// Statistical feature extraction over a window snapshot.
//
// Feature vector contract: channel-major order over SensorChannel::ALL,
// five slots per channel in Stat::ALL order (mean, median, std, max, min),
// 45 values total. Standard deviation uses the population formula
// (denominator n). A model trained against a different slot mapping or
// the sample formula must be retrained or re-wrapped; this module is the
// single source of truth for the ordering.

use crate::error::PipelineError;
use crate::types::SensorChannel;
use crate::window_buffer::Window;

/// The five summary statistics, in feature-slot order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stat {
    Mean,
    Median,
    Std,
    Max,
    Min,
}

impl Stat {
    pub const ALL: [Stat; 5] = [Self::Mean, Self::Median, Self::Std, Self::Max, Self::Min];

    pub fn index(&self) -> usize {
        *self as usize
    }
}

/// Ordered, fixed-length feature vector. Created once per classification
/// tick and consumed exactly once by the classifier adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    values: Vec<f64>,
}

impl FeatureVector {
    pub const LEN: usize = SensorChannel::ALL.len() * Stat::ALL.len();

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of one statistic for one channel, by the fixed slot layout.
    pub fn stat(&self, channel: SensorChannel, stat: Stat) -> f64 {
        self.values[channel.index() * Stat::ALL.len() + stat.index()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelStats {
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub max: f64,
    pub min: f64,
}

impl ChannelStats {
    /// Compute all five statistics. Caller guarantees `samples` is non-empty.
    pub fn compute(samples: &[f64]) -> Self {
        let mean = mean(samples);
        Self {
            mean,
            median: median(samples),
            std_dev: population_std_dev(samples, mean),
            max: samples.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            min: samples.iter().copied().fold(f64::INFINITY, f64::min),
        }
    }
}

fn mean(samples: &[f64]) -> f64 {
    samples.iter().sum::<f64>() / samples.len() as f64
}

/// Middle element of a value sort; mean of the two middle elements when
/// the count is even.
fn median(samples: &[f64]) -> f64 {
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = sorted.len();
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}

/// Population standard deviation (denominator n).
fn population_std_dev(samples: &[f64], mean: f64) -> f64 {
    let variance =
        samples.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / samples.len() as f64;
    variance.sqrt()
}

pub struct FeatureExtractor {
    min_window_size: usize,
}

impl FeatureExtractor {
    pub fn new(min_window_size: usize) -> Self {
        Self { min_window_size }
    }

    /// Reduce a window to the fixed-order feature vector.
    ///
    /// Fails with `InsufficientData` when any channel is below the minimum
    /// window size; the window (and the buffer behind it) is left as-is so
    /// the next tick can retry on more data.
    pub fn extract(&self, window: &Window) -> Result<FeatureVector, PipelineError> {
        for channel in SensorChannel::ALL {
            let have = window.channel(channel).len();
            if have < self.min_window_size {
                return Err(PipelineError::InsufficientData {
                    channel: channel.name(),
                    have,
                    need: self.min_window_size,
                });
            }
        }

        let mut values = Vec::with_capacity(FeatureVector::LEN);
        for channel in SensorChannel::ALL {
            let stats = ChannelStats::compute(window.channel(channel));
            values.extend_from_slice(&[
                stats.mean,
                stats.median,
                stats.std_dev,
                stats.max,
                stats.min,
            ]);
        }
        Ok(FeatureVector { values })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::window_buffer::WindowedBuffer;

    /// Build a feature vector directly from per-channel slices, bypassing
    /// the minimum-size gate. Shared by classifier and model tests.
    pub(crate) fn feature_vector_from(fill: impl Fn(SensorChannel) -> Vec<f64>) -> FeatureVector {
        let buffer = WindowedBuffer::new();
        for channel in SensorChannel::ALL {
            for value in fill(channel) {
                buffer.append(channel, value);
            }
        }
        FeatureExtractor::new(1).extract(&buffer.snapshot()).unwrap()
    }

    #[test]
    fn test_constant_signal_statistics() {
        // 500 acceleration-X samples of value 1.0.
        let buffer = WindowedBuffer::new();
        for channel in SensorChannel::ALL {
            for _ in 0..500 {
                buffer.append(channel, 1.0);
            }
        }
        let features = FeatureExtractor::new(500)
            .extract(&buffer.snapshot())
            .unwrap();

        assert_eq!(features.stat(SensorChannel::AccX, Stat::Mean), 1.0);
        assert_eq!(features.stat(SensorChannel::AccX, Stat::Median), 1.0);
        assert_eq!(features.stat(SensorChannel::AccX, Stat::Std), 0.0);
        assert_eq!(features.stat(SensorChannel::AccX, Stat::Max), 1.0);
        assert_eq!(features.stat(SensorChannel::AccX, Stat::Min), 1.0);
    }

    #[test]
    fn test_insufficient_data_leaves_buffer_untouched() {
        let buffer = WindowedBuffer::new();
        for channel in SensorChannel::ALL {
            for i in 0..499 {
                buffer.append(channel, i as f64);
            }
        }
        let extractor = FeatureExtractor::new(500);
        let err = extractor.extract(&buffer.snapshot()).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InsufficientData { have: 499, need: 500, .. }
        ));
        // No decimation on failure: the buffer still holds every sample.
        for channel in SensorChannel::ALL {
            assert_eq!(buffer.len(channel), 499);
        }
    }

    #[test]
    fn test_one_short_channel_fails_extraction() {
        let buffer = WindowedBuffer::new();
        for channel in SensorChannel::ALL {
            let count = if channel == SensorChannel::MagZ { 9 } else { 10 };
            for i in 0..count {
                buffer.append(channel, i as f64);
            }
        }
        let err = FeatureExtractor::new(10)
            .extract(&buffer.snapshot())
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InsufficientData { channel: "mag_z", have: 9, need: 10 }
        ));
    }

    #[test]
    fn test_median_even_and_odd_counts() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
        assert_eq!(median(&[7.0]), 7.0);
    }

    #[test]
    fn test_population_std_dev() {
        // Values 2, 4, 4, 4, 5, 5, 7, 9: population stddev is exactly 2.
        let samples = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let stats = ChannelStats::compute(&samples);
        assert!((stats.std_dev - 2.0).abs() < 1e-12);
        assert_eq!(stats.mean, 5.0);
        assert_eq!(stats.max, 9.0);
        assert_eq!(stats.min, 2.0);
    }

    #[test]
    fn test_slot_order_is_channel_major() {
        let features = feature_vector_from(|channel| vec![channel.index() as f64 * 10.0]);
        assert_eq!(features.len(), FeatureVector::LEN);
        // Single-sample channels: mean == median == max == min, std == 0.
        for channel in SensorChannel::ALL {
            let base = channel.index() * Stat::ALL.len();
            let expected = channel.index() as f64 * 10.0;
            assert_eq!(features.as_slice()[base], expected);
            assert_eq!(features.as_slice()[base + 1], expected);
            assert_eq!(features.as_slice()[base + 2], 0.0);
            assert_eq!(features.as_slice()[base + 3], expected);
            assert_eq!(features.as_slice()[base + 4], expected);
        }
    }
}
