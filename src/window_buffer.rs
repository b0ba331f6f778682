// src/window_buffer.rs
//
// Per-channel sample buffers shared between the sample-ingestion task
// and the classification tick. Each channel has its own lock; appends
// on one channel never contend with appends or snapshots on another.
//
// Memory stays bounded through decimation: after a successful
// classification tick the caller drops the older half of every channel,
// keeping the recent half so consecutive windows overlap.

use crate::types::SensorChannel;
use parking_lot::Mutex;

/// Read-only snapshot of all channel buffers, taken at tick time.
/// Channels are consistent in time order but not aligned sample-for-sample.
#[derive(Debug, Clone)]
pub struct Window {
    channels: [Vec<f64>; 9],
}

impl Window {
    pub fn channel(&self, channel: SensorChannel) -> &[f64] {
        &self.channels[channel.index()]
    }
}

pub struct WindowedBuffer {
    channels: [Mutex<Vec<f64>>; 9],
}

impl WindowedBuffer {
    pub fn new() -> Self {
        Self {
            channels: std::array::from_fn(|_| Mutex::new(Vec::new())),
        }
    }

    /// Append one sample. Amortized O(1), never fails.
    pub fn append(&self, channel: SensorChannel, value: f64) {
        self.channels[channel.index()].lock().push(value);
    }

    pub fn len(&self, channel: SensorChannel) -> usize {
        self.channels[channel.index()].lock().len()
    }

    /// Clone the current contents of every channel without mutating state.
    pub fn snapshot(&self) -> Window {
        Window {
            channels: std::array::from_fn(|i| self.channels[i].lock().clone()),
        }
    }

    /// Keep only the most recent half of each channel, discarding the rest.
    /// Called only after a successful classification tick so a failed tick
    /// retries on the full buffer.
    pub fn decimate(&self) {
        for channel in &self.channels {
            let mut samples = channel.lock();
            let keep = samples.len() / 2;
            let discard = samples.len() - keep;
            samples.drain(..discard);
        }
    }

    /// Discard everything. Session start calls this.
    pub fn reset(&self) {
        for channel in &self.channels {
            channel.lock().clear();
        }
    }
}

impl Default for WindowedBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_snapshot() {
        let buffer = WindowedBuffer::new();
        for i in 0..10 {
            buffer.append(SensorChannel::AccX, i as f64);
        }
        buffer.append(SensorChannel::GyrZ, 0.5);

        let window = buffer.snapshot();
        assert_eq!(window.channel(SensorChannel::AccX).len(), 10);
        assert_eq!(window.channel(SensorChannel::AccX)[0], 0.0);
        assert_eq!(window.channel(SensorChannel::GyrZ), &[0.5]);
        assert!(window.channel(SensorChannel::MagY).is_empty());

        // Snapshot must not mutate the buffer.
        assert_eq!(buffer.len(SensorChannel::AccX), 10);
    }

    #[test]
    fn test_decimate_keeps_most_recent_half() {
        let buffer = WindowedBuffer::new();
        for i in 0..6 {
            buffer.append(SensorChannel::AccY, i as f64);
        }
        buffer.decimate();
        let window = buffer.snapshot();
        assert_eq!(window.channel(SensorChannel::AccY), &[3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_decimate_odd_count_floors() {
        let buffer = WindowedBuffer::new();
        for i in 0..5 {
            buffer.append(SensorChannel::MagZ, i as f64);
        }
        buffer.decimate();
        let window = buffer.snapshot();
        // 5 / 2 = 2 samples survive, the newest ones.
        assert_eq!(window.channel(SensorChannel::MagZ), &[3.0, 4.0]);
    }

    #[test]
    fn test_decimate_channels_independently() {
        let buffer = WindowedBuffer::new();
        for i in 0..8 {
            buffer.append(SensorChannel::AccX, i as f64);
        }
        for i in 0..4 {
            buffer.append(SensorChannel::GyrX, i as f64);
        }
        buffer.decimate();
        assert_eq!(buffer.len(SensorChannel::AccX), 4);
        assert_eq!(buffer.len(SensorChannel::GyrX), 2);
        assert_eq!(buffer.len(SensorChannel::MagX), 0);
    }

    #[test]
    fn test_reset_clears_all_channels() {
        let buffer = WindowedBuffer::new();
        for channel in SensorChannel::ALL {
            buffer.append(channel, 1.0);
        }
        buffer.reset();
        for channel in SensorChannel::ALL {
            assert_eq!(buffer.len(channel), 0);
        }
    }
}
