// src/pipeline/metrics.rs
//
// Counters for the two periodic activities. Cheap atomics, cloned freely
// into tasks; summarized at the end of a run.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct PipelineMetrics {
    pub samples_ingested: Arc<AtomicU64>,
    pub ticks_total: Arc<AtomicU64>,
    pub ticks_skipped: Arc<AtomicU64>,
    pub classifications_ok: Arc<AtomicU64>,
    pub classifications_failed: Arc<AtomicU64>,
    pub started_at: Instant,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            samples_ingested: Arc::new(AtomicU64::new(0)),
            ticks_total: Arc::new(AtomicU64::new(0)),
            ticks_skipped: Arc::new(AtomicU64::new(0)),
            classifications_ok: Arc::new(AtomicU64::new(0)),
            classifications_failed: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }

    /// Restart the rate clock. Called when a session actually starts, so
    /// idle time between construction and start does not dilute the rate.
    pub fn mark_started(&mut self) {
        self.started_at = Instant::now();
    }

    pub fn inc(&self, counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn sample_rate(&self) -> f64 {
        let samples = self.samples_ingested.load(Ordering::Relaxed);
        let elapsed = self.started_at.elapsed().as_secs_f64();
        if elapsed > 0.01 {
            samples as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            samples_ingested: self.samples_ingested.load(Ordering::Relaxed),
            samples_per_sec: self.sample_rate(),
            ticks_total: self.ticks_total.load(Ordering::Relaxed),
            ticks_skipped: self.ticks_skipped.load(Ordering::Relaxed),
            classifications_ok: self.classifications_ok.load(Ordering::Relaxed),
            classifications_failed: self.classifications_failed.load(Ordering::Relaxed),
            elapsed_secs: self.started_at.elapsed().as_secs_f64(),
        }
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricsSummary {
    pub samples_ingested: u64,
    pub samples_per_sec: f64,
    pub ticks_total: u64,
    pub ticks_skipped: u64,
    pub classifications_ok: u64,
    pub classifications_failed: u64,
    pub elapsed_secs: f64,
}
