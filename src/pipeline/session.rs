// src/pipeline/session.rs
//
// Wires the pipeline together for one tracking session and owns its two
// periodic activities as independent tasks:
//
//   sample ingestion  — drains the mpsc sink into the windowed buffer,
//                       at whatever rate the sources deliver
//   classification    — fires on its own slower period; snapshot →
//                       extract → classify → segment → decimate
//
// The tasks share only the windowed buffer (per-channel locks) and the
// latest-fix cell. Missed ticks are skipped, never queued, so at most
// one classification is in flight. `stop` aborts and awaits both tasks
// before reading state out, so nothing mutates after it returns.

use crate::classifier::{degraded_observation, BehaviorModel, ClassifierAdapter};
use crate::error::PipelineError;
use crate::features::FeatureExtractor;
use crate::pipeline::event_bus::{EventBus, PipelineEvent};
use crate::pipeline::metrics::PipelineMetrics;
use crate::recorder::PathRecorder;
use crate::sample_source::{LatestFix, SampleSink};
use crate::storage::PathStore;
use crate::types::{Config, RecordedPath, SensorSample};
use crate::window_buffer::WindowedBuffer;
use chrono::Utc;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// Depth of the sample ingestion queue. At 9 channels x 40 Hz this is
/// several seconds of headroom before sources start reporting drops.
const SAMPLE_QUEUE_DEPTH: usize = 4096;

pub struct TrackingSession<M: BehaviorModel> {
    config: Config,
    buffer: Arc<WindowedBuffer>,
    recorder: Arc<Mutex<PathRecorder>>,
    adapter: Arc<ClassifierAdapter<M>>,
    store: PathStore,
    events: Arc<Mutex<EventBus>>,
    metrics: PipelineMetrics,
    latest_fix: LatestFix,
    sample_tx: mpsc::Sender<SensorSample>,
    sample_rx: Option<mpsc::Receiver<SensorSample>>,
    unsaved_path: Option<RecordedPath>,
    tasks: Vec<JoinHandle<()>>,
}

impl<M: BehaviorModel + 'static> TrackingSession<M> {
    pub fn new(config: Config, model: M, store: PathStore) -> Self {
        let (sample_tx, sample_rx) = mpsc::channel(SAMPLE_QUEUE_DEPTH);
        Self {
            config,
            buffer: Arc::new(WindowedBuffer::new()),
            recorder: Arc::new(Mutex::new(PathRecorder::new())),
            adapter: Arc::new(ClassifierAdapter::new(model)),
            store,
            events: Arc::new(Mutex::new(EventBus::new(256))),
            metrics: PipelineMetrics::new(),
            latest_fix: LatestFix::new(),
            sample_tx,
            sample_rx: Some(sample_rx),
            unsaved_path: None,
            tasks: Vec::new(),
        }
    }

    /// Ingestion entry point for sensor collaborators.
    pub fn sample_sink(&self) -> SampleSink {
        self.sample_tx.clone()
    }

    /// Shared cell the location collaborator publishes into.
    pub fn latest_fix(&self) -> LatestFix {
        self.latest_fix.clone()
    }

    pub fn events(&self) -> Arc<Mutex<EventBus>> {
        self.events.clone()
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }

    /// Start the session: reset buffers, then spawn ingestion and the
    /// classification tick. A second start is rejected and leaves the
    /// running session untouched.
    pub fn start(&mut self) -> Result<(), PipelineError> {
        let rx = self
            .sample_rx
            .take()
            .ok_or(PipelineError::InvalidState("ingestion already running"))?;
        if let Err(e) = self.recorder.lock().start(Utc::now()) {
            self.sample_rx = Some(rx);
            return Err(e);
        }
        self.buffer.reset();
        self.latest_fix.clear();
        self.metrics.mark_started();

        self.tasks.push(spawn_ingestion(
            rx,
            self.buffer.clone(),
            self.metrics.clone(),
        ));
        self.tasks.push(spawn_classification(
            TickContext {
                buffer: self.buffer.clone(),
                extractor: FeatureExtractor::new(self.config.classification.min_window_size),
                adapter: self.adapter.clone(),
                recorder: self.recorder.clone(),
                latest_fix: self.latest_fix.clone(),
                events: self.events.clone(),
                metrics: self.metrics.clone(),
            },
            Duration::from_secs_f64(self.config.classification.tick_seconds),
        ));
        Ok(())
    }

    /// Stop the session: cancel both periodic activities, seal the path,
    /// publish it, and hand it to the persistence collaborator.
    ///
    /// A stop while stopped returns `Ok(None)`. A save failure surfaces as
    /// `Persistence`, but the assembled path stays held by the session;
    /// calling `stop` again retries the save and returns the path once it
    /// lands on disk.
    pub async fn stop(&mut self) -> Result<Option<RecordedPath>, PipelineError> {
        for task in self.tasks.drain(..) {
            task.abort();
            let _ = task.await;
        }
        // Fresh ingestion channel for the next session; stale sink clones
        // held by stopped sources go dead with the old receiver.
        let (sample_tx, sample_rx) = mpsc::channel(SAMPLE_QUEUE_DEPTH);
        self.sample_tx = sample_tx;
        self.sample_rx = Some(sample_rx);

        let Some(path) = self.recorder.lock().stop(Utc::now()) else {
            if let Some(path) = self.unsaved_path.take() {
                return self.save_or_retain(path);
            }
            debug!("stop ignored: no session running");
            return Ok(None);
        };

        self.events
            .lock()
            .publish(PipelineEvent::PathCompleted(path.clone()));
        self.save_or_retain(path)
    }

    /// Hand the path to the store; on failure keep it for the next `stop`.
    fn save_or_retain(
        &mut self,
        path: RecordedPath,
    ) -> Result<Option<RecordedPath>, PipelineError> {
        match self.store.save(&path) {
            Ok(_) => Ok(Some(path)),
            Err(e) => {
                warn!(id = %path.id, "save failed, path retained for retry: {e}");
                self.unsaved_path = Some(path);
                Err(e)
            }
        }
    }
}

fn spawn_ingestion(
    mut rx: mpsc::Receiver<SensorSample>,
    buffer: Arc<WindowedBuffer>,
    metrics: PipelineMetrics,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(sample) = rx.recv().await {
            buffer.append(sample.channel, sample.value);
            metrics.inc(&metrics.samples_ingested);
        }
        debug!("sample ingestion channel closed");
    })
}

fn spawn_classification<M: BehaviorModel + 'static>(
    ctx: TickContext<M>,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first interval tick completes immediately; consume it so the
        // first classification waits a full period of data.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            ctx.run_tick();
        }
    })
}

struct TickContext<M: BehaviorModel> {
    buffer: Arc<WindowedBuffer>,
    extractor: FeatureExtractor,
    adapter: Arc<ClassifierAdapter<M>>,
    recorder: Arc<Mutex<PathRecorder>>,
    latest_fix: LatestFix,
    events: Arc<Mutex<EventBus>>,
    metrics: PipelineMetrics,
}

impl<M: BehaviorModel> TickContext<M> {
    fn run_tick(&self) {
        self.metrics.inc(&self.metrics.ticks_total);

        let window = self.buffer.snapshot();
        let features = match self.extractor.extract(&window) {
            Ok(features) => features,
            Err(e) => {
                debug!("tick skipped: {e}");
                self.metrics.inc(&self.metrics.ticks_skipped);
                self.events.lock().publish(PipelineEvent::TickSkipped {
                    reason: e.to_string(),
                });
                return;
            }
        };

        let now = Utc::now();
        match self.adapter.classify(&features, now) {
            Ok(observation) => {
                self.metrics.inc(&self.metrics.classifications_ok);
                let fix = self.latest_fix.get();
                self.recorder.lock().observe(&observation, fix.as_ref());
                self.events
                    .lock()
                    .publish(PipelineEvent::BehaviorObserved { observation });
                // Only a successful tick consumes buffered history; a
                // failed one leaves everything in place for a retry.
                self.buffer.decimate();
            }
            Err(e) => {
                warn!("classification failed, degrading to unknown: {e}");
                self.metrics.inc(&self.metrics.classifications_failed);
                self.events.lock().publish(PipelineEvent::BehaviorObserved {
                    observation: degraded_observation(now),
                });
            }
        }
    }
}
