// src/recorder.rs
//
// Lifecycle of a single tracking session. Exactly one RecordedPath per
// start/stop pair; double starts and stray stops are logged no-ops that
// never corrupt an in-progress session.

use crate::error::PipelineError;
use crate::segmenter::BehaviorSegmenter;
use crate::types::{Observation, PositionFix, RecordedPath};
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Default)]
pub struct PathRecorder {
    segmenter: BehaviorSegmenter,
    start_time: Option<DateTime<Utc>>,
    running: bool,
}

impl PathRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Begin a session: reset segmenter state and record the start time.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), PipelineError> {
        if self.running {
            warn!("start ignored: a session is already running");
            return Err(PipelineError::InvalidState("already tracking"));
        }
        self.segmenter.reset();
        self.start_time = Some(now);
        self.running = true;
        info!("tracking session started");
        Ok(())
    }

    /// Feed one classification into the segmenter. Ignored while stopped.
    pub fn observe(&mut self, observation: &Observation, fix: Option<&PositionFix>) {
        if !self.running {
            debug!("observation ignored: not tracking");
            return;
        }
        self.segmenter
            .observe(observation.label, fix, observation.timestamp);
    }

    /// End the session and assemble the immutable path.
    ///
    /// Returns `None` when no session is running, so a second stop is a
    /// harmless no-op and a path is produced exactly once per session.
    pub fn stop(&mut self, now: DateTime<Utc>) -> Option<RecordedPath> {
        if !self.running {
            debug!("stop ignored: not tracking");
            return None;
        }
        self.running = false;

        let start_time = self.start_time.take()?;
        // The clock may not have advanced between start and stop.
        let end_time = now.max(start_time + Duration::milliseconds(1));
        let (segments, behavior_times) = self.segmenter.finish();

        let path = RecordedPath {
            id: Uuid::new_v4(),
            segments,
            start_time,
            end_time,
            behavior_times,
        };
        info!(
            id = %path.id,
            segments = path.segments.len(),
            coordinates = path.coordinate_count(),
            "tracking session stopped"
        );
        Some(path)
    }
}
