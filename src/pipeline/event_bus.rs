// src/pipeline/event_bus.rs
//
// Decoupled event system. The core publishes what happened each tick;
// subscribers (summary screens, maps, logs) drain events instead of
// reaching into pipeline state.

use crate::types::{Observation, RecordedPath};
use std::collections::VecDeque;
use tracing::warn;

#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// One classification tick produced a label (possibly a degraded
    /// `unknown` when the model call failed).
    BehaviorObserved { observation: Observation },

    /// A tick was skipped before classification could run.
    TickSkipped { reason: String },

    /// A session finished and its path was assembled.
    PathCompleted(RecordedPath),
}

pub struct EventBus {
    events: VecDeque<PipelineEvent>,
    max_pending: usize,
}

impl EventBus {
    pub fn new(max_pending: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(max_pending),
            max_pending,
        }
    }

    pub fn publish(&mut self, event: PipelineEvent) {
        if self.events.len() >= self.max_pending {
            warn!(
                "event bus full ({} events), dropping oldest",
                self.max_pending
            );
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    pub fn drain(&mut self) -> Vec<PipelineEvent> {
        self.events.drain(..).collect()
    }

    pub fn pending_count(&self) -> usize {
        self.events.len()
    }
}
