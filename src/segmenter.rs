// src/segmenter.rs
//
// Turns the noisy label stream plus the latest position fix into
// contiguous same-behavior segments and per-behavior elapsed time.
//
// Accrual rule: the interval between two observations belongs to the
// label that was active DURING the interval, so on a label switch the
// elapsed delta goes to the previous label's bucket before the new
// segment opens. Observations arriving before any fix exists are
// ignored outright; a segment needs at least one coordinate to anchor it.

use crate::types::{BehaviorLabel, BehaviorTimes, Coordinate, PositionFix, Segment};
use chrono::{DateTime, Utc};
use tracing::debug;

#[derive(Debug, Default)]
pub struct BehaviorSegmenter {
    current_label: Option<BehaviorLabel>,
    open_coordinates: Vec<Coordinate>,
    last_observation: Option<DateTime<Utc>>,
    sealed: Vec<Segment>,
    times: BehaviorTimes,
}

impl BehaviorSegmenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one label observation with the latest known fix.
    pub fn observe(
        &mut self,
        label: BehaviorLabel,
        fix: Option<&PositionFix>,
        now: DateTime<Utc>,
    ) {
        let Some(fix) = fix else {
            debug!(%label, "no position fix yet, observation ignored");
            return;
        };

        match self.current_label {
            None => {
                self.current_label = Some(label);
                self.open_coordinates.push(fix.coordinate);
                self.last_observation = Some(now);
            }
            Some(current) if current == label => {
                self.open_coordinates.push(fix.coordinate);
                self.accrue(current, now);
            }
            Some(current) => {
                // The elapsed interval was driven under the old label.
                self.accrue(current, now);
                self.seal_open(current);
                self.current_label = Some(label);
                self.open_coordinates.push(fix.coordinate);
            }
        }
    }

    fn accrue(&mut self, label: BehaviorLabel, now: DateTime<Utc>) {
        if let Some(last) = self.last_observation {
            let seconds = (now - last).num_milliseconds() as f64 / 1000.0;
            if seconds > 0.0 {
                self.times.accrue(label, seconds);
            }
        }
        self.last_observation = Some(now);
    }

    fn seal_open(&mut self, label: BehaviorLabel) {
        let coordinates = std::mem::take(&mut self.open_coordinates);
        if !coordinates.is_empty() {
            self.sealed.push(Segment {
                behavior: label,
                coordinates,
            });
        }
    }

    /// Seal the open segment and hand back the session's segments and
    /// frozen time map, leaving the segmenter reset for the next session.
    pub fn finish(&mut self) -> (Vec<Segment>, BehaviorTimes) {
        if let Some(current) = self.current_label.take() {
            self.seal_open(current);
        }
        self.last_observation = None;
        (
            std::mem::take(&mut self.sealed),
            std::mem::take(&mut self.times),
        )
    }

    pub fn reset(&mut self) {
        self.current_label = None;
        self.open_coordinates.clear();
        self.last_observation = None;
        self.sealed.clear();
        self.times = BehaviorTimes::new();
    }

    pub fn times(&self) -> &BehaviorTimes {
        &self.times
    }
}
