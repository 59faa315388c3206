//! Per-event accept/reject state machine.
//!
//! The host dispatch loop feeds one frame and one parameter snapshot per
//! event; the engine answers with an explicit [`EventOutcome`] instead of
//! signaling skip/stop through control flow, and exposes its
//! [`EngineState`] so the host can drain gracefully once the configured
//! number of hits has been found.

use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use shotpix_calib::{BeamParameter, CoordinateMap, CoordinateMapper, ParameterSnapshot};
use shotpix_core::{Frame, FrameAccumulator};
use shotpix_process::CorrectionPipeline;

use crate::HitRecord;

/// Hit criterion computed from the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Criterion {
    /// Arithmetic mean over the whole detector.
    Mean,
    /// Mode of a bounded histogram of the pixel values.
    HistogramMode {
        /// Number of histogram bins.
        bins: usize,
    },
}

/// Which side of the threshold window counts as a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Selection {
    /// Accept criteria strictly inside `(lower, upper)`.
    Hit,
    /// Accept criteria on or outside the bounds (quiet-shot selection).
    QuietShot,
}

/// Discrimination configuration, fixed at run start.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DiscriminationConfig {
    /// Lower threshold, exclusive.
    pub lower_threshold: f64,
    /// Upper threshold, exclusive.
    pub upper_threshold: f64,
    /// Criterion to evaluate against the thresholds.
    pub criterion: Criterion,
    /// Threshold sense.
    pub selection: Selection,
    /// Request a stop once this many hits have been accepted.
    pub max_hits: u64,
    /// Run accepted frames through the correction pipeline.
    pub apply_corrections: bool,
}

impl Default for DiscriminationConfig {
    fn default() -> Self {
        Self {
            lower_threshold: -10_000_000.0,
            upper_threshold: 10_000_000.0,
            criterion: Criterion::Mean,
            selection: Selection::Hit,
            max_hits: 10_000_000,
            apply_corrections: true,
        }
    }
}

/// Lifecycle state of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Processing events.
    Running,
    /// Hit budget reached; the triggering event completed, the next event
    /// boundary stops the run.
    StopRequested,
    /// No further events are processed.
    Stopped,
}

/// Why an event was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The host delivered no frame for this event.
    NoFrame,
    /// The frame did not match the detector layout.
    MalformedFrame,
    /// The criterion fell outside the configured selection.
    OutsideSelection,
    /// Replay mode and the event index is not in the preloaded record.
    NotInReplayList,
}

/// Result of one event, consumed by the host dispatch loop.
#[derive(Debug)]
pub enum EventOutcome {
    /// The event is a hit; the (optionally corrected) frame is available
    /// to downstream consumers.
    Accepted {
        /// The accepted frame, corrected when corrections are enabled.
        frame: Frame,
        /// The evaluated hit criterion (0 in replay mode).
        criterion: f64,
        /// Custom per-event label (zero-padded event index).
        label: String,
        /// True if the coordinate map changed since the last accepted
        /// event; downstream geometry consumers must refresh.
        geometry_updated: bool,
    },
    /// The event is not a hit; downstream stages see nothing.
    Rejected {
        /// Why the event was rejected.
        reason: RejectReason,
    },
    /// The engine has stopped; the event was not processed.
    Stopped,
}

/// End-of-run bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RunSummary {
    /// Events seen.
    pub events: u64,
    /// Events accepted as hits.
    pub hits: u64,
    /// Events rejected or skipped.
    pub skipped: u64,
    /// Fraction of events accepted.
    pub hit_rate: f64,
    /// How many times the coordinate map was rebuilt.
    pub map_rebuilds: u64,
}

/// Per-event hit discrimination state machine.
pub struct DiscriminationEngine {
    config: DiscriminationConfig,
    replay: Option<HitRecord>,
    mapper: CoordinateMapper,
    pipeline: Option<CorrectionPipeline>,
    accumulator: FrameAccumulator,
    state: EngineState,
    previous: ParameterSnapshot,
    critical_change: bool,
    event_count: u64,
    hit_count: u64,
    skip_count: u64,
    hits: HitRecord,
    intensity_history: Vec<f64>,
}

impl DiscriminationEngine {
    /// Creates an engine for frames of `n_pixels` elements.
    #[must_use]
    pub fn new(config: DiscriminationConfig, mapper: CoordinateMapper, n_pixels: usize) -> Self {
        Self {
            config,
            replay: None,
            mapper,
            pipeline: None,
            accumulator: FrameAccumulator::new(n_pixels),
            state: EngineState::Running,
            previous: ParameterSnapshot::new(),
            critical_change: false,
            event_count: 0,
            hit_count: 0,
            skip_count: 0,
            hits: HitRecord::new(),
            intensity_history: Vec::new(),
        }
    }

    /// Preloads a hit record and switches to replay mode: accept/reject
    /// decisions are taken from the record instead of the criterion.
    #[must_use]
    pub fn with_replay(mut self, record: HitRecord) -> Self {
        if record.is_empty() {
            log::warn!("replay record is empty, every event will be rejected");
        }
        self.replay = Some(record);
        self
    }

    /// Attaches a correction pipeline, applied to accepted frames.
    #[must_use]
    pub fn with_corrections(mut self, pipeline: CorrectionPipeline) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    /// Run-start hook: builds the full coordinate map once from the
    /// initial snapshot.
    pub fn begin_run(&mut self, snapshot: &ParameterSnapshot) {
        self.mapper.rebuild(
            snapshot.valid_value(BeamParameter::DetectorPosition),
            snapshot.valid_value(BeamParameter::Wavelength),
        );
        self.previous = snapshot.clone();
    }

    /// Processes one event.
    ///
    /// Synchronous and event-sequential: each call completes before the
    /// host delivers the next event.
    pub fn process_event(
        &mut self,
        frame: Option<Frame>,
        snapshot: ParameterSnapshot,
    ) -> EventOutcome {
        match self.state {
            EngineState::Stopped => return EventOutcome::Stopped,
            EngineState::StopRequested => {
                log::info!(
                    "stopping after reaching the maximum number of hits ({})",
                    self.config.max_hits
                );
                self.state = EngineState::Stopped;
                return EventOutcome::Stopped;
            }
            EngineState::Running => {}
        }

        let mut snapshot = snapshot;
        snapshot.carry_forward(&self.previous);
        let delta = snapshot.diff(&self.previous);
        if delta.geometry_changed() {
            log::info!("detector position or wavelength changed, recalculating coordinate map");
            self.mapper.rebuild(
                snapshot.valid_value(BeamParameter::DetectorPosition),
                snapshot.valid_value(BeamParameter::Wavelength),
            );
            self.critical_change = true;
        }
        self.previous = snapshot;

        let index = self.event_count;
        self.event_count += 1;

        let Some(mut frame) = frame else {
            log::warn!("event {index}: no frame delivered, skipping");
            self.skip_count += 1;
            return EventOutcome::Rejected {
                reason: RejectReason::NoFrame,
            };
        };
        if frame.len() != self.accumulator.sum().len() {
            log::warn!(
                "event {index}: frame has {} pixels, expected {}, skipping",
                frame.len(),
                self.accumulator.sum().len()
            );
            self.skip_count += 1;
            return EventOutcome::Rejected {
                reason: RejectReason::MalformedFrame,
            };
        }

        let (accepted, criterion, reject_reason) = self.evaluate(index, &frame);

        if !accepted {
            self.skip_count += 1;
            return EventOutcome::Rejected {
                reason: reject_reason,
            };
        }

        self.hit_count += 1;
        self.intensity_history.push(criterion);
        self.hits.insert(index);

        if self.config.apply_corrections {
            if let Some(pipeline) = &mut self.pipeline {
                if let Err(err) = pipeline.apply(&mut frame) {
                    log::warn!("event {index}: correction pass failed ({err})");
                }
            }
        }
        if let Err(err) = self.accumulator.fold(&frame) {
            log::warn!("event {index}: accumulator fold failed ({err})");
        }

        // downstream consumers get exactly one accepted event with the
        // flag raised after each geometry change
        let geometry_updated = self.critical_change;
        self.critical_change = false;

        if self.hit_count >= self.config.max_hits {
            self.state = EngineState::StopRequested;
        }

        EventOutcome::Accepted {
            frame,
            criterion,
            label: format!("{index:010}"),
            geometry_updated,
        }
    }

    fn evaluate(&self, index: u64, frame: &Frame) -> (bool, f64, RejectReason) {
        if let Some(replay) = &self.replay {
            let accepted = replay.contains(index);
            return (accepted, 0.0, RejectReason::NotInReplayList);
        }

        let criterion = match self.config.criterion {
            Criterion::Mean => frame.mean(),
            Criterion::HistogramMode { bins } => frame.histogram_mode(bins),
        };
        // both bounds are exclusive: a criterion exactly on a bound is
        // not inside the window
        let inside =
            criterion > self.config.lower_threshold && criterion < self.config.upper_threshold;
        let accepted = match self.config.selection {
            Selection::Hit => inside,
            Selection::QuietShot => !inside,
        };
        (accepted, criterion, RejectReason::OutsideSelection)
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// The live coordinate map (all unit variants).
    #[must_use]
    pub fn coordinate_map(&self) -> Arc<CoordinateMap> {
        self.mapper.map()
    }

    /// True if the geometry changed and no event has been accepted since.
    #[must_use]
    pub fn pending_geometry_change(&self) -> bool {
        self.critical_change
    }

    /// Accepted event indices so far.
    #[must_use]
    pub fn hit_record(&self) -> &HitRecord {
        &self.hits
    }

    /// Criterion value of every accepted event, in acceptance order.
    #[must_use]
    pub fn intensity_history(&self) -> &[f64] {
        &self.intensity_history
    }

    /// The running accumulator over accepted frames.
    #[must_use]
    pub fn accumulator(&self) -> &FrameAccumulator {
        &self.accumulator
    }

    /// Consumes the engine and hands out the accumulator for
    /// finalization.
    #[must_use]
    pub fn into_accumulator(self) -> FrameAccumulator {
        self.accumulator
    }

    /// Events processed so far.
    #[must_use]
    pub fn event_count(&self) -> u64 {
        self.event_count
    }

    /// Events accepted so far.
    #[must_use]
    pub fn hit_count(&self) -> u64 {
        self.hit_count
    }

    /// Events rejected or skipped so far.
    #[must_use]
    pub fn skip_count(&self) -> u64 {
        self.skip_count
    }

    /// End-of-run bookkeeping.
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            events: self.event_count,
            hits: self.hit_count,
            skipped: self.skip_count,
            hit_rate: if self.event_count == 0 {
                0.0
            } else {
                self.hit_count as f64 / self.event_count as f64
            },
            map_rebuilds: self.mapper.rebuild_count(),
        }
    }
}
