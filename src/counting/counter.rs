//! The per-frame control loop tying the counting components together.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::evaluator::CrossingEvaluator;
use super::event::{AlarmChange, CrossingEvent, Observation};
use super::geometry::{CountingLine, FrameSize};
use super::inventory::{ClassInventory, InventorySnapshot};
use super::label::TrackId;
use super::sink::EventSink;
use super::tracks::TrackStore;
use super::warning::ObservationWarning;
use crate::config::CounterConfig;
use crate::error::LinecountError;

/// Every observation the tracker produced for one video frame.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub index: u64,
    pub size: FrameSize,
    pub observations: Vec<Observation>,
}

impl Frame {
    pub fn new(index: u64, size: FrameSize, observations: Vec<Observation>) -> Self {
        Self {
            index,
            size,
            observations,
        }
    }
}

/// What processing one frame produced.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameOutcome {
    pub events: Vec<CrossingEvent>,
    pub alarms: Vec<AlarmChange>,
    pub warnings: Vec<ObservationWarning>,
    /// Tracks evicted while processing the frame.
    pub evicted: usize,
}

/// Running totals over the whole run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub frames: u64,
    pub observations: u64,
    pub crossings: u64,
    pub alarm_changes: u64,
    pub warnings: u64,
}

/// Multi-class line-crossing counter.
///
/// Owns the track store and the inventory for one video stream. Frames
/// must be fed in increasing index order; a counter is never shared
/// between streams.
///
/// # Example
///
/// ```
/// use linecount::config::CounterConfig;
/// use linecount::counting::{Frame, FrameSize, LineCounter, Observation, Point, RecordingSink};
///
/// let mut counter = LineCounter::new(CounterConfig::default())?;
/// let mut sink = RecordingSink::new();
/// let size = FrameSize::new(640, 480);
///
/// counter.process_frame(&Frame::new(0, size, vec![Observation::new(1, "car", Point::new(200.0, 240.0))]), &mut sink);
/// counter.process_frame(&Frame::new(1, size, vec![Observation::new(1, "car", Point::new(500.0, 240.0))]), &mut sink);
///
/// assert_eq!(sink.events.len(), 1);
/// assert_eq!(counter.snapshot().get("car").unwrap().inventory, 1);
/// # Ok::<(), linecount::LinecountError>(())
/// ```
#[derive(Clone, Debug)]
pub struct LineCounter {
    config: CounterConfig,
    line: Option<CountingLine>,
    evaluator: CrossingEvaluator,
    tracks: TrackStore,
    inventory: ClassInventory,
    last_frame: Option<u64>,
    stats: RunStats,
}

impl LineCounter {
    /// Builds a counter, refusing to start on an invalid configuration.
    pub fn new(config: CounterConfig) -> Result<Self, LinecountError> {
        config.validate()?;

        let evaluator = CrossingEvaluator::new(config.classes.keys().cloned(), config.max_jump_px);
        let inventory = ClassInventory::new(&config.classes);

        info!(
            orientation = %config.line.orientation,
            position = config.line.position,
            invert = config.line.invert,
            classes = config.classes.len(),
            timeout = config.track_timeout_frames,
            "line counter ready"
        );

        Ok(Self {
            config,
            line: None,
            evaluator,
            tracks: TrackStore::new(),
            inventory,
            last_frame: None,
            stats: RunStats::default(),
        })
    }

    pub fn config(&self) -> &CounterConfig {
        &self.config
    }

    /// The line as resolved for the most recent frame size.
    pub fn line(&self) -> Option<&CountingLine> {
        self.line.as_ref()
    }

    /// Processes one frame and publishes its events to `sink`.
    ///
    /// Observations are evaluated in order; each may emit at most one
    /// crossing, which is folded into the inventory before the sink sees
    /// it. Tracks not seen within the timeout are evicted at the end. A gap
    /// in frame indices counts as absence: tracks that would have been
    /// evicted on the missing frames are dropped before evaluation.
    pub fn process_frame<S: EventSink + ?Sized>(
        &mut self,
        frame: &Frame,
        sink: &mut S,
    ) -> FrameOutcome {
        if let Some(last) = self.last_frame {
            if frame.index < last {
                warn!(frame = frame.index, last, "frame delivered out of order");
            }
        }
        self.last_frame = Some(frame.index);

        let line = self.resolve_line(frame.size);
        let timeout = self.config.track_timeout_frames;
        // Catch up on the end-of-frame sweeps of any frames never delivered.
        let mut outcome = FrameOutcome {
            evicted: self.tracks.evict_stale(frame.index.saturating_sub(1), timeout),
            ..Default::default()
        };

        for observation in &frame.observations {
            let evaluation =
                self.evaluator
                    .evaluate(&line, &mut self.tracks, observation, frame.index);
            outcome.warnings.extend(evaluation.warnings);

            let Some(event) = evaluation.event else {
                continue;
            };
            match self.inventory.apply(&event) {
                Ok(alarm) => {
                    sink.on_event(&event);
                    if let Some(change) = alarm {
                        sink.on_alarm_change(&change);
                        outcome.alarms.push(change);
                    }
                    outcome.events.push(event);
                }
                Err(warning) => outcome.warnings.push(warning),
            }
        }

        for warning in &outcome.warnings {
            warn!("{}", warning);
        }

        outcome.evicted += self.tracks.evict_stale(frame.index, timeout);

        self.stats.frames += 1;
        self.stats.observations += frame.observations.len() as u64;
        self.stats.crossings += outcome.events.len() as u64;
        self.stats.alarm_changes += outcome.alarms.len() as u64;
        self.stats.warnings += outcome.warnings.len() as u64;

        outcome
    }

    /// Forgets a track the external tracker reported as closed.
    pub fn close_track(&mut self, id: TrackId) -> bool {
        let removed = self.tracks.remove(id).is_some();
        if removed {
            debug!(track = %id, "track closed");
        }
        removed
    }

    /// The current per-class inventory table.
    pub fn snapshot(&self) -> InventorySnapshot {
        self.inventory.snapshot()
    }

    pub fn active_tracks(&self) -> usize {
        self.tracks.len()
    }

    pub fn stats(&self) -> RunStats {
        self.stats
    }

    /// Zeroes counts, restores initial inventories and drops all tracks.
    pub fn reset(&mut self) {
        self.inventory.reset();
        self.tracks.clear();
        self.last_frame = None;
        self.stats = RunStats::default();
        info!("line counter reset");
    }

    fn resolve_line(&mut self, size: FrameSize) -> CountingLine {
        let current = self.line;
        match current {
            Some(line) if line.frame() == size => line,
            previous => {
                if let Some(old) = previous {
                    warn!(from = %old.frame(), to = %size, "frame size changed, re-resolving line");
                }
                let line = self.config.line.resolve(size);
                debug!(frame = %size, offset = line.offset(), "counting line resolved");
                self.line = Some(line);
                line
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counting::{Capacity, ClassLabel, Direction, Point, RecordingSink};

    const SIZE: FrameSize = FrameSize {
        width: 640,
        height: 480,
    };

    fn frame(index: u64, observations: &[(u64, &str, f64)]) -> Frame {
        Frame::new(
            index,
            SIZE,
            observations
                .iter()
                .map(|(id, class, x)| Observation::new(*id, *class, Point::new(*x, 240.0)))
                .collect(),
        )
    }

    #[test]
    fn test_invalid_config_refuses_to_start() {
        let mut config = CounterConfig::default();
        config.line.position = -0.5;
        assert!(LineCounter::new(config).is_err());
    }

    #[test]
    fn test_events_reach_sink_and_inventory() {
        let mut counter = LineCounter::new(CounterConfig::default()).unwrap();
        let mut sink = RecordingSink::new();
        counter.process_frame(&frame(0, &[(1, "car", 100.0), (2, "motorcycle", 600.0)]), &mut sink);
        let out = counter.process_frame(&frame(1, &[(1, "car", 400.0), (2, "motorcycle", 50.0)]), &mut sink);

        assert_eq!(out.events.len(), 2);
        assert_eq!(sink.events, out.events);
        let snap = counter.snapshot();
        assert_eq!(snap.get("car").unwrap().in_count, 1);
        assert_eq!(snap.get("motorcycle").unwrap().out_count, 1);
        assert_eq!(snap.get("motorcycle").unwrap().inventory, -1);
    }

    #[test]
    fn test_alarm_published_after_event() {
        let mut config = CounterConfig::default();
        config.set_capacity(ClassLabel::new("car"), Capacity::Limited(0));
        let mut counter = LineCounter::new(config).unwrap();
        let mut sink = RecordingSink::new();
        counter.process_frame(&frame(0, &[(1, "car", 100.0)]), &mut sink);
        let out = counter.process_frame(&frame(1, &[(1, "car", 400.0)]), &mut sink);
        assert_eq!(out.alarms.len(), 1);
        assert!(sink.alarms[0].raised);
        assert_eq!(sink.alarms[0].frame, 1);
    }

    #[test]
    fn test_unseen_tracks_evicted() {
        let config = CounterConfig {
            track_timeout_frames: 2,
            ..Default::default()
        };
        let mut counter = LineCounter::new(config).unwrap();
        let mut sink = RecordingSink::new();
        counter.process_frame(&frame(0, &[(1, "car", 100.0)]), &mut sink);
        assert_eq!(counter.process_frame(&frame(2, &[]), &mut sink).evicted, 0);
        assert_eq!(counter.process_frame(&frame(3, &[]), &mut sink).evicted, 1);
        assert_eq!(counter.active_tracks(), 0);
    }

    #[test]
    fn test_gap_in_frame_indices_evicts_before_evaluation() {
        let mut counter = LineCounter::new(CounterConfig::default()).unwrap();
        let mut sink = RecordingSink::new();
        counter.process_frame(&frame(0, &[(1, "car", 100.0)]), &mut sink);
        let out = counter.process_frame(&frame(100, &[(1, "car", 400.0)]), &mut sink);
        assert_eq!(out.evicted, 1);
        assert!(out.events.is_empty());
        assert_eq!(counter.active_tracks(), 1);
    }

    #[test]
    fn test_close_track_forgets_side() {
        let mut counter = LineCounter::new(CounterConfig::default()).unwrap();
        let mut sink = RecordingSink::new();
        counter.process_frame(&frame(0, &[(1, "car", 100.0)]), &mut sink);
        assert!(counter.close_track(TrackId(1)));
        let out = counter.process_frame(&frame(1, &[(1, "car", 400.0)]), &mut sink);
        assert!(out.events.is_empty());
    }

    #[test]
    fn test_reset() {
        let mut counter = LineCounter::new(CounterConfig::default()).unwrap();
        let mut sink = RecordingSink::new();
        counter.process_frame(&frame(0, &[(1, "car", 100.0)]), &mut sink);
        counter.process_frame(&frame(1, &[(1, "car", 400.0)]), &mut sink);
        counter.reset();
        assert_eq!(counter.snapshot().get("car").unwrap().in_count, 0);
        assert_eq!(counter.active_tracks(), 0);
        assert_eq!(counter.stats(), RunStats::default());
    }

    #[test]
    fn test_stats_accumulate() {
        let mut counter = LineCounter::new(CounterConfig::default()).unwrap();
        let mut sink = RecordingSink::new();
        counter.process_frame(&frame(0, &[(1, "car", 100.0), (2, "truck", 10.0)]), &mut sink);
        counter.process_frame(&frame(1, &[(1, "car", 400.0)]), &mut sink);
        let stats = counter.stats();
        assert_eq!(stats.frames, 2);
        assert_eq!(stats.observations, 3);
        assert_eq!(stats.crossings, 1);
        assert_eq!(stats.warnings, 1);
        assert_eq!(sink.events[0].direction, Direction::In);
    }

    #[test]
    fn test_line_resolved_from_frame_size() {
        let mut counter = LineCounter::new(CounterConfig::default()).unwrap();
        assert!(counter.line().is_none());
        counter.process_frame(&frame(0, &[]), &mut RecordingSink::new());
        assert_eq!(counter.line().unwrap().offset(), 320.0);
    }
}
