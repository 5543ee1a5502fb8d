//! Per-observation crossing decision.

use std::collections::BTreeSet;

use tracing::debug;

use super::event::{CrossingEvent, Observation};
use super::geometry::CountingLine;
use super::label::ClassLabel;
use super::tracks::{TrackStore, Upsert};
use super::warning::ObservationWarning;

/// The outcome of evaluating one observation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Evaluation {
    /// At most one crossing per observation.
    pub event: Option<CrossingEvent>,
    pub warnings: Vec<ObservationWarning>,
}

/// Decides, for each observation, whether its track crossed the line.
///
/// The evaluator itself is stateless; all per-track memory lives in the
/// [`TrackStore`] it is handed.
#[derive(Clone, Debug)]
pub struct CrossingEvaluator {
    classes: BTreeSet<ClassLabel>,
    max_jump_px: Option<f64>,
}

impl CrossingEvaluator {
    /// Creates an evaluator that counts only the given classes.
    pub fn new(classes: impl IntoIterator<Item = ClassLabel>, max_jump_px: Option<f64>) -> Self {
        Self {
            classes: classes.into_iter().collect(),
            max_jump_px,
        }
    }

    /// Returns true if the label routes into a configured inventory bucket.
    pub fn is_known(&self, label: &ClassLabel) -> bool {
        self.classes.contains(label)
    }

    /// Evaluates one observation against `line`, updating `tracks`.
    ///
    /// The first sighting of a track only establishes state. Later
    /// sightings emit an event when the side value changes sign, using the
    /// class stored at first sighting. An observation whose reported class
    /// or sticky class is not configured still updates the track so later
    /// frames compare correctly, but never produces an event.
    pub fn evaluate(
        &self,
        line: &CountingLine,
        tracks: &mut TrackStore,
        observation: &Observation,
        frame: u64,
    ) -> Evaluation {
        let mut evaluation = Evaluation::default();
        let id = observation.track_id;
        let reported_known = self.is_known(&observation.class);

        if !reported_known {
            evaluation.warnings.push(ObservationWarning::UnknownClassLabel {
                track: id,
                label: observation.class.clone(),
                frame,
            });
        }

        let side = line.side_value(observation.position);
        let (prior_side, prior_position, sticky) =
            match tracks.upsert(id, &observation.class, side, observation.position, frame) {
                Upsert::New => return evaluation,
                Upsert::Known {
                    prior_side,
                    prior_position,
                    class,
                } => (prior_side, prior_position, class),
            };

        if let Some(limit) = self.max_jump_px {
            let jump = prior_position.distance(&observation.position);
            if jump > limit {
                evaluation
                    .warnings
                    .push(ObservationWarning::IdentityReuseAnomaly {
                        track: id,
                        frame,
                        jump,
                    });
            }
        }

        if sticky != observation.class {
            debug!(
                track = %id,
                sticky = %sticky,
                reported = %observation.class,
                "class disagrees with first sighting, keeping sticky class"
            );
        }

        let Some(direction) = line.direction(prior_side, side) else {
            return evaluation;
        };

        if !reported_known {
            debug!(track = %id, reported = %observation.class, %direction, "crossing with uncounted label skipped");
            return evaluation;
        }

        if !self.is_known(&sticky) {
            debug!(track = %id, class = %sticky, %direction, "crossing of uncounted class skipped");
            if reported_known {
                evaluation.warnings.push(ObservationWarning::UnknownClassLabel {
                    track: id,
                    label: sticky,
                    frame,
                });
            }
            return evaluation;
        }

        debug!(track = %id, class = %sticky, %direction, frame, "line crossed");
        evaluation.event = Some(CrossingEvent {
            track_id: id,
            class: sticky,
            direction,
            frame,
        });
        evaluation
    }
}
