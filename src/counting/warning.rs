//! Per-observation warnings.
//!
//! None of these abort a frame. The counter collects them into the frame
//! outcome and carries on with the next observation.

use serde::Serialize;
use thiserror::Error;

use super::label::{ClassLabel, TrackId};

/// A recoverable problem with a single observation.
#[derive(Clone, Debug, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ObservationWarning {
    /// A class label that is not one of the configured classes.
    ///
    /// Raised for every observation whose reported label is unknown; its
    /// side of the line is still tracked, but a crossing it makes is not
    /// counted. Also raised, carrying the sticky label, each time a track
    /// whose first-sighting class is unknown crosses while reported under a
    /// known label.
    #[error("track {track}: unknown class label '{label}' at frame {frame}")]
    UnknownClassLabel {
        track: TrackId,
        label: ClassLabel,
        frame: u64,
    },

    /// A known track moved implausibly far in one step, which usually means
    /// the tracker reused the identity for a different object.
    #[error("track {track}: jumped {jump:.1}px at frame {frame}, identity may have been reused")]
    IdentityReuseAnomaly { track: TrackId, frame: u64, jump: f64 },
}

impl ObservationWarning {
    /// The track the warning is about.
    pub fn track(&self) -> TrackId {
        match self {
            ObservationWarning::UnknownClassLabel { track, .. }
            | ObservationWarning::IdentityReuseAnomaly { track, .. } => *track,
        }
    }
}
