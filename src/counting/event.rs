//! Values that flow through the counter: observations in, events out.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::geometry::Point;
use super::label::{ClassLabel, TrackId};

/// One tracked object seen in one frame.
///
/// The frame index lives on the enclosing [`Frame`](super::Frame); every
/// observation in a frame shares it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub track_id: TrackId,
    pub class: ClassLabel,
    pub position: Point,
}

impl Observation {
    pub fn new(track_id: u64, class: impl Into<ClassLabel>, position: Point) -> Self {
        Self {
            track_id: TrackId(track_id),
            class: class.into(),
            position,
        }
    }

    /// Builds an observation from an XYXY bounding box, using its centroid.
    pub fn from_bbox(
        track_id: u64,
        class: impl Into<ClassLabel>,
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
    ) -> Self {
        Self::new(track_id, class, Point::centroid(x1, y1, x2, y2))
    }
}

/// Which way an object crossed the line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "IN")]
    In,
    #[serde(rename = "OUT")]
    Out,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::In => f.write_str("IN"),
            Direction::Out => f.write_str("OUT"),
        }
    }
}

/// A single, exactly-once crossing of the line by one track.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossingEvent {
    pub track_id: TrackId,
    /// The sticky class recorded at the track's first sighting.
    pub class: ClassLabel,
    pub direction: Direction,
    pub frame: u64,
}

impl fmt::Display for CrossingEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "frame {}: {} {} (track {})",
            self.frame, self.class, self.direction, self.track_id
        )
    }
}

/// A capacity alarm turning on or off for one class.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmChange {
    pub class: ClassLabel,
    pub raised: bool,
    /// Inventory right after the event that caused the transition.
    pub inventory: i64,
    pub frame: u64,
}

impl fmt::Display for AlarmChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.raised { "raised" } else { "cleared" };
        write!(
            f,
            "frame {}: {} capacity alarm {} (inventory {})",
            self.frame, self.class, state, self.inventory
        )
    }
}
