//! Counting line geometry and the IN/OUT orientation policy.
//!
//! A [`LineConfig`] is what the operator configures: which way the line
//! runs, where it sits as a fraction of the frame, and whether IN and OUT
//! are swapped. Once the frame size is known it resolves into a
//! [`CountingLine`], which maps positions to signed side values.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::event::Direction;
use crate::error::LinecountError;

/// How the counting line runs across the frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// A horizontal line at `position * height`; objects cross it moving
    /// up or down.
    Horizontal,
    /// A vertical line at `position * width`; objects cross it moving left
    /// or right.
    #[default]
    Vertical,
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::Horizontal => f.write_str("horizontal"),
            Orientation::Vertical => f.write_str("vertical"),
        }
    }
}

impl FromStr for Orientation {
    type Err = LinecountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "horizontal" | "h" => Ok(Orientation::Horizontal),
            "vertical" | "v" => Ok(Orientation::Vertical),
            other => Err(LinecountError::InvalidLineConfiguration(format!(
                "unknown orientation '{}' (expected 'horizontal' or 'vertical')",
                other
            ))),
        }
    }
}

/// A position in frame (pixel) coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Returns the centroid of an XYXY box.
    #[inline]
    pub fn centroid(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self::new((x1 + x2) / 2.0, (y1 + y2) / 2.0)
    }

    /// Euclidean distance to another point.
    #[inline]
    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Frame dimensions in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    #[inline]
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for FrameSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// The configured virtual line. Immutable for the duration of a run.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineConfig {
    /// Which way the line runs.
    pub orientation: Orientation,
    /// Relative position in [0.0, 1.0] along the perpendicular axis.
    pub position: f64,
    /// Swap which crossing direction counts as IN.
    pub invert: bool,
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            orientation: Orientation::Vertical,
            position: 0.5,
            invert: false,
        }
    }
}

impl LineConfig {
    /// Creates a validated line configuration.
    pub fn new(
        orientation: Orientation,
        position: f64,
        invert: bool,
    ) -> Result<Self, LinecountError> {
        let config = Self {
            orientation,
            position,
            invert,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks that the relative position is a finite value in [0, 1].
    pub fn validate(&self) -> Result<(), LinecountError> {
        if !self.position.is_finite() || !(0.0..=1.0).contains(&self.position) {
            return Err(LinecountError::InvalidLineConfiguration(format!(
                "line position {} is outside [0, 1]",
                self.position
            )));
        }
        Ok(())
    }

    /// Resolves the relative line into frame coordinates.
    pub fn resolve(&self, frame: FrameSize) -> CountingLine {
        let extent = match self.orientation {
            Orientation::Vertical => frame.width,
            Orientation::Horizontal => frame.height,
        };
        CountingLine {
            orientation: self.orientation,
            offset: self.position * f64::from(extent),
            invert: self.invert,
            frame,
        }
    }
}

/// A line resolved against a concrete frame size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CountingLine {
    orientation: Orientation,
    offset: f64,
    invert: bool,
    frame: FrameSize,
}

impl CountingLine {
    /// The frame size this line was resolved for.
    #[inline]
    pub fn frame(&self) -> FrameSize {
        self.frame
    }

    /// Pixel coordinate of the line on its comparison axis.
    #[inline]
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// The two endpoints of the line, for collaborators that draw it.
    pub fn endpoints(&self) -> (Point, Point) {
        let w = f64::from(self.frame.width);
        let h = f64::from(self.frame.height);
        match self.orientation {
            Orientation::Vertical => (Point::new(self.offset, 0.0), Point::new(self.offset, h)),
            Orientation::Horizontal => (Point::new(0.0, self.offset), Point::new(w, self.offset)),
        }
    }

    /// Signed side value of a position.
    ///
    /// Negative on the left (vertical) or top (horizontal) of the line,
    /// positive on the other side, zero exactly on it.
    #[inline]
    pub fn side_value(&self, position: Point) -> f64 {
        match self.orientation {
            Orientation::Vertical => position.x - self.offset,
            Orientation::Horizontal => position.y - self.offset,
        }
    }

    /// Classifies a transition between two side values.
    ///
    /// Returns `None` unless the values lie strictly on opposite sides. A
    /// negative-to-positive move is IN, or OUT when the line is inverted.
    pub fn direction(&self, prior: f64, current: f64) -> Option<Direction> {
        if is_neutral(prior) || is_neutral(current) {
            return None;
        }
        if (prior < 0.0) == (current < 0.0) {
            return None;
        }
        let neg_to_pos = prior < 0.0;
        if neg_to_pos != self.invert {
            Some(Direction::In)
        } else {
            Some(Direction::Out)
        }
    }
}

/// A side value that carries no side: exactly on the line, or not a number.
#[inline]
pub(crate) fn is_neutral(side: f64) -> bool {
    side == 0.0 || !side.is_finite()
}
