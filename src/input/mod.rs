//! Readers for tracked-observation files.
//!
//! The counter consumes frames of observations produced by an external
//! detector and tracker. These readers load such output from disk so the
//! CLI can replay it. Two layouts are supported:
//!
//! - [`tracks_csv`]: one row per observation, bounding boxes in pixels.
//! - [`tracks_json`]: one object per frame, points or boxes.
//!
//! Both return frames sorted by frame index.

pub mod tracks_csv;
pub mod tracks_json;

use std::path::Path;

use crate::counting::Frame;
use crate::error::LinecountError;

/// Supported observation file layouts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputFormat {
    Csv,
    Json,
}

impl InputFormat {
    /// Parses a `--format` value.
    pub fn from_name(name: &str) -> Result<Self, LinecountError> {
        match name.to_lowercase().as_str() {
            "csv" | "tracks-csv" => Ok(InputFormat::Csv),
            "json" | "tracks-json" => Ok(InputFormat::Json),
            other => Err(LinecountError::UnsupportedFormat(format!(
                "'{}' (supported: csv, json)",
                other
            ))),
        }
    }

    /// Infers the layout from a file extension.
    pub fn from_path(path: &Path) -> Result<Self, LinecountError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "csv" => Ok(InputFormat::Csv),
            "json" => Ok(InputFormat::Json),
            _ => Err(LinecountError::UnsupportedFormat(format!(
                "cannot infer format of '{}', pass --format csv|json",
                path.display()
            ))),
        }
    }
}

/// Reads all frames from `path` in the given layout.
pub fn read_frames(path: &Path, format: InputFormat) -> Result<Vec<Frame>, LinecountError> {
    match format {
        InputFormat::Csv => tracks_csv::read_tracks_csv(path),
        InputFormat::Json => tracks_json::read_tracks_json(path),
    }
}

/// Fuzz-only entrypoint: parses tracks JSON and replays it through a
/// default counter, returning the final inventory.
#[cfg(feature = "fuzzing")]
pub fn fuzz_replay_tracks_json(
    bytes: &[u8],
) -> Result<crate::counting::InventorySnapshot, LinecountError> {
    use crate::config::CounterConfig;
    use crate::counting::{LineCounter, NullSink};

    let frames = tracks_json::from_tracks_json_slice(bytes)?;
    let mut counter = LineCounter::new(CounterConfig::default())?;
    for frame in &frames {
        counter.process_frame(frame, &mut NullSink);
    }
    Ok(counter.snapshot())
}
