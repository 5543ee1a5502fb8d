//! Tracked-observation JSON reader.
//!
//! ```json
//! {
//!   "frames": [
//!     {
//!       "index": 0,
//!       "width": 640,
//!       "height": 480,
//!       "observations": [
//!         { "track_id": 1, "class": "car", "x": 200.0, "y": 240.0 },
//!         { "track_id": 2, "class": "motorcycle", "x1": 10, "y1": 10, "x2": 30, "y2": 50 }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! An observation gives either a point (`x`, `y`) or a box (`x1`..`y2`,
//! reduced to its centroid). Frames are returned sorted by index.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Deserialize;

use crate::counting::{Frame, FrameSize, Observation, Point};
use crate::error::LinecountError;

#[derive(Debug, Deserialize)]
struct TracksDocument {
    frames: Vec<FrameData>,
}

#[derive(Debug, Deserialize)]
struct FrameData {
    index: u64,
    width: u32,
    height: u32,
    #[serde(default)]
    observations: Vec<ObservationData>,
}

#[derive(Debug, Deserialize)]
struct ObservationData {
    track_id: u64,
    class: String,
    #[serde(flatten)]
    position: PositionData,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PositionData {
    Box { x1: f64, y1: f64, x2: f64, y2: f64 },
    Point { x: f64, y: f64 },
}

impl PositionData {
    fn to_point(&self) -> Point {
        match *self {
            PositionData::Box { x1, y1, x2, y2 } => Point::centroid(x1, y1, x2, y2),
            PositionData::Point { x, y } => Point::new(x, y),
        }
    }
}

/// Reads frames from a tracks JSON file.
pub fn read_tracks_json(path: &Path) -> Result<Vec<Frame>, LinecountError> {
    let file = File::open(path).map_err(LinecountError::Io)?;
    let reader = BufReader::new(file);
    let doc: TracksDocument =
        serde_json::from_reader(reader).map_err(|source| LinecountError::TracksJsonParse {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(document_to_frames(doc))
}

/// Reads frames from a tracks JSON string.
pub fn from_tracks_json_str(json: &str) -> Result<Vec<Frame>, LinecountError> {
    from_tracks_json_slice(json.as_bytes())
}

/// Reads frames from tracks JSON bytes.
pub fn from_tracks_json_slice(bytes: &[u8]) -> Result<Vec<Frame>, LinecountError> {
    let doc: TracksDocument =
        serde_json::from_slice(bytes).map_err(|source| LinecountError::TracksJsonParse {
            path: Path::new("<bytes>").to_path_buf(),
            source,
        })?;
    Ok(document_to_frames(doc))
}

fn document_to_frames(doc: TracksDocument) -> Vec<Frame> {
    let mut frames: Vec<Frame> = doc
        .frames
        .into_iter()
        .map(|data| {
            let observations = data
                .observations
                .into_iter()
                .map(|obs| Observation::new(obs.track_id, obs.class, obs.position.to_point()))
                .collect();
            Frame::new(
                data.index,
                FrameSize::new(data.width, data.height),
                observations,
            )
        })
        .collect();
    frames.sort_by_key(|frame| frame.index);
    frames
}
