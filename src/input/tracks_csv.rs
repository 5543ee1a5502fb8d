//! Tracked-observation CSV reader.
//!
//! One row per tracked object per frame, with the bounding box in pixel
//! coordinates. The observation position is the box centroid.
//!
//! ```text
//! frame,width,height,track_id,class,x1,y1,x2,y2
//! 0,640,480,1,car,180,200,220,240
//! 1,640,480,1,car,480,200,520,240
//! ```
//!
//! Rows may appear in any order; they are grouped by `frame` and returned
//! in increasing frame order, keeping row order within a frame. Every row
//! of a frame must agree on `width` and `height`.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Deserialize;

use crate::counting::{Frame, FrameSize, Observation};
use crate::error::LinecountError;

/// A single row in the tracks CSV format.
#[derive(Debug, Deserialize)]
struct TrackRow {
    frame: u64,
    width: u32,
    height: u32,
    track_id: u64,
    class: String,
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
}

/// Reads frames from a tracks CSV file.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed, or if one frame
/// has rows with different dimensions.
pub fn read_tracks_csv(path: &Path) -> Result<Vec<Frame>, LinecountError> {
    let file = File::open(path).map_err(LinecountError::Io)?;
    parse_rows(csv::Reader::from_reader(BufReader::new(file)), path)
}

/// Reads frames from a tracks CSV string.
pub fn from_tracks_csv_str(csv_str: &str) -> Result<Vec<Frame>, LinecountError> {
    from_tracks_csv_slice(csv_str.as_bytes())
}

/// Reads frames from tracks CSV bytes.
pub fn from_tracks_csv_slice(bytes: &[u8]) -> Result<Vec<Frame>, LinecountError> {
    parse_rows(csv::Reader::from_reader(bytes), Path::new("<bytes>"))
}

fn parse_rows<R: std::io::Read>(
    mut reader: csv::Reader<R>,
    path: &Path,
) -> Result<Vec<Frame>, LinecountError> {
    let mut frames: BTreeMap<u64, Frame> = BTreeMap::new();

    for result in reader.deserialize() {
        let row: TrackRow = result.map_err(|source| LinecountError::TracksCsvParse {
            path: path.to_path_buf(),
            source,
        })?;
        let size = FrameSize::new(row.width, row.height);

        let frame = frames
            .entry(row.frame)
            .or_insert_with(|| Frame::new(row.frame, size, Vec::new()));

        if frame.size != size {
            return Err(LinecountError::TracksCsvInvalid {
                path: path.to_path_buf(),
                message: format!(
                    "Inconsistent dimensions for frame {}: {} vs {}",
                    row.frame, frame.size, size
                ),
            });
        }

        frame.observations.push(Observation::from_bbox(
            row.track_id,
            row.class,
            row.x1,
            row.y1,
            row.x2,
            row.y2,
        ));
    }

    Ok(frames.into_values().collect())
}
