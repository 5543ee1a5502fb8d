//! Semicolon-delimited event log, written as the counter runs.
//!
//! ```text
//! frame;event;class;track_id;in_total;out_total;inventory;capacity;orientation;line_position;inverted;source
//! 12;IN;car;4;1;0;1;50;vertical;0.5;false;cam01.csv
//! ;SUMMARY;car;;1;0;1;50;vertical;0.5;false;cam01.csv
//! ```
//!
//! Every crossing and every alarm transition becomes one row carrying the
//! class totals right after it. [`CsvReport::finish`] appends one `SUMMARY`
//! row per class. A failed write is logged once and remembered; the sink
//! keeps accepting messages so counting is never interrupted, and
//! `finish` returns the first failure.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use crate::counting::{
    AlarmChange, Capacity, ClassLabel, CrossingEvent, Direction, EventSink, InventorySnapshot,
    LineConfig,
};
use crate::error::LinecountError;

const HEADER: [&str; 12] = [
    "frame",
    "event",
    "class",
    "track_id",
    "in_total",
    "out_total",
    "inventory",
    "capacity",
    "orientation",
    "line_position",
    "inverted",
    "source",
];

const INVALID_FILE_NAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Replaces characters that are invalid in file names with `_`.
///
/// Surrounding whitespace is trimmed; an empty result becomes `report`.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if INVALID_FILE_NAME_CHARS.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        "report".to_string()
    } else {
        cleaned.to_string()
    }
}

/// `<dir>/<sanitized name>.csv`, leaving an existing `.csv` suffix alone.
pub fn report_path(dir: &Path, name: &str) -> PathBuf {
    let base = sanitize_file_name(name);
    if base.to_lowercase().ends_with(".csv") {
        dir.join(base)
    } else {
        dir.join(format!("{}.csv", base))
    }
}

#[derive(Debug, Serialize)]
struct ReportRow<'a> {
    frame: Option<u64>,
    event: &'a str,
    class: &'a str,
    track_id: Option<u64>,
    in_total: u64,
    out_total: u64,
    inventory: i64,
    capacity: String,
    orientation: String,
    line_position: f64,
    inverted: bool,
    source: &'a str,
}

#[derive(Clone, Debug)]
struct Tally {
    in_total: u64,
    out_total: u64,
    inventory: i64,
    capacity: Capacity,
}

/// An [`EventSink`] that appends one CSV row per message.
pub struct CsvReport<W: Write> {
    writer: csv::Writer<W>,
    path: PathBuf,
    line: LineConfig,
    source: String,
    tallies: BTreeMap<ClassLabel, Tally>,
    rows: u64,
    error: Option<csv::Error>,
}

impl CsvReport<BufWriter<File>> {
    /// Creates `<dir>/<name>.csv`, creating `dir` if needed.
    ///
    /// `baseline` is the inventory at the moment the report starts, so the
    /// running totals line up with the counter's.
    pub fn create(
        dir: &Path,
        name: &str,
        line: LineConfig,
        source: impl Into<String>,
        baseline: &InventorySnapshot,
    ) -> Result<Self, LinecountError> {
        fs::create_dir_all(dir)?;
        let path = report_path(dir, name);
        let file = File::create(&path)?;
        debug!(path = %path.display(), "csv report opened");
        Ok(Self::from_writer(
            BufWriter::new(file),
            path,
            line,
            source,
            baseline,
        ))
    }
}

impl<W: Write> CsvReport<W> {
    /// Wraps any writer. `path` is only used in log messages and errors.
    pub fn from_writer(
        writer: W,
        path: impl Into<PathBuf>,
        line: LineConfig,
        source: impl Into<String>,
        baseline: &InventorySnapshot,
    ) -> Self {
        let writer = csv::WriterBuilder::new()
            .delimiter(b';')
            .has_headers(false)
            .from_writer(writer);
        let tallies = baseline
            .classes
            .iter()
            .map(|row| {
                (
                    row.class.clone(),
                    Tally {
                        in_total: row.in_count,
                        out_total: row.out_count,
                        inventory: row.inventory,
                        capacity: row.capacity,
                    },
                )
            })
            .collect();

        let mut report = Self {
            writer,
            path: path.into(),
            line,
            source: source.into(),
            tallies,
            rows: 0,
            error: None,
        };
        let header = report.writer.write_record(HEADER);
        report.record(header);
        report
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Data rows written so far, header excluded.
    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Appends the `SUMMARY` rows and flushes.
    ///
    /// The final snapshot is authoritative for the summary; it normally
    /// matches the running totals exactly.
    pub fn finish(mut self, final_inventory: &InventorySnapshot) -> Result<W, LinecountError> {
        for row in &final_inventory.classes {
            let tally = Tally {
                in_total: row.in_count,
                out_total: row.out_count,
                inventory: row.inventory,
                capacity: row.capacity,
            };
            self.write_row(None, "SUMMARY", &row.class, None, &tally);
        }

        if let Some(source) = self.error.take() {
            return Err(LinecountError::ReportWrite {
                path: self.path,
                source,
            });
        }

        let path = self.path;
        let rows = self.rows;
        let inner = self
            .writer
            .into_inner()
            .map_err(|e| LinecountError::ReportWrite {
                path: path.clone(),
                source: csv::Error::from(e.into_error()),
            })?;
        debug!(path = %path.display(), rows, "csv report finished");
        Ok(inner)
    }

    fn write_row(
        &mut self,
        frame: Option<u64>,
        event: &str,
        class: &ClassLabel,
        track_id: Option<u64>,
        tally: &Tally,
    ) {
        if self.error.is_some() {
            return;
        }
        let row = ReportRow {
            frame,
            event,
            class: class.as_str(),
            track_id,
            in_total: tally.in_total,
            out_total: tally.out_total,
            inventory: tally.inventory,
            capacity: tally.capacity.to_string(),
            orientation: self.line.orientation.to_string(),
            line_position: self.line.position,
            inverted: self.line.invert,
            source: &self.source,
        };
        let result = self.writer.serialize(row);
        if result.is_ok() {
            self.rows += 1;
        }
        self.record(result);
    }

    fn record(&mut self, result: Result<(), csv::Error>) {
        if let Err(err) = result {
            warn!(path = %self.path.display(), error = %err, "csv report write failed, further rows skipped");
            self.error.get_or_insert(err);
        }
    }
}

impl<W: Write> EventSink for CsvReport<W> {
    fn on_event(&mut self, event: &CrossingEvent) {
        let Some(tally) = self.tallies.get_mut(&event.class) else {
            return;
        };
        match event.direction {
            Direction::In => {
                tally.in_total += 1;
                tally.inventory = tally.inventory.saturating_add(1);
            }
            Direction::Out => {
                tally.out_total += 1;
                tally.inventory = tally.inventory.saturating_sub(1);
            }
        }
        let tally = tally.clone();
        let label = match event.direction {
            Direction::In => "IN",
            Direction::Out => "OUT",
        };
        self.write_row(
            Some(event.frame),
            label,
            &event.class,
            Some(event.track_id.as_u64()),
            &tally,
        );
    }

    fn on_alarm_change(&mut self, change: &AlarmChange) {
        let Some(tally) = self.tallies.get(&change.class).cloned() else {
            return;
        };
        let label = if change.raised {
            "ALARM_RAISED"
        } else {
            "ALARM_CLEARED"
        };
        self.write_row(Some(change.frame), label, &change.class, None, &tally);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counting::{ClassSnapshot, TrackId};

    fn baseline() -> InventorySnapshot {
        InventorySnapshot {
            classes: vec![ClassSnapshot {
                class: ClassLabel::new("car"),
                in_count: 0,
                out_count: 0,
                inventory: 0,
                capacity: Capacity::Limited(1),
                alarm: false,
            }],
        }
    }

    fn crossing(direction: Direction, frame: u64) -> CrossingEvent {
        CrossingEvent {
            track_id: TrackId(7),
            class: ClassLabel::new("car"),
            direction,
            frame,
        }
    }

    fn report() -> CsvReport<Vec<u8>> {
        CsvReport::from_writer(
            Vec::new(),
            "memory.csv",
            LineConfig::default(),
            "cam01",
            &baseline(),
        )
    }

    #[test]
    fn test_rows_and_summary() {
        let mut report = report();
        report.on_event(&crossing(Direction::In, 3));
        report.on_event(&crossing(Direction::In, 5));
        report.on_alarm_change(&AlarmChange {
            class: ClassLabel::new("car"),
            raised: true,
            inventory: 2,
            frame: 5,
        });

        let mut final_inventory = baseline();
        final_inventory.classes[0].in_count = 2;
        final_inventory.classes[0].inventory = 2;
        final_inventory.classes[0].alarm = true;

        let bytes = report.finish(&final_inventory).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], HEADER.join(";"));
        assert_eq!(lines[1], "3;IN;car;7;1;0;1;1;vertical;0.5;false;cam01");
        assert_eq!(lines[2], "5;IN;car;7;2;0;2;1;vertical;0.5;false;cam01");
        assert_eq!(lines[3], "5;ALARM_RAISED;car;;2;0;2;1;vertical;0.5;false;cam01");
        assert_eq!(lines[4], ";SUMMARY;car;;2;0;2;1;vertical;0.5;false;cam01");
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn test_out_lowers_inventory() {
        let mut report = report();
        report.on_event(&crossing(Direction::Out, 1));
        assert_eq!(report.rows(), 1);
        let text = String::from_utf8(report.finish(&baseline()).unwrap()).unwrap();
        assert!(text.contains("1;OUT;car;7;0;1;-1;"));
    }

    #[test]
    fn test_unknown_class_ignored() {
        let mut report = report();
        let mut event = crossing(Direction::In, 1);
        event.class = ClassLabel::new("bus");
        report.on_event(&event);
        assert_eq!(report.rows(), 0);
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("disk full"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Err(std::io::Error::other("disk full"))
        }
    }

    #[test]
    fn test_write_failure_reported_on_finish() {
        let mut report = CsvReport::from_writer(
            FailingWriter,
            "broken.csv",
            LineConfig::default(),
            "cam01",
            &baseline(),
        );
        for frame in 0..2000 {
            report.on_event(&crossing(Direction::In, frame));
        }
        assert!(matches!(
            report.finish(&baseline()),
            Err(LinecountError::ReportWrite { .. })
        ));
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("cam:01/run?"), "cam_01_run_");
        assert_eq!(sanitize_file_name("   "), "report");
        assert_eq!(sanitize_file_name(""), "report");
        assert_eq!(sanitize_file_name(" Registro "), "Registro");
    }

    #[test]
    fn test_report_path_appends_extension() {
        let dir = Path::new("out");
        assert_eq!(report_path(dir, "run1"), dir.join("run1.csv"));
        assert_eq!(report_path(dir, "run1.csv"), dir.join("run1.csv"));
        assert_eq!(report_path(dir, "a|b"), dir.join("a_b.csv"));
    }

    #[test]
    fn test_create_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested");
        let report =
            CsvReport::create(&target, "run", LineConfig::default(), "cam01", &baseline()).unwrap();
        let path = report.path().to_path_buf();
        report.finish(&baseline()).unwrap();
        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.starts_with("frame;event;class"));
        assert!(text.contains(";SUMMARY;car;"));
    }
}
