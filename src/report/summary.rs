//! End-of-run summary, printed by the `count` subcommand.

use std::fmt;

use serde::Serialize;

use crate::counting::{InventorySnapshot, LineConfig, ObservationWarning, RunStats};

/// How many warnings the text rendering lists before eliding the rest.
const MAX_LISTED_WARNINGS: usize = 20;

/// What a counting run did, as text (Display) or JSON (Serialize).
#[derive(Clone, Debug, Serialize)]
pub struct RunSummary {
    /// Input the frames were read from.
    pub source: String,
    pub line: LineConfig,
    pub stats: RunStats,
    /// Tracks still held when the run ended.
    pub active_tracks: usize,
    pub inventory: InventorySnapshot,
    pub warnings: Vec<ObservationWarning>,
    /// Where the CSV event report went, if one was written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_path: Option<String>,
}

impl RunSummary {
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Classes whose capacity alarm is on at the end of the run.
    pub fn alarmed_classes(&self) -> impl Iterator<Item = &str> {
        self.inventory
            .classes
            .iter()
            .filter(|c| c.alarm)
            .map(|c| c.class.as_str())
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Counted {}", self.source)?;
        writeln!(
            f,
            "  line: {} at {}{}",
            self.line.orientation,
            self.line.position,
            if self.line.invert { " (inverted)" } else { "" }
        )?;
        writeln!(
            f,
            "  frames: {}  observations: {}  crossings: {}  alarm transitions: {}",
            self.stats.frames, self.stats.observations, self.stats.crossings, self.stats.alarm_changes
        )?;
        writeln!(f, "  active tracks at end: {}", self.active_tracks)?;
        let alarmed: Vec<&str> = self.alarmed_classes().collect();
        if !alarmed.is_empty() {
            writeln!(f, "  over capacity: {}", alarmed.join(", "))?;
        }
        writeln!(f)?;
        write!(f, "{}", self.inventory)?;

        if let Some(path) = &self.report_path {
            writeln!(f)?;
            writeln!(f, "Report written to {}", path)?;
        }

        if !self.warnings.is_empty() {
            writeln!(f)?;
            writeln!(f, "{} warning(s):", self.warnings.len())?;
            for warning in self.warnings.iter().take(MAX_LISTED_WARNINGS) {
                writeln!(f, "  [WARN] {}", warning)?;
            }
            if self.warnings.len() > MAX_LISTED_WARNINGS {
                writeln!(
                    f,
                    "  ... and {} more",
                    self.warnings.len() - MAX_LISTED_WARNINGS
                )?;
            }
        }

        Ok(())
    }
}
