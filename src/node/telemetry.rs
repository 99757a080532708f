//! Solve-rate and recalc-period telemetry files
//!
//! Tab-separated `<seconds>\t<difficulty>` lines, one file for per-block
//! solve durations and one for per-window averages. Write failures are
//! logged and otherwise ignored; telemetry never blocks consensus.

use crate::error::Result;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use tracing::warn;

/// Appends `<seconds>\t<difficulty>` lines to a TSV file
pub struct TelemetryLog {
    path: PathBuf,
    file: File,
}

impl TelemetryLog {
    /// Open (or create) the block-duration log for a file prefix
    pub fn blocks(files_prefix: &str) -> Result<Self> {
        Self::open(format!("{}_blocks.tsv", files_prefix))
    }

    /// Open (or create) the recalc-period log for a file prefix
    pub fn periods(files_prefix: &str) -> Result<Self> {
        Self::open(format!("{}_periods.tsv", files_prefix))
    }

    fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path, file })
    }

    /// Append one line
    pub fn append(&mut self, seconds: f64, difficulty: f64) {
        if let Err(e) = writeln!(self.file, "{}\t{}", seconds, difficulty) {
            warn!(path = %self.path.display(), "could not write telemetry: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_append_tab_separated_lines() {
        let dir = tempdir().unwrap();
        let prefix = dir.path().join("node").to_string_lossy().into_owned();

        let mut log = TelemetryLog::blocks(&prefix).unwrap();
        log.append(9.5, 128.0);
        log.append(10.25, 256.0);

        let text = std::fs::read_to_string(format!("{}_blocks.tsv", prefix)).unwrap();
        assert_eq!(text, "9.5\t128\n10.25\t256\n");
    }

    #[test]
    fn test_blocks_and_periods_are_separate_files() {
        let dir = tempdir().unwrap();
        let prefix = dir.path().join("node").to_string_lossy().into_owned();

        TelemetryLog::blocks(&prefix).unwrap().append(1.0, 1.0);
        TelemetryLog::periods(&prefix).unwrap().append(2.0, 2.0);

        assert!(dir.path().join("node_blocks.tsv").exists());
        assert!(dir.path().join("node_periods.tsv").exists());
    }
}
