//! Run evidence under `<base>/Evidencia`: one `repasses_<stamp>.jsonl` file
//! per run with a JSON line for each processed repasse, and
//! `<nr_repasse>_<stamp>.png` screenshots of rows that failed.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the evidence directory under the base working directory.
pub const EVIDENCE_DIR: &str = "Evidencia";

const RECORDS_PREFIX: &str = "repasses";

/// Timestamp used in evidence file names, e.g. `15.10.2025_08.30.00`.
pub fn evidence_stamp(at: NaiveDateTime) -> String {
    at.format("%d.%m.%Y_%H.%M.%S").to_string()
}

/// Path of the evidence directory for a base working directory.
pub fn evidence_dir(base: &Path) -> PathBuf {
    base.join(EVIDENCE_DIR)
}

/// File name of the screenshot taken when a repasse fails.
pub fn screenshot_file_name(nr_repasse: i64, at: NaiveDateTime) -> String {
    format!("{}_{}.png", nr_repasse, evidence_stamp(at))
}

/// Evidence of one run, stamped with the run's start time.
#[derive(Debug, Clone)]
pub struct RunEvidence {
    dir: PathBuf,
    records: PathBuf,
}

impl RunEvidence {
    /// Create the evidence directory under `base` if needed.
    pub fn create(base: &Path, started_at: NaiveDateTime) -> anyhow::Result<Self> {
        let dir = evidence_dir(base);
        std::fs::create_dir_all(&dir)?;
        let stamp = evidence_stamp(started_at);
        let records = dir.join(format!("{}_{}.jsonl", RECORDS_PREFIX, stamp));
        Ok(Self { dir, records })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// JSON-lines file with one record per processed repasse.
    pub fn records_path(&self) -> &Path {
        &self.records
    }

    pub fn screenshot_path(&self, nr_repasse: i64, at: NaiveDateTime) -> PathBuf {
        self.dir.join(screenshot_file_name(nr_repasse, at))
    }

    /// Append the record of one processed repasse.
    pub fn record<T: Serialize>(&self, repasse: &T) -> anyhow::Result<()> {
        let line = serde_json::to_string(repasse)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.records)?;
        writeln!(file, "{}", line)?;
        debug!("Evidence appended to {:?}", self.records);
        Ok(())
    }
}
