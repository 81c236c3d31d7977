//! Report file writer.
//!
//! Layout, one file per audit target:
//!
//! ```text
//! Resource Type, Unit Counted, Workloads, Error Regions
//! AWS EC2 Instance, 42, 42, eu-west-3,
//! TOTAL, 42, 42
//! ```
//!
//! The header goes to disk before discovery and before any probe runs;
//! records are appended and flushed as the runner finalizes them; the
//! TOTAL row closes the file.

use cc_common::{CensusRecord, ScopeKind, Totals};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::ReportError;

/// Streaming report writer.
pub struct ReportWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    rows: u64,
    finalized: bool,
}

impl ReportWriter {
    /// Create the report file and write the header line.
    ///
    /// The header is flushed immediately so the file exists and is
    /// well-formed even if the run aborts fatally before any probe.
    pub fn create(path: impl Into<PathBuf>, scope_kind: ScopeKind) -> Result<Self, ReportError> {
        let path = path.into();
        let file = File::create(&path).map_err(|e| ReportError::Io {
            path: path.clone(),
            source: e,
        })?;
        let mut writer = BufWriter::new(file);

        writeln!(
            writer,
            "Resource Type, Unit Counted, Workloads, Error {}",
            scope_kind.plural()
        )
        .and_then(|_| writer.flush())
        .map_err(|e| ReportError::Io {
            path: path.clone(),
            source: e,
        })?;

        debug!(path = %path.display(), "report header written");
        Ok(Self {
            path,
            writer,
            rows: 0,
            finalized: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record rows appended so far (header and TOTAL excluded).
    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Append one census record and flush it to disk.
    pub fn append(&mut self, record: &CensusRecord) -> Result<(), ReportError> {
        if self.finalized {
            return Err(ReportError::Finalized);
        }

        let errors: String = record
            .failed_units
            .iter()
            .map(|u| format!("{}, ", u.column_entry()))
            .collect();

        writeln!(
            self.writer,
            "{}, {}, {}, {}",
            record.resource_type,
            record.count,
            format_workload(record.workload),
            errors
        )
        .and_then(|_| self.writer.flush())
        .map_err(|e| ReportError::Io {
            path: self.path.clone(),
            source: e,
        })?;

        self.rows += 1;
        Ok(())
    }

    /// Write the TOTAL row. Workload is rounded here and nowhere else.
    pub fn finish(&mut self, totals: &Totals) -> Result<(), ReportError> {
        if self.finalized {
            return Err(ReportError::Finalized);
        }

        writeln!(
            self.writer,
            "TOTAL, {}, {}",
            totals.count,
            totals.rounded_workload()
        )
        .and_then(|_| self.writer.flush())
        .map_err(|e| ReportError::Io {
            path: self.path.clone(),
            source: e,
        })?;

        self.finalized = true;
        info!(path = %self.path.display(), rows = self.rows, "report complete");
        Ok(())
    }
}

/// Per-record workload formatting: unrounded, integral values without a
/// decimal point.
fn format_workload(workload: f64) -> String {
    if workload.fract() == 0.0 {
        format!("{}", workload as i64)
    } else {
        format!("{}", workload)
    }
}

/// Deterministic report file name for an audit target.
///
/// `aws-staging-units.csv` for a named target, `aws-units.csv` for the
/// provider default.
pub fn report_file_name(provider: &str, target: Option<&str>) -> String {
    match target {
        Some(t) => format!("{}-{}-units.csv", provider, t),
        None => format!("{}-units.csv", provider),
    }
}
