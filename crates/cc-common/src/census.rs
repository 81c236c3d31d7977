//! Census records and probe outcome types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a probe invocation failed for one scope unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// The external command exited abnormally, timed out, or never spawned.
    Exec,
    /// The command succeeded but its output could not be parsed.
    Decode,
}

/// Recoverable failure of one (probe, scope unit) invocation.
///
/// Carries the rendered command line and the captured output so a single
/// log line is enough to reproduce the failure. These are values folded
/// into census records, never errors propagated past the unit loop.
#[derive(Debug, Clone, Error)]
pub enum ProbeFailure {
    #[error("command failed: {command}: {detail}")]
    Exec {
        command: String,
        detail: String,
        output: String,
    },

    #[error("undecodable output from {command}: {detail}")]
    Decode {
        command: String,
        detail: String,
        output: String,
    },
}

impl ProbeFailure {
    pub fn kind(&self) -> FailureKind {
        match self {
            ProbeFailure::Exec { .. } => FailureKind::Exec,
            ProbeFailure::Decode { .. } => FailureKind::Decode,
        }
    }

    /// The rendered command line that failed.
    pub fn command(&self) -> &str {
        match self {
            ProbeFailure::Exec { command, .. } | ProbeFailure::Decode { command, .. } => command,
        }
    }

    /// Raw output captured from the failing invocation (may be truncated).
    pub fn output(&self) -> &str {
        match self {
            ProbeFailure::Exec { output, .. } | ProbeFailure::Decode { output, .. } => output,
        }
    }
}

/// A scope unit whose probe invocation failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedUnit {
    pub unit_id: String,
    pub kind: FailureKind,
}

impl FailedUnit {
    pub fn new(unit_id: impl Into<String>, kind: FailureKind) -> Self {
        Self {
            unit_id: unit_id.into(),
            kind,
        }
    }

    /// Error-column cell for this unit. Decode failures carry a `(JSON)`
    /// tag so transport and format failures stay distinguishable.
    pub fn column_entry(&self) -> String {
        match self.kind {
            FailureKind::Exec => self.unit_id.clone(),
            FailureKind::Decode => format!("{} (JSON)", self.unit_id),
        }
    }
}

/// Aggregated result for one probe across all scope units of a target.
///
/// Invariant: `count` is the sum of successful outcomes only; failed units
/// never contribute to it but are always listed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CensusRecord {
    pub resource_type: String,
    pub count: u64,
    /// `count × multiplier`, never rounded at this level.
    pub workload: f64,
    pub failed_units: Vec<FailedUnit>,
}

impl CensusRecord {
    /// True when the record carries no information. Trivial records are
    /// omitted from reports (existing contract of the report format).
    pub fn is_trivial(&self) -> bool {
        self.count == 0 && self.failed_units.is_empty()
    }
}

/// Running count/workload sums across emitted records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    pub count: u64,
    pub workload: f64,
}

impl Totals {
    pub fn absorb(&mut self, record: &CensusRecord) {
        self.count += record.count;
        self.workload += record.workload;
    }

    /// Workload rounded to the nearest integer. Rounding happens here and
    /// nowhere else, when the TOTAL row is written.
    pub fn rounded_workload(&self) -> i64 {
        self.workload.round() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_entry_tags_decode_failures() {
        let exec = FailedUnit::new("us-east-1", FailureKind::Exec);
        let decode = FailedUnit::new("us-east-1", FailureKind::Decode);
        assert_eq!(exec.column_entry(), "us-east-1");
        assert_eq!(decode.column_entry(), "us-east-1 (JSON)");
    }

    #[test]
    fn trivial_record_detection() {
        let trivial = CensusRecord {
            resource_type: "X".into(),
            count: 0,
            workload: 0.0,
            failed_units: vec![],
        };
        assert!(trivial.is_trivial());

        let with_error = CensusRecord {
            failed_units: vec![FailedUnit::new("A", FailureKind::Exec)],
            ..trivial.clone()
        };
        assert!(!with_error.is_trivial());
    }

    #[test]
    fn totals_round_once_at_the_end() {
        let mut totals = Totals::default();
        for _ in 0..3 {
            totals.absorb(&CensusRecord {
                resource_type: "X".into(),
                count: 1,
                workload: 0.4,
                failed_units: vec![],
            });
        }
        assert_eq!(totals.count, 3);
        // 0.4 * 3 rounds to 1; per-record rounding would have given 0.
        assert_eq!(totals.rounded_workload(), 1);
    }

    #[test]
    fn probe_failure_accessors() {
        let failure = ProbeFailure::Exec {
            command: "aws ec2 describe-instances".into(),
            detail: "exit status 255".into(),
            output: "AccessDenied".into(),
        };
        assert_eq!(failure.kind(), FailureKind::Exec);
        assert_eq!(failure.command(), "aws ec2 describe-instances");
        assert_eq!(failure.output(), "AccessDenied");
    }
}
