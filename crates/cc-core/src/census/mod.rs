//! The census runner.
//!
//! Folds per-(probe, scope-unit) outcomes into census records with an
//! explicit accumulator. Recoverable failures are captured at the unit
//! boundary: a failure on one unit never aborts the probe for the
//! remaining units, and a probe's total failure never aborts subsequent
//! probes.

use cc_common::{CensusRecord, Error, FailedUnit, ScopeUnit, Totals};
use cc_config::DiscoveryFailureMode;
use cc_report::ReportWriter;
use tracing::{info, warn};

use crate::probe::{Probe, ProbeRegistry};
use crate::scope::ScopeResolver;

/// Runner lifecycle states.
///
/// `Failed` is reachable only from `Init`, on a fatal discovery error
/// under [`DiscoveryFailureMode::Abort`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    ScopeResolved,
    RunningProbes,
    Finalizing,
    Done,
    Failed,
}

/// Summary of one target's completed census.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct RunSummary {
    /// Records written to the report (trivial records excluded).
    pub records_emitted: u64,
    pub totals: Totals,
    /// Scope units that failed across all probes.
    pub failed_units: u64,
}

/// Drives one audit target: scope discovery, probe dispatch, streaming
/// aggregation into the report writer.
pub struct CensusRunner<'a> {
    resolver: &'a dyn ScopeResolver,
    registry: &'a ProbeRegistry,
    on_discovery_failure: DiscoveryFailureMode,
    state: RunState,
}

impl<'a> CensusRunner<'a> {
    pub fn new(resolver: &'a dyn ScopeResolver, registry: &'a ProbeRegistry) -> Self {
        Self {
            resolver,
            registry,
            on_discovery_failure: DiscoveryFailureMode::default(),
            state: RunState::Init,
        }
    }

    pub fn on_discovery_failure(mut self, mode: DiscoveryFailureMode) -> Self {
        self.on_discovery_failure = mode;
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Run the full census, streaming each finalized record into `writer`.
    ///
    /// Returns the fatal discovery error under `Abort` mode; the writer
    /// keeps its header-only report in that case. Recoverable probe
    /// failures never surface here; they end up in record error lists.
    pub fn run(&mut self, writer: &mut ReportWriter) -> Result<RunSummary, Error> {
        let units = match self.resolver.discover() {
            Ok(units) => units,
            Err(err) => match self.on_discovery_failure {
                DiscoveryFailureMode::Abort => {
                    self.state = RunState::Failed;
                    return Err(err);
                }
                DiscoveryFailureMode::EmptyScope => {
                    warn!(error = %err, "scope discovery failed; continuing with empty scope");
                    Vec::new()
                }
            },
        };
        self.state = RunState::ScopeResolved;

        self.state = RunState::RunningProbes;
        let mut totals = Totals::default();
        let mut records_emitted = 0u64;
        let mut failed_units = 0u64;

        for probe in self.registry.iter() {
            let record = run_probe(probe, &units);
            info!(
                resource_type = %record.resource_type,
                count = record.count,
                failures = record.failed_units.len(),
                "probe complete"
            );

            // All-zero, all-successful probes stay out of the report.
            if record.is_trivial() {
                continue;
            }

            totals.absorb(&record);
            failed_units += record.failed_units.len() as u64;
            writer
                .append(&record)
                .map_err(|e| Error::Report(e.to_string()))?;
            records_emitted += 1;
        }

        self.state = RunState::Finalizing;
        writer
            .finish(&totals)
            .map_err(|e| Error::Report(e.to_string()))?;
        self.state = RunState::Done;

        info!(
            records = records_emitted,
            count = totals.count,
            workload = totals.rounded_workload(),
            "census complete"
        );
        Ok(RunSummary {
            records_emitted,
            totals,
            failed_units,
        })
    }
}

/// Execute one probe across all scope units, folding outcomes into a
/// record. Failures contribute zero to the count and land in the error
/// list.
fn run_probe(probe: &dyn Probe, units: &[ScopeUnit]) -> CensusRecord {
    let mut count = 0u64;
    let mut failed_units = Vec::new();

    for unit in units {
        match probe.execute(unit) {
            Ok(n) => {
                count += n;
                info!(
                    resource_type = probe.resource_type(),
                    unit = %unit,
                    count = n,
                    "fetched"
                );
            }
            Err(failure) => {
                warn!(
                    resource_type = probe.resource_type(),
                    unit = %unit.id,
                    kind = ?failure.kind(),
                    command = failure.command(),
                    output = failure.output(),
                    "probe invocation failed"
                );
                failed_units.push(FailedUnit::new(&unit.id, failure.kind()));
            }
        }
    }

    CensusRecord {
        resource_type: probe.resource_type().to_string(),
        count,
        workload: count as f64 * probe.multiplier(),
        failed_units,
    }
}
