//! Scope discovery.
//!
//! A [`ScopeResolver`] produces the ordered set of scope units a census
//! iterates over. Discovery order is preserved everywhere downstream; an
//! allow-list only filters membership, never reorders.

use cc_common::{Error, ScopeKind, ScopeUnit};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

use crate::exec::{CommandRunner, CommandSpec};

/// Discovers the ordered scope units for one audit target.
pub trait ScopeResolver {
    fn kind(&self) -> ScopeKind;

    /// Discover scope units, in provider order. A failure here is fatal
    /// for the audit target.
    fn discover(&self) -> Result<Vec<ScopeUnit>, Error>;
}

/// Fixed scope set; used by providers whose probes are target-wide
/// (an Azure subscription, a GCP project, a DigitalOcean context).
pub struct StaticScopeResolver {
    kind: ScopeKind,
    units: Vec<ScopeUnit>,
}

impl StaticScopeResolver {
    pub fn new(kind: ScopeKind, units: Vec<ScopeUnit>) -> Self {
        Self { kind, units }
    }

    pub fn single(kind: ScopeKind, unit: ScopeUnit) -> Self {
        Self::new(kind, vec![unit])
    }
}

impl ScopeResolver for StaticScopeResolver {
    fn kind(&self) -> ScopeKind {
        self.kind
    }

    fn discover(&self) -> Result<Vec<ScopeUnit>, Error> {
        Ok(self.units.clone())
    }
}

/// How scope units are extracted from discovery output.
#[derive(Debug, Clone)]
pub enum ScopeExtract {
    /// Objects at `path`, each contributing the string in `field` as both
    /// id and label. AWS: path `["Regions"]`, field `"RegionName"`;
    /// Alibaba: path `["Regions", "Region"]`, field `"RegionId"`.
    Field { path: Vec<String>, field: String },

    /// Objects at `path` carrying separate id and label fields.
    /// OCI: path `["data"]`, id `"id"`, label `"name"`.
    IdAndLabel {
        path: Vec<String>,
        id_field: String,
        label_field: String,
    },
}

impl ScopeExtract {
    /// Extract units, or `None` when the output shape does not match.
    fn units(&self, root: &Value) -> Option<Vec<ScopeUnit>> {
        match self {
            ScopeExtract::Field { path, field } => {
                let items = navigate(root, path)?.as_array()?;
                items
                    .iter()
                    .map(|item| {
                        item.get(field)
                            .and_then(Value::as_str)
                            .map(ScopeUnit::from_id)
                    })
                    .collect()
            }
            ScopeExtract::IdAndLabel {
                path,
                id_field,
                label_field,
            } => {
                let items = navigate(root, path)?.as_array()?;
                items
                    .iter()
                    .map(|item| {
                        let id = item.get(id_field).and_then(Value::as_str)?;
                        let label = item.get(label_field).and_then(Value::as_str)?;
                        Some(ScopeUnit::new(id, label))
                    })
                    .collect()
            }
        }
    }
}

fn navigate<'a>(root: &'a Value, path: &[String]) -> Option<&'a Value> {
    let mut current = root;
    for key in path {
        current = current.get(key)?;
    }
    Some(current)
}

/// Runs a provider discovery command and extracts scope units.
pub struct CliScopeResolver {
    kind: ScopeKind,
    target: String,
    command: CommandSpec,
    extract: ScopeExtract,
    allow: Vec<String>,
    runner: Arc<CommandRunner>,
}

impl CliScopeResolver {
    pub fn new(
        kind: ScopeKind,
        target: impl Into<String>,
        command: CommandSpec,
        extract: ScopeExtract,
        runner: Arc<CommandRunner>,
    ) -> Self {
        Self {
            kind,
            target: target.into(),
            command,
            extract,
            allow: Vec::new(),
            runner,
        }
    }

    /// Restrict discovery to these unit ids. Empty means all discovered.
    pub fn with_allow_list(mut self, allow: Vec<String>) -> Self {
        self.allow = allow;
        self
    }
}

impl ScopeResolver for CliScopeResolver {
    fn kind(&self) -> ScopeKind {
        self.kind
    }

    fn discover(&self) -> Result<Vec<ScopeUnit>, Error> {
        info!(target = %self.target, command = %self.command, "discovering scope units");

        let output = self.runner.run(&self.command).map_err(|e| Error::Discovery {
            target: self.target.clone(),
            detail: format!("{} ({})", e, self.command),
        })?;

        let root: Value =
            serde_json::from_str(&output.stdout).map_err(|e| Error::Discovery {
                target: self.target.clone(),
                detail: format!("undecodable discovery output: {}", e),
            })?;

        let units = self.extract.units(&root).ok_or_else(|| Error::Discovery {
            target: self.target.clone(),
            detail: "discovery output missing expected fields".to_string(),
        })?;

        if !self.allow.is_empty() {
            debug!(allowed = ?self.allow, "applying scope allow-list");
        }
        let units = filter_allowed(units, &self.allow);
        info!(kind = %self.kind, count = units.len(), "scope units resolved");
        Ok(units)
    }
}

/// Intersect discovered units with an allow-list.
///
/// Membership filter only: discovery order is preserved and allow-list
/// entries that were never discovered are dropped.
pub fn filter_allowed(units: Vec<ScopeUnit>, allow: &[String]) -> Vec<ScopeUnit> {
    if allow.is_empty() {
        return units;
    }
    units
        .into_iter()
        .filter(|unit| allow.iter().any(|a| a == &unit.id))
        .collect()
}
