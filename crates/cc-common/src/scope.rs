//! Scope units: the iteration boundary a probe is summed over.

use serde::{Deserialize, Serialize};

/// Kind of scope unit a provider iterates over.
///
/// Determines the error-column label of the report header
/// (`Error Regions`, `Error Compartments`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeKind {
    Region,
    Subscription,
    Project,
    Compartment,
    Context,
}

impl ScopeKind {
    /// Singular label, as used in logs.
    pub fn label(&self) -> &'static str {
        match self {
            ScopeKind::Region => "Region",
            ScopeKind::Subscription => "Subscription",
            ScopeKind::Project => "Project",
            ScopeKind::Compartment => "Compartment",
            ScopeKind::Context => "Context",
        }
    }

    /// Plural label, as used in the report header's error column.
    pub fn plural(&self) -> &'static str {
        match self {
            ScopeKind::Region => "Regions",
            ScopeKind::Subscription => "Subscriptions",
            ScopeKind::Project => "Projects",
            ScopeKind::Compartment => "Compartments",
            ScopeKind::Context => "Contexts",
        }
    }
}

impl std::fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One scope unit: an opaque identifier plus a human-readable label.
///
/// For AWS regions both fields hold the region code; for OCI compartments
/// the id is the OCID and the label the compartment name. Units are
/// immutable once discovered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeUnit {
    pub id: String,
    pub label: String,
}

impl ScopeUnit {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }

    /// Unit whose label is its identifier (region codes, CLI contexts).
    pub fn from_id(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
        }
    }
}

impl std::fmt::Display for ScopeUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label)
    }
}
