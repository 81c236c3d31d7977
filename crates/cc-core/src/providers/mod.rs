//! Provider plans.
//!
//! Each provider module is a pure function from an audit target and CLI
//! selections to a [`ProviderPlan`]: which resolver enumerates scope
//! units and which probes run. Provider-specific behavior is
//! configuration data; the census loop never branches on provider.
//!
//! Authentication bootstrapping (profile validation, extension checks,
//! service-enablement gating) is the provider CLI's own concern and is
//! deliberately not replicated here.

pub mod alibaba;
pub mod aws;
pub mod azure;
pub mod digitalocean;
pub mod gcp;
pub mod oci;

use cc_common::ScopeKind;

use crate::probe::ProbeRegistry;
use crate::scope::ScopeResolver;

/// Supported cloud providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Aws,
    Azure,
    Gcp,
    Oci,
    Alibaba,
    DigitalOcean,
}

impl Provider {
    /// Slug used in report file names.
    pub fn slug(&self) -> &'static str {
        match self {
            Provider::Aws => "aws",
            Provider::Azure => "azure",
            Provider::Gcp => "gcp",
            Provider::Oci => "oci",
            Provider::Alibaba => "alibaba",
            Provider::DigitalOcean => "digitalocean",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

/// Everything the census needs for one audit target.
pub struct ProviderPlan {
    pub provider: Provider,
    pub scope_kind: ScopeKind,
    pub resolver: Box<dyn ScopeResolver>,
    pub registry: ProbeRegistry,
    /// Report file name for this target.
    pub report_name: String,
}

/// Log/error label for a possibly-unnamed target.
fn target_label(target: Option<&str>) -> String {
    target.unwrap_or("default").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_slugs() {
        assert_eq!(Provider::Aws.slug(), "aws");
        assert_eq!(format!("{}", Provider::DigitalOcean), "digitalocean");
    }

    #[test]
    fn target_labels() {
        assert_eq!(target_label(None), "default");
        assert_eq!(target_label(Some("staging")), "staging");
    }
}
