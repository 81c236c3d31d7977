//! DigitalOcean unit audit plan.
//!
//! Probes are team-wide per CLI context, so the scope is a single unit
//! per target.

use cc_common::{ScopeKind, ScopeUnit};
use cc_report::report_file_name;
use std::sync::Arc;

use super::{target_label, Provider, ProviderPlan};
use crate::exec::{CommandRunner, CommandSpec};
use crate::probe::{CliProbe, CountRule, ProbeRegistry};
use crate::scope::StaticScopeResolver;

/// Build the DigitalOcean plan for one context target.
pub fn plan(context: Option<&str>, runner: Arc<CommandRunner>) -> ProviderPlan {
    let resolver = StaticScopeResolver::single(
        ScopeKind::Context,
        ScopeUnit::from_id(target_label(context)),
    );

    let mut registry = ProbeRegistry::new();
    registry.register(
        CliProbe::new("Digital Ocean Droplets", runner).step(
            doctl_command(context, &["compute", "droplet", "list"]),
            CountRule::ArrayLen,
        ),
    );

    ProviderPlan {
        provider: Provider::DigitalOcean,
        scope_kind: ScopeKind::Context,
        resolver: Box::new(resolver),
        registry,
        report_name: report_file_name("digitalocean", context),
    }
}

fn doctl_command(context: Option<&str>, service: &[&str]) -> CommandSpec {
    let mut args: Vec<String> = service.iter().map(|s| s.to_string()).collect();
    args.push("--output".to_string());
    args.push("json".to_string());
    if let Some(context) = context {
        args.push("--context".to_string());
        args.push(context.to_string());
    }
    CommandSpec::new("doctl", args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_shape() {
        let plan = plan(Some("team-a"), Arc::new(CommandRunner::with_defaults()));
        assert_eq!(plan.provider, Provider::DigitalOcean);
        assert_eq!(plan.scope_kind, ScopeKind::Context);
        assert_eq!(plan.registry.len(), 1);
        assert_eq!(plan.report_name, "digitalocean-team-a-units.csv");
    }

    #[test]
    fn context_flag_is_optional() {
        assert_eq!(
            doctl_command(None, &["compute", "droplet", "list"]).rendered(),
            "doctl compute droplet list --output json"
        );
    }
}
