//! Azure unit audit plan.
//!
//! Probes are subscription-wide, so the scope is a single unit per
//! target. Container repositories drill down: registries first, then
//! repositories per registry.

use cc_common::{ScopeKind, ScopeUnit};
use cc_report::report_file_name;
use std::sync::Arc;

use super::{target_label, Provider, ProviderPlan};
use crate::exec::{CommandRunner, CommandSpec};
use crate::probe::{CliProbe, CountRule, NestedCliProbe, ProbeRegistry};
use crate::scope::StaticScopeResolver;

/// Build the Azure plan for one subscription target.
pub fn plan(subscription: Option<&str>, runner: Arc<CommandRunner>) -> ProviderPlan {
    let resolver = StaticScopeResolver::single(
        ScopeKind::Subscription,
        ScopeUnit::from_id(target_label(subscription)),
    );

    let mut registry = ProbeRegistry::new();
    registry.register(
        CliProbe::new("Azure Virtual Machine", runner.clone())
            .step(az_command(subscription, &["vm", "list"]), CountRule::ArrayLen),
    );
    registry.register(
        CliProbe::new("Azure Kubernetes Cluster (AKS)", runner.clone()).step(
            az_command(subscription, &["aks", "list"]),
            CountRule::ArrayLen,
        ),
    );
    registry.register(NestedCliProbe::new(
        "Azure Container Repository",
        az_command(subscription, &["acr", "list"]),
        "name",
        az_command(subscription, &["acr", "repository", "list", "--name", "{name}"]),
        CountRule::ArrayLen,
        runner,
    ));

    ProviderPlan {
        provider: Provider::Azure,
        scope_kind: ScopeKind::Subscription,
        resolver: Box::new(resolver),
        registry,
        report_name: report_file_name("azure", subscription),
    }
}

fn az_command(subscription: Option<&str>, service: &[&str]) -> CommandSpec {
    let mut args: Vec<String> = service.iter().map(|s| s.to_string()).collect();
    if let Some(subscription) = subscription {
        args.push("--subscription".to_string());
        args.push(subscription.to_string());
    }
    args.push("--output".to_string());
    args.push("json".to_string());
    args.push("--only-show-errors".to_string());
    CommandSpec::new("az", args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_shape() {
        let plan = plan(
            Some("0000-1111"),
            Arc::new(CommandRunner::with_defaults()),
        );
        assert_eq!(plan.provider, Provider::Azure);
        assert_eq!(plan.scope_kind, ScopeKind::Subscription);
        assert_eq!(plan.registry.len(), 3);
        assert_eq!(plan.report_name, "azure-0000-1111-units.csv");
    }

    #[test]
    fn subscription_flag_is_optional() {
        assert_eq!(
            az_command(None, &["vm", "list"]).rendered(),
            "az vm list --output json --only-show-errors"
        );
        assert_eq!(
            az_command(Some("s1"), &["vm", "list"]).rendered(),
            "az vm list --subscription s1 --output json --only-show-errors"
        );
    }
}
