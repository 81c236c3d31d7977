//! Alibaba Cloud unit audit plan.
//!
//! Scope: regions via `ecs DescribeRegions` (the list sits under
//! `.Regions.Region`); one probe counting ECS instances per region.

use cc_common::ScopeKind;
use cc_report::report_file_name;
use std::sync::Arc;

use super::{target_label, Provider, ProviderPlan};
use crate::exec::{CommandRunner, CommandSpec};
use crate::probe::{CliProbe, CountRule, ProbeRegistry};
use crate::scope::{CliScopeResolver, ScopeExtract};

/// Build the Alibaba plan for one profile target.
pub fn plan(
    profile: Option<&str>,
    regions: &[String],
    runner: Arc<CommandRunner>,
) -> ProviderPlan {
    let resolver = CliScopeResolver::new(
        ScopeKind::Region,
        target_label(profile),
        aliyun_command(profile, &["ecs", "DescribeRegions"]),
        ScopeExtract::Field {
            path: vec!["Regions".into(), "Region".into()],
            field: "RegionId".into(),
        },
        runner.clone(),
    )
    .with_allow_list(regions.to_vec());

    let mut registry = ProbeRegistry::new();
    registry.register(
        CliProbe::new("Alibaba ECS Instance", runner)
            .with_multiplier(1.0)
            .step(
                aliyun_command(profile, &["ecs", "DescribeInstances", "--RegionId", "{scope}"]),
                CountRule::PathLen(vec!["Instances".into(), "Instance".into()]),
            ),
    );

    ProviderPlan {
        provider: Provider::Alibaba,
        scope_kind: ScopeKind::Region,
        resolver: Box::new(resolver),
        registry,
        report_name: report_file_name("alibaba", profile),
    }
}

fn aliyun_command(profile: Option<&str>, service: &[&str]) -> CommandSpec {
    let mut args: Vec<String> = service.iter().map(|s| s.to_string()).collect();
    if let Some(profile) = profile {
        args.push("--profile".to_string());
        args.push(profile.to_string());
    }
    CommandSpec::new("aliyun", args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_shape() {
        let plan = plan(None, &[], Arc::new(CommandRunner::with_defaults()));
        assert_eq!(plan.provider, Provider::Alibaba);
        assert_eq!(plan.scope_kind, ScopeKind::Region);
        assert_eq!(plan.registry.len(), 1);
        assert_eq!(plan.report_name, "alibaba-units.csv");
    }

    #[test]
    fn region_placeholder_in_probe_command() {
        let spec = aliyun_command(Some("p1"), &["ecs", "DescribeInstances", "--RegionId", "{scope}"]);
        assert_eq!(
            spec.rendered(),
            "aliyun ecs DescribeInstances --RegionId {scope} --profile p1"
        );
    }
}
