//! AWS unit audit plan.
//!
//! Scope: regions that are opted in (or need no opt-in), discovered via
//! `ec2 describe-regions`. Probes count EC2 instances, ECR repositories,
//! EKS clusters, ECS clusters, and Lambda functions per region.

use cc_common::ScopeKind;
use cc_report::report_file_name;
use std::sync::Arc;

use super::{target_label, Provider, ProviderPlan};
use crate::exec::{CommandRunner, CommandSpec};
use crate::probe::{CliProbe, CountRule, ProbeRegistry};
use crate::scope::{CliScopeResolver, ScopeExtract};

/// Build the AWS plan for one profile target.
pub fn plan(
    profile: Option<&str>,
    regions: &[String],
    runner: Arc<CommandRunner>,
) -> ProviderPlan {
    let discovery = aws_command(
        profile,
        None,
        &[
            "ec2",
            "describe-regions",
            "--filters",
            "Name=opt-in-status,Values=opted-in,opt-in-not-required",
        ],
    );
    let resolver = CliScopeResolver::new(
        ScopeKind::Region,
        target_label(profile),
        discovery,
        ScopeExtract::Field {
            path: vec!["Regions".into()],
            field: "RegionName".into(),
        },
        runner.clone(),
    )
    .with_allow_list(regions.to_vec());

    let mut registry = ProbeRegistry::new();
    registry.register(
        CliProbe::new("AWS EC2 Instance", runner.clone()).step(
            regional_command(
                profile,
                &["ec2", "describe-instances", "--query", "Reservations[].Instances"],
            ),
            CountRule::ArrayLen,
        ),
    );
    registry.register(
        CliProbe::new("AWS Container Repository", runner.clone()).step(
            regional_command(
                profile,
                &[
                    "ecr",
                    "describe-repositories",
                    "--query",
                    "repositories[].repositoryArn",
                ],
            ),
            CountRule::ArrayLen,
        ),
    );
    registry.register(
        CliProbe::new("AWS Kubernetes Cluster (EKS)", runner.clone()).step(
            regional_command(profile, &["eks", "list-clusters"]),
            CountRule::FieldLen("clusters".into()),
        ),
    );
    registry.register(
        CliProbe::new("AWS ECS Cluster", runner.clone()).step(
            regional_command(profile, &["ecs", "list-clusters", "--query", "clusterArns"]),
            CountRule::ArrayLen,
        ),
    );
    registry.register(
        CliProbe::new("AWS Lambda Function", runner.clone()).step(
            regional_command(
                profile,
                &[
                    "lambda",
                    "list-functions",
                    "--query",
                    "Functions[*].FunctionName",
                ],
            ),
            CountRule::ArrayLen,
        ),
    );

    ProviderPlan {
        provider: Provider::Aws,
        scope_kind: ScopeKind::Region,
        resolver: Box::new(resolver),
        registry,
        report_name: report_file_name("aws", profile),
    }
}

/// Per-region probe command: region flag first, then the service call,
/// unpaginated.
fn regional_command(profile: Option<&str>, service: &[&str]) -> CommandSpec {
    let mut spec = aws_command(profile, Some("{scope}"), service);
    spec.args.push("--no-paginate".to_string());
    spec
}

fn aws_command(profile: Option<&str>, region: Option<&str>, service: &[&str]) -> CommandSpec {
    let mut args: Vec<String> = Vec::new();
    if let Some(region) = region {
        args.push("--region".to_string());
        args.push(region.to_string());
    }
    if let Some(profile) = profile {
        args.push("--profile".to_string());
        args.push(profile.to_string());
    }
    args.push("--output".to_string());
    args.push("json".to_string());
    args.extend(service.iter().map(|s| s.to_string()));
    CommandSpec::new("aws", args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_shape() {
        let plan = plan(Some("staging"), &[], Arc::new(CommandRunner::with_defaults()));
        assert_eq!(plan.provider, Provider::Aws);
        assert_eq!(plan.scope_kind, ScopeKind::Region);
        assert_eq!(plan.registry.len(), 5);
        assert_eq!(plan.report_name, "aws-staging-units.csv");
    }

    #[test]
    fn default_target_report_name() {
        let plan = plan(None, &[], Arc::new(CommandRunner::with_defaults()));
        assert_eq!(plan.report_name, "aws-units.csv");
    }

    #[test]
    fn probe_command_includes_profile_and_scope_placeholder() {
        let spec = regional_command(Some("staging"), &["eks", "list-clusters"]);
        assert_eq!(
            spec.rendered(),
            "aws --region {scope} --profile staging --output json eks list-clusters --no-paginate"
        );
    }
}
