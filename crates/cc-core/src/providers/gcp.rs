//! GCP unit audit plan.
//!
//! Probes are project-wide; the project id rides on every command as
//! `--project` rather than mutating global gcloud configuration. Cloud
//! Run services and jobs are counted as one resource type.

use cc_common::{ScopeKind, ScopeUnit};
use cc_report::report_file_name;
use std::sync::Arc;

use super::{Provider, ProviderPlan};
use crate::exec::{CommandRunner, CommandSpec};
use crate::probe::{CliProbe, CountRule, ProbeRegistry};
use crate::scope::StaticScopeResolver;

/// Build the GCP plan for one project target.
pub fn plan(project: &str, runner: Arc<CommandRunner>) -> ProviderPlan {
    let resolver =
        StaticScopeResolver::single(ScopeKind::Project, ScopeUnit::from_id(project));

    let mut registry = ProbeRegistry::new();
    registry.register(
        CliProbe::new("GCP Compute Instance", runner.clone()).step(
            gcloud_command(&["compute", "instances", "list"]),
            CountRule::ArrayLen,
        ),
    );
    registry.register(
        CliProbe::new("GCP Kubernetes Cluster (GKE)", runner.clone()).step(
            gcloud_command(&["container", "clusters", "list"]),
            CountRule::ArrayLen,
        ),
    );
    registry.register(
        CliProbe::new("GCP Cloud Function", runner.clone()).step(
            gcloud_command(&["functions", "list"]),
            CountRule::ArrayLen,
        ),
    );
    registry.register(
        CliProbe::new("GCP Cloud Run", runner.clone())
            .step(
                gcloud_command(&["run", "services", "list"]),
                CountRule::ArrayLen,
            )
            .step(
                gcloud_command(&["run", "jobs", "list"]),
                CountRule::ArrayLen,
            ),
    );
    registry.register(
        CliProbe::new(
            "GCP Artifact Repository (only docker repositories)",
            runner.clone(),
        )
        .step(
            gcloud_command(&[
                "artifacts",
                "repositories",
                "list",
                "--filter=format=docker",
            ]),
            CountRule::ArrayLen,
        ),
    );
    registry.register(
        CliProbe::new("GCP Container Repository", runner).step(
            gcloud_command(&["container", "images", "list"]),
            CountRule::ArrayLen,
        ),
    );

    ProviderPlan {
        provider: Provider::Gcp,
        scope_kind: ScopeKind::Project,
        resolver: Box::new(resolver),
        registry,
        report_name: report_file_name("gcp", Some(project)),
    }
}

fn gcloud_command(service: &[&str]) -> CommandSpec {
    let mut args: Vec<String> = service.iter().map(|s| s.to_string()).collect();
    args.push("--project".to_string());
    args.push("{scope}".to_string());
    args.push("--format".to_string());
    args.push("json".to_string());
    CommandSpec::new("gcloud", args)
}
