//! OCI unit audit plan.
//!
//! Scope: active compartments (root included) discovered via
//! `iam compartment list`; the compartment OCID is the unit id and the
//! compartment name its label. Extra CLI arguments (`--auth
//! security_token` and friends) ride on every command.

use cc_common::ScopeKind;
use cc_report::report_file_name;
use std::sync::Arc;

use super::{target_label, Provider, ProviderPlan};
use crate::exec::{CommandRunner, CommandSpec};
use crate::probe::{CliProbe, CountRule, ProbeRegistry};
use crate::scope::{CliScopeResolver, ScopeExtract};

/// Build the OCI plan for one profile target.
pub fn plan(
    profile: Option<&str>,
    compartments: &[String],
    extra_args: &[String],
    runner: Arc<CommandRunner>,
) -> ProviderPlan {
    let discovery = oci_command(
        profile,
        extra_args,
        &[
            "iam",
            "compartment",
            "list",
            "--all",
            "--include-root",
            "--compartment-id-in-subtree",
            "true",
            "--access-level",
            "ACCESSIBLE",
            "--lifecycle-state",
            "ACTIVE",
        ],
    );
    let resolver = CliScopeResolver::new(
        ScopeKind::Compartment,
        target_label(profile),
        discovery,
        ScopeExtract::IdAndLabel {
            path: vec!["data".into()],
            id_field: "id".into(),
            label_field: "name".into(),
        },
        runner.clone(),
    )
    .with_allow_list(compartments.to_vec());

    let mut registry = ProbeRegistry::new();
    registry.register(
        CliProbe::new("Oracle Compute Instance", runner.clone())
            .with_multiplier(1.0)
            .step(
                oci_command(
                    profile,
                    extra_args,
                    &[
                        "compute",
                        "instance",
                        "list",
                        "--all",
                        "--compartment-id",
                        "{scope}",
                    ],
                ),
                CountRule::FieldLen("data".into()),
            ),
    );
    registry.register(
        CliProbe::new("Oracle Kubernetes Cluster", runner)
            .with_multiplier(1.0)
            .step(
                oci_command(
                    profile,
                    extra_args,
                    &["ce", "cluster", "list", "--all", "--compartment-id", "{scope}"],
                ),
                CountRule::FieldLen("data".into()),
            ),
    );

    ProviderPlan {
        provider: Provider::Oci,
        scope_kind: ScopeKind::Compartment,
        resolver: Box::new(resolver),
        registry,
        report_name: report_file_name("oci", profile),
    }
}

fn oci_command(profile: Option<&str>, extra_args: &[String], service: &[&str]) -> CommandSpec {
    let mut args: Vec<String> = service.iter().map(|s| s.to_string()).collect();
    args.push("--output".to_string());
    args.push("json".to_string());
    if let Some(profile) = profile {
        args.push("--profile".to_string());
        args.push(profile.to_string());
    }
    args.extend(extra_args.iter().cloned());
    CommandSpec::new("oci", args)
}
