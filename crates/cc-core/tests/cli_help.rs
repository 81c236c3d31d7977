//! Help and version surface tests for cloud-census.

use assert_cmd::Command;
use predicates::prelude::*;

fn cloud_census() -> Command {
    Command::cargo_bin("cloud-census").expect("cloud-census binary should exist")
}

#[test]
fn top_level_help_lists_providers() {
    cloud_census()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("aws"))
        .stdout(predicate::str::contains("azure"))
        .stdout(predicate::str::contains("gcp"))
        .stdout(predicate::str::contains("oci"))
        .stdout(predicate::str::contains("alibaba"))
        .stdout(predicate::str::contains("digitalocean"));
}

#[test]
fn version_prints() {
    cloud_census()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("cloud-census"));
}

#[test]
fn provider_help_documents_selectors() {
    cloud_census()
        .args(["aws", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--profiles"))
        .stdout(predicate::str::contains("--regions"));

    cloud_census()
        .args(["oci", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--compartments"))
        .stdout(predicate::str::contains("--cli-args"));
}

#[test]
fn global_flags_documented_in_help() {
    cloud_census()
        .args(["aws", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--on-discovery-failure"))
        .stdout(predicate::str::contains("--strict"))
        .stdout(predicate::str::contains("--timeout"));
}
