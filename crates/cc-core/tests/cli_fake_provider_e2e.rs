//! End-to-end CLI runs against fake provider CLIs.
//!
//! Each test drops a small shell script named after the provider CLI
//! into a temp directory, puts that directory first on PATH, and runs
//! the real binary. No cloud account is touched.

#![cfg(unix)]

use assert_cmd::Command;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

fn write_fake_cli(dir: &Path, name: &str, script: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}\n", script)).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn cloud_census(fake_bin: &Path) -> Command {
    let mut cmd = Command::cargo_bin("cloud-census").expect("cloud-census binary should exist");
    let path = format!(
        "{}:{}",
        fake_bin.display(),
        std::env::var("PATH").unwrap_or_default()
    );
    cmd.env("PATH", path);
    cmd
}

#[test]
fn digitalocean_single_context_report() {
    let dir = tempfile::tempdir().unwrap();
    let bin = dir.path().join("bin");
    fs::create_dir(&bin).unwrap();
    write_fake_cli(
        &bin,
        "doctl",
        r#"printf '[{"id":1},{"id":2},{"id":3}]'"#,
    );

    let out = dir.path().join("reports");
    fs::create_dir(&out).unwrap();

    cloud_census(&bin)
        .args(["digitalocean", "--output-dir"])
        .arg(&out)
        .assert()
        .success();

    let report = fs::read_to_string(out.join("digitalocean-units.csv")).unwrap();
    let lines: Vec<&str> = report.lines().collect();
    assert_eq!(
        lines[0],
        "Resource Type, Unit Counted, Workloads, Error Contexts"
    );
    assert_eq!(lines[1].trim_end(), "Digital Ocean Droplets, 3, 3,");
    assert_eq!(lines[2], "TOTAL, 3, 3");
}

const FAKE_AWS: &str = r#"
case "$*" in
  *describe-regions*) printf '{"Regions":[{"RegionName":"r1"},{"RegionName":"r2"}]}' ;;
  *describe-instances*) printf '[{},{}]' ;;
  *eks*) printf '{"clusters":[]}' ;;
  *) printf '[]' ;;
esac
"#;

#[test]
fn aws_counts_across_discovered_regions() {
    let dir = tempfile::tempdir().unwrap();
    let bin = dir.path().join("bin");
    fs::create_dir(&bin).unwrap();
    write_fake_cli(&bin, "aws", FAKE_AWS);

    let out = dir.path().join("reports");
    fs::create_dir(&out).unwrap();

    cloud_census(&bin)
        .args(["aws", "--output-dir"])
        .arg(&out)
        .assert()
        .success();

    let report = fs::read_to_string(out.join("aws-units.csv")).unwrap();
    let lines: Vec<&str> = report.lines().collect();
    // Two instances in each of two regions; every other probe is quiet
    // and therefore omitted.
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[1].trim_end(), "AWS EC2 Instance, 4, 4,");
    assert_eq!(lines[2], "TOTAL, 4, 4");
}

#[test]
fn aws_region_allow_list_narrows_the_census() {
    let dir = tempfile::tempdir().unwrap();
    let bin = dir.path().join("bin");
    fs::create_dir(&bin).unwrap();
    write_fake_cli(&bin, "aws", FAKE_AWS);

    let out = dir.path().join("reports");
    fs::create_dir(&out).unwrap();

    cloud_census(&bin)
        .args(["aws", "--regions", "r2", "--output-dir"])
        .arg(&out)
        .assert()
        .success();

    let report = fs::read_to_string(out.join("aws-units.csv")).unwrap();
    assert!(report.contains("AWS EC2 Instance, 2, 2,"));
    assert!(report.lines().last().unwrap().starts_with("TOTAL, 2"));
}

#[test]
fn profile_targets_get_separate_reports() {
    let dir = tempfile::tempdir().unwrap();
    let bin = dir.path().join("bin");
    fs::create_dir(&bin).unwrap();
    write_fake_cli(&bin, "aws", FAKE_AWS);

    let out = dir.path().join("reports");
    fs::create_dir(&out).unwrap();

    cloud_census(&bin)
        .args(["aws", "--profiles", "alpha", "beta", "--output-dir"])
        .arg(&out)
        .assert()
        .success();

    assert!(out.join("aws-alpha-units.csv").exists());
    assert!(out.join("aws-beta-units.csv").exists());
}

#[test]
fn discovery_failure_leaves_header_only_report_and_exits_clean() {
    let dir = tempfile::tempdir().unwrap();
    let bin = dir.path().join("bin");
    fs::create_dir(&bin).unwrap();
    write_fake_cli(
        &bin,
        "aws",
        r#"echo "Unable to locate credentials" >&2; exit 255"#,
    );

    let out = dir.path().join("reports");
    fs::create_dir(&out).unwrap();

    // Without --strict a fatal target failure is logged but the process
    // still exits 0.
    cloud_census(&bin)
        .args(["aws", "--output-dir"])
        .arg(&out)
        .assert()
        .success();

    let report = fs::read_to_string(out.join("aws-units.csv")).unwrap();
    assert_eq!(report.lines().count(), 1);
    assert!(report.starts_with("Resource Type"));
}

#[test]
fn strict_mode_reports_fatal_targets_in_the_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let bin = dir.path().join("bin");
    fs::create_dir(&bin).unwrap();
    write_fake_cli(&bin, "aws", "exit 255");

    let out = dir.path().join("reports");
    fs::create_dir(&out).unwrap();

    cloud_census(&bin)
        .args(["aws", "--strict", "--output-dir"])
        .arg(&out)
        .assert()
        .code(3);
}

#[test]
fn empty_scope_mode_completes_despite_discovery_failure() {
    let dir = tempfile::tempdir().unwrap();
    let bin = dir.path().join("bin");
    fs::create_dir(&bin).unwrap();
    write_fake_cli(&bin, "aws", "exit 255");

    let out = dir.path().join("reports");
    fs::create_dir(&out).unwrap();

    cloud_census(&bin)
        .args([
            "aws",
            "--strict",
            "--on-discovery-failure",
            "empty-scope",
            "--output-dir",
        ])
        .arg(&out)
        .assert()
        .success();

    let report = fs::read_to_string(out.join("aws-units.csv")).unwrap();
    assert_eq!(report.lines().last().unwrap(), "TOTAL, 0, 0");
}

#[test]
fn probe_failures_are_recorded_but_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let bin = dir.path().join("bin");
    fs::create_dir(&bin).unwrap();
    // Discovery works; EC2 works in r1 only; everything else is quiet.
    write_fake_cli(
        &bin,
        "aws",
        r#"
case "$*" in
  *describe-regions*) printf '{"Regions":[{"RegionName":"r1"},{"RegionName":"r2"}]}' ;;
  *--region*r2*describe-instances*) echo "RequestLimitExceeded" >&2; exit 254 ;;
  *describe-instances*) printf '[{},{},{}]' ;;
  *eks*) printf '{"clusters":[]}' ;;
  *) printf '[]' ;;
esac
"#,
    );

    let out = dir.path().join("reports");
    fs::create_dir(&out).unwrap();

    cloud_census(&bin)
        .args(["aws", "--strict", "--output-dir"])
        .arg(&out)
        .assert()
        .success();

    let report = fs::read_to_string(out.join("aws-units.csv")).unwrap();
    let lines: Vec<&str> = report.lines().collect();
    assert_eq!(lines[1].trim_end(), "AWS EC2 Instance, 3, 3, r2,");
    assert_eq!(lines[2], "TOTAL, 3, 3");
}
