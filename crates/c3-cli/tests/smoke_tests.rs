//! Smoke tests for the c3 CLI
//!
//! Run the real binary against throwaway projects.

#![allow(deprecated)] // Allow deprecated Command::cargo_bin until assert_cmd is updated
#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use c3::{LineHits, SessionFactory, SNAPSHOT_FILE};
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Get a command for the c3 binary
fn c3() -> Command {
    Command::cargo_bin("c3").expect("c3 binary should exist")
}

/// Project with `codeception.yml` and one merged run
fn project() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("codeception.yml"), "paths:\n  output: out\n").unwrap();
    let work_dir = dir.path().join("out/c3tmp");
    seed(&work_dir.join(SNAPSHOT_FILE), "checkout", &[(1, 1), (2, 0)]);
    (dir, work_dir)
}

fn seed(path: &Path, label: &str, lines: &[(u32, u64)]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let hits: LineHits = [("src/cart.rs".to_string(), lines.iter().copied().collect())]
        .into_iter()
        .collect();
    let factory = SessionFactory::default();
    let (mut snapshot, mut lock) = factory.lock(path).unwrap();
    let mut run = factory.fresh();
    run.record(label, &hits);
    snapshot.merge(&run);
    lock.write_back(&snapshot).unwrap();
}

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_version_flag() {
    c3().arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.4.0"));
}

#[test]
fn test_help_flag() {
    c3().arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("report"))
        .stdout(predicate::str::contains("merge"))
        .stdout(predicate::str::contains("summary"));
}

#[test]
fn test_no_args_fails() {
    c3().assert().failure(); // Requires a subcommand
}

#[test]
fn test_unknown_format_rejected() {
    c3().args(["report", "pdf"]).assert().failure();
}

// ============================================================================
// Commands
// ============================================================================

#[test]
fn test_summary_json() {
    let (dir, _) = project();
    c3().args(["summary", "--json", "-C"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"checkout\""))
        .stdout(predicate::str::contains("\"executable_lines\": 2"));
}

#[test]
fn test_summary_text() {
    let (dir, _) = project();
    c3().args(["summary", "-C"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("src/cart.rs"))
        .stdout(predicate::str::contains("1/2"));
}

#[test]
fn test_summary_missing_config() {
    let dir = TempDir::new().unwrap();
    c3().args(["summary", "-C"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Codecoverage config file"));
}

#[test]
fn test_report_clover() {
    let (dir, work_dir) = project();
    c3().args(["report", "clover", "-C"])
        .arg(dir.path())
        .assert()
        .success();
    let xml = fs::read_to_string(work_dir.join("codecoverage.clover.xml")).unwrap();
    assert!(xml.contains("src/cart.rs"));
}

#[test]
fn test_report_html_uncompressed() {
    let (dir, work_dir) = project();
    c3().args(["report", "html", "--no-gzip", "-C"])
        .arg(dir.path())
        .assert()
        .success();
    let tar = fs::read(work_dir.join("codecoverage.tar")).unwrap();
    let mut archive = tar::Archive::new(tar.as_slice());
    assert!(archive.entries().unwrap().count() > 0);
}

#[test]
fn test_merge_two_snapshots() {
    let dir = TempDir::new().unwrap();
    let a = dir.path().join("a.serialized");
    let b = dir.path().join("b.serialized");
    seed(&a, "one", &[(1, 1)]);
    seed(&b, "two", &[(2, 1)]);
    let into = dir.path().join("all.serialized");

    c3().arg("merge")
        .arg(&a)
        .arg(&b)
        .arg("--into")
        .arg(&into)
        .assert()
        .success();

    let merged = SessionFactory::default().load(&into).unwrap();
    assert_eq!(merged.tests().len(), 2);
    assert_eq!(merged.covered_lines("src/cart.rs").len(), 2);
}

#[test]
fn test_clear_quiet() {
    let (dir, work_dir) = project();
    c3().args(["clear", "-q", "-C"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
    assert!(work_dir.is_dir());
    assert_eq!(fs::read_dir(&work_dir).unwrap().count(), 0);
}
