use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn test_help_shows_all_commands() {
    cargo_bin_cmd!("sdesk")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("login"))
        .stdout(predicate::str::contains("companies"))
        .stdout(predicate::str::contains("projects"))
        .stdout(predicate::str::contains("forgot-password"));
}

#[test]
fn test_projects_help_shows_subcommands() {
    cargo_bin_cmd!("sdesk")
        .args(["projects", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("toggle"))
        .stdout(predicate::str::contains("tickets"))
        .stdout(predicate::str::contains("cost-report"));
}

#[test]
fn test_cost_report_rejects_bad_dates() {
    cargo_bin_cmd!("sdesk")
        .args(["projects", "cost-report", "3", "--from", "31/01/2025"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--from"));
}

#[test]
fn test_interactive_mode_needs_a_terminal() {
    let dir = tempdir().unwrap();

    // assert_cmd pipes stdout, so the full-screen client refuses to start.
    cargo_bin_cmd!("sdesk")
        .env("SDESK_HOME", dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("requires a terminal"));
}
