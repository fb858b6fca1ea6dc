
use assert_cmd::{cargo, prelude::*};
use cli_helpers::{base_cmd, cache_dir, output_dir, read_artifact, run_cmd};
use predicates::prelude::*;
use serde_json::json;
use std::process::Command;
use tempfile::TempDir;

fn setup_temp_home() -> TempDir {
    TempDir::new().expect("failed to create temp home")
}

#[test]
fn all_writes_every_artifact_without_color() {
    let home = setup_temp_home();

    let mut cmd = base_cmd(&home);
    cmd.arg("all");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("GSK"))
        .stdout(predicate::str::contains("£210.00"))
        .stdout(predicate::str::contains("02/2021"))
        .stdout(predicate::str::contains("\u{001b}[").not());

    for file in ["inventory.json", "monthly.json", "top-dividends.json"] {
        assert!(output_dir(&home).join(file).exists(), "{} not written", file);
    }
}

#[test]
fn inventory_folds_orders_and_resolves_yields_from_cache() {
    let home = setup_temp_home();
    run_cmd(&home, &["inventory"]).unwrap();

    let inventory = read_artifact(&home, "inventory.json").unwrap();
    assert_eq!(
        inventory,
        json!({
            "GSK": { "dividendYield": 0.06, "invested": 90.0, "name": "GlaxoSmithKline", "quantity": 6.0 },
            "VOD": { "dividendYield": 0.0712, "invested": 120.0, "name": "Vodafone", "quantity": 100.0 }
        })
    );
}

#[test]
fn monthly_is_chronological() {
    let home = setup_temp_home();
    run_cmd(&home, &["monthly"]).unwrap();

    let monthly = read_artifact(&home, "monthly.json").unwrap();
    assert_eq!(
        monthly,
        json!([
            { "label": "01/2021", "month": 1, "total": 1.0, "year": 2021 },
            { "label": "02/2021", "month": 2, "total": 6.5, "year": 2021 }
        ])
    );
}

#[test]
fn top_dividends_after_inventory() {
    let home = setup_temp_home();
    run_cmd(&home, &["inventory"]).unwrap();
    run_cmd(&home, &["top-dividends"]).unwrap();

    let stats = read_artifact(&home, "top-dividends.json").unwrap();
    assert_eq!(stats["GSK"]["numberOfPayments"], json!(2));
    assert_eq!(stats["GSK"]["total"], json!(3.0));
    assert_eq!(stats["GSK"]["averaged"], json!(1.5));
    assert_eq!(stats["GSK"]["lastPaymentDate"], json!("2021-02-19T15:56:55+02:00"));
    assert_eq!(stats["GSK"]["dividendYield"], json!(6.0));
    assert_eq!(stats["VOD"]["dividendYield"], json!(7.12));
    assert_eq!(stats["VOD"]["numberOfPayments"], json!(1));
}

#[test]
fn rerun_produces_identical_artifacts() {
    let home = setup_temp_home();
    run_cmd(&home, &["all"]).unwrap();
    let first = std::fs::read(output_dir(&home).join("top-dividends.json")).unwrap();

    run_cmd(&home, &["all"]).unwrap();
    let second = std::fs::read(output_dir(&home).join("top-dividends.json")).unwrap();

    assert_eq!(first, second);
}

#[test]
fn top_dividends_without_inventory_fails() {
    let home = setup_temp_home();

    let mut cmd = base_cmd(&home);
    cmd.arg("top-dividends");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("inventory stage first"));
}

#[test]
fn generate_without_fetched_history_fails() {
    let home = setup_temp_home();
    let empty_cache = home.path().join("empty-cache");
    std::fs::create_dir_all(&empty_cache).unwrap();

    let mut cmd = Command::new(cargo::cargo_bin!("divtrack"));
    cmd.env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join("config"))
        .arg("--no-color")
        .arg("--offline")
        .arg("--cache-dir")
        .arg(&empty_cache)
        .arg("--output-dir")
        .arg(output_dir(&home))
        .arg("monthly");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("divtrack fetch"));
}

#[test]
fn fetch_is_refused_offline() {
    let home = setup_temp_home();

    let mut cmd = base_cmd(&home);
    cmd.arg("fetch");

    cmd.assert().failure().stderr(predicate::str::contains("offline"));
}

#[test]
fn prune_reports_removed_count() {
    let home = setup_temp_home();

    let mut cmd = base_cmd(&home);
    cmd.arg("prune").arg("stock-bot");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Removed 0 expired entries from stock-bot"));
    assert!(cache_dir(&home).join("stock-bot/GSK/instrument.json").exists());
}
