//! Integration tests for stonklog CLI.

use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Get the stonklog binary, isolated from the user's config and data.
fn stonklog_bin(home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_stonklog"));
    cmd.env("XDG_CONFIG_HOME", home.join("config"))
        .env_remove("STONKLOG_CONFIG")
        .env_remove("RUST_LOG")
        .arg("--data-dir")
        .arg(home.join("data"));
    cmd
}

fn run(home: &Path, args: &[&str]) -> Output {
    stonklog_bin(home)
        .args(args)
        .output()
        .expect("Failed to execute command")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_help_flag() {
    let home = TempDir::new().unwrap();
    let output = run(home.path(), &["--help"]);

    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("stonklog"));
    assert!(out.contains("record"));
    assert!(out.contains("eps"));
    assert!(out.contains("--data-dir"));
}

#[test]
fn test_version_flag() {
    let home = TempDir::new().unwrap();
    let output = run(home.path(), &["--version"]);

    assert!(output.status.success());
    assert!(stdout(&output).contains("stonklog 0."));
}

#[test]
fn test_stock_add_and_list() {
    let home = TempDir::new().unwrap();
    let added = run(home.path(), &["stock", "add", "aapl", "Apple"]);
    assert!(added.status.success(), "{}", stderr(&added));
    assert!(stdout(&added).contains("Registered AAPL (Apple)"));

    let listed = run(home.path(), &["stock", "list"]);
    assert!(listed.status.success());
    let out = stdout(&listed);
    assert!(out.contains("AAPL"));
    assert!(out.contains("fixed"));
}

#[test]
fn test_duplicate_ticker_fails() {
    let home = TempDir::new().unwrap();
    assert!(run(home.path(), &["stock", "add", "7203", "Toyota"]).status.success());

    let again = run(home.path(), &["stock", "add", " 7203 ", "Toyota Motor"]);
    assert!(!again.status.success());
    assert!(stderr(&again).contains("7203"));
}

#[test]
fn test_record_without_stock_fails() {
    let home = TempDir::new().unwrap();
    let output = run(home.path(), &["record", "add", "-t", "ZZZ", "-d", "2024-01-01", "-p", "10"]);
    assert!(!output.status.success());
}

#[test]
fn test_eps_change_recomputes_per() {
    let home = TempDir::new().unwrap();
    assert!(run(home.path(), &["stock", "add", "7203", "Toyota"]).status.success());

    let added = run(home.path(), &["record", "add", "-t", "7203", "-d", "2024-03-01", "-p", "3000"]);
    assert!(added.status.success(), "{}", stderr(&added));
    assert!(stdout(&added).contains("PER -"));

    let set = run(home.path(), &["eps", "set", "7203", "--fixed", "150"]);
    assert!(set.status.success(), "{}", stderr(&set));
    assert!(stdout(&set).contains("recomputed 1 record(s)"));

    let listed = run(home.path(), &["record", "list", "-f", "json"]);
    assert!(listed.status.success());
    let records: serde_json::Value = serde_json::from_str(&stdout(&listed)).unwrap();
    assert_eq!(records[0]["ticker"], "7203");
    assert_eq!(records[0]["epsUsed"], 150.0);
    assert_eq!(records[0]["per"], 20.0);
}

#[test]
fn test_quarterly_ttm() {
    let home = TempDir::new().unwrap();
    assert!(run(home.path(), &["stock", "add", "X", "Example"]).status.success());
    for (quarter, eps) in [("2023Q4", "1"), ("2024Q1", "2"), ("2024Q2", "3"), ("2024Q3", "4"), ("2024Q4", "5")] {
        let output = run(home.path(), &["eps", "quarter", "X", quarter, eps]);
        assert!(output.status.success(), "{}", stderr(&output));
    }
    assert!(run(home.path(), &["eps", "set", "X", "--mode", "quarterly"]).status.success());

    let shown = run(home.path(), &["eps", "show", "X"]);
    let out = stdout(&shown);
    assert!(out.contains("TTM:       14.00"));
    assert!(out.contains("Resolved:  14.00"));

    let bad = run(home.path(), &["eps", "quarter", "X", "2024Q5", "1"]);
    assert!(!bad.status.success());
}

#[test]
fn test_export_import_roundtrip() {
    let home = TempDir::new().unwrap();
    assert!(run(home.path(), &["stock", "add", "AAPL", "Apple"]).status.success());
    assert!(run(home.path(), &["record", "add", "-t", "AAPL", "-d", "2024-05-01", "-p", "180.5", "-m", "note"])
        .status
        .success());

    let file = home.path().join("backup.json");
    let exported = run(home.path(), &["export", "-o", file.to_str().unwrap()]);
    assert!(exported.status.success(), "{}", stderr(&exported));

    let other = TempDir::new().unwrap();
    let imported = run(other.path(), &["import", file.to_str().unwrap()]);
    assert!(imported.status.success(), "{}", stderr(&imported));
    assert!(stdout(&imported).contains("Imported 1 stock(s) and 1 record(s)"));

    let listed = run(other.path(), &["record", "list"]);
    let out = stdout(&listed);
    assert!(out.contains("Ticker: AAPL"));
    assert!(out.contains("Price: 180.5"));
    assert!(out.contains("Memo: note"));
}

#[test]
fn test_malformed_import_keeps_data() {
    let home = TempDir::new().unwrap();
    assert!(run(home.path(), &["stock", "add", "MSFT", "Microsoft"]).status.success());

    let file = home.path().join("broken.json");
    std::fs::write(&file, "{ not json").unwrap();
    let imported = run(home.path(), &["import", file.to_str().unwrap()]);
    assert!(!imported.status.success());
    assert!(stderr(&imported).contains("check the file format"));

    let listed = run(home.path(), &["stock", "list"]);
    assert!(stdout(&listed).contains("MSFT"));
}

#[test]
fn test_view_batch() {
    let home = TempDir::new().unwrap();
    assert!(run(home.path(), &["stock", "add", "AAPL", "Apple"]).status.success());
    assert!(run(home.path(), &["record", "add", "-t", "AAPL", "-d", "2024-05-01", "-p", "180"])
        .status
        .success());

    let output = run(home.path(), &["view", "-b", "-M", "price"]);
    assert!(output.status.success(), "{}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("=== STONKLOG all | Price ==="));
    assert!(out.contains("2024-05-01 AAPL"));
}

#[test]
fn test_ocr_missing_image_reports_status() {
    let home = TempDir::new().unwrap();
    let output = run(home.path(), &["ocr", home.path().join("nope.png").to_str().unwrap()]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("failed to read image"));
}

#[test]
fn test_config_init() {
    let home = TempDir::new().unwrap();
    let path = home.path().join("stonklog.toml");
    let output = run(home.path(), &["config", "--init", "-c", path.to_str().unwrap()]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(path.exists());
}
