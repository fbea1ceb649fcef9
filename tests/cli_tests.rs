//! Integration tests for the zotsort CLI
//!
//! Every test runs offline: either against an empty in-memory library or one
//! seeded from a `--snapshot` file.

use assert_cmd::{cargo::cargo_bin_cmd, Command};
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const ENV_OVERRIDES: [&str; 5] = [
    "ZOTSORT_CONFIG",
    "ZOTSORT_ZOTERO_API_KEY",
    "ZOTSORT_LIBRARY_ID",
    "ZOTSORT_CLASSIFIER_API_KEY",
    "ZOTSORT_DRY_RUN",
];

/// Get a Command for zotsort with a clean environment, run inside `dir`
fn zotsort(dir: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("zotsort");
    cmd.current_dir(dir);
    for var in ENV_OVERRIDES {
        cmd.env_remove(var);
    }
    cmd
}

/// Write a config file into `dir` and return the `--config` arguments
fn write_config(dir: &Path, content: &str) -> [String; 2] {
    let path = dir.join("zotsort.toml");
    fs::write(&path, content).unwrap();
    ["--config".to_string(), path.display().to_string()]
}

fn write_snapshot(dir: &Path) -> String {
    let snapshot = serde_json::json!({
        "folders": [
            {"key": "F1", "name": "Extremes×Mechanisms"},
            {"key": "F2", "name": "Flash Drought Dynamics", "parent": "F1"},
        ],
        "items": [
            {"key": "P1", "item_type": "journalArticle", "title": "Onset of flash droughts",
             "tags": ["精读", "gemini_read", "misc"]},
            {"key": "P2", "item_type": "journalArticle", "title": "Soil moisture memory",
             "tags": ["重要"]},
            {"key": "P3", "item_type": "book", "title": "Hydrology", "tags": []},
        ],
    });
    let path = dir.join("library.json");
    fs::write(&path, serde_json::to_string_pretty(&snapshot).unwrap()).unwrap();
    path.display().to_string()
}

// ============================================================================
// Help and version
// ============================================================================

#[test]
fn test_help_flag() {
    let dir = tempdir().unwrap();
    zotsort(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: zotsort"))
        .stdout(predicate::str::contains("organize"))
        .stdout(predicate::str::contains("resolve"))
        .stdout(predicate::str::contains("clean-tags"));
}

#[test]
fn test_version_flag() {
    let dir = tempdir().unwrap();
    zotsort(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("zotsort"));
}

#[test]
fn test_no_command_prints_hint() {
    let dir = tempdir().unwrap();
    zotsort(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("zotsort --help"));
}

// ============================================================================
// Errors and exit codes
// ============================================================================

#[test]
fn test_missing_explicit_config_is_usage_error() {
    let dir = tempdir().unwrap();
    zotsort(dir.path())
        .args(["--config", "nope.toml", "--format", "json", "cache", "show"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("\"missing_config\""));
}

#[test]
fn test_unknown_argument_as_json_envelope() {
    let dir = tempdir().unwrap();
    zotsort(dir.path())
        .args(["--format", "json", "resolve", "A", "--bogus"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("\"usage_error\""));
}

#[test]
fn test_invalid_config_value() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), "[keywords]\nmerge_threshold = 1.5\n");
    zotsort(dir.path())
        .args(&config)
        .args(["cache", "show"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("keywords.merge_threshold"));
}

#[test]
fn test_organize_requires_classifier_key() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), "");
    zotsort(dir.path())
        .args(&config)
        .args(["--offline", "organize"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("classifier.api_key"));
}

#[test]
fn test_organize_rejects_zero_batch_size() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), "[classifier]\napi_key = \"k\"\n");
    zotsort(dir.path())
        .args(&config)
        .args(["--offline", "organize", "--batch-size", "0"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--batch-size"));
}

#[test]
fn test_organize_unknown_target_collection() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), "[classifier]\napi_key = \"k\"\n");
    let snapshot = write_snapshot(dir.path());
    zotsort(dir.path())
        .args(&config)
        .args(["--snapshot", &snapshot, "organize", "--target", "No/Such"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_live_remote_requires_credentials() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), "");
    zotsort(dir.path())
        .args(&config)
        .args(["cache", "refresh"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("zotero.library_id"));
}

// ============================================================================
// Resolve
// ============================================================================

#[test]
fn test_resolve_from_warm_cache() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), "");
    fs::write(
        dir.path().join("collections_cache.json"),
        r#"{"A": {"key": "K1", "parent": null}, "B": {"key": "K2", "parent": "K1"}}"#,
    )
    .unwrap();

    zotsort(dir.path())
        .args(&config)
        .args(["--offline", "resolve", "A/B"])
        .assert()
        .success()
        .stdout("K2\n");
}

#[test]
fn test_resolve_refreshes_cold_cache_from_snapshot() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), "");
    let snapshot = write_snapshot(dir.path());

    zotsort(dir.path())
        .args(&config)
        .args([
            "--snapshot",
            &snapshot,
            "resolve",
            "Extremes×Mechanisms / Flash Drought Dynamics",
        ])
        .assert()
        .success()
        .stdout("F2\n");

    assert!(!dir.path().join("collections_cache.json").exists());
}

#[test]
fn test_offline_resolve_keeps_real_cache_file() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), "");
    let cache_path = dir.path().join("collections_cache.json");
    let seeded = r#"{"A": {"key": "K1", "parent": null}, "B": {"key": "K2", "parent": "K1"}}"#;
    fs::write(&cache_path, seeded).unwrap();

    zotsort(dir.path())
        .args(&config)
        .args(["--offline", "resolve", "A/New"])
        .assert()
        .success()
        .stdout("dry-run:New@K1\n");

    let cache: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&cache_path).unwrap()).unwrap();
    assert_eq!(cache["A"]["key"], "K1");
    assert_eq!(cache["B"]["key"], "K2");
    assert_eq!(cache.as_object().unwrap().len(), 2);
}

#[test]
fn test_resolve_dry_run_plans_missing_folders() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), "");
    let snapshot = write_snapshot(dir.path());

    let output = zotsort(dir.path())
        .args(&config)
        .args([
            "--snapshot",
            &snapshot,
            "--format",
            "json",
            "resolve",
            "Extremes×Mechanisms/New Topic",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["placeholder"], true);
    assert_eq!(json["dry_run"], true);
    assert_eq!(json["key"], "dry-run:New Topic@F1");
}

#[test]
fn test_resolve_live_against_snapshot_creates_in_memory() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), "");
    let snapshot = write_snapshot(dir.path());

    zotsort(dir.path())
        .args(&config)
        .args(["--snapshot", &snapshot, "--live", "resolve", "Reviews×Synthesis/Domain Reviews"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("MEM"));

    assert!(!dir.path().join("collections_cache.json").exists());
}

#[test]
fn test_resolve_unclassified() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), "");
    zotsort(dir.path())
        .args(&config)
        .args(["--offline", "resolve", "unclassified"])
        .assert()
        .success()
        .stdout("unclassified\n");
}

// ============================================================================
// Cache
// ============================================================================

#[test]
fn test_cache_show_and_refresh() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), "[organizer]\ncache_file = \"state/cache.json\"\n");
    let snapshot = write_snapshot(dir.path());
    let cache_path = dir.path().join("state/cache.json");

    zotsort(dir.path())
        .args(&config)
        .args(["--offline", "cache", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("is empty"));

    zotsort(dir.path())
        .args(&config)
        .args(["--snapshot", &snapshot, "cache", "refresh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 folders").and(predicate::str::contains("unchanged")));
    assert!(!cache_path.exists());

    fs::create_dir_all(cache_path.parent().unwrap()).unwrap();
    fs::write(
        &cache_path,
        r#"{"Flash Drought Dynamics": {"key": "F2", "parent": "F1"}}"#,
    )
    .unwrap();

    let output = zotsort(dir.path())
        .args(&config)
        .args(["--offline", "--format", "json", "cache", "show"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["needs_rebuild"], false);
    assert_eq!(json["entries"]["Flash Drought Dynamics"]["key"], "F2");
    assert_eq!(json["entries"]["Flash Drought Dynamics"]["parent"], "F1");
}

#[test]
fn test_offline_cache_refresh_reports_unsaved() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), "");
    let snapshot = write_snapshot(dir.path());
    let cache_path = dir.path().join("collections_cache.json");
    fs::write(&cache_path, r#"{"A": {"key": "K1", "parent": null}}"#).unwrap();

    let output = zotsort(dir.path())
        .args(&config)
        .args(["--snapshot", &snapshot, "--format", "json", "cache", "refresh"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["entries"], 2);
    assert_eq!(json["saved"], false);
    assert_eq!(
        fs::read_to_string(&cache_path).unwrap(),
        r#"{"A": {"key": "K1", "parent": null}}"#
    );
}

// ============================================================================
// Tag cleaning
// ============================================================================

#[test]
fn test_clean_tags_dry_run_summary() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), "");
    let snapshot = write_snapshot(dir.path());

    let output = zotsort(dir.path())
        .args(&config)
        .args(["--snapshot", &snapshot, "--format", "json", "clean-tags"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["dry_run"], true);
    assert_eq!(json["summary"]["processed"], 2);
    assert_eq!(json["summary"]["cleaned"], 1);
    assert_eq!(json["summary"]["skipped"], 1);
}

#[test]
fn test_clean_tags_keep_override() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), "");
    let snapshot = write_snapshot(dir.path());

    zotsort(dir.path())
        .args(&config)
        .args(["--snapshot", &snapshot, "clean-tags", "--keep", "misc"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Would clean 2 of 2 items"));
}

// ============================================================================
// Keywords
// ============================================================================

fn write_keyword_input(dir: &Path) -> String {
    let records = serde_json::json!([
        {"key": "A", "title": "Flash drought onset", "keywords": ["flash drought", "soil moisture", "evapotranspiration"]},
        {"key": "B", "title": "Drought monitoring", "keywords": ["flash drought", "soil moisture", "remote sensing"]},
        {"key": "C", "title": "Drought and vegetation", "keywords": ["flash drought", "vegetation"]},
        {"key": "D", "title": "Empty", "keywords": []},
    ]);
    let path = dir.join("keywords.json");
    fs::write(&path, records.to_string()).unwrap();
    path.display().to_string()
}

#[test]
fn test_keywords_analyze_writes_reports() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), "");
    let input = write_keyword_input(dir.path());

    zotsort(dir.path())
        .args(&config)
        .args(["keywords", "analyze", "--input", &input, "--output-dir", "out"])
        .assert()
        .success()
        .stdout(predicate::str::contains("3 papers"));

    let out = dir.path().join("out");
    assert!(out.join("keyword_categories.json").is_file());
    assert!(out.join("keyword_statistics.json").is_file());
    assert!(out.join("keyword_report.txt").is_file());

    let stats: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("keyword_statistics.json")).unwrap())
            .unwrap();
    assert_eq!(stats["total_items"], 3);
}

#[test]
fn test_keywords_top_limit() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), "");
    let input = write_keyword_input(dir.path());

    let output = zotsort(dir.path())
        .args(&config)
        .args(["--format", "json", "keywords", "top", "--input", &input, "-n", "1"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let top = json.as_array().unwrap();
    assert_eq!(top.len(), 1);
    let merged = top[0]["merged"].as_array().unwrap();
    assert!(merged.iter().any(|k| k == "flash drought"));
}

#[test]
fn test_keywords_bad_input_is_data_error() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), "");
    fs::write(dir.path().join("bad.json"), "{not json").unwrap();

    zotsort(dir.path())
        .args(&config)
        .args(["keywords", "top", "--input", "bad.json"])
        .assert()
        .code(3);
}
