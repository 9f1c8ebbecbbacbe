//! Runs the built binary against local candidate files.

use std::io::Write;
use std::process::{Command, Output};
use tempfile::{NamedTempFile, TempDir};

fn tajy(args: &[&str]) -> Output {
    // an empty working dir keeps a developer's .tajy.toml out of the run
    let dir = TempDir::new().unwrap();
    Command::new(env!("CARGO_BIN_EXE_tajy-search"))
        .args(args)
        .current_dir(dir.path())
        .env_remove("RUST_LOG")
        .env_remove("TAJY_CONFIG")
        .output()
        .unwrap()
}

fn candidates_file() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"[
            {{"asegurado": "Ana Díaz", "numero": "S-1"}},
            {{"name": "Carlos González", "externalRef": "S-2"}},
            {{"name": "Juan Pérez", "externalRef": "S-3"}}
        ]"#
    )
    .unwrap();
    file
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

#[test]
fn test_score_reports_tier() {
    let output = tajy(&["score", "gonzales", "González"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("phonetic"));
}

#[test]
fn test_score_json() {
    let output = tajy(&["--format", "json", "score", "ana", "Ana Díaz"]);
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(json["tier"], "prefix");
    assert_eq!(json["score"], 0.95);
}

#[test]
fn test_phonetic() {
    let output = tajy(&["phonetic", "Gonzalez"]);
    let key = stdout(&output);
    assert_eq!(key.trim(), stdout(&tajy(&["phonetic", "gonsales"])).trim());
}

#[test]
fn test_search_file_json() {
    let file = candidates_file();
    let path = file.path().to_str().unwrap();

    let output = tajy(&["search", "carlos gonzales", "--file", path, "--format", "json"]);
    assert!(output.status.success());

    let results: Vec<serde_json::Value> = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["name"], "Carlos González");
    assert_eq!(results[0]["externalRef"], "S-2");
    assert!(results[0]["score"].as_f64().unwrap() >= 0.35);
}

#[test]
fn test_search_limit() {
    let file = candidates_file();
    let path = file.path().to_str().unwrap();

    let output = tajy(&[
        "search", "a", "--file", path, "--format", "json", "--threshold", "0", "--limit", "2",
    ]);
    // one character is below the minimum query length
    assert_eq!(output.status.code(), Some(2));

    let output = tajy(&[
        "search", "an", "--file", path, "--format", "json", "--threshold", "0", "--limit", "2",
    ]);
    let results: Vec<serde_json::Value> = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(results.len(), 2);
}

#[test]
fn test_missing_file_exit_code() {
    let output = tajy(&["search", "ana", "--file", "/nonexistent/candidates.json"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("E2001"));
}

#[test]
fn test_invalid_threshold() {
    let file = candidates_file();
    let path = file.path().to_str().unwrap();

    let output = tajy(&["search", "ana", "--file", path, "--threshold", "1.5"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_bad_config_exit_code() {
    let mut config = NamedTempFile::new().unwrap();
    write!(config, "[search]\nprimary_threshold = 3.0\n").unwrap();

    let output = tajy(&["--config", config.path().to_str().unwrap(), "phonetic", "ana"]);
    assert_eq!(output.status.code(), Some(3));
}
