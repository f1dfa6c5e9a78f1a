//! CLI integration tests
//!
//! These tests run the binary against temporary projects and verify the
//! exit status, output formats and baseline handling.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const ALPHA_JAVA: &str = r#"
import androidx.annotation.IntRange;

class Paint {
    void setAlpha(@IntRange(from = 0, to = 255) int alpha) {}

    void draw() {
        setAlpha(300);
    }
}
"#;

const CLEAN_KOTLIN: &str = r#"
import androidx.annotation.IntRange

fun setAlpha(@IntRange(from = 0, to = 255) alpha: Int) {}

fun draw() {
    setAlpha(128)
}
"#;

fn project(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (relative, contents) in files {
        let path = dir.path().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }
    dir
}

fn rangelint(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("rangelint").unwrap();
    cmd.arg(root).env("NO_COLOR", "1");
    cmd
}

#[test]
fn test_cli_help() {
    Command::cargo_bin("rangelint")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("rangelint"))
        .stdout(predicate::str::contains("--baseline"))
        .stdout(predicate::str::contains("--no-flow"));
}

#[test]
fn test_cli_version() {
    Command::cargo_bin("rangelint")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_clean_project_succeeds() {
    let dir = project(&[("src/Draw.kt", CLEAN_KOTLIN)]);
    rangelint(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No issues found."));
}

#[test]
fn test_range_error_fails() {
    let dir = project(&[("src/Paint.java", ALPHA_JAVA)]);
    rangelint(dir.path())
        .assert()
        .code(1)
        .stdout(predicate::str::contains("src/Paint.java:8"))
        .stdout(predicate::str::contains("Value must be ≤ 255 (was 300) [Range]"))
        .stdout(predicate::str::contains("setAlpha(300);"));
}

#[test]
fn test_json_output() {
    let dir = project(&[("src/Paint.java", ALPHA_JAVA)]);
    let output = rangelint(dir.path())
        .args(["--format", "json", "--quiet"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["total_issues"], 1);
    assert_eq!(value["issues"][0]["id"], "Range");
    assert_eq!(value["issues"][0]["file"], "src/Paint.java");
    assert_eq!(value["issues"][0]["line"], 8);
}

#[test]
fn test_sarif_output_file() {
    let dir = project(&[("src/Paint.java", ALPHA_JAVA)]);
    let report = dir.path().join("report.sarif");
    rangelint(dir.path())
        .args(["--format", "sarif", "--output"])
        .arg(&report)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Report written to"));

    let sarif = fs::read_to_string(&report).unwrap();
    assert!(sarif.contains("\"ruleId\": \"Range\""));
    assert!(sarif.contains("\"version\": \"2.1.0\""));
}

#[test]
fn test_disable_check() {
    let dir = project(&[("src/Paint.java", ALPHA_JAVA)]);
    rangelint(dir.path())
        .args(["--disable", "Range"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No issues found."));

    rangelint(dir.path())
        .args(["--check", "SupportAnnotationUsage"])
        .assert()
        .success();
}

#[test]
fn test_unknown_check_rejected() {
    let dir = project(&[("src/Draw.kt", CLEAN_KOTLIN)]);
    rangelint(dir.path())
        .args(["--check", "Unused"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown check"));
}

#[test]
fn test_baseline_roundtrip() {
    let dir = project(&[("src/Paint.java", ALPHA_JAVA)]);
    let baseline = dir.path().join("baseline.json");

    rangelint(dir.path())
        .arg("--generate-baseline")
        .arg(&baseline)
        .assert()
        .success();
    assert!(baseline.exists());

    rangelint(dir.path())
        .arg("--baseline")
        .arg(&baseline)
        .assert()
        .success()
        .stdout(predicate::str::contains("No issues found."));

    // A new problem is still reported
    fs::write(
        dir.path().join("src/Other.java"),
        "class Other { void f(Paint p) { p.setAlpha(-1); } }",
    )
    .unwrap();
    rangelint(dir.path())
        .arg("--baseline")
        .arg(&baseline)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Value must be ≥ 0 (was -1)"))
        .stdout(predicate::str::contains("was 300").not());
}

#[test]
fn test_config_file_severity() {
    let dir = project(&[
        ("src/Paint.java", ALPHA_JAVA),
        ("rangelint.toml", "[checks.range]\nseverity = \"warning\"\n"),
    ]);
    rangelint(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Warning: Value must be ≤ 255 (was 300)"));
}
