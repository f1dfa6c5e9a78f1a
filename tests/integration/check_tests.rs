//! End-to-end checks over small Android-style projects on disk
//!
//! Each test writes a project into a temp directory, runs discovery, model
//! building and the checks, and inspects the findings.

use rangelint::analysis::{Analyzer, Finding, IssueId, Severity};
use rangelint::config::Config;
use rangelint::discovery::FileFinder;
use rangelint::model::ModelBuilder;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn analyze(root: &Path, config: &Config) -> Vec<Finding> {
    let files = FileFinder::new(config).find_files(root).unwrap();
    let model = ModelBuilder::new().build_from_files(&files).unwrap();
    Analyzer::new(config).analyze(&model)
}

fn messages(findings: &[Finding]) -> Vec<&str> {
    findings.iter().map(|f| f.message.as_str()).collect()
}

const COLORS_JAVA: &str = r#"
package com.example.ui;

import androidx.annotation.IntRange;

public class Colors {
    public static void setAlpha(@IntRange(from = 0, to = 255) int alpha) {}
}
"#;

#[test]
fn test_cross_file_java_call() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "app/src/main/java/com/example/ui/Colors.java", COLORS_JAVA);
    write(
        dir.path(),
        "app/src/main/java/com/example/ui/Screen.java",
        r#"
package com.example.ui;

class Screen {
    void render() {
        Colors.setAlpha(512);
        Colors.setAlpha(128);
    }
}
"#,
    );

    let findings = analyze(dir.path(), &Config::default());
    assert_eq!(messages(&findings), vec!["Value must be ≤ 255 (was 512)"]);

    let finding = &findings[0];
    assert_eq!(finding.issue, IssueId::Range);
    assert_eq!(finding.severity, Severity::Error);
    assert!(finding.location.file.ends_with("Screen.java"));
    assert_eq!(finding.location.line, 6);
}

#[test]
fn test_kotlin_and_java_mixed() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "app/src/main/java/com/example/ui/Colors.java", COLORS_JAVA);
    write(
        dir.path(),
        "app/src/main/kotlin/com/example/ui/Fade.kt",
        r#"
package com.example.ui

fun fade() {
    Colors.setAlpha(-5)
}
"#,
    );

    let findings = analyze(dir.path(), &Config::default());
    assert_eq!(messages(&findings), vec!["Value must be ≥ 0 (was -5)"]);
    assert!(findings[0].location.file.ends_with("Fade.kt"));
}

#[test]
fn test_both_checks_sorted_by_location() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "src/Widget.java",
        r#"
class Widget {
    void setLevel(@IntRange(from = 10, to = 0) int level) {}
    void setScale(@FloatRange(from = 0.0, to = 2.0) float scale) {}

    void update() {
        setScale(3.0f);
    }
}
"#,
    );

    let findings = analyze(dir.path(), &Config::default());
    assert_eq!(
        findings.iter().map(|f| f.issue).collect::<Vec<_>>(),
        vec![IssueId::SupportAnnotationUsage, IssueId::Range]
    );
    assert_eq!(
        messages(&findings),
        vec![
            "Invalid range: the `from` attribute must be less than the `to` attribute",
            "Value must be ≤ 2.0 (was 3.0)",
        ]
    );
}

#[test]
fn test_config_disables_check_and_overrides_severity() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "src/Widget.java",
        r#"
class Widget {
    void setLevel(@IntRange(from = 10, to = 0) int level) {}
    void setCount(@IntRange(from = 1) int count) {}

    void update() {
        setCount(0);
    }
}
"#,
    );
    write(
        dir.path(),
        ".rangelint.yml",
        "checks:\n  annotation_usage:\n    enabled: false\n  range:\n    severity: warning\n",
    );

    let config = Config::from_default_locations(dir.path()).unwrap();
    let findings = analyze(dir.path(), &config);
    assert_eq!(messages(&findings), vec!["Value must be ≥ 1 (was 0)"]);
    assert_eq!(findings[0].severity, Severity::Warning);
}

#[test]
fn test_test_sources_skipped_by_default() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "app/src/main/java/Colors.java", COLORS_JAVA);
    write(
        dir.path(),
        "app/src/test/java/ColorsTest.java",
        r#"
class ColorsTest {
    void testInvalid() {
        Colors.setAlpha(1000);
    }
}
"#,
    );

    assert!(analyze(dir.path(), &Config::default()).is_empty());

    let mut config = Config::default();
    config.analysis.include_tests = true;
    assert_eq!(
        messages(&analyze(dir.path(), &config)),
        vec!["Value must be ≤ 255 (was 1000)"]
    );
}

#[test]
fn test_flow_inference_toggle() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "src/Volume.java",
        r#"
class Volume {
    void setVolume(@IntRange(from = 0, to = 10) int volume) {}

    void apply(int level) {
        if (level > 20 && level < 50) {
            setVolume(level);
        }
    }
}
"#,
    );

    let findings = analyze(dir.path(), &Config::default());
    assert_eq!(
        messages(&findings),
        vec!["Value must be ≥ 0 and ≤ 10 but `level` can be ≥ 21 and ≤ 49"]
    );

    let mut config = Config::default();
    config.analysis.flow_inference = false;
    assert!(analyze(dir.path(), &config).is_empty());
}

#[test]
fn test_local_shadows_field_of_other_class() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "app/src/main/java/com/example/ui/Colors.java", COLORS_JAVA);
    write(
        dir.path(),
        "app/src/main/java/com/example/ui/Other.java",
        r#"
package com.example.ui;

import androidx.annotation.IntRange;

class Other {
    @IntRange(from = 0, to = 1000) int value;
}
"#,
    );
    write(
        dir.path(),
        "app/src/main/java/com/example/ui/A.java",
        r#"
package com.example.ui;

class A {
    void u() {
        int value = 5;
        Colors.setAlpha(value);
    }
}
"#,
    );

    let findings = analyze(dir.path(), &Config::default());
    assert!(findings.is_empty(), "unexpected findings: {:?}", messages(&findings));
}

#[test]
fn test_constant_arrays_from_other_class() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "app/src/main/java/com/example/ui/Limits.java",
        r#"
package com.example.ui;

class Limits {
    static final float[] INVALID_FLOAT_ARRAY = new float[] {10f, 12f, 5f};
    static final int HIGH = 300;
}
"#,
    );
    write(
        dir.path(),
        "app/src/main/java/com/example/ui/Screen.java",
        r#"
package com.example.ui;

import androidx.annotation.FloatRange;
import androidx.annotation.IntRange;

class Screen {
    void setLevels(@FloatRange(from = 10) float[] levels) {}
    void setAlpha(@IntRange(from = 0, to = 255) int alpha) {}

    void render() {
        setLevels(Limits.INVALID_FLOAT_ARRAY);
        setAlpha(Limits.HIGH);
    }
}
"#,
    );

    let findings = analyze(dir.path(), &Config::default());
    assert_eq!(
        messages(&findings),
        vec!["Value must be ≥ 10.0 (was 5.0)", "Value must be ≤ 255 (was 300)"]
    );
}
