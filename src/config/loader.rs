// Configuration loader

use crate::analysis::{IssueId, Severity};
use miette::{IntoDiagnostic, Result, WrapErr};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for rangelint analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Target directories to analyze
    pub targets: Vec<PathBuf>,

    /// Patterns to exclude from analysis
    pub exclude: Vec<String>,

    /// Per-check switches
    pub checks: ChecksConfig,

    /// Analysis tuning
    pub analysis: AnalysisConfig,

    /// Annotation recognition
    pub annotations: AnnotationsConfig,

    /// Report configuration
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    pub enabled: bool,

    /// Override the default severity of the check
    pub severity: Option<Severity>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChecksConfig {
    /// `Range`: arguments outside the declared range
    pub range: CheckConfig,

    /// `SupportAnnotationUsage`: malformed range annotations
    pub annotation_usage: CheckConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Refine constraints using enclosing `if` conditions
    pub flow_inference: bool,

    /// Analyze test source sets (`test/`, `androidTest/`)
    pub include_tests: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationsConfig {
    /// Additional packages that publish `IntRange`/`FloatRange`/`Size`
    pub extra_packages: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Output format: terminal, json, sarif
    pub format: String,

    /// Show the offending source line in terminal output
    pub show_source: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            targets: vec![],
            exclude: vec![
                "**/build/**".to_string(),
                "**/generated/**".to_string(),
                "**/.gradle/**".to_string(),
                "**/.idea/**".to_string(),
            ],
            checks: ChecksConfig::default(),
            analysis: AnalysisConfig::default(),
            annotations: AnnotationsConfig::default(),
            report: ReportConfig::default(),
        }
    }
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            severity: None,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            flow_inference: true,
            include_tests: false,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: "terminal".to_string(),
            show_source: true,
        }
    }
}

/// Directories holding test sources, skipped unless `include_tests` is set
const TEST_PATTERNS: &[&str] = &["**/test/**", "**/androidTest/**", "**/testFixtures/**"];

impl Config {
    /// Load configuration from a file (YAML or TOML)
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        match extension {
            "yml" | "yaml" => serde_yaml::from_str(&contents)
                .into_diagnostic()
                .wrap_err("Failed to parse YAML config"),
            "toml" => toml::from_str(&contents)
                .into_diagnostic()
                .wrap_err("Failed to parse TOML config"),
            _ => {
                // Try YAML first, then TOML
                if let Ok(config) = serde_yaml::from_str(&contents) {
                    Ok(config)
                } else {
                    toml::from_str(&contents)
                        .into_diagnostic()
                        .wrap_err("Failed to parse config file")
                }
            }
        }
    }

    /// Try to load configuration from default locations
    pub fn from_default_locations(project_root: &Path) -> Result<Self> {
        let default_names = [
            ".rangelint.yml",
            ".rangelint.yaml",
            ".rangelint.toml",
            "rangelint.yml",
            "rangelint.yaml",
            "rangelint.toml",
        ];

        for name in &default_names {
            let path = project_root.join(name);
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        // No config file found, use defaults
        Ok(Self::default())
    }

    /// Check if a path is excluded from analysis
    pub fn should_exclude(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy().replace('\\', "/");
        if self.exclude.iter().any(|pattern| glob_match(pattern, &path_str)) {
            return true;
        }
        !self.analysis.include_tests
            && TEST_PATTERNS.iter().any(|pattern| glob_match(pattern, &path_str))
    }

    fn check(&self, id: IssueId) -> &CheckConfig {
        match id {
            IssueId::Range => &self.checks.range,
            IssueId::SupportAnnotationUsage => &self.checks.annotation_usage,
        }
    }

    fn check_mut(&mut self, id: IssueId) -> &mut CheckConfig {
        match id {
            IssueId::Range => &mut self.checks.range,
            IssueId::SupportAnnotationUsage => &mut self.checks.annotation_usage,
        }
    }

    pub fn is_enabled(&self, id: IssueId) -> bool {
        self.check(id).enabled
    }

    pub fn set_enabled(&mut self, id: IssueId, enabled: bool) {
        self.check_mut(id).enabled = enabled;
    }

    /// Severity for findings of a check, honoring overrides
    pub fn severity(&self, id: IssueId) -> Severity {
        self.check(id).severity.unwrap_or_else(|| id.default_severity())
    }
}

/// Simple glob matching for patterns like "*Test" or "**/build/**"
fn glob_match(pattern: &str, text: &str) -> bool {
    if pattern.starts_with('*') && !pattern.contains('/') {
        return text.ends_with(&pattern[1..]);
    }

    if pattern.ends_with('*') && !pattern.contains('/') {
        return text.starts_with(&pattern[..pattern.len() - 1]);
    }

    if pattern.contains("**") {
        // "**/build/**" matches a whole directory name anywhere in the path
        if pattern.starts_with("**/") && pattern.ends_with("/**") {
            let dir_name = pattern
                .trim_start_matches("**/")
                .trim_end_matches("/**")
                .trim_matches('/');
            let dir_pattern = format!("/{}/", dir_name);
            return text.contains(&dir_pattern) || text.starts_with(&dir_pattern[1..]);
        }

        let parts: Vec<&str> = pattern.split("**").collect();
        if parts.len() == 2 {
            let prefix = parts[0].trim_end_matches('/');
            let suffix = parts[1].trim_start_matches('/');

            if prefix.is_empty() && suffix.is_empty() {
                return true;
            }

            if prefix.is_empty() {
                return suffix_match(suffix, text);
            }

            if suffix.is_empty() {
                return text.starts_with(prefix) || text.contains(&format!("{}/", prefix));
            }

            return (text.starts_with(prefix) || text.contains(&format!("/{}/", prefix)))
                && suffix_match(suffix, text);
        }
    }

    text == pattern
}

/// `*.kt` style suffixes match file extensions
fn suffix_match(suffix: &str, text: &str) -> bool {
    match suffix.strip_prefix('*') {
        Some(rest) => text.ends_with(rest),
        None => text.ends_with(suffix) || text.contains(&format!("/{}", suffix)),
    }
}
