use super::display_path;
use crate::analysis::{Finding, Severity};
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// JSON reporter for programmatic output
pub struct JsonReporter {
    project_root: PathBuf,
}

impl JsonReporter {
    pub fn new(project_root: &Path) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
        }
    }

    pub fn render(&self, findings: &[Finding]) -> Result<String> {
        let report = JsonReport::from_findings(findings, &self.project_root);
        let mut json = serde_json::to_string_pretty(&report).into_diagnostic()?;
        json.push('\n');
        Ok(json)
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    version: &'static str,
    total_issues: usize,
    issues: Vec<JsonIssue<'a>>,
    summary: JsonSummary,
}

#[derive(Serialize)]
struct JsonIssue<'a> {
    id: &'static str,
    severity: &'static str,
    message: &'a str,
    file: String,
    line: usize,
    column: usize,
}

#[derive(Serialize, Default)]
struct JsonSummary {
    errors: usize,
    warnings: usize,
    infos: usize,
}

impl<'a> JsonReport<'a> {
    fn from_findings(findings: &'a [Finding], root: &Path) -> Self {
        let mut summary = JsonSummary::default();

        let issues = findings
            .iter()
            .map(|finding| {
                match finding.severity {
                    Severity::Error => summary.errors += 1,
                    Severity::Warning => summary.warnings += 1,
                    Severity::Info => summary.infos += 1,
                }

                JsonIssue {
                    id: finding.issue.as_str(),
                    severity: finding.severity.as_str(),
                    message: &finding.message,
                    file: display_path(&finding.location.file, root),
                    line: finding.location.line,
                    column: finding.location.column,
                }
            })
            .collect();

        Self {
            version: env!("CARGO_PKG_VERSION"),
            total_issues: findings.len(),
            issues,
            summary,
        }
    }
}
