use super::display_path;
use crate::analysis::{Finding, IssueId, Severity};
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

const SCHEMA: &str =
    "https://raw.githubusercontent.com/oasis-tcs/sarif-spec/master/Schemata/sarif-schema-2.1.0.json";

/// SARIF reporter for CI/CD integration (GitHub code scanning and similar)
pub struct SarifReporter {
    project_root: PathBuf,
}

impl SarifReporter {
    pub fn new(project_root: &Path) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
        }
    }

    pub fn render(&self, findings: &[Finding]) -> Result<String> {
        let sarif = SarifReport::from_findings(findings, &self.project_root);
        let mut json = serde_json::to_string_pretty(&sarif).into_diagnostic()?;
        json.push('\n');
        Ok(json)
    }
}

/// SARIF 2.1.0 format
#[derive(Serialize)]
struct SarifReport {
    #[serde(rename = "$schema")]
    schema: &'static str,
    version: &'static str,
    runs: Vec<SarifRun>,
}

#[derive(Serialize)]
struct SarifRun {
    tool: SarifTool,
    results: Vec<SarifResult>,
}

#[derive(Serialize)]
struct SarifTool {
    driver: SarifDriver,
}

#[derive(Serialize)]
struct SarifDriver {
    name: &'static str,
    version: &'static str,
    rules: Vec<SarifRule>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifRule {
    id: &'static str,
    name: &'static str,
    short_description: SarifMessage,
    full_description: SarifMessage,
    default_configuration: SarifConfiguration,
}

#[derive(Serialize)]
struct SarifConfiguration {
    level: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifResult {
    rule_id: &'static str,
    level: &'static str,
    message: SarifMessage,
    locations: Vec<SarifLocation>,
}

#[derive(Serialize)]
struct SarifMessage {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifLocation {
    physical_location: SarifPhysicalLocation,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifPhysicalLocation {
    artifact_location: SarifArtifactLocation,
    region: SarifRegion,
}

#[derive(Serialize)]
struct SarifArtifactLocation {
    uri: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifRegion {
    start_line: usize,
    start_column: usize,
}

fn level(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "error",
        Severity::Warning => "warning",
        Severity::Info => "note",
    }
}

impl SarifReport {
    fn from_findings(findings: &[Finding], root: &Path) -> Self {
        let rules = IssueId::ALL
            .iter()
            .map(|id| SarifRule {
                id: id.as_str(),
                name: id.as_str(),
                short_description: SarifMessage {
                    text: id.brief_description().to_string(),
                },
                full_description: SarifMessage {
                    text: id.explanation().to_string(),
                },
                default_configuration: SarifConfiguration {
                    level: level(id.default_severity()),
                },
            })
            .collect();

        let results = findings
            .iter()
            .map(|finding| SarifResult {
                rule_id: finding.issue.as_str(),
                level: level(finding.severity),
                message: SarifMessage {
                    text: finding.message.clone(),
                },
                locations: vec![SarifLocation {
                    physical_location: SarifPhysicalLocation {
                        artifact_location: SarifArtifactLocation {
                            uri: display_path(&finding.location.file, root),
                        },
                        region: SarifRegion {
                            start_line: finding.location.line,
                            start_column: finding.location.column,
                        },
                    },
                }],
            })
            .collect();

        SarifReport {
            schema: SCHEMA,
            version: "2.1.0",
            runs: vec![SarifRun {
                tool: SarifTool {
                    driver: SarifDriver {
                        name: "rangelint",
                        version: env!("CARGO_PKG_VERSION"),
                        rules,
                    },
                },
                results,
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Location;

    #[test]
    fn test_sarif_rules_and_results() {
        let findings = vec![Finding::new(
            IssueId::Range,
            "Expected length 3 (was 2)",
            Location::new(PathBuf::from("/project/app/Main.kt"), 7, 12, 100, 104),
        )
        .with_severity(Severity::Info)];

        let sarif = SarifReporter::new(Path::new("/project")).render(&findings).unwrap();
        let value: serde_json::Value = serde_json::from_str(&sarif).unwrap();
        let run = &value["runs"][0];

        assert_eq!(value["version"], "2.1.0");
        assert_eq!(run["tool"]["driver"]["name"], "rangelint");
        assert_eq!(run["tool"]["driver"]["rules"].as_array().unwrap().len(), 2);
        assert_eq!(run["tool"]["driver"]["rules"][1]["id"], "SupportAnnotationUsage");
        assert_eq!(run["results"][0]["ruleId"], "Range");
        assert_eq!(run["results"][0]["level"], "note");
        assert_eq!(
            run["results"][0]["locations"][0]["physicalLocation"]["artifactLocation"]["uri"],
            "app/Main.kt"
        );
        assert_eq!(
            run["results"][0]["locations"][0]["physicalLocation"]["region"]["startLine"],
            7
        );
    }
}
