//! Checks over the project model
//!
//! Each check is a [`Detector`]; the [`Analyzer`] runs the enabled ones and
//! applies the configured severities.

pub mod detectors;
pub mod flow;

pub use crate::model::ProjectModel;
pub use detectors::{AnnotationUsageDetector, Detector, RangeDetector};

use crate::annotation::AnnotationParser;
use crate::config::Config;
use crate::model::Location;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{debug, info};

/// Identifier of a check, as used in reports, baselines and `--check`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IssueId {
    /// Argument outside the range declared by the parameter
    Range,
    /// Malformed or misplaced range annotation
    SupportAnnotationUsage,
}

impl IssueId {
    pub const ALL: [IssueId; 2] = [IssueId::Range, IssueId::SupportAnnotationUsage];

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueId::Range => "Range",
            IssueId::SupportAnnotationUsage => "SupportAnnotationUsage",
        }
    }

    pub fn default_severity(&self) -> Severity {
        Severity::Error
    }

    pub fn brief_description(&self) -> &'static str {
        match self {
            IssueId::Range => "Outside Range",
            IssueId::SupportAnnotationUsage => "Incorrect support annotation usage",
        }
    }

    pub fn explanation(&self) -> &'static str {
        match self {
            IssueId::Range => {
                "Some parameters are required to be in a particular numerical range; this check \
                 makes sure that arguments passed fall within the range. For arrays, Strings \
                 and collections this refers to the size or length."
            }
            IssueId::SupportAnnotationUsage => {
                "This check looks for various problems in how range and size annotations are \
                 declared, such as an empty range or an annotation on a type it does not \
                 apply to."
            }
        }
    }
}

impl std::fmt::Display for IssueId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for IssueId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IssueId::ALL
            .iter()
            .find(|id| id.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| format!("unknown check '{}' (expected Range or SupportAnnotationUsage)", s))
    }
}

/// Severity levels for findings
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A problem reported by a check
#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    pub issue: IssueId,
    pub severity: Severity,
    pub message: String,
    pub location: Location,
}

impl Finding {
    pub fn new(issue: IssueId, message: impl Into<String>, location: Location) -> Self {
        Self {
            issue,
            severity: issue.default_severity(),
            message: message.into(),
            location,
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }
}

/// Runs the enabled checks over a model
pub struct Analyzer<'a> {
    config: &'a Config,
    parser: AnnotationParser,
}

impl<'a> Analyzer<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            parser: AnnotationParser::new(&config.annotations.extra_packages),
        }
    }

    pub fn analyze(&self, model: &ProjectModel) -> Vec<Finding> {
        let range = RangeDetector::new(&self.parser).with_flow_inference(self.config.analysis.flow_inference);
        let usage = AnnotationUsageDetector::new(&self.parser);
        let detectors: Vec<&(dyn Detector + Sync)> = vec![&range, &usage];

        let mut findings: Vec<Finding> = detectors
            .par_iter()
            .filter(|detector| self.config.is_enabled(detector.issue()))
            .flat_map(|detector| {
                let issue = detector.issue();
                let found = detector.detect(model);
                debug!("{} reported {} findings", issue, found.len());
                let severity = self.config.severity(issue);
                found
                    .into_iter()
                    .map(|finding| finding.with_severity(severity))
                    .collect::<Vec<_>>()
            })
            .collect();

        findings.sort_by(|a, b| {
            a.location
                .file
                .cmp(&b.location.file)
                .then(a.location.line.cmp(&b.location.line))
                .then(a.location.column.cmp(&b.location.column))
                .then(a.issue.cmp(&b.issue))
                .then(a.message.cmp(&b.message))
        });
        findings.dedup_by(|a, b| a.issue == b.issue && a.location == b.location && a.message == b.message);

        info!("Found {} issues", findings.len());
        findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_id_parsing() {
        assert_eq!("Range".parse::<IssueId>(), Ok(IssueId::Range));
        assert_eq!("range".parse::<IssueId>(), Ok(IssueId::Range));
        assert_eq!(
            "SupportAnnotationUsage".parse::<IssueId>(),
            Ok(IssueId::SupportAnnotationUsage)
        );
        assert!("DC001".parse::<IssueId>().is_err());
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Error > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
        assert_eq!(Severity::Warning.to_string(), "warning");
    }
}
