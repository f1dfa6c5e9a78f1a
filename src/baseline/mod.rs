//! Baseline support
//!
//! A baseline records the findings of an earlier run so that only new
//! findings are reported.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use thiserror::Error;

use crate::analysis::{Finding, IssueId};
use crate::report::display_path;

/// Baseline errors
#[derive(Error, Debug)]
pub enum BaselineError {
    #[error("Failed to read baseline file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse baseline: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("Baseline version mismatch (expected {expected}, found {found})")]
    VersionMismatch { expected: u32, found: u32 },
}

const BASELINE_VERSION: u32 = 1;

/// Lines a baselined finding may move before it counts as new
const LINE_TOLERANCE: usize = 10;

/// A fingerprint for a finding that can be matched across runs
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IssueFingerprint {
    /// File path relative to the project root
    pub file: String,
    pub issue: IssueId,
    pub message: String,
    /// Line number at baseline time; may drift
    pub line: usize,
}

impl IssueFingerprint {
    pub fn from_finding(finding: &Finding, project_root: &Path) -> Self {
        Self {
            file: display_path(&finding.location.file, project_root),
            issue: finding.issue,
            message: finding.message.clone(),
            line: finding.location.line,
        }
    }

    /// File, issue and message must be equal; the line may drift a little
    pub fn matches(&self, finding: &Finding, project_root: &Path) -> bool {
        self.issue == finding.issue
            && self.message == finding.message
            && self.file == display_path(&finding.location.file, project_root)
            && self.line.abs_diff(finding.location.line) <= LINE_TOLERANCE
    }
}

/// Known findings to ignore
#[derive(Debug, Serialize, Deserialize)]
pub struct Baseline {
    pub version: u32,
    /// Seconds since the Unix epoch
    pub created_at: String,
    pub issues: Vec<IssueFingerprint>,
}

impl Baseline {
    pub fn from_findings(findings: &[Finding], project_root: &Path) -> Self {
        Self {
            version: BASELINE_VERSION,
            created_at: timestamp(),
            issues: findings
                .iter()
                .map(|finding| IssueFingerprint::from_finding(finding, project_root))
                .collect(),
        }
    }

    pub fn load(path: &Path) -> Result<Self, BaselineError> {
        let reader = BufReader::new(fs::File::open(path)?);
        let baseline: Self = serde_json::from_reader(reader)?;

        if baseline.version != BASELINE_VERSION {
            return Err(BaselineError::VersionMismatch {
                expected: BASELINE_VERSION,
                found: baseline.version,
            });
        }
        Ok(baseline)
    }

    pub fn save(&self, path: &Path) -> Result<(), BaselineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let writer = BufWriter::new(fs::File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Findings not covered by the baseline.
    ///
    /// Each fingerprint absorbs at most one finding, so a repeated message
    /// in the same file only stays hidden as often as it was recorded.
    pub fn filter_new(&self, findings: Vec<Finding>, project_root: &Path) -> Vec<Finding> {
        let mut used = vec![false; self.issues.len()];
        findings
            .into_iter()
            .filter(|finding| {
                let hit = self
                    .issues
                    .iter()
                    .enumerate()
                    .find(|(i, fp)| !used[*i] && fp.matches(finding, project_root));
                match hit {
                    Some((i, _)) => {
                        used[i] = true;
                        false
                    }
                    None => true,
                }
            })
            .collect()
    }

    pub fn is_baselined(&self, finding: &Finding, project_root: &Path) -> bool {
        self.issues.iter().any(|fp| fp.matches(finding, project_root))
    }

    pub fn stats(&self, findings: &[Finding], project_root: &Path) -> BaselineStats {
        let baselined = findings
            .iter()
            .filter(|finding| self.is_baselined(finding, project_root))
            .count();

        BaselineStats {
            total_in_baseline: self.issues.len(),
            baselined_found: baselined,
            new_issues: findings.len() - baselined,
        }
    }
}

/// Statistics about baseline comparison
#[derive(Debug, Clone)]
pub struct BaselineStats {
    pub total_in_baseline: usize,
    /// Current findings matching the baseline
    pub baselined_found: usize,
    pub new_issues: usize,
}

impl std::fmt::Display for BaselineStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} new issues ({} baselined, {} in baseline file)",
            self.new_issues, self.baselined_found, self.total_in_baseline
        )
    }
}

fn timestamp() -> String {
    use std::time::SystemTime;

    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
        .to_string()
}
