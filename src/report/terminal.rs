use super::display_path;
use crate::analysis::{Finding, Severity};
use colored::Colorize;
use std::collections::HashMap;
use std::fmt::Write;
use std::path::{Path, PathBuf};

/// Terminal reporter with colored, lint style output:
///
/// ```text
/// src/Foo.java:12: Error: Value must be ≤ 255 (was 300) [Range]
///         setAlpha(300);
///                  ~~~
/// ```
pub struct TerminalReporter {
    project_root: PathBuf,
    show_source: bool,
}

impl TerminalReporter {
    pub fn new(project_root: &Path) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
            show_source: true,
        }
    }

    pub fn with_source(mut self, show: bool) -> Self {
        self.show_source = show;
        self
    }

    pub fn render(&self, findings: &[Finding]) -> String {
        let mut out = String::new();
        if findings.is_empty() {
            let _ = writeln!(out, "{}", "No issues found.".green().bold());
            return out;
        }

        let mut sources: HashMap<&Path, Option<String>> = HashMap::new();
        for finding in findings {
            let location = &finding.location;
            let severity = match finding.severity {
                Severity::Error => "Error".red().bold(),
                Severity::Warning => "Warning".yellow().bold(),
                Severity::Info => "Information".blue().bold(),
            };
            let _ = writeln!(
                out,
                "{}: {}: {} {}",
                format!("{}:{}", display_path(&location.file, &self.project_root), location.line).bold(),
                severity,
                finding.message,
                format!("[{}]", finding.issue).dimmed()
            );

            if self.show_source {
                let source = sources
                    .entry(location.file.as_path())
                    .or_insert_with(|| std::fs::read_to_string(&location.file).ok());
                if let Some((line, underline)) = source.as_deref().and_then(|s| excerpt(s, finding)) {
                    let _ = writeln!(out, "{}", line);
                    let _ = writeln!(out, "{}", underline);
                }
            }
        }

        out.push_str(&summary(findings));
        out
    }
}

/// Source line of the finding and a `~` underline below the flagged range
fn excerpt(source: &str, finding: &Finding) -> Option<(String, String)> {
    let location = &finding.location;
    let line = source.lines().nth(location.line.checked_sub(1)?)?;
    let line_start = source.get(..location.start_byte)?.rfind('\n').map(|i| i + 1).unwrap_or(0);
    let column = location.start_byte.checked_sub(line_start)?;
    let prefix = line.get(..column)?;
    let end = location.end_byte.min(line_start + line.len());
    let width = source.get(location.start_byte..end)?.chars().count().max(1);

    let indent: String = prefix
        .chars()
        .map(|c| if c == '\t' { '\t' } else { ' ' })
        .collect();
    Some((line.to_string(), format!("{}{}", indent, "~".repeat(width))))
}

fn summary(findings: &[Finding]) -> String {
    let mut errors = 0;
    let mut warnings = 0;
    let mut infos = 0;
    for finding in findings {
        match finding.severity {
            Severity::Error => errors += 1,
            Severity::Warning => warnings += 1,
            Severity::Info => infos += 1,
        }
    }

    let mut parts = vec![
        format!("{} errors", errors).red().to_string(),
        format!("{} warnings", warnings).yellow().to_string(),
    ];
    if infos > 0 {
        parts.push(format!("{} info", infos).blue().to_string());
    }
    format!("{}\n", parts.join(", "))
}

impl Default for TerminalReporter {
    fn default() -> Self {
        Self::new(Path::new(""))
    }
}
