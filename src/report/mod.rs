mod json;
mod sarif;
mod terminal;

pub use json::JsonReporter;
pub use sarif::SarifReporter;
pub use terminal::TerminalReporter;

use crate::analysis::Finding;
use miette::{miette, IntoDiagnostic, Result};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Output format for reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportFormat {
    #[default]
    Terminal,
    Json,
    Sarif,
}

impl FromStr for ReportFormat {
    type Err = miette::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "terminal" | "text" => Ok(ReportFormat::Terminal),
            "json" => Ok(ReportFormat::Json),
            "sarif" => Ok(ReportFormat::Sarif),
            other => Err(miette!("Unknown report format: {}", other)),
        }
    }
}

/// Reporter for outputting range check results
pub struct Reporter {
    format: ReportFormat,
    output_path: Option<PathBuf>,
    show_source: bool,
    project_root: PathBuf,
}

impl Reporter {
    pub fn new(format: ReportFormat, output_path: Option<PathBuf>) -> Self {
        Self {
            format,
            output_path,
            show_source: true,
            project_root: PathBuf::new(),
        }
    }

    /// Print the offending source line under each terminal finding
    pub fn with_source(mut self, show: bool) -> Self {
        self.show_source = show;
        self
    }

    /// Paths in reports are shown relative to this directory
    pub fn with_project_root(mut self, root: &Path) -> Self {
        self.project_root = root.to_path_buf();
        self
    }

    /// Report the findings
    pub fn report(&self, findings: &[Finding]) -> Result<()> {
        let rendered = match self.format {
            ReportFormat::Terminal => TerminalReporter::new(&self.project_root)
                .with_source(self.show_source)
                .render(findings),
            ReportFormat::Json => JsonReporter::new(&self.project_root).render(findings)?,
            ReportFormat::Sarif => SarifReporter::new(&self.project_root).render(findings)?,
        };

        match &self.output_path {
            Some(path) => {
                std::fs::write(path, &rendered).into_diagnostic()?;
                println!("Report written to: {}", path.display());
            }
            None => print!("{}", rendered),
        }
        Ok(())
    }
}

/// Path shown in reports: relative to the project root when possible
pub(crate) fn display_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}
