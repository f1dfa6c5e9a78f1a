use clap::Parser;
use colored::Colorize;
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::info;

use rangelint::analysis::{Analyzer, Finding, IssueId, Severity};
use rangelint::baseline::Baseline;
use rangelint::config::Config;
use rangelint::discovery::{FileFinder, FileStats};
use rangelint::model::ModelBuilder;
use rangelint::report::{ReportFormat, Reporter};
use rangelint::watch::FileWatcher;

/// rangelint - Android range annotation checks for Kotlin and Java
#[derive(Parser, Debug)]
#[command(name = "rangelint")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the project directory to analyze
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Target directories to analyze (can be specified multiple times)
    #[arg(short, long)]
    target: Vec<PathBuf>,

    /// Patterns to exclude (can be specified multiple times)
    #[arg(short, long)]
    exclude: Vec<String>,

    /// Output format [default: terminal, or `report.format` from the config]
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Output file (for json/sarif formats)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Only report findings that are not in this baseline file
    #[arg(long, value_name = "FILE")]
    baseline: Option<PathBuf>,

    /// Generate a baseline file from current results
    #[arg(long, value_name = "FILE")]
    generate_baseline: Option<PathBuf>,

    /// Run only these checks (Range, SupportAnnotationUsage)
    #[arg(long = "check", value_name = "ID")]
    checks: Vec<IssueId>,

    /// Disable these checks
    #[arg(long = "disable", value_name = "ID")]
    disabled: Vec<IssueId>,

    /// Do not refine constraints from enclosing `if` conditions
    #[arg(long)]
    no_flow: bool,

    /// Also analyze test source sets
    #[arg(long)]
    include_tests: bool,

    /// Do not print source excerpts in terminal output
    #[arg(long)]
    no_source: bool,

    /// Watch mode - continuously monitor for changes
    #[arg(long)]
    watch: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode - only output results
    #[arg(short, long)]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, Default)]
enum OutputFormat {
    #[default]
    Terminal,
    Json,
    Sarif,
}

impl From<OutputFormat> for ReportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Terminal => ReportFormat::Terminal,
            OutputFormat::Json => ReportFormat::Json,
            OutputFormat::Sarif => ReportFormat::Sarif,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    info!("rangelint v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&cli)?;

    if cli.watch {
        run_watch_mode(&config, &cli)?;
        return Ok(());
    }

    let errors = run_analysis(&config, &cli)?;
    if errors > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn run_watch_mode(config: &Config, cli: &Cli) -> Result<()> {
    FileWatcher::new(config)
        .watch(&cli.path, || {
            match run_analysis(config, cli) {
                Ok(_) => {
                    println!();
                    println!("{}", "Check complete. Waiting for changes...".green());
                }
                Err(e) => eprintln!("{}: {:?}", "Analysis error".red(), e),
            }
            true
        })
        .map_err(|e| miette::miette!("Watch error: {}", e))
}

fn init_logging(verbose: bool, quiet: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = if let Some(config_path) = &cli.config {
        Config::from_file(config_path)?
    } else {
        Config::from_default_locations(&cli.path)?
    };

    // Override with CLI arguments
    if !cli.target.is_empty() {
        config.targets = cli.target.clone();
    }
    if !cli.exclude.is_empty() {
        config.exclude.extend(cli.exclude.clone());
    }
    if !cli.checks.is_empty() {
        for id in IssueId::ALL {
            config.set_enabled(id, cli.checks.contains(&id));
        }
    }
    for id in &cli.disabled {
        config.set_enabled(*id, false);
    }
    if cli.no_flow {
        config.analysis.flow_inference = false;
    }
    if cli.include_tests {
        config.analysis.include_tests = true;
    }
    if cli.no_source {
        config.report.show_source = false;
    }

    Ok(config)
}

/// One full run; returns the number of error findings reported
fn run_analysis(config: &Config, cli: &Cli) -> Result<usize> {
    use indicatif::{ProgressBar, ProgressStyle};
    use std::time::Instant;

    let start_time = Instant::now();

    info!("Discovering files...");
    let files = FileFinder::new(config).find_files(&cli.path)?;
    let stats = FileStats::from_files(&files);
    info!(
        "Found {} files to analyze ({} Kotlin, {} Java)",
        stats.total(),
        stats.kotlin_files,
        stats.java_files
    );

    if files.is_empty() {
        if !cli.quiet {
            eprintln!("{}", "No Kotlin or Java files found.".yellow());
        }
        return Ok(0);
    }

    let pb = if cli.quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(files.len() as u64)
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .into_diagnostic()?
            .progress_chars("#>-"),
    );
    let model = ModelBuilder::new().build_with_progress(&files, || pb.inc(1))?;
    pb.finish_and_clear();

    let findings = Analyzer::new(config).analyze(&model);

    if let Some(path) = &cli.generate_baseline {
        Baseline::from_findings(&findings, &cli.path)
            .save(path)
            .map_err(|e| miette::miette!("Failed to generate baseline: {}", e))?;
        eprintln!(
            "{}",
            format!("Baseline with {} issues written to {}", findings.len(), path.display()).green()
        );
        return Ok(0);
    }

    let findings = match &cli.baseline {
        Some(path) => match Baseline::load(path) {
            Ok(baseline) => {
                let stats = baseline.stats(&findings, &cli.path);
                if !cli.quiet {
                    eprintln!("{}", format!("Baseline: {}", stats).cyan());
                }
                baseline.filter_new(findings, &cli.path)
            }
            Err(e) => {
                eprintln!("{}: Failed to load baseline: {}", "Warning".yellow(), e);
                findings
            }
        },
        None => findings,
    };

    let format = match cli.format {
        Some(format) => format.into(),
        None => ReportFormat::from_str(&config.report.format)?,
    };
    Reporter::new(format, cli.output.clone())
        .with_source(config.report.show_source)
        .with_project_root(&cli.path)
        .report(&findings)?;

    info!("Analysis completed in {:.2}s", start_time.elapsed().as_secs_f64());

    Ok(count_errors(&findings))
}

fn count_errors(findings: &[Finding]) -> usize {
    findings
        .iter()
        .filter(|finding| finding.severity == Severity::Error)
        .count()
}
