//! rangelint - Android range annotation checks for Kotlin and Java
//!
//! Checks that call arguments respect `@IntRange`, `@FloatRange` and
//! `@Size` declarations, and that those annotations are well formed.
//!
//! # Architecture
//!
//! The analysis pipeline consists of:
//! 1. **File Discovery** - Find all .kt and .java files
//! 2. **Parsing** - Parse source files using tree-sitter
//! 3. **Model Building** - Merge declarations, call sites and constants
//! 4. **Checks** - Evaluate arguments against the range constraint algebra
//! 5. **Reporting** - Output results in various formats

pub mod analysis;
pub mod annotation;
pub mod baseline;
pub mod config;
pub mod constraint;
pub mod discovery;
pub mod model;
pub mod parser;
pub mod report;
pub mod watch;

pub use analysis::{Analyzer, Finding, IssueId, Severity};
pub use annotation::{parse_annotation, AnnotationParser};
pub use config::Config;
pub use constraint::{FloatRangeConstraint, IntRangeConstraint, RangeConstraint, SizeConstraint};
pub use discovery::FileFinder;
pub use model::{ModelBuilder, ProjectModel};
pub use report::{ReportFormat, Reporter};
