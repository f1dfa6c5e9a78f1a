mod loader;

pub use loader::{AnalysisConfig, AnnotationsConfig, CheckConfig, ChecksConfig, Config, ReportConfig};
