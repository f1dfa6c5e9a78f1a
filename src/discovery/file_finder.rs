// File discovery for Kotlin and Java sources

use crate::config::Config;
use ignore::WalkBuilder;
use miette::{IntoDiagnostic, Result};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Type of source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    Kotlin,
    Java,
}

impl FileType {
    /// Determine file type from path
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "kt" | "kts" => Some(FileType::Kotlin),
            "java" => Some(FileType::Java),
            _ => None,
        }
    }
}

/// Represents a discovered source file
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Absolute path to the file
    pub path: PathBuf,

    /// Type of source file
    pub file_type: FileType,
}

impl SourceFile {
    pub fn new(path: PathBuf, file_type: FileType) -> Self {
        Self { path, file_type }
    }

    /// Load and return owned contents
    pub fn read_contents(&self) -> Result<String> {
        std::fs::read_to_string(&self.path).into_diagnostic()
    }
}

/// File finder for discovering source files in a project
pub struct FileFinder<'a> {
    config: &'a Config,
}

impl<'a> FileFinder<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Find all Kotlin and Java files under `root`, or under the configured
    /// targets relative to it. A file given directly as `root` is returned as-is.
    pub fn find_files(&self, root: &Path) -> Result<Vec<SourceFile>> {
        debug!("Scanning for files in: {}", root.display());

        if root.is_file() {
            return Ok(FileType::from_path(root)
                .map(|file_type| vec![SourceFile::new(root.to_path_buf(), file_type)])
                .unwrap_or_default());
        }

        let targets: Vec<PathBuf> = if self.config.targets.is_empty() {
            vec![root.to_path_buf()]
        } else {
            self.config.targets.iter().map(|t| root.join(t)).collect()
        };

        let mut files: Vec<SourceFile> = targets
            .par_iter()
            .flat_map(|target| self.scan_directory(target))
            .collect();

        // Stable order keeps reports and baselines reproducible
        files.sort_by(|a, b| a.path.cmp(&b.path));
        files.dedup_by(|a, b| a.path == b.path);

        debug!("Found {} files", files.len());
        Ok(files)
    }

    /// Scan a single directory for source files
    fn scan_directory(&self, dir: &Path) -> Vec<SourceFile> {
        if !dir.exists() {
            trace!("Directory does not exist: {}", dir.display());
            return Vec::new();
        }

        let walker = WalkBuilder::new(dir)
            .hidden(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .ignore(true)
            .parents(true)
            .follow_links(false)
            .build();

        walker
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter_map(|entry| {
                let path = entry.path();
                let file_type = FileType::from_path(path)?;

                // Only the part below the scanned directory is matched, so a
                // project that itself lives under e.g. /tmp/build is still found
                let relative = path.strip_prefix(dir).unwrap_or(path);
                if self.config.should_exclude(relative) {
                    trace!("Excluding: {}", path.display());
                    return None;
                }

                trace!("Found {:?}: {}", file_type, path.display());
                Some(SourceFile::new(path.to_path_buf(), file_type))
            })
            .collect()
    }
}

/// Statistics about discovered files
#[derive(Debug, Default)]
pub struct FileStats {
    pub kotlin_files: usize,
    pub java_files: usize,
}

impl FileStats {
    pub fn from_files(files: &[SourceFile]) -> Self {
        let mut stats = Self::default();
        for file in files {
            match file.file_type {
                FileType::Kotlin => stats.kotlin_files += 1,
                FileType::Java => stats.java_files += 1,
            }
        }
        stats
    }

    pub fn total(&self) -> usize {
        self.kotlin_files + self.java_files
    }
}
