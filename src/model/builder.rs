// Parallel model builder using rayon

use super::{Language, ProjectModel};
use crate::discovery::{FileType, SourceFile};
use crate::parser::{JavaParser, KotlinParser, ParseResult, Parser as SourceParser};
use miette::Result;
use rayon::prelude::*;
use std::path::PathBuf;
use tracing::{debug, info};

/// Parsed file result
struct ParsedFile {
    path: PathBuf,
    language: Language,
    result: ParseResult,
}

/// Builds the project model, parsing files in parallel
pub struct ModelBuilder;

impl ModelBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Parse all files and merge them into one model.
    ///
    /// Files that fail to read or parse are logged and skipped.
    pub fn build_from_files(&self, files: &[SourceFile]) -> Result<ProjectModel> {
        self.build_with_progress(files, || {})
    }

    /// Like [`build_from_files`](Self::build_from_files), calling
    /// `on_parsed` after each file from the worker threads
    pub fn build_with_progress<F>(&self, files: &[SourceFile], on_parsed: F) -> Result<ProjectModel>
    where
        F: Fn() + Sync,
    {
        info!("Parsing {} files in parallel...", files.len());

        let results: Vec<Result<ParsedFile>> = files
            .par_iter()
            .map(|file| {
                let parsed = self.parse_file(file);
                on_parsed();
                parsed
            })
            .collect();

        let mut model = ProjectModel::new();
        for result in results {
            match result {
                Ok(parsed) => model.add_file(&parsed.path, parsed.language, parsed.result),
                Err(e) => {
                    debug!("Parse error (continuing): {}", e);
                }
            }
        }

        info!(
            "Parsed {} functions, {} call sites",
            model.functions().len(),
            model.call_count()
        );

        Ok(model)
    }

    /// Parse a single file
    fn parse_file(&self, file: &SourceFile) -> Result<ParsedFile> {
        let contents = file.read_contents()?;
        let (language, result) = match file.file_type {
            FileType::Kotlin => (Language::Kotlin, KotlinParser::new().parse(&file.path, &contents)?),
            FileType::Java => (Language::Java, JavaParser::new().parse(&file.path, &contents)?),
        };
        Ok(ParsedFile {
            path: file.path.clone(),
            language,
            result,
        })
    }
}

impl Default for ModelBuilder {
    fn default() -> Self {
        Self::new()
    }
}
