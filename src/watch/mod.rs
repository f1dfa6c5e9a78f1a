//! Watch mode
//!
//! Re-runs the analysis whenever a Kotlin or Java source below the watched
//! directory changes.

use crate::config::Config;
use crate::discovery::FileType;
use colored::Colorize;
use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebouncedEventKind};
use std::path::Path;
use std::sync::mpsc::channel;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Failed to create file watcher: {0}")]
    WatcherError(#[from] notify::Error),
    #[error("Failed to receive events: {0}")]
    RecvError(#[from] std::sync::mpsc::RecvError),
}

/// File watcher for continuous analysis
pub struct FileWatcher<'a> {
    config: &'a Config,
    debounce_ms: u64,
}

impl<'a> FileWatcher<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            debounce_ms: 500,
        }
    }

    pub fn with_debounce_ms(mut self, ms: u64) -> Self {
        self.debounce_ms = ms;
        self
    }

    /// Sources that the analysis would pick up
    fn should_trigger(&self, root: &Path, path: &Path) -> bool {
        if FileType::from_path(path).is_none() {
            return false;
        }
        let relative = path.strip_prefix(root).unwrap_or(path);
        !self.config.should_exclude(relative)
    }

    /// Run `on_change` once, then again after every relevant change until
    /// it returns `false`
    pub fn watch<F>(&self, root: &Path, mut on_change: F) -> Result<(), WatchError>
    where
        F: FnMut() -> bool,
    {
        let (tx, rx) = channel();
        let mut debouncer = new_debouncer(Duration::from_millis(self.debounce_ms), tx)?;
        debouncer.watcher().watch(root, RecursiveMode::Recursive)?;

        println!();
        println!("{}", "Watch mode active. Press Ctrl+C to stop.".cyan().bold());
        println!("{}", format!("   Watching: {}", root.display()).dimmed());
        println!();

        if !on_change() {
            return Ok(());
        }

        loop {
            let events = match rx.recv()? {
                Ok(events) => events,
                Err(e) => {
                    eprintln!("{}: {:?}", "Watch error".red(), e);
                    continue;
                }
            };

            let relevant: Vec<_> = events
                .iter()
                .filter(|e| {
                    matches!(e.kind, DebouncedEventKind::Any | DebouncedEventKind::AnyContinuous)
                        && self.should_trigger(root, &e.path)
                })
                .collect();
            if relevant.is_empty() {
                debug!("Ignoring {} unrelated file events", events.len());
                continue;
            }

            println!();
            println!(
                "{}",
                format!("Changes detected in {} file(s), re-checking...", relevant.len()).yellow()
            );
            for event in relevant.iter().take(5) {
                if let Some(name) = event.path.file_name() {
                    println!("   • {}", name.to_string_lossy().dimmed());
                }
            }
            if relevant.len() > 5 {
                println!("   • ... and {} more", relevant.len() - 5);
            }
            println!();

            if !on_change() {
                return Ok(());
            }
        }
    }
}
