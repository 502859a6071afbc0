#![deny(missing_docs)]
//! Shared logging utilities for the carousel workspace.
//!
//! This crate provides the `carousel_*` logging macros used across the
//! codebase, the process-wide logger initialization for the harvester binary,
//! and a minimal test initializer for the global logger.

use std::fs::File;
use std::path::{Path, PathBuf};

use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

/// Default log file name, relative to the current working directory.
pub const DEFAULT_LOG_FILE: &str = "carousel.log";

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! carousel_trace {
    ($($arg:tt)*) => {{
        log::trace!($($arg)*);
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! carousel_debug {
    ($($arg:tt)*) => {{
        log::debug!($($arg)*);
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! carousel_info {
    ($($arg:tt)*) => {{
        log::info!($($arg)*);
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! carousel_warn {
    ($($arg:tt)*) => {{
        log::warn!($($arg)*);
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! carousel_error {
    ($($arg:tt)*) => {{
        log::error!($($arg)*);
    }};
}

/// Destination for log output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogDestination {
    /// Write to the given log file.
    File(PathBuf),
    /// Write to the terminal.
    Terminal,
    /// Write to both the terminal and the given log file.
    Both(PathBuf),
}

impl LogDestination {
    /// Parses a destination name (`terminal`, `file`, `both`) using
    /// [`DEFAULT_LOG_FILE`] for file output.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "terminal" | "term" => Some(Self::Terminal),
            "file" => Some(Self::File(PathBuf::from(DEFAULT_LOG_FILE))),
            "both" => Some(Self::Both(PathBuf::from(DEFAULT_LOG_FILE))),
            _ => None,
        }
    }
}

/// Initializes the global logger with the specified destination and level.
///
/// A file that cannot be created is reported on stderr and skipped; logging
/// then continues on the remaining destinations, if any.
pub fn initialize(destination: LogDestination, level: LevelFilter) {
    let config = build_config();

    let loggers: Vec<Box<dyn SharedLogger>> = match destination {
        LogDestination::File(path) => match create_file_logger(&path, level, config) {
            Some(file_logger) => vec![file_logger],
            None => return,
        },
        LogDestination::Terminal => vec![TermLogger::new(
            level,
            config,
            TerminalMode::Mixed,
            ColorChoice::Auto,
        )],
        LogDestination::Both(path) => {
            let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
                level,
                config.clone(),
                TerminalMode::Mixed,
                ColorChoice::Auto,
            )];
            if let Some(file_logger) = create_file_logger(&path, level, config) {
                loggers.push(file_logger);
            }
            loggers
        }
    };

    let _ = CombinedLogger::init(loggers);
}

/// Initializes a simple terminal logger for use in tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

fn build_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .build()
}

fn create_file_logger(
    path: &Path,
    level: LevelFilter,
    config: Config,
) -> Option<Box<WriteLogger<File>>> {
    match File::create(path) {
        Ok(file) => Some(WriteLogger::new(level, config, file)),
        Err(err) => {
            eprintln!("Warning: Could not create log file at {:?}: {}", path, err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destination_names_are_case_insensitive() {
        assert_eq!(
            LogDestination::from_name("Terminal"),
            Some(LogDestination::Terminal)
        );
        assert_eq!(
            LogDestination::from_name(" both "),
            Some(LogDestination::Both(PathBuf::from(DEFAULT_LOG_FILE)))
        );
        assert_eq!(LogDestination::from_name("syslog"), None);
    }

    #[test]
    fn file_logger_is_created_in_writable_dir() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("carousel.log");
        assert!(create_file_logger(&path, LevelFilter::Info, build_config()).is_some());
        assert!(path.exists());
    }

    #[test]
    fn file_logger_is_skipped_when_parent_missing() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("missing").join("carousel.log");
        assert!(create_file_logger(&path, LevelFilter::Info, build_config()).is_none());
    }
}
