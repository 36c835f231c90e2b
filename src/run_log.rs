//! Run-scoped logging context.
//!
//! A `RunLog` is created once per run and handed to each component, which
//! derives a `ScopedLog` with its own log target. Every record carries the run
//! id so interleaved runs in `app.log` can be told apart. Output goes through
//! the `log` facade, so whatever `log4rs` configuration `main` installs applies.

use chrono::Utc;
use log::Level;
use std::fmt;
use std::sync::Arc;

/// Logging context for one run of the reader
#[derive(Debug, Clone)]
pub struct RunLog {
    run_id: Arc<str>,
}

impl RunLog {
    pub fn new() -> Self {
        Self::with_id(Utc::now().format("%Y%m%dT%H%M%S").to_string())
    }

    pub fn with_id(run_id: impl Into<String>) -> Self {
        Self {
            run_id: Arc::from(run_id.into()),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Log handle for a single component
    pub fn scoped(&self, component: &'static str) -> ScopedLog {
        ScopedLog {
            run_id: Arc::clone(&self.run_id),
            target: component,
        }
    }
}

impl Default for RunLog {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct ScopedLog {
    run_id: Arc<str>,
    target: &'static str,
}

impl ScopedLog {
    pub fn target(&self) -> &'static str {
        self.target
    }

    pub fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        log::log!(target: self.target, level, "[{}] {}", self.run_id, args);
    }

    pub fn debug(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Debug, args);
    }

    pub fn info(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Info, args);
    }

    pub fn warn(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Warn, args);
    }

    pub fn error(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Error, args);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoped_logs_share_run_id() {
        let run = RunLog::with_id("run-1");
        let scroll = run.scoped("reader::scroll");
        let queue = run.scoped("reader::queue");

        assert_eq!(run.run_id(), "run-1");
        assert_eq!(scroll.target(), "reader::scroll");
        assert_eq!(queue.target(), "reader::queue");
        assert!(Arc::ptr_eq(&scroll.run_id, &queue.run_id));
    }

    #[test]
    fn test_generated_run_id_is_timestamp() {
        let run = RunLog::new();
        assert_eq!(run.run_id().len(), "20240101T000000".len());
        assert!(run.run_id().contains('T'));
    }
}
