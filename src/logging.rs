// src/logging.rs
//! Explicit logger handles.
//!
//! Components never log through an ambient, process-wide name. Each one is
//! handed a [`Logger`] by whoever constructs it, and derives child scopes
//! from it for the work it spawns. Output still goes through the `log`
//! facade, which the binary wires to log4rs once at startup.

use log::Level;
use std::fmt;
use std::sync::Arc;

/// Target used for every record emitted by the crawler.
pub const LOG_TARGET: &str = "socialgraph_crawler";

/// A named logging scope, cheap to clone and pass around.
#[derive(Clone)]
pub struct Logger {
    scope: Arc<str>,
}

impl Logger {
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: Arc::from(scope.into()),
        }
    }

    /// Derives a nested scope, e.g. `Scheduler` -> `Scheduler/Worker 2`.
    pub fn child(&self, name: impl fmt::Display) -> Self {
        Self::new(format!("{}/{}", self.scope, name))
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn log(&self, level: Level, message: fmt::Arguments<'_>) {
        log::log!(target: LOG_TARGET, level, "{}: {}", self.scope, message);
    }

    pub fn error(&self, message: fmt::Arguments<'_>) {
        self.log(Level::Error, message);
    }

    pub fn warn(&self, message: fmt::Arguments<'_>) {
        self.log(Level::Warn, message);
    }

    pub fn info(&self, message: fmt::Arguments<'_>) {
        self.log(Level::Info, message);
    }

    pub fn debug(&self, message: fmt::Arguments<'_>) {
        self.log(Level::Debug, message);
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Logger").field(&self.scope).finish()
    }
}
