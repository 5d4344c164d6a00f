use log::{Level, Log, Record};
use std::{fmt, sync::Arc};

pub const LOG_TARGET: &str = "selfupdate";

/// Logging handle passed through configuration.
///
/// Holds an injected [`Log`] implementation, or forwards to whatever logger the
/// application installed for the `log` facade when none was given.
#[derive(Clone, Default)]
pub struct Logger {
    inner: Option<Arc<dyn Log>>,
}

impl Logger {
    pub fn new(log: Arc<dyn Log>) -> Self {
        Self { inner: Some(log) }
    }

    /// Forwards to the global `log` facade.
    pub fn global() -> Self {
        Self::default()
    }

    pub fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        let record = Record::builder()
            .level(level)
            .target(LOG_TARGET)
            .args(args)
            .build();
        match &self.inner {
            Some(inner) => {
                if inner.enabled(record.metadata()) {
                    inner.log(&record);
                }
            }
            None => {
                let global = log::logger();
                if level <= log::max_level() && global.enabled(record.metadata()) {
                    global.log(&record);
                }
            }
        }
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
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("injected", &self.inner.is_some())
            .finish()
    }
}
