//! User-facing notifications. Flows report outcomes through a [`Notifier`]
//! instead of printing directly, so the CLI and the tests can each decide
//! where messages go.

use std::{
    fmt,
    sync::{Mutex, MutexGuard},
};

use serde::Serialize;

use crate::{log_error, log_info, log_warn};

const ENABLE_LOGS: bool = true;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Error,
    Warning,
    Info,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Level::Success => "✓",
            Level::Error => "✗",
            Level::Warning => "!",
            Level::Info => "i",
        };
        f.write_str(label)
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, level: Level, message: &str);

    fn success(&self, message: &str) {
        self.notify(Level::Success, message);
    }

    fn error(&self, message: &str) {
        self.notify(Level::Error, message);
    }

    fn warning(&self, message: &str) {
        self.notify(Level::Warning, message);
    }

    fn info(&self, message: &str) {
        self.notify(Level::Info, message);
    }
}

/// Logs every message and prints it; errors and warnings go to stderr.
#[derive(Debug, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, level: Level, message: &str) {
        match level {
            Level::Error => {
                log_error!("{message}");
                eprintln!("{level} {message}");
            }
            Level::Warning => {
                log_warn!("{message}");
                eprintln!("{level} {message}");
            }
            Level::Success | Level::Info => {
                log_info!("{message}");
                println!("{level} {message}");
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<(Level, String)>>,
}

impl RecordingNotifier {
    fn guard(&self) -> MutexGuard<'_, Vec<(Level, String)>> {
        match self.messages.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn messages(&self) -> Vec<(Level, String)> {
        self.guard().clone()
    }

    pub fn last(&self) -> Option<(Level, String)> {
        self.guard().last().cloned()
    }

    pub fn count(&self, level: Level) -> usize {
        self.guard().iter().filter(|(seen, _)| *seen == level).count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, level: Level, message: &str) {
        self.guard().push((level, message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_keeps_order_and_levels() {
        let notifier = RecordingNotifier::default();
        notifier.info("Analizuję plik");
        notifier.error("Błąd");
        notifier.success("Gotowe");

        assert_eq!(notifier.count(Level::Error), 1);
        assert_eq!(notifier.last(), Some((Level::Success, "Gotowe".to_string())));
        assert_eq!(notifier.messages().len(), 3);
    }
}
