//! Display and notification contract.
//!
//! The controller never renders anything itself. It reports status changes,
//! activity log lines and dialogs through [`OperatorDisplay`], which the
//! front end implements. The only call flowing the other way is the Stop
//! control raising a [`CancelSignal`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::state::CancelSignal;

/// Reader status shown after a successful connection.
pub const READER_CONNECTED: &str = "Connected";

/// Reader status shown while no reader is connected.
pub const READER_NOT_CONNECTED: &str = "Not Connected";

/// Card status while an operation waits for a card.
pub const CARD_WAITING: &str = "Waiting...";

/// Card status while a card is in the field.
pub const CARD_DETECTED: &str = "Card Detected";

/// Card status while the field is empty.
pub const CARD_ABSENT: &str = "No Card";

/// UID text shown when the UID is unknown.
pub const UID_UNKNOWN: &str = "-";

/// Severity of an activity log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Success => write!(f, "success"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// One line of operator-facing narration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// Operator-facing display.
///
/// Methods take `&self`; implementations use interior mutability. They are
/// called from the controller's single flow of control and must not block.
///
/// # Examples
///
/// ```
/// use kanban_controller::display::{LogLevel, OperatorDisplay};
/// use kanban_controller::CancelSignal;
///
/// struct StdoutDisplay;
///
/// impl OperatorDisplay for StdoutDisplay {
///     fn log(&self, message: &str, level: LogLevel) {
///         println!("[{}] {}", level, message);
///     }
///     fn set_reader_status(&self, _text: &str, _connected: bool) {}
///     fn set_card_status(&self, _text: &str, _present: bool) {}
///     fn set_card_uid(&self, _text: &str) {}
///     fn set_thread_values(&self, _thread1: &str, _thread2: &str) {}
///     fn show_error(&self, title: &str, message: &str) {
///         eprintln!("{}: {}", title, message);
///     }
///     fn show_success(&self, title: &str, message: &str) {
///         println!("{}: {}", title, message);
///     }
///     fn show_warning(&self, title: &str, message: &str) {
///         println!("{}: {}", title, message);
///     }
///     fn show_stop_control(&self, _title: &str, _cancel: CancelSignal) {}
///     fn close_stop_control(&self) {}
/// }
/// ```
pub trait OperatorDisplay {
    /// Append a line to the activity log.
    fn log(&self, message: &str, level: LogLevel);

    fn set_reader_status(&self, text: &str, connected: bool);

    fn set_card_status(&self, text: &str, present: bool);

    fn set_card_uid(&self, text: &str);

    /// Mirror thread codes back into the input fields after a read.
    fn set_thread_values(&self, thread1: &str, thread2: &str);

    fn show_error(&self, title: &str, message: &str);

    fn show_success(&self, title: &str, message: &str);

    fn show_warning(&self, title: &str, message: &str);

    /// Show the Stop control of a continuous batch.
    ///
    /// Activating the control must call [`CancelSignal::request`] on `cancel`
    /// and have no other effect.
    fn show_stop_control(&self, title: &str, cancel: CancelSignal);

    /// Remove the Stop control.
    fn close_stop_control(&self);
}

/// Collects narration while forwarding each line to the display.
pub(crate) struct Narrator<'a, D: OperatorDisplay> {
    display: &'a D,
    entries: Vec<LogEntry>,
}

impl<'a, D: OperatorDisplay> Narrator<'a, D> {
    pub(crate) fn new(display: &'a D) -> Self {
        Self {
            display,
            entries: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        self.display.log(&message, level);
        self.entries.push(LogEntry::new(level, message));
    }

    pub(crate) fn info(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Info, message);
    }

    pub(crate) fn success(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Success, message);
    }

    pub(crate) fn warning(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Warning, message);
    }

    pub(crate) fn error(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Error, message);
    }

    pub(crate) fn into_entries(self) -> Vec<LogEntry> {
        self.entries
    }
}

/// Stop control shown for the lifetime of a continuous batch.
///
/// Closing happens on drop so every exit path removes the control.
pub(crate) struct StopControl<'a, D: OperatorDisplay> {
    display: &'a D,
}

impl<'a, D: OperatorDisplay> StopControl<'a, D> {
    pub(crate) fn show(display: &'a D, title: &str, cancel: CancelSignal) -> Self {
        display.show_stop_control(title, cancel);
        Self { display }
    }

    pub(crate) fn close(self) {}
}

impl<D: OperatorDisplay> Drop for StopControl<'_, D> {
    fn drop(&mut self) {
        self.display.close_stop_control();
    }
}
