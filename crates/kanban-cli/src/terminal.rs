//! Terminal implementation of the operator display.

use std::sync::{Mutex, MutexGuard};

use chrono::Local;
use kanban_controller::display::{
    CARD_ABSENT, OperatorDisplay, READER_NOT_CONNECTED, UID_UNKNOWN,
};
use kanban_controller::{CancelSignal, LogLevel};
use owo_colors::OwoColorize;

/// Status fields a window would keep on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusPanel {
    pub reader: String,
    pub reader_connected: bool,
    pub card: String,
    pub card_present: bool,
    pub uid: String,
    pub thread1: String,
    pub thread2: String,
}

impl Default for StatusPanel {
    fn default() -> Self {
        Self {
            reader: READER_NOT_CONNECTED.to_string(),
            reader_connected: false,
            card: CARD_ABSENT.to_string(),
            card_present: false,
            uid: UID_UNKNOWN.to_string(),
            thread1: String::new(),
            thread2: String::new(),
        }
    }
}

/// Prints the activity log with timestamps and keeps the status fields
/// for the `status` command.
#[derive(Debug, Default)]
pub struct TerminalDisplay {
    panel: Mutex<StatusPanel>,
    stop: Mutex<Option<CancelSignal>>,
}

impl TerminalDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    fn panel(&self) -> MutexGuard<'_, StatusPanel> {
        self.panel.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn stop_slot(&self) -> MutexGuard<'_, Option<CancelSignal>> {
        self.stop.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn status(&self) -> StatusPanel {
        self.panel().clone()
    }

    /// Press the Stop control, if one is showing.
    pub fn press_stop(&self) -> bool {
        match self.stop_slot().as_ref() {
            Some(cancel) => {
                cancel.request();
                true
            }
            None => false,
        }
    }

    pub fn print_status(&self, busy: bool) {
        let panel = self.status();
        let reader = if panel.reader_connected {
            panel.reader.green().to_string()
        } else {
            panel.reader.red().to_string()
        };
        let card = if panel.card_present {
            panel.card.green().to_string()
        } else {
            panel.card.dimmed().to_string()
        };

        println!("  Reader:   {}", reader);
        println!("  Card:     {}", card);
        println!("  UID:      {}", panel.uid);
        println!("  Thread 1: {}", panel.thread1);
        println!("  Thread 2: {}", panel.thread2);
        if busy {
            println!("  {}", "Operation in progress".yellow());
        }
    }

    fn dialog(&self, title: &str, message: &str, level: LogLevel) {
        let heading = match level {
            LogLevel::Success => format!("✓ {}", title).green().bold().to_string(),
            LogLevel::Warning => format!("! {}", title).yellow().bold().to_string(),
            LogLevel::Error => format!("✗ {}", title).red().bold().to_string(),
            LogLevel::Info => title.bold().to_string(),
        };

        println!();
        println!("  {}", heading);
        for line in message.lines() {
            println!("    {}", line);
        }
        println!();
    }
}

impl OperatorDisplay for TerminalDisplay {
    fn log(&self, message: &str, level: LogLevel) {
        let stamp = format!("[{}]", Local::now().format("%H:%M:%S"));
        let line = match level {
            LogLevel::Info => message.to_string(),
            LogLevel::Success => message.green().to_string(),
            LogLevel::Warning => message.yellow().to_string(),
            LogLevel::Error => message.red().to_string(),
        };
        println!("{} {}", stamp.dimmed(), line);
    }

    fn set_reader_status(&self, text: &str, connected: bool) {
        let mut panel = self.panel();
        panel.reader = text.to_string();
        panel.reader_connected = connected;
    }

    fn set_card_status(&self, text: &str, present: bool) {
        let mut panel = self.panel();
        panel.card = text.to_string();
        panel.card_present = present;
    }

    fn set_card_uid(&self, text: &str) {
        self.panel().uid = text.to_string();
    }

    fn set_thread_values(&self, thread1: &str, thread2: &str) {
        let mut panel = self.panel();
        panel.thread1 = thread1.to_string();
        panel.thread2 = thread2.to_string();
    }

    fn show_error(&self, title: &str, message: &str) {
        self.dialog(title, message, LogLevel::Error);
    }

    fn show_success(&self, title: &str, message: &str) {
        self.dialog(title, message, LogLevel::Success);
    }

    fn show_warning(&self, title: &str, message: &str) {
        self.dialog(title, message, LogLevel::Warning);
    }

    fn show_stop_control(&self, title: &str, cancel: CancelSignal) {
        println!(
            "{} {}",
            format!("[{}]", title).cyan().bold(),
            "Press Enter or Ctrl-C to stop.".dimmed()
        );
        *self.stop_slot() = Some(cancel);
    }

    fn close_stop_control(&self) {
        self.stop_slot().take();
    }
}
