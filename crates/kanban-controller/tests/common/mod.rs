//! Common test utilities for controller integration tests.
//!
//! Provides a [`RecordingDisplay`] that keeps every call the controller
//! makes, and helpers that build a controller over the mock reader.

#![allow(dead_code)]

use std::sync::Mutex;

use kanban_controller::display::OperatorDisplay;
use kanban_controller::{CancelSignal, ControllerConfig, LogLevel, SessionController};
use kanban_hardware::mock::{MockCardSession, MockReaderHandle};

pub type TestController = SessionController<MockCardSession, RecordingDisplay>;

/// One display call, in the order it was made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayEvent {
    Log(LogLevel, String),
    ReaderStatus(String, bool),
    CardStatus(String, bool),
    CardUid(String),
    ThreadValues(String, String),
    Error(String, String),
    Success(String, String),
    Warning(String, String),
    StopShown(String),
    StopClosed,
}

/// Display that records calls instead of rendering them.
#[derive(Debug, Default)]
pub struct RecordingDisplay {
    events: Mutex<Vec<DisplayEvent>>,
    stop: Mutex<Option<CancelSignal>>,
    press_stop_on_show: bool,
}

impl RecordingDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Display whose Stop control is pressed as soon as it appears.
    pub fn pressing_stop() -> Self {
        Self {
            press_stop_on_show: true,
            ..Self::default()
        }
    }

    fn push(&self, event: DisplayEvent) {
        self.events.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<DisplayEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    /// Activity log messages in order.
    pub fn logs(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                DisplayEvent::Log(_, message) => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn has_log(&self, message: &str) -> bool {
        self.logs().iter().any(|line| line == message)
    }

    pub fn count_logs(&self, message: &str) -> usize {
        self.logs().iter().filter(|line| *line == message).count()
    }

    /// Titles of every dialog shown, in order.
    pub fn dialog_titles(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                DisplayEvent::Error(title, _)
                | DisplayEvent::Success(title, _)
                | DisplayEvent::Warning(title, _) => Some(title),
                _ => None,
            })
            .collect()
    }

    /// Body of the last dialog with this title.
    pub fn dialog_text(&self, title: &str) -> Option<String> {
        self.events().into_iter().rev().find_map(|event| match event {
            DisplayEvent::Error(t, text)
            | DisplayEvent::Success(t, text)
            | DisplayEvent::Warning(t, text)
                if t == title =>
            {
                Some(text)
            }
            _ => None,
        })
    }

    /// Cancel signal handed to the last Stop control.
    pub fn stop_signal(&self) -> Option<CancelSignal> {
        self.stop.lock().unwrap().clone()
    }
}

impl OperatorDisplay for RecordingDisplay {
    fn log(&self, message: &str, level: LogLevel) {
        self.push(DisplayEvent::Log(level, message.to_string()));
    }

    fn set_reader_status(&self, text: &str, connected: bool) {
        self.push(DisplayEvent::ReaderStatus(text.to_string(), connected));
    }

    fn set_card_status(&self, text: &str, present: bool) {
        self.push(DisplayEvent::CardStatus(text.to_string(), present));
    }

    fn set_card_uid(&self, text: &str) {
        self.push(DisplayEvent::CardUid(text.to_string()));
    }

    fn set_thread_values(&self, thread1: &str, thread2: &str) {
        self.push(DisplayEvent::ThreadValues(
            thread1.to_string(),
            thread2.to_string(),
        ));
    }

    fn show_error(&self, title: &str, message: &str) {
        self.push(DisplayEvent::Error(title.to_string(), message.to_string()));
    }

    fn show_success(&self, title: &str, message: &str) {
        self.push(DisplayEvent::Success(title.to_string(), message.to_string()));
    }

    fn show_warning(&self, title: &str, message: &str) {
        self.push(DisplayEvent::Warning(title.to_string(), message.to_string()));
    }

    fn show_stop_control(&self, title: &str, cancel: CancelSignal) {
        self.push(DisplayEvent::StopShown(title.to_string()));
        if self.press_stop_on_show {
            cancel.request();
        }
        *self.stop.lock().unwrap() = Some(cancel);
    }

    fn close_stop_control(&self) {
        self.push(DisplayEvent::StopClosed);
    }
}

/// UID of the n-th test card.
pub fn uid(n: u8) -> Vec<u8> {
    vec![0x04, n, n, n]
}

/// Controller over a mock reader, without running startup.
pub fn controller_with(display: RecordingDisplay) -> (TestController, MockReaderHandle) {
    let (reader, handle) = MockCardSession::new();
    let controller = SessionController::new(reader, display, ControllerConfig::default());
    (controller, handle)
}

/// Controller whose reader is connected, with the startup output cleared.
pub async fn started_controller() -> (TestController, MockReaderHandle) {
    started_controller_with(RecordingDisplay::new()).await
}

pub async fn started_controller_with(
    display: RecordingDisplay,
) -> (TestController, MockReaderHandle) {
    let (controller, handle) = controller_with(display);
    assert!(controller.startup().await);
    controller.display().clear();
    (controller, handle)
}
