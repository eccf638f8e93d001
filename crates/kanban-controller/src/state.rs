//! Presence state and session flags.
//!
//! [`SessionFlags`] owns the busy gate and the cancel request. The gate is
//! raised by `acquire` and lowered when the [`BusyGuard`] is released or
//! dropped; cancellation goes through [`CancelSignal`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;

use crate::display::UID_UNKNOWN;

/// Last known card presence, as shown to the operator.
///
/// A UID is only ever stored together with `present == true`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PresenceState {
    present: bool,
    uid: Option<String>,
}

impl PresenceState {
    /// Empty field.
    pub fn absent() -> Self {
        Self::default()
    }

    /// Card in the field, with its UID if it could be read.
    pub fn present(uid: Option<String>) -> Self {
        Self {
            present: true,
            uid: uid.filter(|uid| !uid.is_empty()),
        }
    }

    pub fn is_present(&self) -> bool {
        self.present
    }

    pub fn uid(&self) -> Option<&str> {
        self.uid.as_deref()
    }

    /// UID for display, `"-"` when unknown.
    pub fn uid_text(&self) -> &str {
        self.uid().unwrap_or(UID_UNKNOWN)
    }
}

/// Cooperative cancellation flag shared with the Stop control.
///
/// Clones share the same flag.
///
/// # Examples
///
/// ```
/// use kanban_controller::CancelSignal;
///
/// let signal = CancelSignal::new();
/// let stop_button = signal.clone();
///
/// stop_button.request();
/// assert!(signal.is_requested());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancelSignal(Arc<AtomicBool>);

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the running batch to stop at its next check.
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub(crate) fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Busy gate and cancel request, owned by the session controller.
#[derive(Debug, Default)]
pub struct SessionFlags {
    busy: AtomicBool,
    cancel: CancelSignal,
}

impl SessionFlags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the hardware as owned by a foreground operation.
    ///
    /// Callers are expected to run one foreground operation at a time;
    /// acquiring twice does not block.
    pub fn acquire(&self) -> BusyGuard<'_> {
        self.busy.store(true, Ordering::SeqCst);
        BusyGuard { flags: self }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Handle to the cancel flag, for the Stop control.
    pub fn cancel_signal(&self) -> CancelSignal {
        self.cancel.clone()
    }

    pub fn request_cancel(&self) {
        self.cancel.request();
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.cancel.is_requested()
    }

    pub(crate) fn reset_cancel(&self) {
        self.cancel.reset();
    }
}

/// Busy gate held by a foreground operation.
///
/// Dropping the guard lowers `busy` on every exit path, panics included.
#[derive(Debug)]
#[must_use = "the gate is released as soon as the guard is dropped"]
pub struct BusyGuard<'a> {
    flags: &'a SessionFlags,
}

impl BusyGuard<'_> {
    /// Lower the gate now.
    pub fn release(self) {}
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flags.busy.store(false, Ordering::SeqCst);
    }
}
