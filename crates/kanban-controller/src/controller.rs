//! Card session controller.
//!
//! The controller arbitrates the single card reader between the background
//! presence monitor and foreground operations.
//!
//! ```text
//!            ┌──────────────────┐  try_lock, skipped while busy
//!            │ Presence monitor │─────────────────┐
//!            └──────────────────┘                 ▼
//! ┌──────────┐  acquire   ┌───────────┐  lock  ┌─────────────┐
//! │ Operator │──────────► │ Busy gate │──────► │ CardSession │
//! └──────────┘  release   └───────────┘        └─────────────┘
//!                 + immediate presence refresh
//! ```
//!
//! A foreground operation raises the busy gate, then takes the hardware
//! lock. On release it lowers the gate and refreshes presence while still
//! holding the lock, so the monitor's next tick always observes the
//! refreshed state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use kanban_core::{ThreadPair, format_uid};
use kanban_hardware::CardSession;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use crate::config::ControllerConfig;
use crate::display::{
    CARD_ABSENT, CARD_DETECTED, CARD_WAITING, LogLevel, Narrator, OperatorDisplay,
    READER_CONNECTED, READER_NOT_CONNECTED, UID_UNKNOWN,
};
use crate::outcome::OperationOutcome;
use crate::state::{BusyGuard, CancelSignal, PresenceState, SessionFlags};

/// Dialog text shown once when no reader is found at startup.
const READER_NOT_FOUND_TEXT: &str = "ACR122U reader not detected.\n\n\
    Please connect the reader. Detection is retried in the background.\n\n\
    You can still use the interface, but card operations will fail.";

/// One hardware call run against a presented card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardOp {
    Write(ThreadPair),
    Read,
    WriteBypass,
    Clear,
}

/// Card session controller.
///
/// Owns the hardware session, the display, the session flags and the
/// presence state for the life of the process.
///
/// # Examples
///
/// ```no_run
/// use kanban_controller::{CardOp, ControllerConfig, SessionController};
/// # use kanban_controller::display::OperatorDisplay;
/// use kanban_hardware::mock::MockCardSession;
///
/// # async fn example<D: OperatorDisplay>(display: D) {
/// let (reader, handle) = MockCardSession::new();
/// let controller = SessionController::new(reader, display, ControllerConfig::default());
///
/// controller.startup().await;
/// handle.present_card(vec![0x04, 0xA1, 0xB2, 0xC3]);
///
/// let outcome = controller.run_single(CardOp::Read).await;
/// println!("{}", outcome.message());
/// # }
/// ```
pub struct SessionController<H, D> {
    pub(crate) hardware: AsyncMutex<H>,
    pub(crate) display: D,
    pub(crate) flags: SessionFlags,
    presence: Mutex<PresenceState>,
    /// Reader status last shown to the operator.
    reader_online: AtomicBool,
    pub(crate) config: ControllerConfig,
}

impl<H: CardSession, D: OperatorDisplay> SessionController<H, D> {
    pub fn new(hardware: H, display: D, config: ControllerConfig) -> Self {
        Self {
            hardware: AsyncMutex::new(hardware),
            display,
            flags: SessionFlags::new(),
            presence: Mutex::new(PresenceState::absent()),
            reader_online: AtomicBool::new(false),
            config,
        }
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn flags(&self) -> &SessionFlags {
        &self.flags
    }

    pub fn is_busy(&self) -> bool {
        self.flags.is_busy()
    }

    /// Handle that stops the running continuous batch.
    pub fn cancel_signal(&self) -> CancelSignal {
        self.flags.cancel_signal()
    }

    /// Snapshot of the last known presence.
    pub fn presence(&self) -> PresenceState {
        self.presence_lock().clone()
    }

    fn presence_lock(&self) -> MutexGuard<'_, PresenceState> {
        self.presence
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Whether a reader is connected, without waiting on a running operation.
    pub fn has_reader(&self) -> Option<bool> {
        self.hardware.try_lock().ok().map(|hw| hw.has_reader())
    }

    /// Connect to the reader and report the result.
    ///
    /// A missing reader is not fatal: the status shows "Not Connected", a
    /// one-time warning dialog is shown and the presence monitor keeps
    /// retrying discovery. Returns whether a reader was connected.
    pub async fn startup(&self) -> bool {
        self.display
            .log("=== Thread Verification - Kanban Tool ===", LogLevel::Info);
        self.display.log("Initializing RFID reader...", LogLevel::Info);

        let mut hw = self.hardware.lock().await;
        match hw.connect_reader().await {
            Ok(message) => {
                info!("{}", message);
                self.display.log(&message, LogLevel::Success);
                self.display.set_reader_status(READER_CONNECTED, true);
                self.reader_online.store(true, Ordering::SeqCst);
                self.display.set_card_status(CARD_ABSENT, false);
                self.display.set_card_uid(UID_UNKNOWN);
                true
            }
            Err(e) => {
                warn!("Reader not available at startup: {}", e);
                self.display.log(&e.to_string(), LogLevel::Error);
                self.display.set_reader_status(READER_NOT_CONNECTED, false);
                self.display
                    .show_warning("Reader Not Found", READER_NOT_FOUND_TEXT);
                false
            }
        }
    }

    /// Run the presence monitor forever.
    ///
    /// Polls presence every `presence_poll_ms` while a reader is connected,
    /// and retries reader discovery every `reader_retry_ms` otherwise.
    pub async fn run_presence_monitor(&self) {
        loop {
            // A running operation means a reader was there when it started
            let has_reader = self.has_reader().unwrap_or(true);

            if has_reader {
                self.presence_tick().await;
                tokio::time::sleep(self.config.presence_poll()).await;
            } else {
                if self.reader_online.swap(false, Ordering::SeqCst) {
                    warn!("Reader lost");
                    self.display.log("Reader disconnected", LogLevel::Warning);
                    self.display.set_reader_status(READER_NOT_CONNECTED, false);
                    let state = PresenceState::absent();
                    self.show_presence(&state);
                    self.set_presence(state);
                }
                self.discover_reader().await;
                tokio::time::sleep(self.config.reader_retry()).await;
            }
        }
    }

    /// One discovery attempt, skipped while an operation runs.
    async fn discover_reader(&self) {
        if self.flags.is_busy() {
            return;
        }
        let Ok(mut hw) = self.hardware.try_lock() else {
            return;
        };

        match hw.connect_reader().await {
            Ok(message) => {
                info!("{}", message);
                self.display.log(&message, LogLevel::Success);
                self.display.set_reader_status(READER_CONNECTED, true);
                self.reader_online.store(true, Ordering::SeqCst);
            }
            Err(e) => debug!("Reader discovery failed: {}", e),
        }
    }

    /// One presence monitor tick.
    ///
    /// Does nothing while busy or without a reader. Otherwise notifies the
    /// display only when presence changed since the last known state.
    pub async fn presence_tick(&self) {
        if self.flags.is_busy() {
            return;
        }
        let Ok(mut hw) = self.hardware.try_lock() else {
            return;
        };
        if !hw.has_reader() {
            return;
        }

        let present = hw.check_card_present().await;
        if present == self.presence_lock().is_present() {
            return;
        }

        let state = if present {
            PresenceState::present(read_uid_best_effort(&mut *hw).await)
        } else {
            PresenceState::absent()
        };

        if self.flags.is_busy() {
            return;
        }

        self.show_presence(&state);
        match (state.is_present(), state.uid()) {
            (true, Some(uid)) => self
                .display
                .log(&format!("Card detected - UID: {}", uid), LogLevel::Success),
            (true, None) => self.display.log("Card detected on reader", LogLevel::Success),
            (false, _) => self.display.log("Card removed from reader", LogLevel::Info),
        }
        self.set_presence(state);
    }

    /// Re-read presence now and overwrite the stored state.
    pub async fn refresh_presence(&self) {
        let mut hw = self.hardware.lock().await;
        self.refresh_with(&mut hw).await;
    }

    pub(crate) async fn refresh_with(&self, hw: &mut H) {
        if !hw.has_reader() {
            return;
        }

        let state = if hw.check_card_present().await {
            PresenceState::present(read_uid_best_effort(hw).await)
        } else {
            PresenceState::absent()
        };

        self.show_presence(&state);
        self.set_presence(state);
    }

    fn show_presence(&self, state: &PresenceState) {
        if state.is_present() {
            self.display.set_card_status(CARD_DETECTED, true);
        } else {
            self.display.set_card_status(CARD_ABSENT, false);
        }
        self.display.set_card_uid(state.uid_text());
    }

    fn set_presence(&self, state: PresenceState) {
        *self.presence_lock() = state;
    }

    /// Lower the busy gate, then refresh presence before giving up the
    /// hardware.
    pub(crate) async fn finish(&self, busy: BusyGuard<'_>, hw: &mut H) {
        busy.release();
        self.refresh_with(hw).await;
    }

    /// Run one hardware call on the next presented card.
    ///
    /// Holds the busy gate for the whole call. Every failure is returned as
    /// [`OperationOutcome::Failed`]; nothing is raised.
    pub async fn run_single(&self, op: CardOp) -> OperationOutcome {
        let busy = self.flags.acquire();
        let mut hw = self.hardware.lock().await;

        let mut log = Narrator::new(&self.display);
        let outcome = self.single_card(&mut hw, &op, &mut log).await;

        self.finish(busy, &mut hw).await;
        outcome
    }

    /// Wait for a card, run `op`, disconnect.
    ///
    /// `op` is never invoked if the wait fails. The card connection is
    /// closed on every path.
    pub(crate) async fn single_card(
        &self,
        hw: &mut H,
        op: &CardOp,
        log: &mut Narrator<'_, D>,
    ) -> OperationOutcome {
        log.info("Waiting for card... Please place card on reader.");
        self.display.set_card_status(CARD_WAITING, false);

        match hw.wait_for_card(self.config.card_wait_timeout()).await {
            Ok(message) => {
                log.success(message);
                self.display.set_card_status(CARD_DETECTED, true);
            }
            Err(e) => {
                debug!("Card wait failed: {}", e);
                self.display.set_card_status(CARD_ABSENT, false);
                hw.disconnect().await;

                let outcome = if e.is_no_card() {
                    OperationOutcome::no_card()
                } else {
                    OperationOutcome::from_error(&e)
                };
                log.warning(outcome.message());
                return outcome;
            }
        }

        let outcome = perform(hw, op).await;
        hw.disconnect().await;
        outcome
    }
}

/// Invoke one hardware call on the connected card.
pub(crate) async fn perform<H: CardSession>(hw: &mut H, op: &CardOp) -> OperationOutcome {
    let result = match op {
        CardOp::Write(pair) => hw.write_kanban(pair).await.map(OperationOutcome::succeeded),
        CardOp::Read => hw
            .read_kanban()
            .await
            .map(|read| OperationOutcome::read(read.message, read.pair)),
        CardOp::WriteBypass => hw.write_bypass().await.map(OperationOutcome::succeeded),
        CardOp::Clear => hw.clear_card().await.map(OperationOutcome::succeeded),
    };

    result.unwrap_or_else(|e| {
        warn!("Card operation {:?} failed: {}", op, e);
        OperationOutcome::from_error(&e)
    })
}

/// Read the UID for display. Any failure means "unknown".
async fn read_uid_best_effort<H: CardSession>(hw: &mut H) -> Option<String> {
    match hw.read_uid().await {
        Ok(uid) if !uid.is_empty() => Some(format_uid(&uid)),
        Ok(_) => None,
        Err(e) => {
            debug!("UID read failed: {}", e);
            None
        }
    }
}
