//! Bounded and cancellable batch runs.
//!
//! Both variants reuse the single-card body per slot and wait for the card
//! to be removed between slots. They differ in how they end:
//!
//! - [`write_batch`](SessionController::write_batch) runs exactly N slots.
//! - [`run_continuous`](SessionController::run_continuous) runs until the
//!   Stop control raises the cancel signal. Its card and removal waits
//!   re-check the signal every retry tick.

use kanban_core::{BatchSize, ThreadPair};
use kanban_hardware::CardSession;
use tokio::time::Instant;
use tracing::debug;

use crate::controller::{CardOp, SessionController, perform};
use crate::display::{
    CARD_ABSENT, CARD_DETECTED, CARD_WAITING, Narrator, OperatorDisplay, StopControl,
};
use crate::outcome::{BatchRun, BatchSummary, FailureKind, OperationOutcome};
use crate::state::CancelSignal;

/// Which call a continuous batch runs on each card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContinuousMode {
    Read,
    Clear,
}

impl ContinuousMode {
    fn op(self) -> CardOp {
        match self {
            Self::Read => CardOp::Read,
            Self::Clear => CardOp::Clear,
        }
    }

    /// Title of the Stop control.
    pub fn title(self) -> &'static str {
        match self {
            Self::Read => "Reading Cards",
            Self::Clear => "Clearing Cards",
        }
    }

    fn verb(self) -> &'static str {
        match self {
            Self::Read => "Reading",
            Self::Clear => "Clearing",
        }
    }

    fn noun(self) -> &'static str {
        match self {
            Self::Read => "Read",
            Self::Clear => "Clear",
        }
    }
}

/// How an interruptible card wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CardWait {
    Presented,
    TimedOut,
    Cancelled,
}

impl<H: CardSession, D: OperatorDisplay> SessionController<H, D> {
    /// Write the same thread codes to `count` cards.
    ///
    /// A slot without a card, or with a failed write, is recorded as failed
    /// and the batch moves straight to the next slot without a removal
    /// wait. After a successful slot, except the last, the controller waits
    /// up to `removal_timeout_ms` for the card to leave; if it does not,
    /// a warning is logged and the same card may be written again.
    ///
    /// The summary always has `attempted == count`.
    pub async fn write_batch(&self, pair: &ThreadPair, count: BatchSize) -> BatchRun {
        let busy = self.flags.acquire();
        let mut hw = self.hardware.lock().await;

        let total = count.get();
        let op = CardOp::Write(pair.clone());
        let mut log = Narrator::new(&self.display);
        let mut summary = BatchSummary::default();

        log.info(format!("=== Writing {} cards ===", total));
        log.info(format!(
            "Thread1='{}', Thread2='{}'",
            pair.thread1, pair.thread2
        ));

        for index in 1..=total {
            let tag = format!("[Card {}/{}]", index, total);
            log.warning(format!("{} Waiting for card...", tag));

            let outcome = self.single_card(&mut hw, &op, &mut log).await;
            match &outcome {
                OperationOutcome::Succeeded { .. } => {
                    log.success(format!("{} ✓ Success!", tag));

                    if index < total {
                        log.warning(format!("{} Please remove card and place next card", tag));
                        if !self.wait_for_removal(&mut hw, None).await {
                            log.warning(format!("{} Warning: Card not removed yet", tag));
                        }
                    }
                }
                OperationOutcome::Failed { kind, message } => {
                    if *kind == FailureKind::NoCard {
                        log.error(format!("{} No card detected - Skipping", tag));
                    } else {
                        log.error(format!("{} ✗ Failed: {}", tag, message));
                    }
                }
            }
            summary.record(index, outcome);
        }

        log.info("=== Write Multiple Complete ===");
        log.success(format!("Success: {}/{}", summary.succeeded(), total));
        if summary.failed() > 0 {
            log.error(format!("Failed: {}/{}", summary.failed(), total));
        }

        self.finish(busy, &mut hw).await;

        BatchRun {
            summary,
            log: log.into_entries(),
            cancelled: false,
        }
    }

    /// Read or clear cards until the operator presses Stop.
    ///
    /// The cancel signal is cleared at the start and checked before every
    /// card wait, at every retry tick of the wait, and during removal
    /// waits. A slot is only recorded once a card wait has ended without
    /// cancellation; a timed-out wait counts as a failed slot.
    pub async fn run_continuous(&self, mode: ContinuousMode) -> BatchRun {
        let busy = self.flags.acquire();
        self.flags.reset_cancel();
        let cancel = self.flags.cancel_signal();
        let stop = StopControl::show(&self.display, mode.title(), cancel.clone());

        let mut hw = self.hardware.lock().await;
        let mut log = Narrator::new(&self.display);
        let mut summary = BatchSummary::default();

        log.info(format!(
            "=== {} Multiple Cards (Continuous Mode) ===",
            mode.verb()
        ));
        log.warning(format!(
            "Press Stop to finish {}.",
            mode.verb().to_lowercase()
        ));

        let mut index = 1;
        while !cancel.is_requested() {
            let tag = format!("[Card {}]", index);
            log.warning(format!("{} Waiting for card...", tag));

            match self.wait_for_card_interruptible(&mut hw, &cancel).await {
                CardWait::Cancelled => break,
                CardWait::TimedOut => {
                    log.error(format!("{} No card detected - Skipping", tag));
                    summary.record(index, OperationOutcome::no_card());
                    index += 1;
                    continue;
                }
                CardWait::Presented => {}
            }

            if cancel.is_requested() {
                hw.disconnect().await;
                break;
            }

            log.info(format!("{} {} data...", tag, mode.verb()));
            let outcome = perform(&mut *hw, &mode.op()).await;
            hw.disconnect().await;

            match (&outcome, mode) {
                (OperationOutcome::Succeeded { payload: Some(pair), .. }, ContinuousMode::Read) => {
                    if pair.is_bypass() {
                        log.warning(format!("{} ⚠️ BYPASS CARD", tag));
                    } else {
                        log.success(format!("{} Thread 1: {}", tag, pair.thread1));
                        log.success(format!("{} Thread 2: {}", tag, pair.thread2));
                    }
                }
                (OperationOutcome::Succeeded { .. }, _) => {
                    log.success(format!("{} ✓ Cleared!", tag));
                }
                (OperationOutcome::Failed { message, .. }, _) => {
                    log.error(format!("{} ✗ Failed: {}", tag, message));
                }
            }
            summary.record(index, outcome);

            if !cancel.is_requested() {
                log.warning(format!("{} Please remove card and place next card", tag));
                let removed = self.wait_for_removal(&mut hw, Some(&cancel)).await;
                if !removed && !cancel.is_requested() {
                    log.warning(format!("{} Warning: Card not removed yet", tag));
                }
            }

            index += 1;
        }

        stop.close();

        log.info(format!("=== {} Multiple Complete ===", mode.noun()));
        log.info(format!("Total cards processed: {}", summary.attempted()));
        log.success(format!("Success: {}", summary.succeeded()));
        if summary.failed() > 0 {
            log.error(format!("Failed: {}", summary.failed()));
        }

        if mode == ContinuousMode::Read && summary.cards_read().next().is_some() {
            log.info("--- Cards Summary ---");
            for (number, pair) in summary.cards_read() {
                if pair.is_bypass() {
                    log.warning(format!("Card {}: BYPASS CARD", number));
                } else {
                    log.info(format!("Card {}: {} / {}", number, pair.thread1, pair.thread2));
                }
            }
        }

        self.finish(busy, &mut hw).await;

        BatchRun {
            summary,
            log: log.into_entries(),
            cancelled: true,
        }
    }

    /// Card wait that re-checks `cancel` every `card_retry_ms`.
    ///
    /// Each attempt closes any stale card connection before connecting.
    async fn wait_for_card_interruptible(&self, hw: &mut H, cancel: &CancelSignal) -> CardWait {
        self.display.set_card_status(CARD_WAITING, false);
        let deadline = Instant::now() + self.config.card_wait_timeout();

        loop {
            if cancel.is_requested() {
                return CardWait::Cancelled;
            }

            match hw.try_connect_card().await {
                Ok(true) => {
                    self.display.set_card_status(CARD_DETECTED, true);
                    return CardWait::Presented;
                }
                Ok(false) => {}
                Err(e) => debug!("Card connect attempt failed: {}", e),
            }

            let now = Instant::now();
            if now >= deadline {
                self.display.set_card_status(CARD_ABSENT, false);
                return CardWait::TimedOut;
            }
            tokio::time::sleep(self.config.card_retry().min(deadline - now)).await;
        }
    }

    /// Poll until the card leaves the field.
    ///
    /// Returns `false` if the ceiling was reached or `cancel` was raised
    /// first. Never fails the batch.
    async fn wait_for_removal(&self, hw: &mut H, cancel: Option<&CancelSignal>) -> bool {
        let deadline = Instant::now() + self.config.removal_timeout();

        loop {
            if cancel.is_some_and(CancelSignal::is_requested) {
                return false;
            }
            if !hw.check_card_present().await {
                return true;
            }

            let now = Instant::now();
            if now >= deadline {
                debug!(
                    "Card still present after {}ms",
                    self.config.removal_timeout_ms
                );
                return false;
            }
            tokio::time::sleep(self.config.removal_poll().min(deadline - now)).await;
        }
    }
}
