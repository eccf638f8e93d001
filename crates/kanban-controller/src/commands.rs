//! Operator commands.
//!
//! [`Operator`] is what a front end binds its buttons or prompt commands
//! to. It validates input before any hardware access, runs the operation
//! through the [`SessionController`], and turns the result into log lines
//! and the summary dialog for that command.

use kanban_core::constants::SUMMARY_LISTED_CARDS;
use kanban_core::{BatchSize, Error, Result, ThreadPair};
use kanban_hardware::CardSession;
use tracing::info;

use crate::batch::ContinuousMode;
use crate::controller::{CardOp, SessionController};
use crate::display::{LogLevel, OperatorDisplay};
use crate::outcome::{BatchRun, FailureKind, OperationOutcome};

const NO_CARD_TITLE: &str = "No Card Detected";
const NO_CARD_TEXT: &str = "Please place a card on the reader and try again.";
const INVALID_INPUT_TITLE: &str = "Invalid Input";
const BLANK_CARD_TEXT: &str = "Card holds no thread codes";

/// Command surface over a session controller.
///
/// # Examples
///
/// ```no_run
/// use kanban_controller::{Operator, SessionController};
/// # use kanban_controller::display::OperatorDisplay;
/// # use kanban_hardware::CardSession;
///
/// # async fn example<H: CardSession, D: OperatorDisplay>(controller: SessionController<H, D>) {
/// let operator = Operator::new(&controller);
///
/// match operator.write_one("TH-001", "TH-RED-100").await {
///     Ok(outcome) => println!("{}", outcome.message()),
///     Err(e) => println!("rejected: {}", e),
/// }
/// # }
/// ```
pub struct Operator<'a, H, D> {
    controller: &'a SessionController<H, D>,
}

impl<'a, H: CardSession, D: OperatorDisplay> Operator<'a, H, D> {
    pub fn new(controller: &'a SessionController<H, D>) -> Self {
        Self { controller }
    }

    pub fn controller(&self) -> &SessionController<H, D> {
        self.controller
    }

    fn display(&self) -> &D {
        self.controller.display()
    }

    fn log(&self, message: &str, level: LogLevel) {
        self.display().log(message, level);
    }

    /// Validate operator input, reporting a rejection through a dialog.
    ///
    /// # Errors
    ///
    /// Returns the validation error; no hardware has been touched.
    pub fn validate_pair(&self, thread1: &str, thread2: &str) -> Result<ThreadPair> {
        ThreadPair::validated(thread1, thread2).inspect_err(|e| match e {
            Error::EmptyThreadCode => self.display().show_warning(
                INVALID_INPUT_TITLE,
                "Please enter both Thread 1 and Thread 2 codes.",
            ),
            e => self.display().show_error(INVALID_INPUT_TITLE, &e.to_string()),
        })
    }

    /// Validate a batch size.
    ///
    /// Returns `Ok(None)` for 0, which means "no work".
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidBatchSize` above the configured maximum.
    pub fn validate_batch_size(&self, count: u32) -> Result<Option<BatchSize>> {
        if count == 0 {
            return Ok(None);
        }

        let max = self.controller.config().max_batch_size;
        BatchSize::with_max(count, max)
            .map(Some)
            .inspect_err(|e| self.display().show_error(INVALID_INPUT_TITLE, &e.to_string()))
    }

    fn report_no_card(&self, outcome: &OperationOutcome) -> bool {
        if outcome.failure_kind() == Some(FailureKind::NoCard) {
            self.display().show_error(NO_CARD_TITLE, NO_CARD_TEXT);
            true
        } else {
            false
        }
    }

    /// Write both thread codes to one card.
    ///
    /// # Errors
    ///
    /// Returns a validation error if either code is empty, longer than 16
    /// characters or not printable ASCII.
    pub async fn write_one(&self, thread1: &str, thread2: &str) -> Result<OperationOutcome> {
        let pair = self.validate_pair(thread1, thread2)?;
        self.log(
            &format!(
                "Writing Kanban: Thread1='{}', Thread2='{}'",
                pair.thread1, pair.thread2
            ),
            LogLevel::Info,
        );

        let outcome = self.controller.run_single(CardOp::Write(pair.clone())).await;
        if self.report_no_card(&outcome) {
            return Ok(outcome);
        }

        if outcome.is_success() {
            info!("Card written: {}", pair);
            self.log(outcome.message(), LogLevel::Success);
            self.display().show_success(
                "Success",
                &format!(
                    "Kanban card written successfully!\n\nThread 1: {}\nThread 2: {}",
                    pair.thread1, pair.thread2
                ),
            );
        } else {
            self.log(
                &format!("Failed to write Kanban: {}", outcome.message()),
                LogLevel::Error,
            );
            self.display().show_error(
                "Write Failed",
                &format!("Failed to write Kanban card.\n\n{}", outcome.message()),
            );
        }

        Ok(outcome)
    }

    /// Write the bypass keyword to one card.
    pub async fn write_bypass(&self) -> OperationOutcome {
        self.log("Writing BYPASS card...", LogLevel::Warning);

        let outcome = self.controller.run_single(CardOp::WriteBypass).await;
        if self.report_no_card(&outcome) {
            return outcome;
        }

        if outcome.is_success() {
            self.log("BYPASS card written successfully", LogLevel::Success);
            self.display().show_success(
                "Success",
                "BYPASS card written successfully!\n\n\
                 WARNING: This card will bypass all verification.\n\
                 Use only for maintenance or special operations.",
            );
        } else {
            self.log(
                &format!("Failed to write BYPASS: {}", outcome.message()),
                LogLevel::Error,
            );
            self.display().show_error(
                "Write Failed",
                &format!("Failed to write BYPASS card.\n\n{}", outcome.message()),
            );
        }

        outcome
    }

    /// Read one card and mirror its codes into the input fields.
    pub async fn read_one(&self) -> OperationOutcome {
        self.log("Reading Kanban card...", LogLevel::Info);

        let outcome = self.controller.run_single(CardOp::Read).await;
        if self.report_no_card(&outcome) {
            return outcome;
        }

        match outcome.payload() {
            Some(pair) => {
                self.log(outcome.message(), LogLevel::Success);
                self.log(&format!("Thread 1: {}", pair.thread1), LogLevel::Info);
                self.log(&format!("Thread 2: {}", pair.thread2), LogLevel::Info);
                self.display()
                    .set_thread_values(&pair.thread1, &pair.thread2);
                if pair.is_blank() {
                    self.log(BLANK_CARD_TEXT, LogLevel::Warning);
                }

                if pair.is_bypass() {
                    self.display().show_warning(
                        "Bypass Card",
                        "This is a BYPASS card.\n\nMachine will operate without verification.",
                    );
                } else {
                    self.display().show_success(
                        "Card Read Successfully",
                        &format!("Thread 1: {}\nThread 2: {}", pair.thread1, pair.thread2),
                    );
                }
            }
            None => {
                self.log(
                    &format!("Failed to read Kanban: {}", outcome.message()),
                    LogLevel::Error,
                );
                self.display().show_error(
                    "Read Failed",
                    &format!("Failed to read Kanban card.\n\n{}", outcome.message()),
                );
            }
        }

        outcome
    }

    /// Erase both thread codes on one card.
    pub async fn clear_one(&self) -> OperationOutcome {
        self.log("Clearing card...", LogLevel::Info);

        let outcome = self.controller.run_single(CardOp::Clear).await;
        if self.report_no_card(&outcome) {
            return outcome;
        }

        if outcome.is_success() {
            self.log(outcome.message(), LogLevel::Success);
            self.display()
                .show_success("Success", "Card cleared successfully!");
        } else {
            self.log(
                &format!("Failed to clear card: {}", outcome.message()),
                LogLevel::Error,
            );
            self.display().show_error(
                "Clear Failed",
                &format!("Failed to clear card.\n\n{}", outcome.message()),
            );
        }

        outcome
    }

    /// Write the same codes to `count` cards.
    ///
    /// A count of 0 does nothing and returns `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns a validation error for bad codes or a count above the limit.
    pub async fn write_many(
        &self,
        thread1: &str,
        thread2: &str,
        count: u32,
    ) -> Result<Option<BatchRun>> {
        let pair = self.validate_pair(thread1, thread2)?;
        let Some(count) = self.validate_batch_size(count)? else {
            return Ok(None);
        };

        let run = self.controller.write_batch(&pair, count).await;
        let summary = &run.summary;
        let total = count.get();

        if summary.all_succeeded() {
            self.display().show_success(
                "All Cards Written",
                &format!(
                    "Successfully wrote all {} cards!\n\nThread 1: {}\nThread 2: {}",
                    total, pair.thread1, pair.thread2
                ),
            );
        } else {
            self.display().show_warning(
                "Write Complete with Errors",
                &format!(
                    "Success: {}/{}\nFailed: {}/{}\n\nPlease check the log for details.",
                    summary.succeeded(),
                    total,
                    summary.failed(),
                    total
                ),
            );
        }

        Ok(Some(run))
    }

    /// Read cards until Stop is pressed.
    pub async fn read_continuous(&self) -> BatchRun {
        let run = self.controller.run_continuous(ContinuousMode::Read).await;
        let summary = &run.summary;

        if summary.attempted() == 0 {
            return run;
        }

        if summary.all_succeeded() {
            let mut text = format!("Successfully read {} cards!\n\n", summary.succeeded());
            let listed: Vec<_> = summary.cards_read().collect();
            if !listed.is_empty() {
                text.push_str("Cards:\n");
                for (number, pair) in listed.iter().take(SUMMARY_LISTED_CARDS) {
                    text.push_str(&format!("{}. {}\n", number, pair));
                }
                if listed.len() > SUMMARY_LISTED_CARDS {
                    text.push_str(&format!(
                        "... and {} more\n",
                        listed.len() - SUMMARY_LISTED_CARDS
                    ));
                }
            }
            self.display().show_success("Cards Read", &text);
        } else {
            self.display()
                .show_warning("Read Complete", &totals_text(&run));
        }

        run
    }

    /// Clear cards until Stop is pressed.
    pub async fn clear_continuous(&self) -> BatchRun {
        let run = self.controller.run_continuous(ContinuousMode::Clear).await;
        let summary = &run.summary;

        if summary.attempted() == 0 {
            return run;
        }

        if summary.all_succeeded() {
            self.display().show_success(
                "All Cards Cleared",
                &format!("Successfully cleared {} cards!", summary.succeeded()),
            );
        } else {
            self.display()
                .show_warning("Clear Complete", &totals_text(&run));
        }

        run
    }
}

fn totals_text(run: &BatchRun) -> String {
    format!(
        "Total: {}\nSuccess: {}\nFailed: {}\n\nPlease check the log for details.",
        run.summary.attempted(),
        run.summary.succeeded(),
        run.summary.failed()
    )
}
