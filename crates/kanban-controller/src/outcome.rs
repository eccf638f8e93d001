//! Operation outcomes and batch summaries.

use kanban_core::ThreadPair;
use kanban_hardware::HardwareError;
use serde::Serialize;

use crate::display::LogEntry;

/// Message of a card wait that timed out.
pub const NO_CARD_MESSAGE: &str = "No card detected";

/// Why an operation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureKind {
    /// No card was presented in time; nothing was written.
    NoCard,

    /// The reader or card reported an error.
    Hardware,
}

/// Result of one single-card operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum OperationOutcome {
    Succeeded {
        message: String,
        /// Thread codes, for reads.
        payload: Option<ThreadPair>,
    },
    Failed {
        kind: FailureKind,
        message: String,
    },
}

impl OperationOutcome {
    pub fn succeeded(message: impl Into<String>) -> Self {
        Self::Succeeded {
            message: message.into(),
            payload: None,
        }
    }

    pub fn read(message: impl Into<String>, pair: ThreadPair) -> Self {
        Self::Succeeded {
            message: message.into(),
            payload: Some(pair),
        }
    }

    pub fn no_card() -> Self {
        Self::Failed {
            kind: FailureKind::NoCard,
            message: NO_CARD_MESSAGE.to_string(),
        }
    }

    pub fn hardware(message: impl Into<String>) -> Self {
        Self::Failed {
            kind: FailureKind::Hardware,
            message: message.into(),
        }
    }

    /// Classify a driver error, keeping its message verbatim.
    pub fn from_error(error: &HardwareError) -> Self {
        if error.is_no_card() {
            Self::Failed {
                kind: FailureKind::NoCard,
                message: error.to_string(),
            }
        } else {
            Self::hardware(error.to_string())
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Succeeded { message, .. } | Self::Failed { message, .. } => message,
        }
    }

    pub fn payload(&self) -> Option<&ThreadPair> {
        match self {
            Self::Succeeded { payload, .. } => payload.as_ref(),
            Self::Failed { .. } => None,
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Succeeded { .. } => None,
            Self::Failed { kind, .. } => Some(*kind),
        }
    }

    /// Returns `true` if the payload is a bypass card.
    pub fn is_bypass(&self) -> bool {
        self.payload().is_some_and(ThreadPair::is_bypass)
    }
}

/// Outcome of one batch slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchResult {
    /// 1-based slot number.
    pub index: u32,
    pub outcome: OperationOutcome,
    pub is_bypass: bool,
}

/// Totals and per-slot results of a batch.
///
/// Built while the batch runs and handed out only once it has ended, so a
/// summary seen by a caller never changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    attempted: u32,
    succeeded: u32,
    failed: u32,
    results: Vec<BatchResult>,
}

impl BatchSummary {
    pub(crate) fn record(&mut self, index: u32, outcome: OperationOutcome) {
        self.attempted += 1;
        if outcome.is_success() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }

        let is_bypass = outcome.is_bypass();
        self.results.push(BatchResult {
            index,
            outcome,
            is_bypass,
        });
    }

    pub fn attempted(&self) -> u32 {
        self.attempted
    }

    pub fn succeeded(&self) -> u32 {
        self.succeeded
    }

    pub fn failed(&self) -> u32 {
        self.failed
    }

    /// Results in slot order.
    pub fn results(&self) -> &[BatchResult] {
        &self.results
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }

    /// Successful reads with their slot numbers, in slot order.
    pub fn cards_read(&self) -> impl Iterator<Item = (u32, &ThreadPair)> {
        self.results
            .iter()
            .filter_map(|result| result.outcome.payload().map(|pair| (result.index, pair)))
    }
}

/// A finished batch: summary, narration in emission order, and how it ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchRun {
    pub summary: BatchSummary,
    pub log: Vec<LogEntry>,
    /// The run ended because the operator pressed Stop.
    pub cancelled: bool,
}
