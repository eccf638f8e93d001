//! Card session controller for the kanban card tool.
//!
//! This crate coordinates one card reader between a background presence
//! monitor and foreground operator commands:
//!
//! - [`SessionController`]: presence monitor, busy gate, single-card
//!   operations and batch runs.
//! - [`Operator`]: input validation and per-command dialogs.
//! - [`display::OperatorDisplay`]: the contract a front end implements.
//!
//! Failures never escape as errors once hardware is involved. Every card
//! operation ends in an [`OperationOutcome`], and batches return a
//! [`BatchRun`] with per-slot results and the narration that was shown.
//!
//! # Scheduling
//!
//! The controller is meant to run on a single-threaded runtime: the
//! presence monitor is a local task and operator commands are awaited from
//! the input loop. Waits yield at every retry tick, so the Stop control
//! stays responsive during a batch.

pub mod batch;
pub mod commands;
pub mod config;
pub mod controller;
pub mod display;
pub mod outcome;
pub mod state;

pub use batch::ContinuousMode;
pub use commands::Operator;
pub use config::ControllerConfig;
pub use controller::{CardOp, SessionController};
pub use display::{LogEntry, LogLevel, OperatorDisplay};
pub use outcome::{BatchResult, BatchRun, BatchSummary, FailureKind, OperationOutcome};
pub use state::{BusyGuard, CancelSignal, PresenceState, SessionFlags};
