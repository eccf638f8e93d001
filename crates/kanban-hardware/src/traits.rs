//! Hardware session trait definition.
//!
//! This module defines the contract between the card session controller and a
//! card reader. A session owns at most one reader and, transiently, one card
//! connection. The controller never inspects the reader handle; it only asks
//! whether one exists and forwards calls.
//!
//! All methods use native `async fn` (Rust 1.90 + Edition 2024 RPITIT),
//! eliminating the need for the `async_trait` macro.

#![allow(async_fn_in_trait)]

use std::time::Duration;

use kanban_core::ThreadPair;

use crate::error::Result;

/// Thread codes read back from a card, with the driver's status message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardRead {
    /// Decoded thread codes. Both are empty for a cleared card.
    pub pair: ThreadPair,

    /// Human-readable status reported by the driver.
    pub message: String,
}

impl CardRead {
    pub fn new(pair: ThreadPair, message: impl Into<String>) -> Self {
        Self {
            pair,
            message: message.into(),
        }
    }
}

/// Card reader session abstraction.
///
/// # Object Safety and Dynamic Dispatch
///
/// **NOTE**: This trait is NOT object-safe because `async fn` methods return
/// `impl Future`. Use generic type parameters, or the
/// [`AnyCardSession`](crate::devices::AnyCardSession) enum when the backend
/// is chosen at runtime.
///
/// # Connection Model
///
/// - [`wait_for_card`](CardSession::wait_for_card) and
///   [`try_connect_card`](CardSession::try_connect_card) open a card
///   connection.
/// - The four data operations require an open connection and fail with
///   [`HardwareError::NoCard`](crate::HardwareError::NoCard) otherwise.
/// - [`disconnect`](CardSession::disconnect) closes it and is idempotent.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use kanban_core::ThreadPair;
/// use kanban_hardware::traits::CardSession;
/// use kanban_hardware::Result;
///
/// async fn write_one<S: CardSession>(session: &mut S, pair: &ThreadPair) -> Result<String> {
///     session.wait_for_card(Duration::from_secs(10)).await?;
///     let result = session.write_kanban(pair).await;
///     session.disconnect().await;
///     result
/// }
/// ```
pub trait CardSession: Send + Sync {
    /// Whether a reader handle currently exists.
    fn has_reader(&self) -> bool;

    /// Discover and connect to a reader.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::ReaderNotFound` if no suitable reader exists.
    async fn connect_reader(&mut self) -> Result<String>;

    /// Wait up to `timeout` for a card and connect to it.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::Timeout` if no card was presented in time, or
    /// `HardwareError::ReaderNotFound` if there is no reader.
    async fn wait_for_card(&mut self, timeout: Duration) -> Result<String>;

    /// Make a single connection attempt.
    ///
    /// Any stale card connection is closed first. Returns `Ok(false)` when no
    /// card is in the field.
    ///
    /// # Errors
    ///
    /// Returns an error for reader failures other than "no card".
    async fn try_connect_card(&mut self) -> Result<bool>;

    /// Check whether a card is in the reader field.
    ///
    /// Failures are reported as "not present".
    async fn check_card_present(&mut self) -> bool;

    /// Read the UID of the card in the field.
    ///
    /// Works with or without an open card connection.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no card or the reader rejects the command.
    async fn read_uid(&mut self) -> Result<Vec<u8>>;

    /// Write both thread codes to the connected card.
    async fn write_kanban(&mut self, pair: &ThreadPair) -> Result<String>;

    /// Read both thread codes from the connected card.
    async fn read_kanban(&mut self) -> Result<CardRead>;

    /// Write the bypass keyword to the connected card.
    async fn write_bypass(&mut self) -> Result<String>;

    /// Erase both thread blocks on the connected card.
    async fn clear_card(&mut self) -> Result<String>;

    /// Close the card connection, if any.
    async fn disconnect(&mut self);
}
