//! Reader and card errors.
//!
//! Display strings of these errors are shown to the operator verbatim as the
//! failure message of a card operation.

/// Result of a reader or card call.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Failure of a reader or card call.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// No reader is attached, or the reader was never connected.
    #[error("Reader not found: {message}")]
    ReaderNotFound { message: String },

    /// The card left the field while connected.
    #[error("Card disconnected: {reason}")]
    Disconnected { reason: String },

    /// An operation needed a connected card and there was none.
    #[error("No card connected")]
    NoCard,

    /// No card was presented before the wait ceiling.
    #[error("No card detected within {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Card rejected the sector key.
    #[error("Authentication failed for block {block}")]
    Authentication { block: u8 },

    /// Reader returned a non-success status word.
    #[error("Card returned status {sw1:02X}{sw2:02X}")]
    Status { sw1: u8, sw2: u8 },

    /// Transmit failed or the card stopped answering.
    #[error("Communication error: {message}")]
    CommunicationError { message: String },

    /// A block or response did not have the expected shape.
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// Error reported by the PC/SC subsystem.
    #[cfg(feature = "hardware-pcsc")]
    #[error("PC/SC error: {0}")]
    Pcsc(#[from] pcsc::Error),
}

impl HardwareError {
    pub fn reader_not_found(message: impl Into<String>) -> Self {
        Self::ReaderNotFound {
            message: message.into(),
        }
    }

    pub fn disconnected(reason: impl Into<String>) -> Self {
        Self::Disconnected {
            reason: reason.into(),
        }
    }

    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }

    pub fn communication(message: impl Into<String>) -> Self {
        Self::CommunicationError {
            message: message.into(),
        }
    }

    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    /// Returns `true` when the error means "no card was there".
    pub fn is_no_card(&self) -> bool {
        matches!(self, Self::NoCard | Self::Timeout { .. })
    }
}
