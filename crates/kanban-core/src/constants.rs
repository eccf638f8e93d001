//! Constants shared across the kanban tool.
//!
//! Card layout values are fixed by the machine firmware that reads the
//! kanban cards on the shop floor; changing them makes written cards
//! unreadable by the machines. Timing values are defaults only and can be
//! overridden through the controller configuration.
//!
//! # Usage
//!
//! ```
//! use kanban_core::constants::*;
//!
//! assert_eq!(THREAD_CODE_MAX_LEN, 16);
//! assert_eq!(BLOCK_SIZE, THREAD_CODE_MAX_LEN);
//! assert!(BYPASS_KEYWORD.eq_ignore_ascii_case("bypass"));
//! ```

// ============================================================================
// Thread Codes
// ============================================================================

/// Maximum length of a thread code, in characters.
///
/// Each code is stored in a single 16-byte card block, so this limit is
/// tied to [`BLOCK_SIZE`].
pub const THREAD_CODE_MAX_LEN: usize = 16;

/// Reserved thread1 value marking a bypass card.
///
/// A card whose thread1 matches this keyword (ignoring ASCII case) tells the
/// machine to run without thread verification.
pub const BYPASS_KEYWORD: &str = "BYPASS";

// ============================================================================
// Card Layout (MIFARE Classic 1K)
// ============================================================================

/// Card memory block holding thread1.
pub const BLOCK_THREAD1: u8 = 4;

/// Card memory block holding thread2.
pub const BLOCK_THREAD2: u8 = 5;

/// Size of a MIFARE Classic data block in bytes.
pub const BLOCK_SIZE: usize = 16;

/// Factory default key A for MIFARE Classic sectors.
pub const DEFAULT_KEY_A: [u8; 6] = [0xFF; 6];

// ============================================================================
// Timing Defaults (milliseconds)
// ============================================================================

/// Period of the idle presence poll.
pub const DEFAULT_PRESENCE_POLL_MS: u64 = 500;

/// Period of reader discovery retries while no reader is connected.
pub const DEFAULT_READER_RETRY_MS: u64 = 2_000;

/// How long a single-card operation waits for a card to be presented.
pub const DEFAULT_CARD_WAIT_TIMEOUT_MS: u64 = 10_000;

/// Poll interval while waiting for a card to be removed between batch slots.
pub const DEFAULT_REMOVAL_POLL_MS: u64 = 100;

/// Ceiling of the card-removal wait. Reaching it is not an error.
pub const DEFAULT_REMOVAL_TIMEOUT_MS: u64 = 5_000;

/// Retry tick of the interruptible card wait used by continuous batches.
pub const DEFAULT_CARD_RETRY_MS: u64 = 300;

// ============================================================================
// Batches
// ============================================================================

/// Largest card count an operator may request for a bounded write batch.
pub const MAX_BATCH_SIZE: u32 = 100;

/// Number of cards listed individually in a continuous read summary.
pub const SUMMARY_LISTED_CARDS: usize = 10;
