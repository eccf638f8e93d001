use crate::{
    Result,
    constants::{BYPASS_KEYWORD, MAX_BATCH_SIZE, THREAD_CODE_MAX_LEN},
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Operator-entered thread code (1-16 printable ASCII characters).
///
/// Codes are trimmed before validation, so `" TH-001 "` becomes `"TH-001"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ThreadCode(String);

impl ThreadCode {
    /// Create a new thread code with validation.
    ///
    /// # Errors
    /// Returns a validation error if the trimmed code is empty, longer than
    /// 16 characters, or contains anything other than printable ASCII and
    /// spaces.
    pub fn new(code: &str) -> Result<Self> {
        let code = code.trim();

        if code.is_empty() {
            return Err(Error::EmptyThreadCode);
        }

        let len = code.chars().count();
        if len > THREAD_CODE_MAX_LEN {
            return Err(Error::ThreadCodeTooLong { len });
        }

        // One byte per character, and a NUL would end the block early
        if code.chars().any(|c| !c.is_ascii_graphic() && c != ' ') {
            return Err(Error::NonPrintableThreadCode(code.to_string()));
        }

        Ok(ThreadCode(code.to_string()))
    }

    /// Get the thread code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if this code is the bypass keyword.
    #[must_use]
    pub fn is_bypass(&self) -> bool {
        is_bypass_code(&self.0)
    }
}

impl fmt::Display for ThreadCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ThreadCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ThreadCode::new(s)
    }
}

impl TryFrom<String> for ThreadCode {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        ThreadCode::new(&value)
    }
}

impl From<ThreadCode> for String {
    fn from(code: ThreadCode) -> Self {
        code.0
    }
}

/// Case-insensitive comparison against [`BYPASS_KEYWORD`].
///
/// # Examples
///
/// ```
/// use kanban_core::is_bypass_code;
///
/// assert!(is_bypass_code("bypass"));
/// assert!(is_bypass_code("ByPaSs"));
/// assert!(!is_bypass_code("TH-001"));
/// ```
#[must_use]
pub fn is_bypass_code(thread1: &str) -> bool {
    thread1.trim().eq_ignore_ascii_case(BYPASS_KEYWORD)
}

/// The two thread codes stored on a kanban card.
///
/// Values read back from a card are kept as raw strings: a cleared card
/// yields two empty codes, which would not pass [`ThreadCode`] validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadPair {
    pub thread1: String,
    pub thread2: String,
}

impl ThreadPair {
    /// Create a pair from raw strings without validation.
    pub fn new(thread1: impl Into<String>, thread2: impl Into<String>) -> Self {
        Self {
            thread1: thread1.into(),
            thread2: thread2.into(),
        }
    }

    /// Create a pair from operator input, validating both codes.
    ///
    /// # Errors
    /// Returns the first validation error found, checking thread1 first.
    pub fn validated(thread1: &str, thread2: &str) -> Result<Self> {
        let thread1 = ThreadCode::new(thread1)?;
        let thread2 = ThreadCode::new(thread2)?;
        Ok(Self::from_codes(thread1, thread2))
    }

    /// Create a pair from already validated codes.
    pub fn from_codes(thread1: ThreadCode, thread2: ThreadCode) -> Self {
        Self {
            thread1: thread1.into(),
            thread2: thread2.into(),
        }
    }

    /// The pair written to bypass cards.
    pub fn bypass() -> Self {
        Self::new(BYPASS_KEYWORD, "")
    }

    /// Returns `true` if thread1 is the bypass keyword.
    #[must_use]
    pub fn is_bypass(&self) -> bool {
        is_bypass_code(&self.thread1)
    }

    /// Returns `true` if both codes are empty (a cleared card).
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.thread1.is_empty() && self.thread2.is_empty()
    }
}

impl fmt::Display for ThreadPair {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_bypass() {
            write!(f, "BYPASS CARD")
        } else {
            write!(f, "{} / {}", self.thread1, self.thread2)
        }
    }
}

/// Number of cards requested for a bounded batch (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BatchSize(u32);

impl BatchSize {
    /// Create a batch size with validation against an upper bound.
    ///
    /// # Errors
    /// Returns `Error::InvalidBatchSize` if `size` is 0 or above `max`.
    pub fn with_max(size: u32, max: u32) -> Result<Self> {
        if size == 0 || size > max {
            return Err(Error::InvalidBatchSize { size, max });
        }
        Ok(BatchSize(size))
    }

    /// Create a batch size bounded by [`MAX_BATCH_SIZE`].
    ///
    /// # Errors
    /// Returns `Error::InvalidBatchSize` if `size` is outside 1-100.
    pub fn new(size: u32) -> Result<Self> {
        Self::with_max(size, MAX_BATCH_SIZE)
    }

    #[must_use]
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for BatchSize {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Format a card UID as upper-case hex bytes separated by spaces.
///
/// # Examples
///
/// ```
/// use kanban_core::format_uid;
///
/// assert_eq!(format_uid(&[0x04, 0xA1, 0xB2, 0xC3]), "04 A1 B2 C3");
/// ```
#[must_use]
pub fn format_uid(uid: &[u8]) -> String {
    uid.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
