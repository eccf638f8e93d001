use thiserror::Error;

use crate::constants::THREAD_CODE_MAX_LEN;

#[derive(Error, Debug)]
pub enum Error {
    // Validation errors
    #[error("Thread code must not be empty")]
    EmptyThreadCode,

    #[error("Thread code must be {max} characters or less, got {len}", max = THREAD_CODE_MAX_LEN)]
    ThreadCodeTooLong { len: usize },

    #[error("Thread code must be printable ASCII: {0:?}")]
    NonPrintableThreadCode(String),

    #[error("Batch size must be 1-{max}, got {size}")]
    InvalidBatchSize { size: u32, max: u32 },

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
