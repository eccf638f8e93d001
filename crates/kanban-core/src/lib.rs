//! Core types for the thread verification kanban tool.
//!
//! Kanban cards carry two short thread codes identifying the production
//! threads a sewing machine must be loaded with. This crate holds the
//! validated domain types, the bypass-card rules and the error taxonomy
//! shared by the hardware and controller crates.

pub mod constants;
pub mod error;
pub mod types;

pub use constants::BYPASS_KEYWORD;
pub use error::{Error, Result};
pub use types::*;
