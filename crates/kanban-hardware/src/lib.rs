//! Card reader abstraction layer for the kanban card tool.
//!
//! This crate defines the [`CardSession`] contract the session controller
//! drives, the block codec used to store thread codes on MIFARE Classic
//! cards, and two backends:
//!
//! - [`mock::MockCardSession`]: a simulated reader with a scriptable field,
//!   fault injection and call counters, used by tests and `--simulate`.
//! - `pcsc::PcscCardSession`: an ACR122U over PC/SC, behind the
//!   `hardware-pcsc` feature.
//!
//! # Design
//!
//! - **Async-first**: native `async fn` in traits (Rust 1.90 + Edition 2024).
//! - **Enum dispatch**: [`devices::AnyCardSession`] selects a backend at
//!   runtime without trait objects.
//! - **Error-aware**: every fallible call returns [`Result<T>`] with a
//!   [`HardwareError`] describing what went wrong.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use kanban_core::ThreadPair;
//! use kanban_hardware::{CardSession, Result};
//!
//! async fn write_one<S: CardSession>(session: &mut S) -> Result<String> {
//!     session.wait_for_card(Duration::from_secs(10)).await?;
//!     let result = session.write_kanban(&ThreadPair::new("TH-001", "TH-RED-100")).await;
//!     session.disconnect().await;
//!     result
//! }
//! ```

pub mod codec;
pub mod devices;
pub mod error;
pub mod mock;
#[cfg(feature = "hardware-pcsc")]
pub mod pcsc;
pub mod traits;

pub use devices::AnyCardSession;
pub use error::{HardwareError, Result};
pub use traits::{CardRead, CardSession};
