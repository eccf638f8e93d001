//! Enum wrapper for card session dispatch.
//!
//! Native `async fn` in traits is not object-safe, so `Box<dyn CardSession>`
//! is not available. [`AnyCardSession`] provides concrete dispatch over the
//! compiled-in backends instead, which lets the binary pick a backend at
//! runtime and still hand a single concrete type to the controller.
//!
//! # Examples
//!
//! ```
//! use kanban_hardware::devices::AnyCardSession;
//! use kanban_hardware::mock::MockCardSession;
//!
//! let (reader, _handle) = MockCardSession::new();
//! let session = AnyCardSession::Mock(reader);
//! assert_eq!(session.backend(), "simulated");
//! ```

use std::time::Duration;

use kanban_core::ThreadPair;

use crate::Result;
use crate::mock::MockCardSession;
#[cfg(feature = "hardware-pcsc")]
use crate::pcsc::PcscCardSession;
use crate::traits::{CardRead, CardSession};

/// Card session backend selected at runtime.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyCardSession {
    /// Simulated reader for development and testing.
    Mock(MockCardSession),

    /// PC/SC reader (ACR122U and compatibles).
    #[cfg(feature = "hardware-pcsc")]
    Pcsc(PcscCardSession),
}

impl AnyCardSession {
    /// Short backend name for status output.
    pub fn backend(&self) -> &'static str {
        match self {
            Self::Mock(_) => "simulated",
            #[cfg(feature = "hardware-pcsc")]
            Self::Pcsc(_) => "pcsc",
        }
    }
}

impl From<MockCardSession> for AnyCardSession {
    fn from(session: MockCardSession) -> Self {
        Self::Mock(session)
    }
}

#[cfg(feature = "hardware-pcsc")]
impl From<PcscCardSession> for AnyCardSession {
    fn from(session: PcscCardSession) -> Self {
        Self::Pcsc(session)
    }
}

/// Forward a trait call to whichever backend is active.
macro_rules! dispatch {
    ($self:ident, $session:ident => $call:expr) => {
        match $self {
            Self::Mock($session) => $call,
            #[cfg(feature = "hardware-pcsc")]
            Self::Pcsc($session) => $call,
        }
    };
}

impl CardSession for AnyCardSession {
    fn has_reader(&self) -> bool {
        dispatch!(self, session => session.has_reader())
    }

    async fn connect_reader(&mut self) -> Result<String> {
        dispatch!(self, session => session.connect_reader().await)
    }

    async fn wait_for_card(&mut self, timeout: Duration) -> Result<String> {
        dispatch!(self, session => session.wait_for_card(timeout).await)
    }

    async fn try_connect_card(&mut self) -> Result<bool> {
        dispatch!(self, session => session.try_connect_card().await)
    }

    async fn check_card_present(&mut self) -> bool {
        dispatch!(self, session => session.check_card_present().await)
    }

    async fn read_uid(&mut self) -> Result<Vec<u8>> {
        dispatch!(self, session => session.read_uid().await)
    }

    async fn write_kanban(&mut self, pair: &ThreadPair) -> Result<String> {
        dispatch!(self, session => session.write_kanban(pair).await)
    }

    async fn read_kanban(&mut self) -> Result<CardRead> {
        dispatch!(self, session => session.read_kanban().await)
    }

    async fn write_bypass(&mut self) -> Result<String> {
        dispatch!(self, session => session.write_bypass().await)
    }

    async fn clear_card(&mut self) -> Result<String> {
        dispatch!(self, session => session.clear_card().await)
    }

    async fn disconnect(&mut self) {
        dispatch!(self, session => session.disconnect().await)
    }
}
