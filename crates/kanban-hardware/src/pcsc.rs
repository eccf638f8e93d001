//! PC/SC card reader backend.
//!
//! Talks to an ACR122U (or any reader accepting the same pseudo-APDUs)
//! through the platform PC/SC service. Only compiled with the
//! `hardware-pcsc` feature.
//!
//! PC/SC calls are blocking but short; the only long wait, waiting for a
//! card, is done as a loop of single connect attempts separated by
//! `tokio::time::sleep`, so the runtime stays responsive.

use std::ffi::CString;
use std::fmt;
use std::time::Duration;

use kanban_core::ThreadPair;
use kanban_core::constants::{BLOCK_THREAD1, BLOCK_THREAD2, DEFAULT_KEY_A};
use pcsc::{Card, Context, Disposition, Protocols, ReaderState, Scope, ShareMode, State};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::codec::{self, Block, apdu};
use crate::error::{HardwareError, Result};
use crate::traits::{CardRead, CardSession};

/// Default substring used to pick a reader from the PC/SC reader list.
pub const DEFAULT_NAME_FILTER: &str = "ACR122";

/// Default interval between connect attempts while waiting for a card.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// PC/SC backed card session.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use kanban_hardware::pcsc::PcscCardSession;
/// use kanban_hardware::traits::CardSession;
///
/// #[tokio::main]
/// async fn main() -> kanban_hardware::Result<()> {
///     let mut session = PcscCardSession::new()?;
///     println!("{}", session.connect_reader().await?);
///
///     session.wait_for_card(Duration::from_secs(10)).await?;
///     let read = session.read_kanban().await?;
///     println!("{}", read.pair);
///     session.disconnect().await;
///     Ok(())
/// }
/// ```
pub struct PcscCardSession {
    context: Context,
    reader: Option<CString>,
    card: Option<Card>,
    name_filter: String,
    poll_interval: Duration,
}

impl fmt::Debug for PcscCardSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PcscCardSession")
            .field("reader", &self.reader)
            .field("card_connected", &self.card.is_some())
            .field("name_filter", &self.name_filter)
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

impl PcscCardSession {
    /// Establish a PC/SC context.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::Pcsc` if the PC/SC service is unavailable.
    pub fn new() -> Result<Self> {
        let context = Context::establish(Scope::User)?;

        Ok(Self {
            context,
            reader: None,
            card: None,
            name_filter: DEFAULT_NAME_FILTER.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Set the substring used to select a reader by name.
    pub fn with_name_filter(mut self, filter: impl Into<String>) -> Self {
        self.name_filter = filter.into();
        self
    }

    /// Set the interval between connect attempts while waiting for a card.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    fn reader(&self) -> Result<&CString> {
        self.reader
            .as_ref()
            .ok_or_else(|| HardwareError::reader_not_found("reader not connected"))
    }

    fn close_card(&mut self) {
        if let Some(card) = self.card.take()
            && let Err((_, e)) = card.disconnect(Disposition::LeaveCard)
        {
            debug!("Card disconnect failed: {}", e);
        }
    }

    /// Single connect attempt. `Ok(None)` means no card in the field.
    fn connect_card(&self) -> Result<Option<Card>> {
        let reader = self.reader()?;

        match self.context.connect(reader, ShareMode::Shared, Protocols::ANY) {
            Ok(card) => Ok(Some(card)),
            Err(
                pcsc::Error::NoSmartcard | pcsc::Error::RemovedCard | pcsc::Error::UnpoweredCard,
            ) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn connected_card(&self) -> Result<&Card> {
        self.card.as_ref().ok_or(HardwareError::NoCard)
    }

    fn authenticate(card: &Card, block: u8) -> Result<()> {
        transmit(card, &apdu::load_key(&DEFAULT_KEY_A))?;
        transmit(card, &apdu::authenticate(block))
            .map_err(|_| HardwareError::Authentication { block })?;
        Ok(())
    }

    fn write_blocks(&self, blocks: &[(u8, Block)]) -> Result<()> {
        let card = self.connected_card()?;

        for (block, data) in blocks {
            Self::authenticate(card, *block)?;
            transmit(card, &apdu::update_block(*block, data))?;
        }

        Ok(())
    }

    fn read_block(card: &Card, block: u8) -> Result<Block> {
        Self::authenticate(card, block)?;
        let data = transmit(card, &apdu::read_block(block))?;

        Block::try_from(data.as_slice()).map_err(|_| {
            HardwareError::invalid_data(format!(
                "Block {} returned {} bytes",
                block,
                data.len()
            ))
        })
    }
}

/// Send one APDU and return the response data without the status word.
fn transmit(card: &Card, command: &[u8]) -> Result<Vec<u8>> {
    let mut buffer = [0u8; pcsc::MAX_BUFFER_SIZE];
    let response = card.transmit(command, &mut buffer)?;
    Ok(codec::check_status(response)?.to_vec())
}

impl CardSession for PcscCardSession {
    fn has_reader(&self) -> bool {
        self.reader.is_some()
    }

    async fn connect_reader(&mut self) -> Result<String> {
        let readers = self.context.list_readers_owned()?;
        debug!("PC/SC readers: {:?}", readers);

        let filter = self.name_filter.to_lowercase();
        let reader = readers
            .into_iter()
            .find(|name| name.to_string_lossy().to_lowercase().contains(&filter))
            .ok_or_else(|| {
                HardwareError::reader_not_found(format!(
                    "No reader matching '{}' found",
                    self.name_filter
                ))
            })?;

        let message = format!("Connected to reader: {}", reader.to_string_lossy());
        info!("{}", message);
        self.reader = Some(reader);
        Ok(message)
    }

    async fn wait_for_card(&mut self, timeout: Duration) -> Result<String> {
        let deadline = Instant::now() + timeout;

        loop {
            self.close_card();

            if let Some(card) = self.connect_card()? {
                self.card = Some(card);
                let uid = self
                    .read_uid()
                    .await
                    .map(|uid| kanban_core::format_uid(&uid))
                    .unwrap_or_else(|_| "unknown".to_string());
                return Ok(format!("Card detected - UID: {}", uid));
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(HardwareError::timeout(timeout.as_millis() as u64));
            }
            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        }
    }

    async fn try_connect_card(&mut self) -> Result<bool> {
        self.close_card();

        match self.connect_card()? {
            Some(card) => {
                self.card = Some(card);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn check_card_present(&mut self) -> bool {
        let Some(reader) = self.reader.clone() else {
            return false;
        };

        let mut states = [ReaderState::new(reader, State::UNAWARE)];
        match self.context.get_status_change(Duration::ZERO, &mut states) {
            Ok(()) => states[0].event_state().contains(State::PRESENT),
            Err(e) => {
                debug!("Presence check failed: {}", e);
                false
            }
        }
    }

    async fn read_uid(&mut self) -> Result<Vec<u8>> {
        if let Some(card) = &self.card {
            return transmit(card, &apdu::get_uid());
        }

        // Temporary connection, released before returning
        let card = self.connect_card()?.ok_or(HardwareError::NoCard)?;
        let uid = transmit(&card, &apdu::get_uid());
        if let Err((_, e)) = card.disconnect(Disposition::LeaveCard) {
            debug!("UID connection disconnect failed: {}", e);
        }
        uid
    }

    async fn write_kanban(&mut self, pair: &ThreadPair) -> Result<String> {
        let blocks = codec::encode_pair(pair)?;
        self.write_blocks(&blocks)?;
        Ok("Kanban card written successfully".to_string())
    }

    async fn read_kanban(&mut self) -> Result<CardRead> {
        let card = self.connected_card()?;
        let thread1 = Self::read_block(card, BLOCK_THREAD1)?;
        let thread2 = Self::read_block(card, BLOCK_THREAD2)?;

        Ok(CardRead::new(
            codec::decode_pair(&thread1, &thread2),
            "Kanban card read successfully",
        ))
    }

    async fn write_bypass(&mut self) -> Result<String> {
        let blocks = codec::encode_pair(&ThreadPair::bypass())?;
        self.write_blocks(&blocks)?;
        Ok("Bypass card written successfully".to_string())
    }

    async fn clear_card(&mut self) -> Result<String> {
        let blank = Block::default();
        self.write_blocks(&[(BLOCK_THREAD1, blank), (BLOCK_THREAD2, blank)])?;
        Ok("Card cleared successfully".to_string())
    }

    async fn disconnect(&mut self) {
        self.close_card();
    }
}

impl Drop for PcscCardSession {
    fn drop(&mut self) {
        if self.card.is_some() {
            warn!("Card connection still open on drop, releasing");
            self.close_card();
        }
    }
}
