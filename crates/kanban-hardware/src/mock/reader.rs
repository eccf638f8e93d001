//! Mock card reader implementation for testing and development.
//!
//! This module provides a simulated reader whose field, card memory and
//! failure behaviour are controlled through a [`MockReaderHandle`]. Card
//! contents are stored as raw blocks and go through the same codec as the
//! PC/SC reader, so a write followed by a read exercises the real encoding.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use kanban_core::constants::{BLOCK_THREAD1, BLOCK_THREAD2};
use kanban_core::{ThreadPair, format_uid};
use tokio::time::Instant;
use tracing::debug;

use crate::codec::{self, Block};
use crate::error::{HardwareError, Result};
use crate::traits::{CardRead, CardSession};

/// Default interval between field polls while waiting for a card.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// One step of a scripted operator.
///
/// Entries are consumed whenever a card wait finds the field empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presentation {
    /// Place the card with this UID on the reader.
    Card(Vec<u8>),

    /// Keep the field empty for this long, starting when the entry is reached.
    Absent(Duration),
}

/// Call counters recorded by the mock reader.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MockStats {
    /// Card connections opened.
    pub connects: usize,

    /// Card connections closed.
    pub disconnects: usize,

    /// Write attempts (kanban and bypass).
    pub writes: usize,

    /// Read attempts.
    pub reads: usize,

    /// Clear attempts.
    pub clears: usize,

    /// Presence checks.
    pub presence_checks: usize,

    /// UID reads.
    pub uid_reads: usize,
}

#[derive(Debug, Default)]
struct Faults {
    write: Option<String>,
    read: Option<String>,
    clear: Option<String>,
    uid: bool,
}

#[derive(Debug)]
struct MockState {
    /// Reader is plugged in.
    attached: bool,

    /// `connect_reader` succeeded.
    reader_connected: bool,

    /// Card memory by UID.
    cards: HashMap<Vec<u8>, HashMap<u8, Block>>,

    /// Card currently in the field.
    field: Option<Vec<u8>>,

    /// Card currently connected.
    connected: Option<Vec<u8>>,

    script: VecDeque<Presentation>,
    absent_until: Option<Instant>,

    /// Card leaves the field when its connection is closed.
    auto_remove: bool,

    faults: Faults,
    stats: MockStats,
}

impl MockState {
    fn new() -> Self {
        Self {
            attached: true,
            reader_connected: false,
            cards: HashMap::new(),
            field: None,
            connected: None,
            script: VecDeque::new(),
            absent_until: None,
            auto_remove: false,
            faults: Faults::default(),
            stats: MockStats::default(),
        }
    }

    fn require_reader(&self) -> Result<()> {
        if self.reader_connected && self.attached {
            Ok(())
        } else {
            Err(HardwareError::reader_not_found("mock reader not connected"))
        }
    }

    /// Returns `true` if a card is in the field, advancing the script if not.
    fn poll_field(&mut self, now: Instant) -> bool {
        if self.field.is_some() {
            return true;
        }

        if let Some(until) = self.absent_until {
            if now < until {
                return false;
            }
            self.absent_until = None;
        }

        match self.script.pop_front() {
            Some(Presentation::Card(uid)) => {
                self.cards.entry(uid.clone()).or_default();
                self.field = Some(uid);
                true
            }
            Some(Presentation::Absent(duration)) => {
                self.absent_until = Some(now + duration);
                false
            }
            None => false,
        }
    }

    fn connect_field(&mut self) -> Option<Vec<u8>> {
        let uid = self.field.clone()?;
        self.connected = Some(uid.clone());
        self.stats.connects += 1;
        Some(uid)
    }

    fn close(&mut self) {
        if self.connected.take().is_some() {
            self.stats.disconnects += 1;
            if self.auto_remove {
                self.field = None;
            }
        }
    }

    /// UID of the connected card, if it is still in the field.
    fn connected_card(&self) -> Result<Vec<u8>> {
        match (&self.connected, &self.field) {
            (Some(connected), Some(field)) if connected == field => Ok(connected.clone()),
            (Some(_), _) => Err(HardwareError::disconnected("card left the field")),
            (None, _) => Err(HardwareError::NoCard),
        }
    }

    fn store(&mut self, uid: &[u8], blocks: [(u8, Block); 2]) {
        let memory = self.cards.entry(uid.to_vec()).or_default();
        for (block, data) in blocks {
            memory.insert(block, data);
        }
    }

    fn load(&self, uid: &[u8], block: u8) -> Block {
        self.cards
            .get(uid)
            .and_then(|memory| memory.get(&block))
            .copied()
            .unwrap_or_default()
    }
}

/// Mock card reader for testing and development.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use kanban_core::ThreadPair;
/// use kanban_hardware::mock::MockCardSession;
/// use kanban_hardware::traits::CardSession;
///
/// #[tokio::main]
/// async fn main() -> kanban_hardware::Result<()> {
///     let (mut reader, handle) = MockCardSession::new();
///     reader.connect_reader().await?;
///
///     handle.present_card(vec![0x04, 0xAB, 0xCD, 0xEF]);
///     reader.wait_for_card(Duration::from_secs(1)).await?;
///     reader.write_kanban(&ThreadPair::new("TH-001", "TH-RED-100")).await?;
///
///     let read = reader.read_kanban().await?;
///     assert_eq!(read.pair.thread1, "TH-001");
///
///     reader.disconnect().await;
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockCardSession {
    state: Arc<Mutex<MockState>>,
    name: String,
    poll_interval: Duration,
}

impl MockCardSession {
    /// Create a new mock reader with the default name.
    ///
    /// The reader starts attached but not connected; call
    /// [`connect_reader`](CardSession::connect_reader) first.
    pub fn new() -> (Self, MockReaderHandle) {
        Self::with_name("Mock ACR122U PICC Interface")
    }

    /// Create a new mock reader with a custom name.
    pub fn with_name(name: impl Into<String>) -> (Self, MockReaderHandle) {
        let state = Arc::new(Mutex::new(MockState::new()));

        let reader = Self {
            state: Arc::clone(&state),
            name: name.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        };

        (reader, MockReaderHandle { state })
    }

    /// Set the interval between field polls while waiting for a card.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        lock_state(&self.state)
    }
}

impl CardSession for MockCardSession {
    fn has_reader(&self) -> bool {
        let state = self.lock();
        state.reader_connected && state.attached
    }

    async fn connect_reader(&mut self) -> Result<String> {
        let mut state = self.lock();
        if !state.attached {
            state.reader_connected = false;
            return Err(HardwareError::reader_not_found("no readers available"));
        }
        state.reader_connected = true;
        Ok(format!("Connected to reader: {}", self.name))
    }

    async fn wait_for_card(&mut self, timeout: Duration) -> Result<String> {
        let deadline = Instant::now() + timeout;

        loop {
            {
                let mut state = self.lock();
                state.require_reader()?;
                state.close();

                if state.poll_field(Instant::now())
                    && let Some(uid) = state.connect_field()
                {
                    return Ok(format!("Card detected - UID: {}", format_uid(&uid)));
                }
            }

            let now = Instant::now();
            if now >= deadline {
                debug!("No card presented within {}ms", timeout.as_millis());
                return Err(HardwareError::timeout(timeout.as_millis() as u64));
            }
            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        }
    }

    async fn try_connect_card(&mut self) -> Result<bool> {
        let mut state = self.lock();
        state.require_reader()?;
        state.close();

        if state.poll_field(Instant::now()) {
            Ok(state.connect_field().is_some())
        } else {
            Ok(false)
        }
    }

    async fn check_card_present(&mut self) -> bool {
        let mut state = self.lock();
        state.stats.presence_checks += 1;
        state.attached && state.field.is_some()
    }

    async fn read_uid(&mut self) -> Result<Vec<u8>> {
        let mut state = self.lock();
        state.require_reader()?;
        state.stats.uid_reads += 1;

        if state.faults.uid {
            return Err(HardwareError::Status {
                sw1: 0x63,
                sw2: 0x00,
            });
        }

        state.field.clone().ok_or(HardwareError::NoCard)
    }

    async fn write_kanban(&mut self, pair: &ThreadPair) -> Result<String> {
        let mut state = self.lock();
        state.stats.writes += 1;
        let uid = state.connected_card()?;

        if let Some(message) = state.faults.write.take() {
            return Err(HardwareError::communication(message));
        }

        let blocks = codec::encode_pair(pair)?;
        state.store(&uid, blocks);
        Ok("Kanban card written successfully".to_string())
    }

    async fn read_kanban(&mut self) -> Result<CardRead> {
        let mut state = self.lock();
        state.stats.reads += 1;
        let uid = state.connected_card()?;

        if let Some(message) = state.faults.read.take() {
            return Err(HardwareError::communication(message));
        }

        let pair = codec::decode_pair(
            &state.load(&uid, BLOCK_THREAD1),
            &state.load(&uid, BLOCK_THREAD2),
        );
        Ok(CardRead::new(pair, "Kanban card read successfully"))
    }

    async fn write_bypass(&mut self) -> Result<String> {
        self.write_kanban(&ThreadPair::bypass()).await?;
        Ok("Bypass card written successfully".to_string())
    }

    async fn clear_card(&mut self) -> Result<String> {
        let mut state = self.lock();
        state.stats.clears += 1;
        let uid = state.connected_card()?;

        if let Some(message) = state.faults.clear.take() {
            return Err(HardwareError::communication(message));
        }

        let blank = Block::default();
        state.store(&uid, [(BLOCK_THREAD1, blank), (BLOCK_THREAD2, blank)]);
        Ok("Card cleared successfully".to_string())
    }

    async fn disconnect(&mut self) {
        self.lock().close();
    }
}

fn lock_state(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Handle for controlling a mock card reader.
///
/// The handle plays the operator: it places and removes cards, scripts a
/// sequence of presentations, plugs the reader in and out, and injects
/// driver failures. Clones share the same reader.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use kanban_hardware::mock::{MockCardSession, Presentation};
///
/// let (_reader, handle) = MockCardSession::new();
/// handle.script([
///     Presentation::Card(vec![0x01, 0x02, 0x03, 0x04]),
///     Presentation::Absent(Duration::from_secs(11)),
///     Presentation::Card(vec![0x05, 0x06, 0x07, 0x08]),
/// ]);
/// handle.set_auto_remove(true);
/// ```
#[derive(Debug, Clone)]
pub struct MockReaderHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockReaderHandle {
    fn lock(&self) -> MutexGuard<'_, MockState> {
        lock_state(&self.state)
    }

    /// Register a blank card without presenting it.
    pub fn add_card(&self, uid: Vec<u8>) {
        self.lock().cards.entry(uid).or_default();
    }

    /// Register a card with thread codes already written.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::InvalidData` if a code does not fit a block.
    pub fn add_written_card(&self, uid: Vec<u8>, pair: &ThreadPair) -> Result<()> {
        let blocks = codec::encode_pair(pair)?;
        self.lock().store(&uid, blocks);
        Ok(())
    }

    /// Place a card on the reader, registering it if unknown.
    pub fn present_card(&self, uid: Vec<u8>) {
        let mut state = self.lock();
        state.cards.entry(uid.clone()).or_default();
        state.field = Some(uid);
    }

    /// Take the card off the reader.
    pub fn remove_card(&self) {
        self.lock().field = None;
    }

    /// Queue scripted presentations, consumed by card waits.
    pub fn script(&self, presentations: impl IntoIterator<Item = Presentation>) {
        self.lock().script.extend(presentations);
    }

    /// Number of scripted presentations not yet consumed.
    pub fn pending_presentations(&self) -> usize {
        self.lock().script.len()
    }

    /// Make the card leave the field whenever its connection is closed.
    pub fn set_auto_remove(&self, enabled: bool) {
        self.lock().auto_remove = enabled;
    }

    /// Unplug the reader.
    pub fn detach_reader(&self) {
        let mut state = self.lock();
        state.attached = false;
        state.reader_connected = false;
        state.connected = None;
    }

    /// Plug the reader back in. It still needs `connect_reader`.
    pub fn attach_reader(&self) {
        self.lock().attached = true;
    }

    /// Fail the next write with a communication error.
    pub fn fail_next_write(&self, message: impl Into<String>) {
        self.lock().faults.write = Some(message.into());
    }

    /// Fail the next read with a communication error.
    pub fn fail_next_read(&self, message: impl Into<String>) {
        self.lock().faults.read = Some(message.into());
    }

    /// Fail the next clear with a communication error.
    pub fn fail_next_clear(&self, message: impl Into<String>) {
        self.lock().faults.clear = Some(message.into());
    }

    /// Make every UID read fail until turned off.
    pub fn fail_uid_reads(&self, enabled: bool) {
        self.lock().faults.uid = enabled;
    }

    /// Thread codes currently stored on a card.
    pub fn card_contents(&self, uid: &[u8]) -> Option<ThreadPair> {
        let state = self.lock();
        state.cards.contains_key(uid).then(|| {
            codec::decode_pair(
                &state.load(uid, BLOCK_THREAD1),
                &state.load(uid, BLOCK_THREAD2),
            )
        })
    }

    /// Check if a card is in the field.
    pub fn is_card_presented(&self) -> bool {
        self.lock().field.is_some()
    }

    /// Check if a card connection is open.
    pub fn is_connected(&self) -> bool {
        self.lock().connected.is_some()
    }

    /// Snapshot of the call counters.
    pub fn stats(&self) -> MockStats {
        self.lock().stats
    }
}
