//! Common test utilities for reader integration tests.

#![allow(dead_code)]

use std::time::Duration;

use kanban_hardware::CardSession;
use kanban_hardware::mock::{MockCardSession, MockReaderHandle};

/// UID of the card most tests present.
pub const TEST_UID: [u8; 4] = [0x04, 0xA1, 0xB2, 0xC3];

/// Card wait used by the tests, matching the operator default.
pub const CARD_WAIT: Duration = Duration::from_secs(10);

/// Create a mock reader that has already been connected.
pub async fn connected_reader() -> (MockCardSession, MockReaderHandle) {
    let (mut reader, handle) = MockCardSession::new();
    reader
        .connect_reader()
        .await
        .expect("mock reader should connect");
    (reader, handle)
}

/// Present the test card and open a connection to it.
pub async fn present_and_connect(reader: &mut MockCardSession, handle: &MockReaderHandle) {
    handle.present_card(TEST_UID.to_vec());
    reader
        .wait_for_card(CARD_WAIT)
        .await
        .expect("presented card should connect");
}
