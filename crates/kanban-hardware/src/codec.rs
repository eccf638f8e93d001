//! Card block codec and ACR122U command builders.
//!
//! Thread codes are stored one per MIFARE Classic block, ASCII, padded with
//! zero bytes to [`BLOCK_SIZE`]:
//!
//! ```text
//! block 4: 54 48 2D 30 30 31 00 00 00 00 00 00 00 00 00 00   "TH-001"
//! block 5: 54 48 2D 52 45 44 2D 31 30 30 00 00 00 00 00 00   "TH-RED-100"
//! ```
//!
//! The ACR122U exposes card memory through PC/SC pseudo-APDUs (class `FF`).
//! Every response ends with a two-byte status word, `90 00` on success.
//!
//! # Examples
//!
//! ```
//! use kanban_hardware::codec::{decode_block, encode_block};
//!
//! let block = encode_block("TH-001").unwrap();
//! assert_eq!(&block[..6], b"TH-001");
//! assert_eq!(decode_block(&block), "TH-001");
//! ```

use kanban_core::ThreadPair;
use kanban_core::constants::{BLOCK_SIZE, BLOCK_THREAD1, BLOCK_THREAD2};

use crate::error::{HardwareError, Result};

/// A single card data block.
pub type Block = [u8; BLOCK_SIZE];

/// Success status word.
pub const SW_SUCCESS: [u8; 2] = [0x90, 0x00];

/// Encode a thread code into a zero-padded block.
///
/// # Errors
///
/// Returns `HardwareError::InvalidData` if the code is longer than a block
/// or contains anything other than printable ASCII and spaces.
pub fn encode_block(code: &str) -> Result<Block> {
    let bytes = code.as_bytes();

    if bytes.len() > BLOCK_SIZE {
        return Err(HardwareError::invalid_data(format!(
            "Thread code '{}' exceeds {} bytes",
            code, BLOCK_SIZE
        )));
    }

    if bytes.iter().any(|&b| !b.is_ascii_graphic() && b != b' ') {
        return Err(HardwareError::invalid_data(format!(
            "Thread code '{}' must be printable ASCII",
            code.escape_default()
        )));
    }

    let mut block = [0u8; BLOCK_SIZE];
    block[..bytes.len()].copy_from_slice(bytes);
    Ok(block)
}

/// Decode a block back into a thread code.
///
/// Reading stops at the first zero byte; surrounding whitespace is trimmed.
/// Bytes that are not valid UTF-8 are replaced rather than rejected.
pub fn decode_block(block: &[u8]) -> String {
    let end = block.iter().position(|&b| b == 0).unwrap_or(block.len());
    String::from_utf8_lossy(&block[..end]).trim().to_string()
}

/// Encode both thread codes, returning `(block, data)` pairs in write order.
///
/// # Errors
///
/// Returns `HardwareError::InvalidData` if either code does not fit.
pub fn encode_pair(pair: &ThreadPair) -> Result<[(u8, Block); 2]> {
    Ok([
        (BLOCK_THREAD1, encode_block(&pair.thread1)?),
        (BLOCK_THREAD2, encode_block(&pair.thread2)?),
    ])
}

/// Decode a pair from the two thread blocks.
pub fn decode_pair(thread1: &[u8], thread2: &[u8]) -> ThreadPair {
    ThreadPair::new(decode_block(thread1), decode_block(thread2))
}

/// Split a reader response into data and status word, failing on non-9000.
///
/// # Errors
///
/// Returns `HardwareError::InvalidData` for responses shorter than two bytes
/// and `HardwareError::Status` for any status other than `90 00`.
pub fn check_status(response: &[u8]) -> Result<&[u8]> {
    if response.len() < 2 {
        return Err(HardwareError::invalid_data(format!(
            "Response too short: {} bytes",
            response.len()
        )));
    }

    let (data, sw) = response.split_at(response.len() - 2);
    if sw != SW_SUCCESS {
        return Err(HardwareError::Status {
            sw1: sw[0],
            sw2: sw[1],
        });
    }

    Ok(data)
}

/// ACR122U pseudo-APDU builders.
pub mod apdu {
    use super::Block;

    /// Key slot in reader volatile memory used for sector authentication.
    pub const KEY_SLOT: u8 = 0x00;

    /// MIFARE key A selector.
    pub const KEY_TYPE_A: u8 = 0x60;

    /// Get the card UID.
    pub fn get_uid() -> Vec<u8> {
        vec![0xFF, 0xCA, 0x00, 0x00, 0x00]
    }

    /// Load a 6-byte key into the reader key slot.
    pub fn load_key(key: &[u8; 6]) -> Vec<u8> {
        let mut apdu = vec![0xFF, 0x82, 0x00, KEY_SLOT, 0x06];
        apdu.extend_from_slice(key);
        apdu
    }

    /// Authenticate a block with key A from the reader key slot.
    pub fn authenticate(block: u8) -> Vec<u8> {
        vec![
            0xFF, 0x86, 0x00, 0x00, 0x05, 0x01, 0x00, block, KEY_TYPE_A, KEY_SLOT,
        ]
    }

    /// Read a full 16-byte block.
    pub fn read_block(block: u8) -> Vec<u8> {
        vec![0xFF, 0xB0, 0x00, block, 0x10]
    }

    /// Overwrite a full 16-byte block.
    pub fn update_block(block: u8, data: &Block) -> Vec<u8> {
        let mut apdu = vec![0xFF, 0xD6, 0x00, block, 0x10];
        apdu.extend_from_slice(data);
        apdu
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_encode_pads_with_zeros() {
        let block = encode_block("TH-001").unwrap();
        assert_eq!(&block[..6], b"TH-001");
        assert!(block[6..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_encode_full_block() {
        let block = encode_block("1234567890123456").unwrap();
        assert_eq!(&block, b"1234567890123456");
        assert_eq!(decode_block(&block), "1234567890123456");
    }

    #[rstest]
    #[case("12345678901234567")]
    #[case("TH\0001")]
    #[case("TH\t01")]
    #[case("TÉ")]
    fn test_encode_rejects(#[case] code: &str) {
        assert!(matches!(
            encode_block(code),
            Err(HardwareError::InvalidData { .. })
        ));
    }

    #[test]
    fn test_decode_cleared_block() {
        assert_eq!(decode_block(&[0u8; BLOCK_SIZE]), "");
    }

    #[test]
    fn test_decode_space_padded_block() {
        // Cards written by other tools pad with spaces
        let mut block = [b' '; BLOCK_SIZE];
        block[..4].copy_from_slice(b"TH-9");
        assert_eq!(decode_block(&block), "TH-9");
    }

    #[test]
    fn test_pair_uses_thread_blocks() {
        let blocks = encode_pair(&ThreadPair::new("A", "B")).unwrap();
        assert_eq!(blocks[0].0, BLOCK_THREAD1);
        assert_eq!(blocks[1].0, BLOCK_THREAD2);
        assert_eq!(decode_pair(&blocks[0].1, &blocks[1].1), ThreadPair::new("A", "B"));
    }

    #[test]
    fn test_check_status_success() {
        let data = check_status(&[0x04, 0xAB, 0x90, 0x00]).unwrap();
        assert_eq!(data, &[0x04, 0xAB]);
    }

    #[test]
    fn test_check_status_failure() {
        let err = check_status(&[0x63, 0x00]).unwrap_err();
        assert!(matches!(err, HardwareError::Status { sw1: 0x63, sw2: 0x00 }));
        assert!(check_status(&[0x90]).is_err());
    }

    #[test]
    fn test_apdu_layouts() {
        assert_eq!(apdu::get_uid(), vec![0xFF, 0xCA, 0x00, 0x00, 0x00]);
        assert_eq!(
            apdu::load_key(&[0xFF; 6]),
            vec![0xFF, 0x82, 0x00, 0x00, 0x06, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]
        );
        assert_eq!(
            apdu::authenticate(4),
            vec![0xFF, 0x86, 0x00, 0x00, 0x05, 0x01, 0x00, 0x04, 0x60, 0x00]
        );
        assert_eq!(apdu::read_block(5), vec![0xFF, 0xB0, 0x00, 0x05, 0x10]);

        let update = apdu::update_block(4, &[0xAA; BLOCK_SIZE]);
        assert_eq!(&update[..5], &[0xFF, 0xD6, 0x00, 0x04, 0x10]);
        assert_eq!(update.len(), 5 + BLOCK_SIZE);
    }
}
