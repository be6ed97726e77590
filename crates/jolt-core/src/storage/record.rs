//! Log record and its fixed-width page serialization.
//!
//! One over-threshold event is persisted as five of these records, all
//! sharing the same header and each carrying a different window of the
//! flattened motion history.
//!
//! Binary format (one 64-byte store page):
//! - id: 1 byte
//! - event_source: 1 byte
//! - timestamp: 2 bytes (little-endian)
//! - payload: 60 bytes

use crate::config::{LOG_PAYLOAD_BYTES, LOG_RECORD_BYTES};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogRecord {
    /// Sequence number assigned from the stored log count.
    pub id: u8,
    /// Raw interrupt-source snapshot captured when the event fired.
    pub event_source: u8,
    /// Seconds since boot, saturating.
    pub timestamp: u16,
    /// One 60-byte window of the flattened history.
    pub payload: [u8; LOG_PAYLOAD_BYTES],
}

impl LogRecord {
    pub fn new(
        id: u8,
        event_source: u8,
        timestamp: u16,
        payload: [u8; LOG_PAYLOAD_BYTES],
    ) -> Self {
        Self {
            id,
            event_source,
            timestamp,
            payload,
        }
    }

    /// Serialize into one store page.
    pub fn to_bytes(&self) -> [u8; LOG_RECORD_BYTES] {
        let mut bytes = [0u8; LOG_RECORD_BYTES];
        bytes[0] = self.id;
        bytes[1] = self.event_source;
        bytes[2..4].copy_from_slice(&self.timestamp.to_le_bytes());
        bytes[4..].copy_from_slice(&self.payload);
        bytes
    }

    /// Reconstruct a record from one store page.
    pub fn from_bytes(bytes: &[u8; LOG_RECORD_BYTES]) -> Self {
        let mut payload = [0u8; LOG_PAYLOAD_BYTES];
        payload.copy_from_slice(&bytes[4..]);
        Self {
            id: bytes[0],
            event_source: bytes[1],
            timestamp: u16::from_le_bytes([bytes[2], bytes[3]]),
            payload,
        }
    }
}
