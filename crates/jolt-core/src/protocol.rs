//! Remote query protocol and burst telemetry framing.
//!
//! The request/response side is a framed single-byte instruction set over a
//! byte stream, one command at a time. The telemetry side is an independent
//! one-way stream of 5-byte level frames emitted while verbose-send is
//! enabled and acquisition is active; it is advisory and never acknowledged.

use core::fmt::Debug;

use embedded_io::Write;
use log::debug;
use thiserror_no_std::Error;

use crate::config::{FIFO_LEVELS, LOG_PAGES_PER_EVENT, PAGE_SIZE};
use crate::sensor::RawBurst;
use crate::storage::{LogStore, PageStore};

/// Erase all log data and reply with [`OP_ACK`].
pub const OP_RESET: u8 = 0x52;
/// Reply with the current log count byte.
pub const OP_LOG_COUNT: u8 = 0x4E;
/// Reply with the current control flags byte.
pub const OP_READ_CONTROL: u8 = 0x43;
/// Followed by an identifier byte; reply with that log's five records.
pub const OP_READ_LOG: u8 = 0x4C;
/// Acknowledgement byte sent after a completed reset.
pub const OP_ACK: u8 = 0x4B;

/// Telemetry frame markers.
pub const FRAME_START: u8 = 0xA0;
pub const FRAME_END: u8 = 0xC0;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError<SE: Debug, LE: Debug> {
    #[error("store access failed: {0:?}")]
    Store(SE),
    #[error("response link failed: {0:?}")]
    Link(LE),
}

/// Byte-stream command decoder.
///
/// Commands run synchronously from the main loop, never from a handler, so
/// the store is never touched concurrently with the pipeline.
#[derive(Debug, Default)]
pub struct CommandHandler {
    awaiting_id: bool,
}

impl CommandHandler {
    pub const fn new() -> Self {
        Self { awaiting_id: false }
    }

    /// Feed one received byte; executes a command once it is complete.
    pub fn feed<P, W>(
        &mut self,
        byte: u8,
        store: &mut LogStore<P>,
        link: &mut W,
    ) -> Result<(), ProtocolError<P::Error, W::Error>>
    where
        P: PageStore,
        W: Write,
    {
        if self.awaiting_id {
            self.awaiting_id = false;
            return send_log(byte, store, link);
        }

        match byte {
            OP_RESET => {
                store.erase_all().map_err(ProtocolError::Store)?;
                link.write_all(&[OP_ACK]).map_err(ProtocolError::Link)?;
            }
            OP_LOG_COUNT => {
                let count = store.log_count().map_err(ProtocolError::Store)?;
                link.write_all(&[count]).map_err(ProtocolError::Link)?;
            }
            OP_READ_CONTROL => {
                let flags = store.control_flags().map_err(ProtocolError::Store)?;
                link.write_all(&[flags.to_byte()])
                    .map_err(ProtocolError::Link)?;
            }
            OP_READ_LOG => self.awaiting_id = true,
            other => debug!("ignoring unknown op code {:#04x}", other),
        }
        Ok(())
    }
}

/// Send the five records of log `id` in store order, earliest page first.
/// An unknown identifier sends nothing.
fn send_log<P, W>(
    id: u8,
    store: &mut LogStore<P>,
    link: &mut W,
) -> Result<(), ProtocolError<P::Error, W::Error>>
where
    P: PageStore,
    W: Write,
{
    let Some(base) = store.find_log(id).map_err(ProtocolError::Store)? else {
        debug!("log {} not found", id);
        return Ok(());
    };

    for index in 0..LOG_PAGES_PER_EVENT {
        let record = store
            .read_log_record(base + (index * PAGE_SIZE) as u16)
            .map_err(ProtocolError::Store)?;
        link.write_all(&record.to_bytes())
            .map_err(ProtocolError::Link)?;
    }
    Ok(())
}

/// Frame and send the high axis bytes of a raw burst: per level a start
/// marker, the three axis bytes and an end marker.
pub fn send_burst<W: Write>(burst: &RawBurst, link: &mut W) -> Result<(), W::Error> {
    for level in 0..FIFO_LEVELS {
        let [x, y, z] = burst.level_high(level);
        link.write_all(&[FRAME_START, x, y, z, FRAME_END])?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        HISTORY_DEPTH, LOG_RECORD_BYTES, RAW_BURST_BYTES, REDUCED_BURST_BYTES,
    };
    use crate::history::{HistoryBuffer, ReducedBurst};
    use crate::testutil::{MemPageStore, VecSink};

    fn store_with_log(id: u8) -> LogStore<MemPageStore> {
        let mut store = LogStore::new(MemPageStore::new());
        let mut history = HistoryBuffer::new();
        for i in 1..=HISTORY_DEPTH as u8 {
            history.push(ReducedBurst::from_bytes([i; REDUCED_BURST_BYTES]));
        }
        store.append_log(id, 0x4A, 321, &history).unwrap();
        store
    }

    #[test]
    fn test_log_count_command() {
        let mut store = store_with_log(0);
        let mut link = VecSink::new();

        CommandHandler::new()
            .feed(OP_LOG_COUNT, &mut store, &mut link)
            .unwrap();
        assert_eq!(&link.bytes[..], &[1]);
    }

    #[test]
    fn test_read_control_command() {
        let mut store = store_with_log(0);
        store.save_run_state(true).unwrap();
        store.save_verbose_send(true).unwrap();
        let mut link = VecSink::new();

        CommandHandler::new()
            .feed(OP_READ_CONTROL, &mut store, &mut link)
            .unwrap();
        assert_eq!(&link.bytes[..], &[0b0000_0101]);
    }

    #[test]
    fn test_read_log_sends_five_records_in_store_order() {
        let mut store = store_with_log(9);
        let mut link = VecSink::new();
        let mut handler = CommandHandler::new();

        handler.feed(OP_READ_LOG, &mut store, &mut link).unwrap();
        assert!(link.bytes.is_empty());
        handler.feed(9, &mut store, &mut link).unwrap();

        assert_eq!(link.bytes.len(), LOG_PAGES_PER_EVENT * LOG_RECORD_BYTES);
        for index in 0..LOG_PAGES_PER_EVENT {
            let page = &link.bytes[index * LOG_RECORD_BYTES..(index + 1) * LOG_RECORD_BYTES];
            assert_eq!(page[0], 9);
            assert_eq!(page[1], 0x4A);
            assert_eq!(u16::from_le_bytes([page[2], page[3]]), 321);
        }
    }

    #[test]
    fn test_read_log_unknown_id_sends_nothing() {
        let mut store = store_with_log(1);
        let mut link = VecSink::new();
        let mut handler = CommandHandler::new();

        handler.feed(OP_READ_LOG, &mut store, &mut link).unwrap();
        handler.feed(99, &mut store, &mut link).unwrap();
        assert!(link.bytes.is_empty());

        // The handler is back in the idle state afterwards.
        handler.feed(OP_LOG_COUNT, &mut store, &mut link).unwrap();
        assert_eq!(&link.bytes[..], &[1]);
    }

    #[test]
    fn test_reset_command_erases_and_acknowledges() {
        let mut store = store_with_log(0);
        let mut link = VecSink::new();

        CommandHandler::new()
            .feed(OP_RESET, &mut store, &mut link)
            .unwrap();

        assert_eq!(&link.bytes[..], &[OP_ACK]);
        assert_eq!(store.log_count().unwrap(), 0);
        assert!(store.reset_marker().unwrap());
    }

    #[test]
    fn test_unknown_op_code_is_ignored() {
        let mut store = store_with_log(0);
        let mut link = VecSink::new();

        CommandHandler::new()
            .feed(0x00, &mut store, &mut link)
            .unwrap();
        assert!(link.bytes.is_empty());
    }

    #[test]
    fn test_burst_telemetry_framing() {
        let mut bytes = [0u8; RAW_BURST_BYTES];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = i as u8;
        }
        let burst = RawBurst::from_bytes(bytes);
        let mut link = VecSink::new();

        send_burst(&burst, &mut link).unwrap();

        assert_eq!(link.bytes.len(), FIFO_LEVELS * 5);
        for level in 0..FIFO_LEVELS {
            let frame = &link.bytes[level * 5..level * 5 + 5];
            assert_eq!(frame[0], FRAME_START);
            assert_eq!(frame[4], FRAME_END);
            assert_eq!(&frame[1..4], &burst.level_high(level)[..]);
        }
    }
}
