//! Append-only paged log store on non-volatile memory.
//!
//! Layout (64-byte pages, 512 pages):
//! - Page 0 is the control region: byte 0 holds the mode/flags byte,
//!   bytes 8..=9 the little-endian written-pages counter.
//! - Pages 1..=511 are the log-data region, growing forward in groups of
//!   five pages per logged event. Pages are never freed individually; only
//!   [`LogStore::erase_all`] reclaims space.

pub mod eeprom;
pub mod record;

pub use eeprom::Eeprom25lc256;
pub use record::LogRecord;

use log::{debug, info, warn};

use crate::config::{
    CTRL_FLAGS_ADDR, CTRL_PAGE_COUNT_ADDR, LOG_DATA_BASE_ADDR, LOG_DATA_PAGES,
    LOG_PAGES_PER_EVENT, LOG_RECORD_BYTES, MEMORY_BYTES, PAGE_COUNT, PAGE_SIZE,
};
use crate::history::HistoryBuffer;

/// Page-addressed non-volatile memory under the log store.
///
/// `write_page` returns only once the data is durable; drivers poll their
/// write-in-progress status internally (unbounded, not cancellable). Writes
/// must not cross a page boundary.
pub trait PageStore {
    type Error: core::fmt::Debug;

    fn read_byte(&mut self, addr: u16) -> Result<u8, Self::Error>;
    fn read_page(&mut self, addr: u16, buf: &mut [u8]) -> Result<(), Self::Error>;
    fn write_page(&mut self, addr: u16, data: &[u8]) -> Result<(), Self::Error>;
}

const FLAG_RUN: u8 = 1 << 0;
const FLAG_CONFIG: u8 = 1 << 1;
const FLAG_VERBOSE_SEND: u8 = 1 << 2;
const FLAG_RESET_MARKER: u8 = 1 << 3;

/// Decoded view of the persisted mode/flags byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControlFlags(u8);

impl ControlFlags {
    pub const fn from_byte(byte: u8) -> Self {
        Self(byte)
    }

    pub const fn to_byte(self) -> u8 {
        self.0
    }

    /// Start/stop mirror: true while acquisition is started.
    pub const fn run(self) -> bool {
        self.0 & FLAG_RUN != 0
    }

    pub const fn config_active(self) -> bool {
        self.0 & FLAG_CONFIG != 0
    }

    pub const fn verbose_send(self) -> bool {
        self.0 & FLAG_VERBOSE_SEND != 0
    }

    pub const fn reset_marker(self) -> bool {
        self.0 & FLAG_RESET_MARKER != 0
    }

    pub fn set_run(&mut self, on: bool) {
        self.set(FLAG_RUN, on);
    }

    pub fn set_config_active(&mut self, on: bool) {
        self.set(FLAG_CONFIG, on);
    }

    pub fn set_verbose_send(&mut self, on: bool) {
        self.set(FLAG_VERBOSE_SEND, on);
    }

    pub fn set_reset_marker(&mut self, on: bool) {
        self.set(FLAG_RESET_MARKER, on);
    }

    fn set(&mut self, mask: u8, on: bool) {
        if on {
            self.0 |= mask;
        } else {
            self.0 &= !mask;
        }
    }
}

/// Append-only event log plus the persisted mode/flag mirror.
pub struct LogStore<P> {
    pages: P,
}

impl<P: PageStore> LogStore<P> {
    pub fn new(pages: P) -> Self {
        Self { pages }
    }

    /// Direct access to the underlying memory, for host-side tooling.
    pub fn page_store_mut(&mut self) -> &mut P {
        &mut self.pages
    }

    // ------------------------------------------------------------------
    // Control flags
    // ------------------------------------------------------------------

    pub fn control_flags(&mut self) -> Result<ControlFlags, P::Error> {
        Ok(ControlFlags::from_byte(self.pages.read_byte(CTRL_FLAGS_ADDR)?))
    }

    fn write_flags(&mut self, flags: ControlFlags) -> Result<(), P::Error> {
        self.pages.write_page(CTRL_FLAGS_ADDR, &[flags.to_byte()])
    }

    /// Read-modify-write of the control byte so unrelated bits survive.
    /// The first flag write after a reset also clears the reset marker.
    fn update_flags(
        &mut self,
        apply: impl FnOnce(&mut ControlFlags),
    ) -> Result<(), P::Error> {
        let mut flags = self.control_flags()?;
        apply(&mut flags);
        self.write_flags(flags)?;

        if flags.reset_marker() {
            flags.set_reset_marker(false);
            self.write_flags(flags)?;
        }
        Ok(())
    }

    pub fn save_run_state(&mut self, running: bool) -> Result<(), P::Error> {
        self.update_flags(|flags| flags.set_run(running))
    }

    pub fn run_state(&mut self) -> Result<bool, P::Error> {
        Ok(self.control_flags()?.run())
    }

    pub fn save_config_active(&mut self, active: bool) -> Result<(), P::Error> {
        self.update_flags(|flags| flags.set_config_active(active))
    }

    pub fn config_active(&mut self) -> Result<bool, P::Error> {
        Ok(self.control_flags()?.config_active())
    }

    pub fn save_verbose_send(&mut self, enabled: bool) -> Result<(), P::Error> {
        self.update_flags(|flags| flags.set_verbose_send(enabled))
    }

    pub fn verbose_send(&mut self) -> Result<bool, P::Error> {
        Ok(self.control_flags()?.verbose_send())
    }

    /// The reset marker is managed directly, without the auto-clear the
    /// other flag writes perform.
    pub fn save_reset_marker(&mut self, on: bool) -> Result<(), P::Error> {
        let mut flags = self.control_flags()?;
        flags.set_reset_marker(on);
        self.write_flags(flags)
    }

    pub fn reset_marker(&mut self) -> Result<bool, P::Error> {
        Ok(self.control_flags()?.reset_marker())
    }

    // ------------------------------------------------------------------
    // Counters
    // ------------------------------------------------------------------

    /// Pages written to the log-data region so far. Always a multiple of
    /// [`LOG_PAGES_PER_EVENT`].
    pub fn log_pages(&mut self) -> Result<u16, P::Error> {
        let mut buf = [0u8; 2];
        self.pages.read_page(CTRL_PAGE_COUNT_ADDR, &mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    fn set_log_pages(&mut self, pages: u16) -> Result<(), P::Error> {
        self.pages
            .write_page(CTRL_PAGE_COUNT_ADDR, &pages.to_le_bytes())
    }

    /// Whole logs currently stored.
    pub fn log_count(&mut self) -> Result<u8, P::Error> {
        Ok((self.log_pages()? / LOG_PAGES_PER_EVENT as u16) as u8)
    }

    // ------------------------------------------------------------------
    // Log data
    // ------------------------------------------------------------------

    /// Append one five-page log built from the current history.
    ///
    /// When fewer than five pages remain the whole append is skipped
    /// silently: nothing is written, the counter is untouched, no error is
    /// reported. Capacity is provisioned generously relative to the
    /// expected event rate.
    pub fn append_log(
        &mut self,
        id: u8,
        event_source: u8,
        timestamp: u16,
        history: &HistoryBuffer,
    ) -> Result<(), P::Error> {
        let page_count = self.log_pages()?;
        if page_count as usize + LOG_PAGES_PER_EVENT > LOG_DATA_PAGES {
            warn!(
                "log store full at {} pages, dropping event {}",
                page_count, id
            );
            return Ok(());
        }

        let mut addr = LOG_DATA_BASE_ADDR + page_count * PAGE_SIZE as u16;
        for index in 0..LOG_PAGES_PER_EVENT {
            let record = LogRecord::new(id, event_source, timestamp, history.page_payload(index));
            self.pages.write_page(addr, &record.to_bytes())?;
            addr += PAGE_SIZE as u16;
        }
        self.set_log_pages(page_count + LOG_PAGES_PER_EVENT as u16)?;

        debug!("appended log {} at page count {}", id, page_count);
        Ok(())
    }

    /// Linear forward scan of page-group headers for `id`.
    ///
    /// Returns the address of the first matching page. Identifiers derive
    /// from a monotonically increasing counter; should the 8-bit space ever
    /// wrap, the earliest match wins.
    pub fn find_log(&mut self, id: u8) -> Result<Option<u16>, P::Error> {
        let mut addr = LOG_DATA_BASE_ADDR;
        loop {
            if self.pages.read_byte(addr)? == id {
                return Ok(Some(addr));
            }
            let next = addr as usize + PAGE_SIZE;
            if next >= MEMORY_BYTES {
                return Ok(None);
            }
            addr = next as u16;
        }
    }

    /// Read and decode the record stored at `addr`.
    pub fn read_log_record(&mut self, addr: u16) -> Result<LogRecord, P::Error> {
        let mut buf = [0u8; LOG_RECORD_BYTES];
        self.pages.read_page(addr, &mut buf)?;
        Ok(LogRecord::from_bytes(&buf))
    }

    /// Zero every page, reset the counter and raise the reset marker.
    pub fn erase_all(&mut self) -> Result<(), P::Error> {
        let zeros = [0u8; PAGE_SIZE];
        let mut addr = 0u16;
        for _ in 0..PAGE_COUNT {
            self.pages.write_page(addr, &zeros)?;
            addr = addr.wrapping_add(PAGE_SIZE as u16);
        }
        self.save_reset_marker(true)?;

        info!("log store erased");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HISTORY_DEPTH, LOG_PAYLOAD_BYTES, REDUCED_BURST_BYTES};
    use crate::history::ReducedBurst;
    use crate::testutil::MemPageStore;

    fn full_history() -> HistoryBuffer {
        let mut history = HistoryBuffer::new();
        for i in 1..=HISTORY_DEPTH as u8 {
            history.push(ReducedBurst::from_bytes([i; REDUCED_BURST_BYTES]));
        }
        history
    }

    fn store() -> LogStore<MemPageStore> {
        LogStore::new(MemPageStore::new())
    }

    #[test]
    fn test_append_increments_counts() {
        let mut store = store();
        let history = full_history();

        for id in 0..4u8 {
            store.append_log(id, 0x4A, 100 + id as u16, &history).unwrap();
        }

        assert_eq!(store.log_pages().unwrap(), 20);
        assert_eq!(store.log_count().unwrap(), 4);
    }

    #[test]
    fn test_append_then_find_and_decode() {
        let mut store = store();
        let history = full_history();
        store.append_log(3, 0x4A, 777, &history).unwrap();

        let addr = store.find_log(3).unwrap().expect("log 3 stored");
        assert_eq!(addr, LOG_DATA_BASE_ADDR);

        for index in 0..LOG_PAGES_PER_EVENT {
            let record = store
                .read_log_record(addr + (index * PAGE_SIZE) as u16)
                .unwrap();
            assert_eq!(record.id, 3);
            assert_eq!(record.event_source, 0x4A);
            assert_eq!(record.timestamp, 777);
            assert_eq!(record.payload, history.page_payload(index));
        }
    }

    #[test]
    fn test_find_missing_id_returns_none() {
        let mut store = store();
        let history = full_history();
        store.append_log(3, 0, 0, &history).unwrap();

        assert_eq!(store.find_log(99).unwrap(), None);
    }

    #[test]
    fn test_find_returns_earliest_match() {
        let mut store = store();
        let history = full_history();
        store.append_log(7, 0, 1, &history).unwrap();
        store.append_log(7, 0, 2, &history).unwrap();

        // Duplicate identifiers resolve to the first stored group.
        let addr = store.find_log(7).unwrap().unwrap();
        assert_eq!(addr, LOG_DATA_BASE_ADDR);
        assert_eq!(store.read_log_record(addr).unwrap().timestamp, 1);
    }

    #[test]
    fn test_reads_do_not_mutate_the_store() {
        let mut store = store();
        let history = full_history();
        store.append_log(1, 0x40, 5, &history).unwrap();

        let first = store.find_log(1).unwrap();
        let record_a = store.read_log_record(first.unwrap()).unwrap();
        let second = store.find_log(1).unwrap();
        let record_b = store.read_log_record(second.unwrap()).unwrap();

        assert_eq!(first, second);
        assert_eq!(record_a, record_b);
        assert_eq!(store.log_count().unwrap(), 1);
    }

    #[test]
    fn test_full_store_skips_append_without_partial_write() {
        let mut store = store();
        let history = full_history();

        // 102 appends fill 510 of the 511 data pages.
        for id in 0..102u8 {
            store.append_log(id, 0, 0, &history).unwrap();
        }
        assert_eq!(store.log_pages().unwrap(), 510);

        let before = store.page_store_mut().mem;
        store.append_log(102, 0xFF, 0xFFFF, &history).unwrap();

        // Nothing moved: same pages, same counter, no partial log.
        assert_eq!(store.page_store_mut().mem, before);
        assert_eq!(store.log_pages().unwrap(), 510);
        assert_eq!(store.log_count().unwrap(), 102);
    }

    #[test]
    fn test_erase_all_zeroes_data_and_sets_marker() {
        let mut store = store();
        let history = full_history();
        store.append_log(0, 0x4A, 9, &history).unwrap();
        store.save_run_state(true).unwrap();

        store.erase_all().unwrap();

        assert_eq!(store.log_count().unwrap(), 0);
        assert!(store.reset_marker().unwrap());
        let mem = &store.page_store_mut().mem;
        assert!(mem[PAGE_SIZE..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_flag_writes_merge_bits() {
        let mut store = store();
        store.save_run_state(true).unwrap();
        store.save_verbose_send(true).unwrap();
        store.save_config_active(true).unwrap();

        let flags = store.control_flags().unwrap();
        assert!(flags.run());
        assert!(flags.verbose_send());
        assert!(flags.config_active());

        store.save_config_active(false).unwrap();
        let flags = store.control_flags().unwrap();
        assert!(flags.run());
        assert!(flags.verbose_send());
        assert!(!flags.config_active());
    }

    #[test]
    fn test_first_flag_write_after_reset_clears_marker() {
        let mut store = store();
        store.erase_all().unwrap();
        assert!(store.reset_marker().unwrap());

        store.save_run_state(true).unwrap();
        assert!(!store.reset_marker().unwrap());
        assert!(store.run_state().unwrap());
    }

    #[test]
    fn test_log_payload_width_is_page_minus_header() {
        assert_eq!(LOG_PAYLOAD_BYTES, PAGE_SIZE - 4);
    }
}
