//! Shared in-memory fakes for unit tests.

use core::convert::Infallible;

use crate::config::MEMORY_BYTES;
use crate::sensor::{AcquisitionMode, MotionSensor, RawBurst};
use crate::storage::PageStore;
use crate::time::MonotonicClock;

/// Byte-array page store with instant, infallible writes.
pub struct MemPageStore {
    pub mem: [u8; MEMORY_BYTES],
}

impl MemPageStore {
    pub fn new() -> Self {
        Self {
            mem: [0; MEMORY_BYTES],
        }
    }
}

impl PageStore for MemPageStore {
    type Error = Infallible;

    fn read_byte(&mut self, addr: u16) -> Result<u8, Infallible> {
        Ok(self.mem[addr as usize])
    }

    fn read_page(&mut self, addr: u16, buf: &mut [u8]) -> Result<(), Infallible> {
        let addr = addr as usize;
        buf.copy_from_slice(&self.mem[addr..addr + buf.len()]);
        Ok(())
    }

    fn write_page(&mut self, addr: u16, data: &[u8]) -> Result<(), Infallible> {
        let addr = addr as usize;
        self.mem[addr..addr + data.len()].copy_from_slice(data);
        Ok(())
    }
}

/// Motion sensor whose observable state is scripted by the test.
pub struct ScriptedSensor {
    pub mode: AcquisitionMode,
    pub next_burst: RawBurst,
    pub int_source: u8,
    /// `event_active` reports true this many more times.
    pub active_polls: u8,
    pub latch_resets: u32,
}

impl ScriptedSensor {
    pub fn new() -> Self {
        Self {
            mode: AcquisitionMode::Stopped,
            next_burst: RawBurst::zeroed(),
            int_source: 0,
            active_polls: 0,
            latch_resets: 0,
        }
    }
}

impl MotionSensor for ScriptedSensor {
    type Error = Infallible;

    fn configure(&mut self, mode: AcquisitionMode) -> Result<(), Infallible> {
        self.mode = mode;
        Ok(())
    }

    fn read_burst(&mut self) -> Result<RawBurst, Infallible> {
        Ok(self.next_burst)
    }

    fn interrupt_source(&mut self) -> Result<u8, Infallible> {
        Ok(self.int_source)
    }

    fn event_active(&mut self) -> Result<bool, Infallible> {
        if self.active_polls > 0 {
            self.active_polls -= 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn fifo_overrun(&mut self) -> Result<bool, Infallible> {
        Ok(false)
    }

    fn reset_fifo_latch(&mut self) -> Result<(), Infallible> {
        self.latch_resets += 1;
        Ok(())
    }
}

/// Fixed clock.
pub struct FakeClock {
    pub secs: u16,
}

impl MonotonicClock for FakeClock {
    fn seconds_since_boot(&mut self) -> u16 {
        self.secs
    }
}

/// Capturing byte sink for link-side assertions.
pub struct VecSink {
    pub bytes: heapless::Vec<u8, 4096>,
}

impl VecSink {
    pub fn new() -> Self {
        Self {
            bytes: heapless::Vec::new(),
        }
    }
}

impl embedded_io::ErrorType for VecSink {
    type Error = Infallible;
}

impl embedded_io::Write for VecSink {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Infallible> {
        let _ = self.bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Infallible> {
        Ok(())
    }
}
