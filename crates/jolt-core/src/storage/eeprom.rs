//! 25LC256-class SPI EEPROM driver.
//!
//! Implements [`PageStore`] over the part's four-instruction protocol:
//! every write is preceded by a write-enable and followed by a poll of the
//! write-in-progress status bit until the cell commit finishes.

use embedded_hal::delay::DelayNs;
use embedded_hal::spi::{Operation, SpiDevice};

use super::PageStore;

/// Instruction set.
const CMD_READ: u8 = 0b0000_0011;
const CMD_WRITE: u8 = 0b0000_0010;
const CMD_WREN: u8 = 0b0000_0110;
const CMD_RDSR: u8 = 0b0000_0101;

/// Write-in-progress bit of the status register.
const STATUS_WIP: u8 = 0x01;

pub struct Eeprom25lc256<S, D> {
    spi: S,
    delay: D,
}

impl<S, D> Eeprom25lc256<S, D>
where
    S: SpiDevice<u8>,
    D: DelayNs,
{
    pub fn new(spi: S, delay: D) -> Self {
        Self { spi, delay }
    }

    /// Read the status register.
    pub fn read_status(&mut self) -> Result<u8, S::Error> {
        let mut out = [0u8; 1];
        self.spi.transaction(&mut [
            Operation::Write(&[CMD_RDSR]),
            Operation::Read(&mut out),
        ])?;
        Ok(out[0])
    }

    /// Set the write-enable latch; required before every write instruction.
    fn write_enable(&mut self) -> Result<(), S::Error> {
        self.spi.write(&[CMD_WREN])
    }

    /// Spin until the WIP bit clears. Bounded only by the part's write
    /// cycle time; there is no timeout and no cancellation.
    pub fn wait_for_write_complete(&mut self) -> Result<(), S::Error> {
        while self.read_status()? & STATUS_WIP != 0 {}
        Ok(())
    }

    fn address_header(cmd: u8, addr: u16) -> [u8; 3] {
        [cmd, (addr >> 8) as u8, addr as u8]
    }
}

impl<S, D> PageStore for Eeprom25lc256<S, D>
where
    S: SpiDevice<u8>,
    D: DelayNs,
{
    type Error = S::Error;

    fn read_byte(&mut self, addr: u16) -> Result<u8, Self::Error> {
        let mut out = [0u8; 1];
        self.spi.transaction(&mut [
            Operation::Write(&Self::address_header(CMD_READ, addr)),
            Operation::Read(&mut out),
        ])?;
        Ok(out[0])
    }

    fn read_page(&mut self, addr: u16, buf: &mut [u8]) -> Result<(), Self::Error> {
        self.spi.transaction(&mut [
            Operation::Write(&Self::address_header(CMD_READ, addr)),
            Operation::Read(buf),
        ])
    }

    fn write_page(&mut self, addr: u16, data: &[u8]) -> Result<(), Self::Error> {
        self.write_enable()?;
        self.delay.delay_us(1);
        self.spi.transaction(&mut [
            Operation::Write(&Self::address_header(CMD_WRITE, addr)),
            Operation::Write(data),
        ])?;
        self.wait_for_write_complete()
    }
}
