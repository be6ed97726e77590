//! LIS3DH register-level driver over SPI.
//!
//! Implements [`MotionSensor`] for the ST LIS3DH accelerometer in 8-bit
//! low-power mode: 200 Hz sampling, FIFO mode with overrun interrupt, and
//! a high-threshold event interrupt on all three axes.

use embedded_hal::delay::DelayNs;
use embedded_hal::spi::{Operation, SpiDevice};

use super::{AcquisitionMode, MotionSensor, RawBurst};
use crate::config::{BYTES_PER_LEVEL, FIFO_LEVELS, RAW_BURST_BYTES};

/// Read bit OR-ed into every register address sent on the bus.
const READ_BIT: u8 = 0x80;

const WHO_AM_I: u8 = 0x0F;
/// Device identity returned by the WHO_AM_I register.
pub const WHO_AM_I_EXPECTED: u8 = 0x33;

const CTRL_REG1: u8 = 0x20;
/// Low-power mode, 200 Hz data rate, all axes disabled.
const CTRL_REG1_STOP_XYZ: u8 = 0x68;
/// Low-power mode, 200 Hz data rate, all axes enabled.
const CTRL_REG1_START_XYZ: u8 = 0x6F;

const CTRL_REG3: u8 = 0x22;
/// Route the IA1 event and the FIFO overrun onto the interrupt pin.
const CTRL_REG3_I1_IA1_OVERRUN: u8 = 0x42;
const CTRL_REG3_NULL: u8 = 0x00;

const CTRL_REG4: u8 = 0x23;
/// Block data update, +/-2 g full scale, 4-wire SPI.
const CTRL_REG4_BDU_ACTIVE: u8 = 0x80;

const CTRL_REG5: u8 = 0x24;
const CTRL_REG5_FIFO_ENABLE: u8 = 0x40;
const CTRL_REG5_FIFO_DISABLE: u8 = 0x00;

const FIFO_CTRL_REG: u8 = 0x2E;
const FIFO_CTRL_BYPASS_MODE: u8 = 0x00;
const FIFO_CTRL_FIFO_MODE: u8 = 0x40;

const FIFO_SRC_REG: u8 = 0x2F;
const FIFO_SRC_OVR_MASK: u8 = 0x40;

const INT1_CFG: u8 = 0x30;
const INT1_CFG_DISABLE_EVENTS: u8 = 0x00;
/// High events on X, Y and Z.
const INT1_CFG_XYZ_HIGH_EVENTS: u8 = 0x2A;

const INT1_SRC: u8 = 0x31;
const INT1_SRC_IA_MASK: u8 = 0x40;

const INT1_THS: u8 = 0x32;
/// 1.6 g at +/-2 g full scale (16 mg per LSB).
const INT1_THS_VALUE: u8 = 0x64;

const INT1_DURATION: u8 = 0x33;
/// 100 ms at 200 Hz data rate (5 ms per LSB).
const INT1_DURATION_VALUE: u8 = 0x14;

/// First axis output register with the read and auto-increment bits set,
/// the start address of every FIFO level read.
const READ_OUT_X_L: u8 = 0xE8;

pub struct Lis3dh<S, D> {
    spi: S,
    delay: D,
}

impl<S, D> Lis3dh<S, D>
where
    S: SpiDevice<u8>,
    D: DelayNs,
{
    pub fn new(spi: S, delay: D) -> Self {
        Self { spi, delay }
    }

    /// Read one register.
    pub fn read_register(&mut self, address: u8) -> Result<u8, S::Error> {
        let mut out = [0u8; 1];
        self.spi.transaction(&mut [
            Operation::Write(&[address | READ_BIT]),
            Operation::Read(&mut out),
        ])?;
        Ok(out[0])
    }

    fn write_register(&mut self, address: u8, value: u8) -> Result<(), S::Error> {
        self.spi.write(&[address, value])
    }

    /// Probe the device identity register.
    pub fn who_am_i(&mut self) -> Result<u8, S::Error> {
        self.read_register(WHO_AM_I)
    }

    /// Full register setup followed by entry into the stopped state.
    pub fn init(&mut self) -> Result<(), S::Error> {
        self.setup()?;
        self.configure(AcquisitionMode::Stopped)
    }

    /// Initialize every control register this application relies on.
    fn setup(&mut self) -> Result<(), S::Error> {
        self.write_register(CTRL_REG1, CTRL_REG1_STOP_XYZ)?;
        self.write_register(CTRL_REG3, CTRL_REG3_NULL)?;
        self.write_register(CTRL_REG4, CTRL_REG4_BDU_ACTIVE)?;
        self.write_register(CTRL_REG5, CTRL_REG5_FIFO_ENABLE)?;
        self.write_register(FIFO_CTRL_REG, FIFO_CTRL_BYPASS_MODE)?;
        self.write_register(INT1_CFG, INT1_CFG_DISABLE_EVENTS)?;
        self.write_register(INT1_THS, INT1_THS_VALUE)?;
        self.write_register(INT1_DURATION, INT1_DURATION_VALUE)
    }
}

impl<S, D> MotionSensor for Lis3dh<S, D>
where
    S: SpiDevice<u8>,
    D: DelayNs,
{
    type Error = S::Error;

    fn configure(&mut self, mode: AcquisitionMode) -> Result<(), Self::Error> {
        match mode {
            AcquisitionMode::Stopped => {
                self.write_register(CTRL_REG1, CTRL_REG1_STOP_XYZ)?;
                self.write_register(CTRL_REG3, CTRL_REG3_NULL)?;
                self.write_register(CTRL_REG5, CTRL_REG5_FIFO_DISABLE)?;
                self.write_register(FIFO_CTRL_REG, FIFO_CTRL_BYPASS_MODE)?;
                self.write_register(INT1_CFG, INT1_CFG_DISABLE_EVENTS)
            }
            AcquisitionMode::HighRate => {
                self.write_register(CTRL_REG1, CTRL_REG1_START_XYZ)?;
                self.write_register(CTRL_REG3, CTRL_REG3_I1_IA1_OVERRUN)?;
                self.write_register(CTRL_REG5, CTRL_REG5_FIFO_ENABLE)?;
                self.write_register(FIFO_CTRL_REG, FIFO_CTRL_FIFO_MODE)?;
                self.write_register(INT1_CFG, INT1_CFG_XYZ_HIGH_EVENTS)
            }
        }
    }

    fn read_burst(&mut self) -> Result<RawBurst, Self::Error> {
        let mut bytes = [0u8; RAW_BURST_BYTES];
        // One level (6 bytes) per transaction, X low register first.
        for level in 0..FIFO_LEVELS {
            let start = level * BYTES_PER_LEVEL;
            self.spi.transaction(&mut [
                Operation::Write(&[READ_OUT_X_L]),
                Operation::Read(&mut bytes[start..start + BYTES_PER_LEVEL]),
            ])?;
        }
        Ok(RawBurst::from_bytes(bytes))
    }

    fn interrupt_source(&mut self) -> Result<u8, Self::Error> {
        self.read_register(INT1_SRC)
    }

    fn event_active(&mut self) -> Result<bool, Self::Error> {
        Ok(self.read_register(INT1_SRC)? & INT1_SRC_IA_MASK != 0)
    }

    fn fifo_overrun(&mut self) -> Result<bool, Self::Error> {
        Ok(self.read_register(FIFO_SRC_REG)? & FIFO_SRC_OVR_MASK != 0)
    }

    fn reset_fifo_latch(&mut self) -> Result<(), Self::Error> {
        self.write_register(FIFO_CTRL_REG, FIFO_CTRL_BYPASS_MODE)?;
        self.delay.delay_us(1);
        self.write_register(FIFO_CTRL_REG, FIFO_CTRL_FIFO_MODE)
    }
}
