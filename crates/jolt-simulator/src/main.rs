//! Desktop simulator for the jolt-rs motion event logger.
//!
//! Emulates the hardware collaborators in memory (motion sensor, EEPROM,
//! serial links, clock) and drives the full core pipeline from stdin, so
//! the acquisition, logging and remote-query paths can be exercised
//! without hardware.
//!
//! # Commands
//!
//! | Command        | Effect                                      |
//! |----------------|---------------------------------------------|
//! | click          | Double-click: toggle stop/start             |
//! | hold           | Long-press: enter/leave config mode         |
//! | verbose on/off | Turn the verbose-send knob (config mode)    |
//! | burst          | Fill the sensor FIFO and raise burst-ready  |
//! | shake          | Raise an over-threshold event               |
//! | count          | Remote LOG_COUNT query                      |
//! | flags          | Remote READ_CONTROL query                   |
//! | read <id>      | Remote READ_LOG query                       |
//! | reset          | Remote RESET command                        |
//! | history        | Show the in-memory history depth            |
//! | quit           | Exit                                        |

use std::cell::RefCell;
use std::convert::Infallible;
use std::io::{self, BufRead, Write as _};
use std::rc::Rc;
use std::time::Instant;

use log::{error, info};

use jolt_core::config::{
    BYTES_PER_LEVEL, FIFO_LEVELS, LOG_RECORD_BYTES, MEMORY_BYTES, RAW_BURST_BYTES,
};
use jolt_core::events::EventFlags;
use jolt_core::pipeline::Pipeline;
use jolt_core::protocol::{self, CommandHandler};
use jolt_core::sensor::{AcquisitionMode, MotionSensor, RawBurst};
use jolt_core::storage::{ControlFlags, LogRecord, PageStore};
use jolt_core::time::MonotonicClock;

/// Interrupt-source byte reported for simulated over-threshold events:
/// the IA bit plus X-high and Y-high.
const SHAKE_INT_SOURCE: u8 = 0x4A;

/// Polls the simulated interrupt stays asserted after a shake.
const SHAKE_ACTIVE_POLLS: u8 = 2;

static FLAGS: EventFlags = EventFlags::new();

// ---------------------------------------------------------------------------
// Emulated hardware
// ---------------------------------------------------------------------------

/// Observable state of the emulated motion sensor.
struct ImuState {
    mode: AcquisitionMode,
    fifo: RawBurst,
    fifo_overrun: bool,
    int_source: u8,
    active_polls: u8,
    phase: f64,
}

impl ImuState {
    fn new() -> Self {
        Self {
            mode: AcquisitionMode::Stopped,
            fifo: RawBurst::zeroed(),
            fifo_overrun: false,
            int_source: 0,
            active_polls: 0,
            phase: 0.0,
        }
    }

    /// Fill the FIFO with a synthetic waveform of the given amplitude.
    fn fill_fifo(&mut self, amplitude: f64) {
        let mut bytes = [0u8; RAW_BURST_BYTES];
        for level in 0..FIFO_LEVELS {
            self.phase += 0.05;
            let x = (amplitude * self.phase.sin()) as i8;
            let y = (amplitude * (self.phase * 0.7).cos()) as i8;
            let z = (amplitude * (self.phase * 1.3).sin()) as i8;

            // Low output registers stay zero (8-bit low-power mode).
            let base = level * BYTES_PER_LEVEL;
            bytes[base + 1] = x as u8;
            bytes[base + 3] = y as u8;
            bytes[base + 5] = z as u8;
        }
        self.fifo = RawBurst::from_bytes(bytes);
        self.fifo_overrun = true;
    }
}

/// Mirror of the hardware interrupt handler: classify the asserted
/// condition and raise the matching flag. Nothing else happens here; the
/// pipeline drains the flags on its next poll.
fn imu_interrupt(state: &Rc<RefCell<ImuState>>) {
    let state = state.borrow();
    if state.fifo_overrun {
        FLAGS.raise_burst_ready();
    }
    if state.int_source & 0x40 != 0 {
        FLAGS.raise_over_threshold();
    }
}

/// [`MotionSensor`] over the shared emulated state, so the command loop can
/// poke the same registers the pipeline reads.
struct MockImu {
    state: Rc<RefCell<ImuState>>,
}

impl MotionSensor for MockImu {
    type Error = Infallible;

    fn configure(&mut self, mode: AcquisitionMode) -> Result<(), Infallible> {
        self.state.borrow_mut().mode = mode;
        Ok(())
    }

    fn read_burst(&mut self) -> Result<RawBurst, Infallible> {
        Ok(self.state.borrow().fifo)
    }

    fn interrupt_source(&mut self) -> Result<u8, Infallible> {
        Ok(self.state.borrow().int_source)
    }

    fn event_active(&mut self) -> Result<bool, Infallible> {
        let mut state = self.state.borrow_mut();
        if state.active_polls > 0 {
            state.active_polls -= 1;
            Ok(true)
        } else {
            state.int_source = 0;
            Ok(false)
        }
    }

    fn fifo_overrun(&mut self) -> Result<bool, Infallible> {
        Ok(self.state.borrow().fifo_overrun)
    }

    fn reset_fifo_latch(&mut self) -> Result<(), Infallible> {
        self.state.borrow_mut().fifo_overrun = false;
        Ok(())
    }
}

/// Heap-backed page store standing in for the SPI EEPROM.
struct MemEeprom {
    mem: Box<[u8; MEMORY_BYTES]>,
}

impl MemEeprom {
    fn new() -> Self {
        Self {
            mem: Box::new([0; MEMORY_BYTES]),
        }
    }
}

impl PageStore for MemEeprom {
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

struct WallClock {
    booted: Instant,
}

impl MonotonicClock for WallClock {
    fn seconds_since_boot(&mut self) -> u16 {
        self.booted.elapsed().as_secs().min(u16::MAX as u64) as u16
    }
}

/// Capturing byte link; the main loop drains and pretty-prints it.
#[derive(Default)]
struct ConsoleLink {
    bytes: Vec<u8>,
}

impl ConsoleLink {
    fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.bytes)
    }
}

impl embedded_io::ErrorType for ConsoleLink {
    type Error = Infallible;
}

impl embedded_io::Write for ConsoleLink {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Infallible> {
        self.bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Infallible> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Remote protocol helpers
// ---------------------------------------------------------------------------

type SimPipeline<'a> = Pipeline<'a, MockImu, MemEeprom, WallClock>;

/// Feed a complete remote command and return the raw response bytes.
fn run_remote(
    handler: &mut CommandHandler,
    pipeline: &mut SimPipeline<'_>,
    link: &mut ConsoleLink,
    request: &[u8],
) -> Vec<u8> {
    for &byte in request {
        if let Err(e) = handler.feed(byte, pipeline.store_mut(), link) {
            error!("remote command failed: {:?}", e);
        }
    }
    link.take()
}

fn print_records(reply: &[u8]) {
    if reply.is_empty() {
        println!("no such log");
        return;
    }
    for chunk in reply.chunks_exact(LOG_RECORD_BYTES) {
        let mut page = [0u8; LOG_RECORD_BYTES];
        page.copy_from_slice(chunk);
        let record = LogRecord::from_bytes(&page);
        println!(
            "log {:3}  source {:#04x}  t={:5}s  payload {:02x} {:02x} {:02x} {:02x} ...",
            record.id,
            record.event_source,
            record.timestamp,
            record.payload[0],
            record.payload[1],
            record.payload[2],
            record.payload[3],
        );
    }
}

fn print_flags(byte: u8) {
    let flags = ControlFlags::from_byte(byte);
    println!(
        "control {:#04x}: run={} config={} verbose={} reset-marker={}",
        byte,
        flags.run(),
        flags.config_active(),
        flags.verbose_send(),
        flags.reset_marker()
    );
}

fn print_help() {
    println!("commands:");
    println!("  click | hold | verbose on|off");
    println!("  burst | shake | history");
    println!("  count | flags | read <id> | reset");
    println!("  help | quit");
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() {
    env_logger::init();
    info!("Starting jolt-rs simulator");

    let imu_state = Rc::new(RefCell::new(ImuState::new()));
    let imu = MockImu {
        state: imu_state.clone(),
    };

    let mut pipeline = match Pipeline::restore(
        imu,
        MemEeprom::new(),
        WallClock {
            booted: Instant::now(),
        },
        &FLAGS,
    ) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            error!("pipeline init failed: {:?}", e);
            return;
        }
    };

    let mut handler = CommandHandler::new();
    let mut telemetry = ConsoleLink::default();
    let mut reply = ConsoleLink::default();

    print_help();

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("[{:?}] > ", pipeline.mode());
        let _ = io::stdout().flush();

        let Some(Ok(line)) = lines.next() else {
            break;
        };
        let mut parts = line.split_whitespace();
        let command = parts.next().unwrap_or("");
        let argument = parts.next();

        match command {
            "" => {}
            "click" => FLAGS.raise_run_toggle(),
            "hold" => FLAGS.raise_config_toggle(),
            "verbose" => {
                // Takes effect only while in config mode, like the knob.
                pipeline
                    .controller_mut()
                    .set_verbose_send(argument == Some("on"));
            }
            "burst" => {
                if imu_state.borrow().mode == AcquisitionMode::HighRate {
                    imu_state.borrow_mut().fill_fifo(40.0);
                    imu_interrupt(&imu_state);
                } else {
                    println!("acquisition is stopped, the FIFO is idle");
                }
            }
            "shake" => {
                if imu_state.borrow().mode == AcquisitionMode::HighRate {
                    {
                        let mut state = imu_state.borrow_mut();
                        state.fill_fifo(120.0);
                        state.int_source = SHAKE_INT_SOURCE;
                        state.active_polls = SHAKE_ACTIVE_POLLS;
                    }
                    imu_interrupt(&imu_state);
                } else {
                    println!("acquisition is stopped, no threshold events");
                }
            }
            "history" => {
                println!("history holds {} reduced bursts", pipeline.history().len());
            }
            "count" => {
                let reply_bytes =
                    run_remote(&mut handler, &mut pipeline, &mut reply, &[protocol::OP_LOG_COUNT]);
                if let &[count] = reply_bytes.as_slice() {
                    println!("logs stored: {}", count);
                }
            }
            "flags" => {
                let reply_bytes = run_remote(
                    &mut handler,
                    &mut pipeline,
                    &mut reply,
                    &[protocol::OP_READ_CONTROL],
                );
                if let &[byte] = reply_bytes.as_slice() {
                    print_flags(byte);
                }
            }
            "read" => match argument.and_then(|a| a.parse::<u8>().ok()) {
                Some(id) => {
                    let reply_bytes = run_remote(
                        &mut handler,
                        &mut pipeline,
                        &mut reply,
                        &[protocol::OP_READ_LOG, id],
                    );
                    print_records(&reply_bytes);
                }
                None => println!("usage: read <id>"),
            },
            "reset" => {
                let reply_bytes =
                    run_remote(&mut handler, &mut pipeline, &mut reply, &[protocol::OP_RESET]);
                if reply_bytes == [protocol::OP_ACK] {
                    println!("store erased");
                }
            }
            "help" => print_help(),
            "quit" | "exit" => break,
            other => println!("unknown command: {}", other),
        }

        // Drain pending hardware events.
        if let Err(e) = pipeline.poll(&mut telemetry) {
            error!("pipeline error: {:?}", e);
        }

        let frames = telemetry.take();
        if !frames.is_empty() {
            println!(
                "telemetry: {} level frames ({} bytes)",
                frames.len() / 5,
                frames.len()
            );
        }
    }

    info!("Simulator exiting");
}
