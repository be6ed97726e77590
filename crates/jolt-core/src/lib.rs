//! Hardware-independent core library for jolt-rs
//!
//! This crate contains all platform-agnostic logic for the jolt motion
//! event logger: FIFO burst acquisition, burst decimation and the bounded
//! motion history, the fixed-width log record codec, the append-only paged
//! log store, the stop/start/config mode machine and the remote query
//! protocol.
//!
//! It is `#![no_std]` and allocation-free so it compiles on both embedded
//! targets and desktop hosts (for the simulator and tests). Hardware is
//! reached exclusively through the `embedded-hal` SPI/delay traits and the
//! crate's own [`sensor::MotionSensor`], [`storage::PageStore`] and
//! [`time::MonotonicClock`] seams.

#![no_std]

pub mod config;
pub mod error;
pub mod events;
pub mod history;
pub mod mode;
pub mod pipeline;
pub mod protocol;
pub mod sensor;
pub mod storage;
pub mod time;

#[cfg(test)]
pub(crate) mod testutil;
