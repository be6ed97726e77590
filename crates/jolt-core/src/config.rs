//! Geometry and layout constants shared across the pipeline.
//!
//! The sensor side describes a 32-level hardware FIFO of 3-axis samples in
//! 8-bit low-power mode; the storage side describes a 64-byte-paged 32 KiB
//! non-volatile part with a one-page control region followed by the
//! append-only log-data region.

/// Axes sampled by the motion sensor.
pub const AXES: usize = 3;

/// Bytes per FIFO level: one low/high output register pair per axis.
pub const BYTES_PER_LEVEL: usize = 2 * AXES;

/// Levels held by the sensor FIFO.
pub const FIFO_LEVELS: usize = 32;

/// Size of one full FIFO read-out.
pub const RAW_BURST_BYTES: usize = FIFO_LEVELS * BYTES_PER_LEVEL;

/// High-register bytes in one burst (the 8-bit low-power samples).
pub const HIGH_BYTES_PER_BURST: usize = FIFO_LEVELS * AXES;

/// Decimation factor applied when a burst enters the history buffer.
pub const DOWNSAMPLE_FACTOR: usize = 2;

/// Levels surviving decimation.
pub const REDUCED_LEVELS: usize = FIFO_LEVELS / DOWNSAMPLE_FACTOR;

/// Size of one reduced burst.
pub const REDUCED_BURST_BYTES: usize = REDUCED_LEVELS * AXES;

/// Reduced bursts retained by the history buffer.
pub const HISTORY_DEPTH: usize = 6;

/// Size of the flattened history.
pub const HISTORY_BYTES: usize = HISTORY_DEPTH * REDUCED_BURST_BYTES;

/// Addressable unit of the non-volatile store.
pub const PAGE_SIZE: usize = 64;

/// Total pages of the non-volatile store.
pub const PAGE_COUNT: usize = 512;

/// Total store capacity in bytes.
pub const MEMORY_BYTES: usize = PAGE_SIZE * PAGE_COUNT;

/// Address of the mode/flags control byte (control region, page 0).
pub const CTRL_FLAGS_ADDR: u16 = 0x0000;

/// Address of the little-endian u16 written-pages counter.
pub const CTRL_PAGE_COUNT_ADDR: u16 = 0x0008;

/// First address of the log-data region (page 1).
pub const LOG_DATA_BASE_ADDR: u16 = 0x0040;

/// Pages available to the log-data region.
pub const LOG_DATA_PAGES: usize = PAGE_COUNT - 1;

/// Pages written per over-threshold event.
pub const LOG_PAGES_PER_EVENT: usize = 5;

/// Log record header size: id, event source, 16-bit timestamp.
pub const LOG_HEADER_BYTES: usize = 4;

/// Payload carried by one log record.
pub const LOG_PAYLOAD_BYTES: usize = 60;

/// Serialized log record size, exactly one store page.
pub const LOG_RECORD_BYTES: usize = LOG_HEADER_BYTES + LOG_PAYLOAD_BYTES;
