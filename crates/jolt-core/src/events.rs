//! Set-and-drain event flags linking interrupt context to the main loop.
//!
//! Each flag has exactly one writer (the hardware event handler that raises
//! it) and one reader (the pipeline poll step that takes it). Handlers only
//! raise flags and touch hardware registers they own; the poll step clears a
//! flag after fully draining the condition behind it. No locks are involved.

use core::sync::atomic::{AtomicBool, Ordering};

/// One atomic flag per asynchronous event kind.
///
/// Intended to live in a `static` so interrupt handlers can reach it by
/// shared reference.
pub struct EventFlags {
    burst_ready: AtomicBool,
    over_threshold: AtomicBool,
    run_toggle: AtomicBool,
    config_toggle: AtomicBool,
}

impl EventFlags {
    pub const fn new() -> Self {
        Self {
            burst_ready: AtomicBool::new(false),
            over_threshold: AtomicBool::new(false),
            run_toggle: AtomicBool::new(false),
            config_toggle: AtomicBool::new(false),
        }
    }

    /// FIFO overrun reported: a full burst is ready to be read.
    pub fn raise_burst_ready(&self) {
        self.burst_ready.store(true, Ordering::Release);
    }

    pub fn take_burst_ready(&self) -> bool {
        self.burst_ready.swap(false, Ordering::AcqRel)
    }

    /// Over-threshold interrupt reported by the sensor.
    pub fn raise_over_threshold(&self) {
        self.over_threshold.store(true, Ordering::Release);
    }

    pub fn take_over_threshold(&self) -> bool {
        self.over_threshold.swap(false, Ordering::AcqRel)
    }

    /// Double-click input: request a stop/start toggle.
    pub fn raise_run_toggle(&self) {
        self.run_toggle.store(true, Ordering::Release);
    }

    pub fn take_run_toggle(&self) -> bool {
        self.run_toggle.swap(false, Ordering::AcqRel)
    }

    /// Long-press input: request entering or leaving config mode.
    pub fn raise_config_toggle(&self) {
        self.config_toggle.store(true, Ordering::Release);
    }

    pub fn take_config_toggle(&self) -> bool {
        self.config_toggle.swap(false, Ordering::AcqRel)
    }
}

impl Default for EventFlags {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_clears_flag() {
        let flags = EventFlags::new();
        assert!(!flags.take_burst_ready());

        flags.raise_burst_ready();
        assert!(flags.take_burst_ready());
        assert!(!flags.take_burst_ready());
    }

    #[test]
    fn test_flags_are_independent() {
        let flags = EventFlags::new();
        flags.raise_run_toggle();
        flags.raise_over_threshold();

        assert!(!flags.take_burst_ready());
        assert!(!flags.take_config_toggle());
        assert!(flags.take_run_toggle());
        assert!(flags.take_over_threshold());
    }
}
