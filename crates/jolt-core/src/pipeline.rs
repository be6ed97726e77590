//! Cooperative main-loop core.
//!
//! A single execution context drains the [`EventFlags`] raised by hardware
//! event handlers: mode toggles first, then the burst-ready and
//! over-threshold conditions. Handlers never touch the store or the
//! history; everything below runs to completion inside `poll`.

use embedded_io::Write;
use log::{debug, warn};

use crate::error::PipelineError;
use crate::events::EventFlags;
use crate::history::{HistoryBuffer, ReducedBurst};
use crate::mode::{Mode, ModeController};
use crate::protocol;
use crate::sensor::MotionSensor;
use crate::storage::{LogStore, PageStore};
use crate::time::MonotonicClock;

pub struct Pipeline<'a, S, P, C> {
    sensor: S,
    store: LogStore<P>,
    clock: C,
    flags: &'a EventFlags,
    history: HistoryBuffer,
    controller: ModeController,
}

impl<'a, S, P, C> Pipeline<'a, S, P, C>
where
    S: MotionSensor,
    P: PageStore,
    C: MonotonicClock,
{
    /// Restore persisted mode state and assemble the pipeline.
    pub fn restore(
        mut sensor: S,
        pages: P,
        clock: C,
        flags: &'a EventFlags,
    ) -> Result<Self, PipelineError<S::Error, P::Error>> {
        let mut store = LogStore::new(pages);
        let controller = ModeController::restore(&mut sensor, &mut store)?;
        Ok(Self {
            sensor,
            store,
            clock,
            flags,
            history: HistoryBuffer::new(),
            controller,
        })
    }

    pub fn mode(&self) -> Mode {
        self.controller.mode()
    }

    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    /// Store access for the remote command path, which runs between polls
    /// on the same execution context.
    pub fn store_mut(&mut self) -> &mut LogStore<P> {
        &mut self.store
    }

    pub fn controller_mut(&mut self) -> &mut ModeController {
        &mut self.controller
    }

    /// One cooperative iteration: dispatch pending mode toggles, then drain
    /// the burst-ready and over-threshold conditions.
    ///
    /// Burst and threshold work is gated on acquisition being active; a
    /// flag raised just before a stop took effect is dropped.
    pub fn poll<W: Write>(
        &mut self,
        telemetry: &mut W,
    ) -> Result<(), PipelineError<S::Error, P::Error>> {
        if self.flags.take_run_toggle() {
            self.controller.toggle_run(&mut self.sensor, &mut self.store)?;
        }
        if self.flags.take_config_toggle() {
            self.controller
                .toggle_config(&mut self.sensor, &mut self.store)?;
        }

        if self.flags.take_burst_ready() && self.controller.acquisition_active() {
            self.service_burst(telemetry)?;
        }
        if self.flags.take_over_threshold() && self.controller.acquisition_active() {
            self.service_threshold()?;
        }
        Ok(())
    }

    /// Read the completed FIFO, fold it into the history and re-arm the
    /// overrun latch. Telemetry forwarding is advisory: a link failure is
    /// logged and dropped.
    fn service_burst<W: Write>(
        &mut self,
        telemetry: &mut W,
    ) -> Result<(), PipelineError<S::Error, P::Error>> {
        let burst = self.sensor.read_burst().map_err(PipelineError::Sensor)?;
        self.history.push(ReducedBurst::from_raw(&burst));

        if self.store.verbose_send().map_err(PipelineError::Store)? {
            if let Err(e) = protocol::send_burst(&burst, telemetry) {
                warn!("telemetry send failed: {:?}", e);
            }
        }

        self.sensor
            .reset_fifo_latch()
            .map_err(PipelineError::Sensor)?;
        debug!("burst recorded, history depth {}", self.history.len());
        Ok(())
    }

    /// Snapshot the event, wait out the interrupt condition and append the
    /// five-page log.
    fn service_threshold(&mut self) -> Result<(), PipelineError<S::Error, P::Error>> {
        let id = self.store.log_count().map_err(PipelineError::Store)?;
        let event_source = self
            .sensor
            .interrupt_source()
            .map_err(PipelineError::Sensor)?;
        let timestamp = self.clock.seconds_since_boot();

        // Capture every interrupt belonging to this event before re-arming.
        // Bounded only by the sensor's event duration; not cancellable.
        while self.sensor.event_active().map_err(PipelineError::Sensor)? {}

        self.store
            .append_log(id, event_source, timestamp, &self.history)
            .map_err(PipelineError::Store)?;
        self.sensor
            .reset_fifo_latch()
            .map_err(PipelineError::Sensor)?;

        debug!("over-threshold event {} logged at {}s", id, timestamp);
        Ok(())
    }
}
