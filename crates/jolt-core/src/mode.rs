//! Acquisition mode state machine.
//!
//! Three modes govern the device: `Stop` and `Start` toggle on a
//! double-click and mirror themselves into the persisted control byte;
//! `Config` overlays either of them on a long-press and is deliberately
//! never persisted as a resumable state. Leaving config reads the prior
//! mode back from the store rather than from memory, so the round trip
//! survives a power cycle at any point.

use log::info;

use crate::error::PipelineError;
use crate::sensor::{AcquisitionMode, MotionSensor};
use crate::storage::{LogStore, PageStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Acquisition disabled.
    Stop,
    /// Acquisition running; bursts and threshold events are processed.
    Start,
    /// Transient configuration overlay; acquisition disabled.
    Config,
}

/// Mode state plus the verbose-send value accumulated while configuring.
pub struct ModeController {
    mode: Mode,
    pending_send: bool,
}

impl ModeController {
    /// Boot path: rebuild mode state from the persisted control byte.
    ///
    /// A power cycle resumes the stored Start/Stop state. Config is never
    /// resumed: a stale config-active bit (power lost while configuring) is
    /// cleared and the underlying Start/Stop state taken instead. On a
    /// factory-fresh store the zeroed byte yields `Stop`.
    pub fn restore<S, P>(
        sensor: &mut S,
        store: &mut LogStore<P>,
    ) -> Result<Self, PipelineError<S::Error, P::Error>>
    where
        S: MotionSensor,
        P: PageStore,
    {
        if store.config_active().map_err(PipelineError::Store)? {
            store
                .save_config_active(false)
                .map_err(PipelineError::Store)?;
        }

        let running = store.run_state().map_err(PipelineError::Store)?;
        let mode = if running { Mode::Start } else { Mode::Stop };
        sensor
            .configure(if running {
                AcquisitionMode::HighRate
            } else {
                AcquisitionMode::Stopped
            })
            .map_err(PipelineError::Sensor)?;

        info!("restored mode {:?}", mode);
        Ok(Self {
            mode,
            pending_send: false,
        })
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Whether acquired data may reach the history buffer and log store.
    pub fn acquisition_active(&self) -> bool {
        self.mode == Mode::Start
    }

    /// Double-click: toggle between Stop and Start. A no-op in Config.
    pub fn toggle_run<S, P>(
        &mut self,
        sensor: &mut S,
        store: &mut LogStore<P>,
    ) -> Result<(), PipelineError<S::Error, P::Error>>
    where
        S: MotionSensor,
        P: PageStore,
    {
        match self.mode {
            Mode::Start => {
                sensor
                    .configure(AcquisitionMode::Stopped)
                    .map_err(PipelineError::Sensor)?;
                store.save_run_state(false).map_err(PipelineError::Store)?;
                self.mode = Mode::Stop;
                info!("acquisition stopped");
            }
            Mode::Stop => {
                sensor
                    .configure(AcquisitionMode::HighRate)
                    .map_err(PipelineError::Sensor)?;
                store.save_run_state(true).map_err(PipelineError::Store)?;
                self.mode = Mode::Start;
                info!("acquisition started");
            }
            Mode::Config => {}
        }
        Ok(())
    }

    /// Long-press: enter config from Stop/Start, or leave it again.
    ///
    /// Leaving resumes whichever Start/Stop state the persisted mirror
    /// holds and persists the verbose-send value accumulated meanwhile.
    pub fn toggle_config<S, P>(
        &mut self,
        sensor: &mut S,
        store: &mut LogStore<P>,
    ) -> Result<(), PipelineError<S::Error, P::Error>>
    where
        S: MotionSensor,
        P: PageStore,
    {
        if self.mode != Mode::Config {
            if self.mode == Mode::Start {
                sensor
                    .configure(AcquisitionMode::Stopped)
                    .map_err(PipelineError::Sensor)?;
            }
            self.mode = Mode::Config;
            store.save_config_active(true).map_err(PipelineError::Store)?;
            info!("entered config mode");
        } else {
            let running = store.run_state().map_err(PipelineError::Store)?;
            self.mode = if running { Mode::Start } else { Mode::Stop };
            store
                .save_config_active(false)
                .map_err(PipelineError::Store)?;
            if running {
                sensor
                    .configure(AcquisitionMode::HighRate)
                    .map_err(PipelineError::Sensor)?;
            }
            store
                .save_verbose_send(self.pending_send)
                .map_err(PipelineError::Store)?;
            info!("left config mode, resumed {:?}", self.mode);
        }
        Ok(())
    }

    /// Record the verbose-send value selected while configuring. Ignored
    /// outside config mode.
    pub fn set_verbose_send(&mut self, enabled: bool) {
        if self.mode == Mode::Config {
            self.pending_send = enabled;
        }
    }
}
