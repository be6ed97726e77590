//! Error types shared by the mode controller and the pipeline.

use core::fmt::Debug;

use thiserror_no_std::Error;

/// Failure of a pipeline step, tagged with the hardware seam it crossed.
///
/// `SE` is the motion sensor's bus error, `PE` the page store's. Both are
/// carried verbatim so the host can log the underlying HAL error.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineError<SE: Debug, PE: Debug> {
    #[error("motion sensor access failed: {0:?}")]
    Sensor(SE),
    #[error("persistent store access failed: {0:?}")]
    Store(PE),
}
