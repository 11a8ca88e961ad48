//! Error types for starting an acquisition.

use thiserror::Error;

use crate::reading::ProviderId;

/// Errors surfaced synchronously by [`AcquisitionTask::start`](super::AcquisitionTask::start).
///
/// Once a task has started, every ending (including provider failure) is
/// delivered as an [`AcquisitionOutcome`](super::AcquisitionOutcome) instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AcquisitionError {
    /// No providers to listen to.
    #[error("no position providers supplied")]
    EmptyProviderSet,

    /// The same provider was supplied twice.
    #[error("provider {0} supplied more than once")]
    DuplicateProvider(ProviderId),

    /// Accuracy threshold is negative or not a number.
    #[error("accuracy threshold must be a finite, non-negative number (got {0})")]
    InvalidThreshold(f32),

    /// A zero deadline can never produce a reading.
    #[error("deadline must be greater than zero")]
    ZeroDeadline,

    /// The deadline timer needs a tokio runtime.
    #[error("acquisition must be started inside a tokio runtime")]
    RuntimeUnavailable,
}

impl AcquisitionError {
    /// True for errors caused by the values passed to `start`.
    pub fn is_configuration_error(&self) -> bool {
        !matches!(self, AcquisitionError::RuntimeUnavailable)
    }
}
