//! Bounded, single-shot position acquisition.
//!
//! An [`AcquisitionTask`] listens to a set of [`ProviderFeed`](crate::feed::ProviderFeed)s,
//! arbitrates every reading through a [`ReadingComparator`](crate::comparator::ReadingComparator),
//! and ends with exactly one [`AcquisitionOutcome`].
//!
//! # Components
//!
//! - [`AcquisitionConfig`] - deadline and optional accuracy threshold
//! - [`AcquisitionError`] - raised synchronously by `start`
//! - [`AcquisitionOutcome`], [`OutcomeKind`], [`TaskPhase`] - how and whether a task ended
//! - [`AcquisitionTask`] and its [`AcquisitionHandle`]

mod config;
mod error;
mod outcome;
mod task;

pub use config::{AcquisitionConfig, DEFAULT_DEADLINE_SECS};
pub use error::AcquisitionError;
pub use outcome::{AcquisitionOutcome, OutcomeKind, TaskPhase};
pub use task::{AcquisitionCanceller, AcquisitionHandle, AcquisitionTask};
