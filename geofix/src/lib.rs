//! geofix - best-effort single position fix from independent providers.
//!
//! Position providers (satellite receivers, network location, fused sources)
//! update on their own schedules and with varying accuracy. This crate listens
//! to a set of them for a bounded time and arbitrates between successive
//! readings to settle on one fix.
//!
//! # Components
//!
//! - [`reading`] - `Reading`, `Accuracy`, `ProviderId`
//! - [`comparator`] - the recency/accuracy/provider arbitration policy
//! - [`feed`] - `ProviderFeed` abstraction with push and scripted feeds
//! - [`acquisition`] - `AcquisitionTask`, the single-shot acquisition lifecycle
//! - [`config`] - INI configuration file
//! - [`logging`] - tracing subscriber setup
//!
//! # Example
//!
//! ```ignore
//! use geofix::acquisition::{AcquisitionConfig, AcquisitionTask};
//! use geofix::feed::PushFeed;
//!
//! let gps = Arc::new(PushFeed::new("gps"));
//! let handle = AcquisitionTask::new(AcquisitionConfig::default()).start(vec![gps.clone()])?;
//!
//! // Platform callback
//! gps.push(reading);
//!
//! let outcome = handle.outcome().await;
//! ```

pub mod acquisition;
pub mod comparator;
pub mod config;
pub mod feed;
pub mod logging;
pub mod reading;

/// Version of the geofix library and CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
