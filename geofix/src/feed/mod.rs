//! Provider feeds - abstract sources of position readings.
//!
//! An acquisition task only needs to subscribe to a feed and later release the
//! subscription. Everything platform specific (satellite receivers, network
//! location services, fused providers) lives behind [`ProviderFeed`].
//!
//! # Architecture
//!
//! ```text
//! ProviderFeed ──subscribe(FeedSink)──► Subscription
//!      │
//!      └── FeedSink::reading() / FeedSink::error()
//!              │
//!              └── FeedListener (acquisition task)
//! ```
//!
//! A [`FeedSink`] holds only a weak reference to its listener, so a feed that
//! outlives a finished acquisition never keeps it alive.
//!
//! # Implementations
//!
//! - [`PushFeed`] - driven by the embedder, e.g. from a platform callback
//! - [`ScriptedFeed`] - replays a timed script, for simulations and tests

mod push;
mod scripted;

use std::sync::Weak;

use thiserror::Error;

use crate::reading::{ProviderId, Reading};

pub use push::PushFeed;
pub use scripted::{ScriptStep, ScriptedEvent, ScriptedFeed};

/// Opaque handle identifying one subscription on one feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

impl Subscription {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Errors a feed can report when asked to subscribe.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeedError {
    #[error("failed to subscribe to provider {provider}: {reason}")]
    SubscribeFailed { provider: ProviderId, reason: String },
}

/// Receiver side of a feed, implemented by whoever consumes readings.
pub trait FeedListener: Send + Sync {
    /// A provider produced a reading.
    fn on_reading(&self, provider: &ProviderId, reading: Reading);

    /// A provider reported that it cannot produce readings.
    fn on_provider_error(&self, provider: &ProviderId, reason: String);
}

/// Callback pair handed to a feed on subscription.
///
/// Both delivery methods return `false` once the listener is gone; feeds may
/// use that to stop producing.
#[derive(Clone)]
pub struct FeedSink {
    provider: ProviderId,
    listener: Weak<dyn FeedListener>,
}

impl FeedSink {
    pub fn new(provider: ProviderId, listener: Weak<dyn FeedListener>) -> Self {
        Self { provider, listener }
    }

    /// Provider this sink reports on behalf of.
    pub fn provider(&self) -> &ProviderId {
        &self.provider
    }

    /// Deliver a reading.
    pub fn reading(&self, reading: Reading) -> bool {
        match self.listener.upgrade() {
            Some(listener) => {
                listener.on_reading(&self.provider, reading);
                true
            }
            None => false,
        }
    }

    /// Report a provider failure.
    pub fn error(&self, reason: impl Into<String>) -> bool {
        match self.listener.upgrade() {
            Some(listener) => {
                listener.on_provider_error(&self.provider, reason.into());
                true
            }
            None => false,
        }
    }

    /// True while the listener is still alive.
    pub fn is_connected(&self) -> bool {
        self.listener.strong_count() > 0
    }
}

impl std::fmt::Debug for FeedSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedSink")
            .field("provider", &self.provider)
            .field("connected", &self.is_connected())
            .finish()
    }
}

/// A source of position readings.
pub trait ProviderFeed: Send + Sync {
    /// Identity of this provider.
    fn id(&self) -> ProviderId;

    /// Start delivering readings and errors to `sink`.
    fn subscribe(&self, sink: FeedSink) -> Result<Subscription, FeedError>;

    /// Stop delivering to the given subscription.
    ///
    /// Must be idempotent: releasing an unknown or already released
    /// subscription is a no-op.
    fn unsubscribe(&self, subscription: Subscription);
}
