//! Push feed - readings are pushed in by the embedder.
//!
//! This is the adapter for callback-driven platform location services: the
//! platform callback calls [`PushFeed::push`] and the feed fans the reading
//! out to every active subscription.
//!
//! # Usage
//!
//! ```ignore
//! let gps = Arc::new(PushFeed::new("gps"));
//! let handle = AcquisitionTask::new(config).start(vec![gps.clone()])?;
//!
//! // From the platform callback
//! gps.push(Reading::new(lat, lon, accuracy, timestamp));
//! ```

use std::collections::HashMap;

use parking_lot::Mutex;

use super::{FeedError, FeedSink, ProviderFeed, Subscription};
use crate::reading::{ProviderId, Reading};

#[derive(Default)]
struct PushFeedState {
    next_id: u64,
    sinks: HashMap<u64, FeedSink>,
    total_subscriptions: u64,
}

/// Feed driven by explicit [`push`](Self::push) and [`fail`](Self::fail) calls.
pub struct PushFeed {
    id: ProviderId,
    state: Mutex<PushFeedState>,
}

impl PushFeed {
    pub fn new(id: impl Into<ProviderId>) -> Self {
        Self {
            id: id.into(),
            state: Mutex::new(PushFeedState::default()),
        }
    }

    /// Deliver a reading to every subscriber.
    ///
    /// Readings without a provider attribution are stamped with this feed's id.
    /// Returns the number of subscribers that received it.
    pub fn push(&self, mut reading: Reading) -> usize {
        if reading.provider.is_none() {
            reading.provider = Some(self.id.clone());
        }

        // Sinks call back into listeners that may unsubscribe from this feed,
        // so deliver outside the lock.
        let sinks = self.snapshot();
        sinks
            .iter()
            .filter(|sink| sink.reading(reading.clone()))
            .count()
    }

    /// Report a provider failure to every subscriber.
    pub fn fail(&self, reason: &str) -> usize {
        let sinks = self.snapshot();
        sinks.iter().filter(|sink| sink.error(reason)).count()
    }

    /// Number of currently active subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.state.lock().sinks.len()
    }

    /// Number of subscriptions ever created on this feed.
    pub fn total_subscriptions(&self) -> u64 {
        self.state.lock().total_subscriptions
    }

    fn snapshot(&self) -> Vec<FeedSink> {
        self.state.lock().sinks.values().cloned().collect()
    }
}

impl ProviderFeed for PushFeed {
    fn id(&self) -> ProviderId {
        self.id.clone()
    }

    fn subscribe(&self, sink: FeedSink) -> Result<Subscription, FeedError> {
        let mut state = self.state.lock();
        state.next_id += 1;
        state.total_subscriptions += 1;
        let id = state.next_id;
        state.sinks.insert(id, sink);

        tracing::trace!(provider = %self.id, subscription = id, "Push feed subscribed");
        Ok(Subscription::new(id))
    }

    fn unsubscribe(&self, subscription: Subscription) {
        if self.state.lock().sinks.remove(&subscription.id()).is_some() {
            tracing::trace!(
                provider = %self.id,
                subscription = subscription.id(),
                "Push feed unsubscribed"
            );
        }
    }
}

impl std::fmt::Debug for PushFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushFeed")
            .field("id", &self.id)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
