//! Scripted feed - replays timed provider events.
//!
//! Each subscription spawns a tokio task that walks the script in offset order,
//! sleeping until each step is due. Unsubscribing cancels the replay.
//!
//! # Design
//!
//! Follows the adapter pattern used by the other async sources:
//! - `subscribe()` spawns the replay task
//! - `tokio::select!` between the next due step and cancellation
//! - Listener-gone detection stops the replay early

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use parking_lot::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::{FeedError, FeedSink, ProviderFeed, Subscription};
use crate::reading::{ProviderId, Reading};

/// One event in a script.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptedEvent {
    /// Deliver this reading verbatim.
    Reading(Reading),

    /// Deliver a reading stamped at delivery time minus `age`, attributed to the feed.
    Fix {
        latitude: f64,
        longitude: f64,
        accuracy_m: f32,
        age: Duration,
    },

    /// Report a provider failure.
    Error(String),
}

/// A scripted event and when it fires, relative to subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptStep {
    pub offset: Duration,
    pub event: ScriptedEvent,
}

/// Feed that replays a fixed script for every subscriber.
pub struct ScriptedFeed {
    id: ProviderId,
    steps: Vec<ScriptStep>,
    next_id: AtomicU64,
    active: Mutex<HashMap<u64, CancellationToken>>,
}

impl ScriptedFeed {
    pub fn new(id: impl Into<ProviderId>) -> Self {
        Self {
            id: id.into(),
            steps: Vec::new(),
            next_id: AtomicU64::new(1),
            active: Mutex::new(HashMap::new()),
        }
    }

    /// Add a step. Steps may be added in any order.
    pub fn step(mut self, offset: Duration, event: ScriptedEvent) -> Self {
        let index = self.steps.partition_point(|s| s.offset <= offset);
        self.steps.insert(index, ScriptStep { offset, event });
        self
    }

    /// Deliver `reading` at `offset`.
    pub fn reading_at(self, offset: Duration, reading: Reading) -> Self {
        self.step(offset, ScriptedEvent::Reading(reading))
    }

    /// Deliver a fresh fix with the given accuracy at `offset`.
    pub fn fix_at(self, offset: Duration, latitude: f64, longitude: f64, accuracy_m: f32) -> Self {
        self.step(
            offset,
            ScriptedEvent::Fix {
                latitude,
                longitude,
                accuracy_m,
                age: Duration::ZERO,
            },
        )
    }

    /// Report a provider failure at `offset`.
    pub fn error_at(self, offset: Duration, reason: impl Into<String>) -> Self {
        self.step(offset, ScriptedEvent::Error(reason.into()))
    }

    /// Script steps in firing order.
    pub fn steps(&self) -> &[ScriptStep] {
        &self.steps
    }

    /// Number of replays currently running.
    pub fn active_subscriptions(&self) -> usize {
        self.active.lock().len()
    }
}

impl ProviderFeed for ScriptedFeed {
    fn id(&self) -> ProviderId {
        self.id.clone()
    }

    fn subscribe(&self, sink: FeedSink) -> Result<Subscription, FeedError> {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|e| FeedError::SubscribeFailed {
                provider: self.id.clone(),
                reason: e.to_string(),
            })?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        self.active.lock().insert(id, token.clone());

        let replay = Replay {
            steps: self.steps.clone(),
            sink,
            token,
        };
        runtime.spawn(replay.run());

        Ok(Subscription::new(id))
    }

    fn unsubscribe(&self, subscription: Subscription) {
        if let Some(token) = self.active.lock().remove(&subscription.id()) {
            token.cancel();
        }
    }
}

/// State owned by one running replay.
struct Replay {
    steps: Vec<ScriptStep>,
    sink: FeedSink,
    token: CancellationToken,
}

impl Replay {
    async fn run(self) {
        let provider = self.sink.provider();
        tracing::debug!(provider = %provider, steps = self.steps.len(), "Script replay started");

        let started = Instant::now();
        for step in &self.steps {
            tokio::select! {
                _ = self.token.cancelled() => {
                    tracing::debug!(provider = %provider, "Script replay cancelled");
                    return;
                }
                _ = tokio::time::sleep_until(started + step.offset) => {}
            }

            // The previous delivery may have released this subscription.
            if self.token.is_cancelled() {
                return;
            }

            if !self.deliver(&step.event) {
                tracing::debug!(provider = %provider, "Listener gone, stopping replay");
                return;
            }
        }

        tracing::debug!(provider = %provider, "Script replay finished");
    }

    fn deliver(&self, event: &ScriptedEvent) -> bool {
        match event {
            ScriptedEvent::Reading(reading) => self.sink.reading(reading.clone()),
            ScriptedEvent::Fix {
                latitude,
                longitude,
                accuracy_m,
                age,
            } => {
                let age = TimeDelta::from_std(*age).unwrap_or(TimeDelta::zero());
                let reading = Reading::new(*latitude, *longitude, *accuracy_m, Utc::now() - age)
                    .with_provider(self.sink.provider().clone());
                self.sink.reading(reading)
            }
            ScriptedEvent::Error(reason) => self.sink.error(reason.as_str()),
        }
    }
}
