//! Acquisition task - listens to providers until one reading wins.
//!
//! The task subscribes to every provider, runs each incoming reading through a
//! [`ReadingComparator`], and keeps the winner as its best reading. It ends
//! exactly once, on whichever comes first:
//!
//! - a best reading within the accuracy threshold → `Success`
//! - the deadline → `Success` with the best reading, or `TimedOut`
//! - `cancel()` or the linked cancellation token → `Cancelled`
//! - every provider failing before any reading was accepted → `Failed`
//!
//! # Concurrency
//!
//! All state lives behind one mutex. Readings are validated and compared while
//! holding it, so concurrent providers are serialized. Resolution takes the
//! outcome sender out of the state, which makes the first resolver the only
//! one; later calls see a resolved phase and return. Unsubscribing and
//! delivering the outcome happen after the lock is released, because feeds
//! may call back into the task from inside `unsubscribe`.
//!
//! # Usage
//!
//! ```ignore
//! let gps: Arc<dyn ProviderFeed> = Arc::new(PushFeed::new("gps"));
//! let config = AcquisitionConfig::new(Duration::from_secs(10)).with_accuracy_threshold(20.0);
//!
//! let handle = AcquisitionTask::new(config).start(vec![gps])?;
//! match handle.outcome().await {
//!     AcquisitionOutcome::Success(reading) => println!("{:?}", reading.position()),
//!     other => println!("no fix: {:?}", other),
//! }
//! ```

use std::collections::HashSet;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::config::AcquisitionConfig;
use super::error::AcquisitionError;
use super::outcome::{AcquisitionOutcome, TaskPhase};
use crate::comparator::{ReadingComparator, RecencyAccuracyComparator};
use crate::feed::{FeedListener, FeedSink, ProviderFeed, Subscription};
use crate::reading::{ProviderId, Reading};

/// Stand-in deadline for durations too large to add to an `Instant` (~30 years).
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Builder and entry point for an acquisition.
pub struct AcquisitionTask {
    config: AcquisitionConfig,
    comparator: Arc<dyn ReadingComparator>,
    cancellation: Option<CancellationToken>,
}

impl AcquisitionTask {
    /// Create a task using the default recency/accuracy comparator.
    pub fn new(config: AcquisitionConfig) -> Self {
        Self {
            config,
            comparator: Arc::new(RecencyAccuracyComparator),
            cancellation: None,
        }
    }

    /// Use a different arbitration policy.
    pub fn with_comparator(mut self, comparator: impl ReadingComparator + 'static) -> Self {
        self.comparator = Arc::new(comparator);
        self
    }

    /// Cancel the acquisition when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Subscribe to `providers` and start the deadline.
    ///
    /// Fails without subscribing anything if the configuration is invalid, the
    /// provider set is empty or contains duplicates, or no tokio runtime is
    /// available. Everything after that is reported through
    /// [`AcquisitionHandle::outcome`].
    pub fn start(
        self,
        providers: Vec<Arc<dyn ProviderFeed>>,
    ) -> Result<AcquisitionHandle, AcquisitionError> {
        if providers.is_empty() {
            return Err(AcquisitionError::EmptyProviderSet);
        }
        self.config.validate()?;

        let mut seen = HashSet::new();
        for feed in &providers {
            let id = feed.id();
            if !seen.insert(id.clone()) {
                return Err(AcquisitionError::DuplicateProvider(id));
            }
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| AcquisitionError::RuntimeUnavailable)?;
        let started = Instant::now();

        let (outcome_tx, outcome_rx) = oneshot::channel();
        let slots = providers
            .into_iter()
            .map(|feed| ProviderSlot {
                id: feed.id(),
                feed,
                subscription: None,
                failed: false,
            })
            .collect();

        let core = Arc::new(TaskCore {
            config: self.config,
            comparator: self.comparator,
            state: Mutex::new(TaskState {
                phase: TaskPhase::Idle,
                best: None,
                providers: slots,
                outcome_tx: Some(outcome_tx),
            }),
            deadline_guard: CancellationToken::new(),
        });

        core.listen();
        core.spawn_deadline(
            &runtime,
            started,
            self.cancellation.unwrap_or_default(),
        );

        Ok(AcquisitionHandle { core, outcome_rx })
    }
}

/// Owner's handle on a running acquisition.
pub struct AcquisitionHandle {
    core: Arc<TaskCore>,
    outcome_rx: oneshot::Receiver<AcquisitionOutcome>,
}

impl AcquisitionHandle {
    /// Cancel the acquisition.
    ///
    /// Returns true if this call ended the task, false if it had already
    /// resolved.
    pub fn cancel(&self) -> bool {
        self.core.cancel()
    }

    /// Current lifecycle phase.
    pub fn status(&self) -> TaskPhase {
        self.core.state.lock().phase
    }

    pub fn is_resolved(&self) -> bool {
        self.status().is_resolved()
    }

    /// Snapshot of the current best reading.
    pub fn best_reading(&self) -> Option<Reading> {
        self.core.state.lock().best.clone()
    }

    /// A cloneable cancel-only handle, for use while awaiting the outcome.
    pub fn canceller(&self) -> AcquisitionCanceller {
        AcquisitionCanceller {
            core: Arc::downgrade(&self.core),
        }
    }

    /// Wait for the single outcome of this acquisition.
    pub async fn outcome(self) -> AcquisitionOutcome {
        self.outcome_rx.await.unwrap_or_else(|_| {
            // The sender only drops unsent if the task state was torn down
            AcquisitionOutcome::Failed("acquisition task dropped".to_string())
        })
    }
}

impl std::fmt::Debug for AcquisitionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcquisitionHandle")
            .field("status", &self.status())
            .finish()
    }
}

/// Cancel-only handle; does not keep the task alive.
#[derive(Clone)]
pub struct AcquisitionCanceller {
    core: Weak<TaskCore>,
}

impl AcquisitionCanceller {
    /// Same as [`AcquisitionHandle::cancel`]; false if the task is gone.
    pub fn cancel(&self) -> bool {
        self.core.upgrade().is_some_and(|core| core.cancel())
    }
}

struct ProviderSlot {
    id: ProviderId,
    feed: Arc<dyn ProviderFeed>,
    subscription: Option<Subscription>,
    failed: bool,
}

struct TaskState {
    phase: TaskPhase,
    best: Option<Reading>,
    providers: Vec<ProviderSlot>,
    outcome_tx: Option<oneshot::Sender<AcquisitionOutcome>>,
}

/// Work left after resolving, done outside the state lock.
struct Resolution {
    outcome: AcquisitionOutcome,
    outcome_tx: Option<oneshot::Sender<AcquisitionOutcome>>,
    released: Vec<(Arc<dyn ProviderFeed>, Subscription)>,
}

struct TaskCore {
    config: AcquisitionConfig,
    comparator: Arc<dyn ReadingComparator>,
    state: Mutex<TaskState>,
    /// Cancelled on resolution so the deadline timer never fires late.
    deadline_guard: CancellationToken,
}

impl TaskCore {
    /// Enter `Listening` and subscribe to every provider.
    ///
    /// The phase changes first so readings delivered from inside `subscribe`
    /// are not lost.
    fn listen(self: &Arc<Self>) {
        let feeds: Vec<(ProviderId, Arc<dyn ProviderFeed>)> = {
            let mut state = self.state.lock();
            state.phase = TaskPhase::Listening;
            state
                .providers
                .iter()
                .map(|slot| (slot.id.clone(), Arc::clone(&slot.feed)))
                .collect()
        };

        tracing::info!(
            providers = feeds.len(),
            deadline_ms = self.config.deadline.as_millis() as u64,
            accuracy_threshold = ?self.config.accuracy_threshold,
            "Acquisition started"
        );

        let listener: Weak<dyn FeedListener> = Arc::downgrade(self) as Weak<dyn FeedListener>;

        for (index, (id, feed)) in feeds.into_iter().enumerate() {
            if self.state.lock().phase.is_resolved() {
                break;
            }
            match feed.subscribe(FeedSink::new(id.clone(), listener.clone())) {
                Ok(subscription) => {
                    let mut state = self.state.lock();
                    if state.phase.is_resolved() {
                        drop(state);
                        tracing::debug!(provider = %id, "Resolved during subscription, releasing");
                        feed.unsubscribe(subscription);
                    } else {
                        state.providers[index].subscription = Some(subscription);
                        tracing::debug!(provider = %id, "Subscribed to provider");
                    }
                }
                Err(e) => {
                    tracing::warn!(provider = %id, error = %e, "Failed to subscribe to provider");
                    self.on_provider_error(&id, e.to_string());
                }
            }
        }
    }

    fn spawn_deadline(
        self: &Arc<Self>,
        runtime: &tokio::runtime::Handle,
        started: Instant,
        external: CancellationToken,
    ) {
        let core = Arc::clone(self);
        let guard = self.deadline_guard.clone();
        // Deadlines past the representable range never fire
        let deadline = started
            .checked_add(self.config.deadline)
            .unwrap_or_else(|| started + FAR_FUTURE);

        runtime.spawn(async move {
            tokio::select! {
                biased;
                _ = guard.cancelled() => {}
                _ = external.cancelled() => {
                    tracing::debug!("Acquisition cancellation token fired");
                    core.cancel();
                }
                _ = tokio::time::sleep_until(deadline) => core.on_deadline(),
            }
        });
    }

    fn cancel(&self) -> bool {
        let resolution = {
            let mut state = self.state.lock();
            if !state.phase.is_open() {
                return false;
            }
            self.resolve_locked(&mut state, AcquisitionOutcome::Cancelled)
        };
        self.finish(resolution)
    }

    fn on_deadline(&self) {
        let resolution = {
            let mut state = self.state.lock();
            if state.phase != TaskPhase::Listening {
                return;
            }
            let outcome = match &state.best {
                Some(best) => AcquisitionOutcome::Success(best.clone()),
                None => AcquisitionOutcome::TimedOut,
            };
            tracing::debug!(has_reading = state.best.is_some(), "Acquisition deadline reached");
            self.resolve_locked(&mut state, outcome)
        };
        self.finish(resolution);
    }

    fn handle_reading(&self, provider: &ProviderId, reading: Reading) {
        let resolution = {
            let mut state = self.state.lock();
            if state.phase != TaskPhase::Listening {
                tracing::trace!(provider = %provider, "Reading after resolution ignored");
                return;
            }

            if let Err(e) = reading.validate() {
                tracing::warn!(provider = %provider, error = %e, "Dropping invalid reading");
                return;
            }

            if !self.comparator.is_better(&reading, state.best.as_ref()) {
                tracing::debug!(
                    provider = %provider,
                    accuracy_m = reading.accuracy.meters(),
                    "Reading rejected (better reading held)"
                );
                return;
            }

            tracing::debug!(
                provider = %provider,
                accuracy_m = reading.accuracy.meters(),
                "Reading accepted as best"
            );

            let threshold_met = self
                .config
                .accuracy_threshold
                .is_some_and(|threshold| reading.accuracy.meters() <= threshold);

            if !threshold_met {
                state.best = Some(reading);
                return;
            }
            let outcome = AcquisitionOutcome::Success(reading.clone());
            state.best = Some(reading);
            self.resolve_locked(&mut state, outcome)
        };
        self.finish(resolution);
    }

    fn handle_provider_error(&self, provider: &ProviderId, reason: String) {
        let resolution = {
            let mut state = self.state.lock();
            if state.phase != TaskPhase::Listening {
                return;
            }

            let Some(slot) = state.providers.iter_mut().find(|slot| &slot.id == provider) else {
                tracing::warn!(provider = %provider, "Error from unknown provider ignored");
                return;
            };
            slot.failed = true;

            let all_failed = state.providers.iter().all(|slot| slot.failed);
            if !all_failed || state.best.is_some() {
                tracing::warn!(
                    provider = %provider,
                    reason = %reason,
                    all_failed,
                    "Provider error, continuing"
                );
                return;
            }

            tracing::warn!(provider = %provider, reason = %reason, "All providers failed");
            self.resolve_locked(&mut state, AcquisitionOutcome::Failed(reason))
        };
        self.finish(resolution);
    }

    /// Move to `Resolved` and collect what must be released.
    ///
    /// Returns `None` if another path already resolved the task.
    fn resolve_locked(
        &self,
        state: &mut TaskState,
        outcome: AcquisitionOutcome,
    ) -> Option<Resolution> {
        if state.phase.is_resolved() {
            return None;
        }
        state.phase = TaskPhase::Resolved(outcome.kind());
        self.deadline_guard.cancel();

        let released = state
            .providers
            .iter_mut()
            .filter_map(|slot| {
                slot.subscription
                    .take()
                    .map(|subscription| (Arc::clone(&slot.feed), subscription))
            })
            .collect();

        Some(Resolution {
            outcome,
            outcome_tx: state.outcome_tx.take(),
            released,
        })
    }

    /// Release subscriptions, then deliver the outcome.
    fn finish(&self, resolution: Option<Resolution>) -> bool {
        let Some(resolution) = resolution else {
            return false;
        };

        for (feed, subscription) in resolution.released {
            feed.unsubscribe(subscription);
        }

        let outcome = resolution.outcome;
        match outcome.reading() {
            Some(reading) => tracing::info!(
                outcome = %outcome.kind(),
                accuracy_m = reading.accuracy.meters(),
                provider = ?reading.provider,
                "Acquisition resolved"
            ),
            None => tracing::info!(outcome = %outcome.kind(), "Acquisition resolved"),
        }

        if let Some(tx) = resolution.outcome_tx {
            if tx.send(outcome).is_err() {
                tracing::debug!("Acquisition outcome receiver dropped");
            }
        }
        true
    }
}

impl FeedListener for TaskCore {
    fn on_reading(&self, provider: &ProviderId, reading: Reading) {
        self.handle_reading(provider, reading);
    }

    fn on_provider_error(&self, provider: &ProviderId, reason: String) {
        self.handle_provider_error(provider, reason);
    }
}
