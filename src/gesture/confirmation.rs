//! Proximity-gated gesture confirmation
//!
//! A screen-off gesture is only acted on when the proximity sensor agrees. Each
//! trigger opens one confirmation attempt:
//!
//! ```text
//! trigger ──► wake lock ──► one-shot proximity listener ──► attempt open
//!                                   │
//!        ┌──────────────────────────┼──────────────────────┐
//!     reading                    deadline               shutdown
//!        │                          │                      │
//!        ▼                          ▼                      ▼
//!   release resources ───────── release resources ──── release resources
//!        │
//!   newer attempt already queued? ── yes ──► superseded, ignored
//!        │ no
//!   reading == max range? ── no ──► dropped
//!        │ yes
//!        ▼
//!   EventDispatcher queue
//! ```
//!
//! Several attempts may be open at once. An attempt only goes stale once a
//! newer one has reached the dispatch queue; until then its reading is honored.

use crate::device::{PowerControl, ProximitySensor, SubscriptionId, WakeLock};
use crate::gesture::dispatcher::{ConfirmedGesture, DispatchSender};
use crate::input::scan_code::Gesture;
use chrono::{DateTime, Local};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// How long an attempt may hold the wake lock waiting for the sensor
pub const DEFAULT_CONFIRMATION_DEADLINE_MS: u64 = 3000;

pub const DEFAULT_WAKE_LOCK_TAG: &str = "ProximityWakeLock";

/// Identifies one confirmation attempt. Tokens grow with every attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestToken(u64);

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "request-{}", self.0)
    }
}

/// An attempt still waiting for its reading
#[derive(Clone, Debug)]
pub struct PendingGestureRequest {
    pub token: RequestToken,
    pub gesture: Gesture,
    pub enqueued_at: DateTime<Local>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfirmationOutcome {
    /// Device covered, gesture queued for dispatch
    Confirmed,
    /// Reading below maximum range, gesture dropped
    NotCovered,
    /// A newer attempt reached the dispatch queue before this reading arrived
    Superseded,
    /// No reading before the deadline
    DeadlineExpired,
    /// The sensor dropped the listener without reporting
    SensorLost,
    /// The gate was shut down while waiting
    Cancelled,
    /// Confirmed, but the dispatch queue refused the request
    QueueRejected,
}

/// Handle to a running attempt
pub struct ConfirmationAttempt {
    pub token: RequestToken,
    handle: JoinHandle<ConfirmationOutcome>,
}

impl ConfirmationAttempt {
    /// Waits for the attempt to resolve
    pub async fn outcome(self) -> ConfirmationOutcome {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Confirmation {} task failed: {}", self.token, e);
                ConfirmationOutcome::Cancelled
            }
        }
    }
}

/// Resources held for one attempt. `release` consumes them, so they are
/// given back exactly once.
struct AttemptResources {
    wake_lock: Option<Box<dyn WakeLock>>,
    sensor: Arc<dyn ProximitySensor>,
    subscription: SubscriptionId,
}

impl AttemptResources {
    fn release(self) {
        if let Some(wake_lock) = self.wake_lock {
            wake_lock.release();
        }
        self.sensor.unsubscribe(self.subscription);
    }
}

/// The only state shared between attempts
#[derive(Debug, Default)]
struct GateState {
    open: BTreeMap<RequestToken, PendingGestureRequest>,
    /// Newest attempt whose gesture reached the dispatch queue
    last_queued: Option<RequestToken>,
}

impl GateState {
    fn is_stale(&self, token: RequestToken) -> bool {
        self.last_queued.is_some_and(|queued| queued > token)
    }
}

type SharedState = Arc<Mutex<GateState>>;

fn lock_state(state: &Mutex<GateState>) -> MutexGuard<'_, GateState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

enum Wakeup {
    Reading(f32),
    SensorLost,
    Deadline,
    Cancelled,
}

/// Everything an attempt's reading needs to be resolved
struct Resolution {
    token: RequestToken,
    gesture: Gesture,
    maximum_range: f32,
    state: SharedState,
    dispatcher: DispatchSender,
}

impl Resolution {
    fn resolve(self, wakeup: Wakeup) -> ConfirmationOutcome {
        // Stale check and posting happen under one lock so two readings cannot
        // both pass the check out of order
        let mut state = lock_state(&self.state);
        state.open.remove(&self.token);

        let value = match wakeup {
            Wakeup::Reading(value) => value,
            Wakeup::SensorLost => return ConfirmationOutcome::SensorLost,
            Wakeup::Deadline => return ConfirmationOutcome::DeadlineExpired,
            Wakeup::Cancelled => return ConfirmationOutcome::Cancelled,
        };

        if state.is_stale(self.token) {
            debug!(
                "{}: newer attempt already queued, ignoring reading {}",
                self.token, value
            );
            return ConfirmationOutcome::Superseded;
        }
        if value != self.maximum_range {
            debug!(
                "{}: reading {} below maximum range {}",
                self.token, value, self.maximum_range
            );
            return ConfirmationOutcome::NotCovered;
        }

        match self.dispatcher.post(ConfirmedGesture::new(self.gesture)) {
            Ok(()) => {
                state.last_queued = Some(self.token);
                ConfirmationOutcome::Confirmed
            }
            Err(e) => {
                warn!("{}: {}", self.token, e);
                ConfirmationOutcome::QueueRejected
            }
        }
    }
}

pub struct GestureConfirmationGate {
    sensor: Option<Arc<dyn ProximitySensor>>,
    power: Option<Arc<dyn PowerControl>>,
    dispatcher: DispatchSender,
    state: SharedState,
    next_token: AtomicU64,
    deadline: Duration,
    wake_lock_tag: String,
    runtime: Handle,
    shutdown: CancellationToken,
    tracker: TaskTracker,
}

impl GestureConfirmationGate {
    /// Must be called from within a tokio runtime. Attempts run on that
    /// runtime even when `begin` is called from another thread.
    pub fn new(
        sensor: Option<Arc<dyn ProximitySensor>>,
        power: Option<Arc<dyn PowerControl>>,
        dispatcher: DispatchSender,
        deadline: Duration,
        wake_lock_tag: impl Into<String>,
    ) -> Self {
        if sensor.is_none() {
            warn!("No proximity sensor, screen-off gestures cannot be confirmed");
        }
        if power.is_none() {
            info!("No power service, confirmations will run without a wake lock");
        }
        Self {
            sensor,
            power,
            dispatcher,
            state: Arc::new(Mutex::new(GateState::default())),
            next_token: AtomicU64::new(1),
            deadline,
            wake_lock_tag: wake_lock_tag.into(),
            runtime: Handle::current(),
            shutdown: CancellationToken::new(),
            tracker: TaskTracker::new(),
        }
    }

    /// Newest attempt still waiting for its reading
    pub fn pending(&self) -> Option<PendingGestureRequest> {
        lock_state(&self.state).open.values().next_back().cloned()
    }

    /// Starts a confirmation attempt for `gesture`.
    ///
    /// Returns `None` when no attempt could be started (gate shut down, no
    /// sensor, or the sensor refused the listener); the gesture is then dropped.
    pub fn begin(&self, gesture: Gesture) -> Option<ConfirmationAttempt> {
        if self.shutdown.is_cancelled() {
            debug!("Gate shut down, ignoring gesture {}", gesture);
            return None;
        }
        let sensor = match &self.sensor {
            Some(sensor) => sensor.clone(),
            None => {
                debug!("Dropping gesture {}: no proximity sensor", gesture);
                return None;
            }
        };

        let token = RequestToken(self.next_token.fetch_add(1, Ordering::SeqCst));

        let wake_lock = match &self.power {
            Some(power) => match power.acquire_wake_lock(&self.wake_lock_tag) {
                Ok(lock) => Some(lock),
                Err(e) => {
                    warn!("Failed to acquire wake lock for {}: {}", token, e);
                    None
                }
            },
            None => None,
        };

        let (reading_tx, reading_rx) = oneshot::channel::<f32>();
        let slot = Mutex::new(Some(reading_tx));
        let listener = move |value: f32| {
            // First reading wins, later ones find the slot empty
            if let Ok(mut slot) = slot.lock() {
                if let Some(tx) = slot.take() {
                    let _ = tx.send(value);
                }
            }
        };

        let subscription = match sensor.subscribe(Box::new(listener)) {
            Ok(id) => id,
            Err(e) => {
                warn!("Proximity listener for {} rejected: {}", token, e);
                if let Some(wake_lock) = wake_lock {
                    wake_lock.release();
                }
                return None;
            }
        };

        let request = PendingGestureRequest {
            token,
            gesture,
            enqueued_at: Local::now(),
        };
        {
            let mut state = lock_state(&self.state);
            if !state.open.is_empty() {
                debug!("{} opened with {} attempt(s) still waiting", token, state.open.len());
            }
            state.open.insert(token, request);
        }
        info!(
            "Confirming gesture {} as {} (listener {})",
            gesture, token, subscription
        );

        let resources = AttemptResources {
            wake_lock,
            sensor: sensor.clone(),
            subscription,
        };
        let resolution = Resolution {
            token,
            gesture,
            maximum_range: sensor.maximum_range(),
            state: self.state.clone(),
            dispatcher: self.dispatcher.clone(),
        };
        let deadline = self.deadline;
        let shutdown = self.shutdown.clone();

        let task = async move {
            let wakeup = tokio::select! {
                biased;

                reading = reading_rx => match reading {
                    Ok(value) => Wakeup::Reading(value),
                    Err(_) => Wakeup::SensorLost,
                },
                _ = tokio::time::sleep(deadline) => Wakeup::Deadline,
                _ = shutdown.cancelled() => Wakeup::Cancelled,
            };

            resources.release();
            let outcome = resolution.resolve(wakeup);
            info!("Gesture {} {} resolved: {:?}", gesture, token, outcome);
            outcome
        };
        let handle = self.tracker.spawn_on(task, &self.runtime);

        Some(ConfirmationAttempt { token, handle })
    }

    /// Cancels every open attempt and waits until their resources are released
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.tracker.close();
        self.tracker.wait().await;
        debug!("Confirmation gate shut down");
    }
}
