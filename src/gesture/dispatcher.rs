//! Serialized dispatch of confirmed gestures
//!
//! A single worker task owns the receiving end of a bounded queue, so confirmed
//! gestures execute one at a time and in the order they were confirmed,
//! whatever context posted them.
//!
//! # Worker lifecycle
//!
//! ```text
//! Configured ──► Active ──► Draining ──► Stopped
//!                  │            ▲
//!                  └────────────┘
//!              (shutdown / all senders gone)
//! ```
//!
//! # Per request
//!
//! ```text
//! ConfirmedGesture ──► resolve action ──► haptic ──► [wake device] ──► action
//!                           │
//!                      no-op / empty ──► dropped
//! ```

use crate::device::haptic::HapticFeedback;
use crate::device::ActionExecutor;
use crate::gesture::action::{is_no_op, requires_wake_first, ActionRequest};
use crate::gesture::preferences::GesturePreferences;
use crate::input::scan_code::Gesture;
use chrono::{DateTime, Local};
use statum::{machine, state};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// A gesture whose proximity confirmation succeeded
#[derive(Clone, Debug)]
pub struct ConfirmedGesture {
    pub gesture: Gesture,
    pub confirmed_at: DateTime<Local>,
}

impl ConfirmedGesture {
    pub fn new(gesture: Gesture) -> Self {
        Self {
            gesture,
            confirmed_at: Local::now(),
        }
    }

    pub fn scan_code(&self) -> u32 {
        self.gesture.scan_code()
    }
}

/// What the worker did with one request
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    Dropped,
    Dispatched(Vec<ActionRequest>),
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Dispatch queue full, dropping gesture {0}")]
    QueueFull(Gesture),

    #[error("Dispatch queue closed")]
    Closed,

    #[error("Dispatch worker panicked: {0}")]
    WorkerPanicked(String),
}

#[state]
#[derive(Debug, Clone)]
pub enum DispatchWorkerState {
    Configured, // Queue and collaborators wired
    Active,     // Consuming the queue
    Draining,   // Queue closed, finishing what is buffered
    Stopped,
}

#[machine]
pub struct DispatchWorker<S: DispatchWorkerState> {
    receiver: mpsc::Receiver<ConfirmedGesture>,
    preferences: GesturePreferences,
    haptic: HapticFeedback,
    actions: Option<Arc<dyn ActionExecutor>>,
    processed: usize,
}

impl<S: DispatchWorkerState> DispatchWorker<S> {
    pub fn processed(&self) -> usize {
        self.processed
    }

    fn handle(&mut self, request: ConfirmedGesture) -> DispatchOutcome {
        self.processed += 1;
        let latency = Local::now() - request.confirmed_at;
        debug!(
            "Dispatching gesture {} (scan code {}), queued for {}ms",
            request.gesture,
            request.scan_code(),
            latency.num_milliseconds()
        );

        let action = self.preferences.resolve(request.gesture);
        if is_no_op(&action) {
            info!("Gesture {} mapped to no action, dropping", request.gesture);
            return DispatchOutcome::Dropped;
        }

        self.haptic.pulse();

        let mut requests = Vec::with_capacity(2);
        if requires_wake_first(&action) {
            requests.push(ActionRequest::wake_device());
        }
        requests.push(ActionRequest::new(action));

        match &self.actions {
            Some(executor) => {
                for request in &requests {
                    info!("Executing action {}", request);
                    executor.execute(request);
                }
            }
            None => warn!(
                "No action executor available, {} request(s) not executed",
                requests.len()
            ),
        }

        DispatchOutcome::Dispatched(requests)
    }
}

impl DispatchWorker<Configured> {
    pub fn create(
        receiver: mpsc::Receiver<ConfirmedGesture>,
        preferences: GesturePreferences,
        haptic: HapticFeedback,
        actions: Option<Arc<dyn ActionExecutor>>,
    ) -> Self {
        Self::new(receiver, preferences, haptic, actions, 0)
    }

    pub fn activate(self) -> DispatchWorker<Active> {
        info!("Activating gesture dispatch worker");
        self.transition()
    }
}

impl DispatchWorker<Active> {
    /// Consumes the queue until shutdown is requested or every sender is gone
    pub async fn run_until_shutdown(
        mut self,
        shutdown: CancellationToken,
    ) -> DispatchWorker<Draining> {
        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("Shutdown requested for dispatch worker");
                    break;
                }

                request = self.receiver.recv() => match request {
                    Some(request) => {
                        let outcome = self.handle(request);
                        debug!("Dispatch finished: {:?}", outcome);
                    }
                    None => {
                        info!("All dispatch senders dropped");
                        break;
                    }
                }
            }
        }

        self.transition()
    }
}

impl DispatchWorker<Draining> {
    /// Executes what is still buffered, then stops
    pub async fn drain(mut self) -> DispatchWorker<Stopped> {
        self.receiver.close();
        while let Some(request) = self.receiver.recv().await {
            let outcome = self.handle(request);
            debug!("Drained dispatch finished: {:?}", outcome);
        }
        info!(
            "Dispatch worker stopped after {} request(s)",
            self.processed
        );
        self.transition()
    }
}

/// Cloneable posting side of the dispatch queue
#[derive(Clone, Debug)]
pub struct DispatchSender {
    sender: mpsc::Sender<ConfirmedGesture>,
}

impl DispatchSender {
    pub(crate) fn channel(capacity: usize) -> (Self, mpsc::Receiver<ConfirmedGesture>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }

    /// Never blocks; safe from the sensor callback context
    pub fn post(&self, request: ConfirmedGesture) -> Result<(), DispatchError> {
        let gesture = request.gesture;
        self.sender.try_send(request).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DispatchError::QueueFull(gesture),
            mpsc::error::TrySendError::Closed(_) => DispatchError::Closed,
        })
    }
}

/// Owns the dispatch worker task
pub struct EventDispatcher {
    sender: DispatchSender,
    shutdown: CancellationToken,
    task_handle: Option<JoinHandle<usize>>,
}

impl EventDispatcher {
    /// Spawns the worker on the current tokio runtime
    pub fn spawn(
        capacity: usize,
        preferences: GesturePreferences,
        haptic: HapticFeedback,
        actions: Option<Arc<dyn ActionExecutor>>,
    ) -> Self {
        let (sender, receiver) = DispatchSender::channel(capacity);
        debug!("Created dispatch queue with capacity {}", capacity);

        let worker = DispatchWorker::create(receiver, preferences, haptic, actions).activate();
        let shutdown = CancellationToken::new();
        let worker_shutdown = shutdown.clone();

        let task_handle = tokio::spawn(async move {
            let draining = worker.run_until_shutdown(worker_shutdown).await;
            let stopped = draining.drain().await;
            stopped.processed()
        });

        Self {
            sender,
            shutdown,
            task_handle: Some(task_handle),
        }
    }

    pub fn sender(&self) -> DispatchSender {
        self.sender.clone()
    }

    /// Stops the worker after it has executed everything already queued.
    /// Returns the number of requests handled over its lifetime.
    pub async fn shutdown(&mut self) -> Result<usize, DispatchError> {
        self.shutdown.cancel();

        match self.task_handle.take() {
            Some(handle) => match handle.await {
                Ok(processed) => Ok(processed),
                Err(e) => {
                    error!("Dispatch worker panicked: {}", e);
                    Err(DispatchError::WorkerPanicked(e.to_string()))
                }
            },
            None => {
                debug!("Dispatch worker already shut down");
                Ok(0)
            }
        }
    }
}
