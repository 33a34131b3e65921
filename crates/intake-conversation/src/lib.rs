// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation engine and intake loop for the Intake order bot.
//!
//! The [`IntakeLoop`] is the central coordinator that:
//! - Receives events from a chat transport
//! - Queues each event behind the same user's earlier events, one worker
//!   task per user with pending events
//! - Bounds how many events are handled at once with a semaphore
//! - Waits (for a bounded time) for in-flight events and closes storage on shutdown

pub mod engine;
pub mod notify;
pub mod prompts;
pub mod session;
pub mod shutdown;

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use intake_core::{ChatTransport, InboundEvent, IntakeError, OrderStore, UserId};
use tokio::sync::Semaphore;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub use engine::{ConversationEngine, EngineSettings, Outcome, Rejection};
pub use notify::NotificationDispatcher;
pub use prompts::Prompts;
pub use session::{SessionRegistry, UserLock};

/// How long shutdown waits for in-flight events before aborting them.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

type UserQueues = DashMap<UserId, UnboundedSender<InboundEvent>>;

/// Pulls events off the transport and feeds them to the engine.
pub struct IntakeLoop {
    transport: Arc<dyn ChatTransport>,
    store: Arc<dyn OrderStore>,
    engine: Arc<ConversationEngine>,
    permits: Arc<Semaphore>,
    queues: Arc<UserQueues>,
    drain_timeout: Duration,
}

impl IntakeLoop {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        store: Arc<dyn OrderStore>,
        engine: Arc<ConversationEngine>,
        max_concurrent_events: usize,
    ) -> Self {
        Self {
            transport,
            store,
            engine,
            permits: Arc::new(Semaphore::new(max_concurrent_events.max(1))),
            queues: Arc::new(DashMap::new()),
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }

    /// Override how long shutdown waits for in-flight events.
    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Number of users with a live event queue.
    pub fn queued_users(&self) -> usize {
        self.queues.len()
    }

    /// Run until `cancel` fires or the transport closes.
    ///
    /// On exit, in-flight events get up to the drain timeout to finish, then
    /// the transport is shut down and the store closed.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), IntakeError> {
        info!("intake loop running");
        let mut workers = JoinSet::new();

        loop {
            tokio::select! {
                event = self.transport.receive() => {
                    let event = match event {
                        Ok(event) => event,
                        Err(e) => {
                            error!(error = %e, "transport receive error");
                            if e.to_string().contains("closed") {
                                break;
                            }
                            continue;
                        }
                    };

                    let user = event.user();
                    if let Some(rx) = self.enqueue(event) {
                        workers.spawn(user_worker(
                            user,
                            rx,
                            self.queues.clone(),
                            self.engine.clone(),
                            self.permits.clone(),
                            cancel.clone(),
                        ));
                    }
                }
                Some(joined) = workers.join_next(), if !workers.is_empty() => {
                    log_join(joined);
                }
                _ = cancel.cancelled() => {
                    info!("shutdown signal received, stopping intake loop");
                    break;
                }
            }
        }

        if !workers.is_empty() {
            info!(in_flight = workers.len(), "waiting for in-flight events");
        }
        let drained = tokio::time::timeout(self.drain_timeout, async {
            while let Some(joined) = workers.join_next().await {
                log_join(joined);
            }
        })
        .await;
        if drained.is_err() {
            warn!(
                remaining = workers.len(),
                timeout_secs = self.drain_timeout.as_secs_f64(),
                "drain timeout reached, aborting unfinished events"
            );
            workers.shutdown().await;
        }
        self.queues.clear();

        if let Err(e) = self.transport.shutdown().await {
            warn!(error = %e, "transport shutdown failed");
        }
        self.store.close().await?;

        info!("intake loop stopped");
        Ok(())
    }

    /// Append `event` to its user's queue without waiting on anything.
    ///
    /// Returns the receiving end when a new queue was opened and needs a worker.
    fn enqueue(&self, event: InboundEvent) -> Option<UnboundedReceiver<InboundEvent>> {
        match self.queues.entry(event.user()) {
            Entry::Occupied(mut queue) => match queue.get().send(event) {
                Ok(()) => None,
                // The worker died without retiring its queue.
                Err(mpsc::error::SendError(event)) => {
                    let (tx, rx) = open_queue(event);
                    queue.insert(tx);
                    Some(rx)
                }
            },
            Entry::Vacant(slot) => {
                let (tx, rx) = open_queue(event);
                slot.insert(tx);
                Some(rx)
            }
        }
    }
}

fn open_queue(
    first: InboundEvent,
) -> (UnboundedSender<InboundEvent>, UnboundedReceiver<InboundEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    // The receiver is alive, so this cannot fail.
    let _ = tx.send(first);
    (tx, rx)
}

/// Handle one user's queued events in arrival order, then retire the queue.
async fn user_worker(
    user: UserId,
    mut rx: UnboundedReceiver<InboundEvent>,
    queues: Arc<UserQueues>,
    engine: Arc<ConversationEngine>,
    permits: Arc<Semaphore>,
    cancel: CancellationToken,
) {
    loop {
        let event = match rx.try_recv() {
            Ok(event) => event,
            Err(_) => {
                // Retire under the entry's lock so no event can slip in unseen.
                match queues.remove_if(&user, |_, _| rx.is_empty()) {
                    Some(_) => return,
                    None if rx.is_empty() => return,
                    None => continue,
                }
            }
        };

        if cancel.is_cancelled() {
            warn!(%user, kind = event.kind(), "shutdown before event was handled, event dropped");
            continue;
        }

        let permit = tokio::select! {
            permit = permits.clone().acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(e) => {
                    error!(%user, error = %e, "event semaphore closed");
                    queues.remove(&user);
                    return;
                }
            },
            _ = cancel.cancelled() => {
                warn!(%user, kind = event.kind(), "shutdown while waiting for capacity, event dropped");
                continue;
            }
        };

        engine.dispatch(event).await;
        drop(permit);
    }
}

fn log_join(joined: Result<(), JoinError>) {
    match joined {
        Ok(()) => debug!("event worker finished"),
        Err(e) if e.is_panic() => error!(error = %e, "event worker panicked"),
        Err(e) => debug!(error = %e, "event worker cancelled"),
    }
}
