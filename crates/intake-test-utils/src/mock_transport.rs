// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock chat transport for deterministic testing.
//!
//! `MockTransport` implements `ChatTransport` with injectable inbound events
//! and captured outbound messages and deletions for assertion in tests.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use intake_core::{
    AdapterType, ChatTransport, HealthStatus, InboundEvent, IntakeError, MessageHandle,
    OutboundMessage, PluginAdapter, UserId,
};

/// A mock chat transport for testing.
///
/// - **inbound**: events injected via `inject()` are returned by `receive()`
/// - **sent**: messages passed to `send()` are captured and retrievable via `sent_messages()`
/// - **deleted**: handles passed to `delete_message()` are captured
///
/// Sends can be made to fail per recipient, or for every message with media,
/// or to hang forever for one recipient.
pub struct MockTransport {
    inbound: Arc<Mutex<VecDeque<InboundEvent>>>,
    sent: Arc<Mutex<Vec<OutboundMessage>>>,
    deleted: Arc<Mutex<Vec<MessageHandle>>>,
    failing_recipients: Arc<Mutex<HashSet<UserId>>>,
    stalled_recipients: Arc<Mutex<HashSet<UserId>>>,
    fail_media: Arc<Mutex<bool>>,
    closed: Arc<Mutex<bool>>,
    notify: Arc<Notify>,
    next_id: AtomicU64,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            inbound: Arc::new(Mutex::new(VecDeque::new())),
            sent: Arc::new(Mutex::new(Vec::new())),
            deleted: Arc::new(Mutex::new(Vec::new())),
            failing_recipients: Arc::new(Mutex::new(HashSet::new())),
            stalled_recipients: Arc::new(Mutex::new(HashSet::new())),
            fail_media: Arc::new(Mutex::new(false)),
            closed: Arc::new(Mutex::new(false)),
            notify: Arc::new(Notify::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Inject an inbound event. The next call to `receive()` returns it.
    pub async fn inject(&self, event: InboundEvent) {
        self.inbound.lock().await.push_back(event);
        self.notify.notify_one();
    }

    /// Make `receive()` report a closed stream once the queue is empty.
    pub async fn close(&self) {
        *self.closed.lock().await = true;
        self.notify.notify_one();
    }

    /// Make every send to `recipient` fail.
    pub async fn fail_sends_to(&self, recipient: UserId) {
        self.failing_recipients.lock().await.insert(recipient);
    }

    /// Make every send to `recipient` hang without ever completing.
    pub async fn stall_sends_to(&self, recipient: UserId) {
        self.stalled_recipients.lock().await.insert(recipient);
    }

    /// Make every send that carries media fail.
    pub async fn fail_media_sends(&self) {
        *self.fail_media.lock().await = true;
    }

    /// All messages that were delivered through `send()`.
    pub async fn sent_messages(&self) -> Vec<OutboundMessage> {
        self.sent.lock().await.clone()
    }

    /// Texts of the messages delivered to `recipient`, in order.
    pub async fn texts_to(&self, recipient: UserId) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|m| m.recipient == recipient)
            .map(|m| m.text.clone())
            .collect()
    }

    /// All handles passed to `delete_message()`.
    pub async fn deleted(&self) -> Vec<MessageHandle> {
        self.deleted.lock().await.clone()
    }

    pub async fn clear_sent(&self) {
        self.sent.lock().await.clear();
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockTransport {
    fn name(&self) -> &str {
        "mock-transport"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transport
    }

    async fn health_check(&self) -> Result<HealthStatus, IntakeError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), IntakeError> {
        Ok(())
    }
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn connect(&mut self) -> Result<(), IntakeError> {
        Ok(())
    }

    async fn send(&self, msg: OutboundMessage) -> Result<MessageHandle, IntakeError> {
        if self.stalled_recipients.lock().await.contains(&msg.recipient) {
            std::future::pending::<()>().await;
        }
        if self.failing_recipients.lock().await.contains(&msg.recipient) {
            return Err(IntakeError::Transport {
                message: format!("mock send to {} refused", msg.recipient),
                source: None,
            });
        }
        if msg.media.is_some() && *self.fail_media.lock().await {
            return Err(IntakeError::Transport {
                message: "mock media send refused".into(),
                source: None,
            });
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let handle = MessageHandle::new(msg.recipient, format!("mock-{id}"));
        self.sent.lock().await.push(msg);
        Ok(handle)
    }

    async fn delete_message(&self, handle: &MessageHandle) -> Result<(), IntakeError> {
        self.deleted.lock().await.push(handle.clone());
        Ok(())
    }

    async fn receive(&self) -> Result<InboundEvent, IntakeError> {
        loop {
            {
                let mut queue = self.inbound.lock().await;
                if let Some(event) = queue.pop_front() {
                    return Ok(event);
                }
                if *self.closed.lock().await {
                    return Err(IntakeError::Transport {
                        message: "mock inbound stream closed".into(),
                        source: None,
                    });
                }
            }
            self.notify.notified().await;
        }
    }
}
