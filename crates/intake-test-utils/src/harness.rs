// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end conversation testing.
//!
//! `TestHarness` assembles a real conversation engine over a temp SQLite
//! order store and a [`MockTransport`]. Its helpers build inbound events the
//! way a transport would and push them through the engine.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use intake_config::model::StorageConfig;
use intake_config::IntakeConfig;
use intake_conversation::{ConversationEngine, Outcome};
use intake_core::{ChatTransport, InboundEvent, IntakeError, MessageHandle, OrderStore, UserId};
use intake_storage::SqliteOrderStore;

use crate::mock_transport::MockTransport;

/// Chat id the harness uses as the operator by default.
pub const OPERATOR: UserId = UserId(900_000);

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    config: IntakeConfig,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        let mut config = IntakeConfig::default();
        config.operator.chat_id = Some(OPERATOR.0);
        Self { config }
    }

    /// Disable (`None`) or change the operator chat.
    pub fn with_operator(mut self, operator: Option<UserId>) -> Self {
        self.config.operator.chat_id = operator.map(|u| u.0);
        self
    }

    pub fn with_welcome_image(mut self, path: &str) -> Self {
        self.config.conversation.welcome_image = Some(path.to_string());
        self
    }

    pub fn with_farewell_image(mut self, path: &str) -> Self {
        self.config.conversation.farewell_image = Some(path.to_string());
        self
    }

    pub fn with_restore_sessions(mut self, restore: bool) -> Self {
        self.config.conversation.restore_sessions = restore;
        self
    }

    /// Full control over the configuration. Storage settings are overridden.
    pub fn with_config(mut self, config: IntakeConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the test harness: temp database, store, mock transport, engine.
    pub async fn build(self) -> Result<TestHarness, IntakeError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| IntakeError::Storage { source: e.into() })?;
        let mut config = self.config;
        config.storage = StorageConfig {
            database_path: temp_dir.path().join("test.db").to_string_lossy().to_string(),
            wal_mode: true,
        };

        let transport = Arc::new(MockTransport::new());
        let (store, engine) = assemble(&config, transport.clone()).await?;

        Ok(TestHarness {
            config,
            store,
            transport,
            engine,
            next_message: AtomicU64::new(1),
            _temp_dir: temp_dir,
        })
    }
}

async fn assemble(
    config: &IntakeConfig,
    transport: Arc<MockTransport>,
) -> Result<(Arc<SqliteOrderStore>, Arc<ConversationEngine>), IntakeError> {
    let store = SqliteOrderStore::new(config.storage.clone())
        .with_username_placeholder(config.conversation.username_placeholder.clone());
    store.initialize().await?;
    let store = Arc::new(store);

    let engine = ConversationEngine::from_config(
        config,
        store.clone() as Arc<dyn OrderStore>,
        transport as Arc<dyn ChatTransport>,
    );
    if config.conversation.restore_sessions {
        engine.restore_sessions().await?;
    }
    Ok((store, Arc::new(engine)))
}

/// A conversation engine wired to a throwaway database and a mock transport.
pub struct TestHarness {
    config: IntakeConfig,
    store: Arc<SqliteOrderStore>,
    transport: Arc<MockTransport>,
    engine: Arc<ConversationEngine>,
    next_message: AtomicU64,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Harness with default settings and an operator configured.
    pub async fn new() -> Result<Self, IntakeError> {
        Self::builder().build().await
    }

    pub fn config(&self) -> &IntakeConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<SqliteOrderStore> {
        &self.store
    }

    pub fn transport(&self) -> &Arc<MockTransport> {
        &self.transport
    }

    pub fn engine(&self) -> &Arc<ConversationEngine> {
        &self.engine
    }

    /// Simulate a process restart: close the store, reopen the same database,
    /// and build a fresh engine (restoring sessions when configured).
    pub async fn restart(&mut self) -> Result<(), IntakeError> {
        self.store.close().await?;
        let (store, engine) = assemble(&self.config, self.transport.clone()).await?;
        self.store = store;
        self.engine = engine;
        Ok(())
    }

    /// Dispatch an arbitrary event through the engine.
    pub async fn dispatch(&self, event: InboundEvent) -> Outcome {
        self.engine.dispatch(event).await
    }

    /// Handle for a message the user "sent".
    pub fn user_message(&self, user: UserId) -> MessageHandle {
        let id = self.next_message.fetch_add(1, Ordering::Relaxed);
        MessageHandle::new(user, format!("in-{id}"))
    }

    pub async fn entry(&self, user: UserId, username: Option<&str>) -> Outcome {
        let message = Some(self.user_message(user));
        self.dispatch(InboundEvent::EntryCommand {
            user,
            username: username.map(str::to_string),
            message,
        })
        .await
    }

    pub async fn consent(&self, user: UserId) -> Outcome {
        let payload = self.config.conversation.consent_payload.clone();
        self.dispatch(InboundEvent::Callback { user, payload }).await
    }

    pub async fn text(&self, user: UserId, text: &str) -> Outcome {
        let message = Some(self.user_message(user));
        self.dispatch(InboundEvent::Text {
            user,
            text: text.to_string(),
            message,
        })
        .await
    }

    pub async fn media(&self, user: UserId) -> Outcome {
        let message = Some(self.user_message(user));
        self.dispatch(InboundEvent::Media { user, message }).await
    }
}
