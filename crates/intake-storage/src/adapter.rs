// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the OrderStore trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use intake_config::model::StorageConfig;
use intake_core::{
    AdapterType, AnswerSlot, HealthStatus, IntakeError, Order, OrderFilter, OrderId,
    OrderSnapshot, OrderStore, PluginAdapter, Step, UserId,
};

use crate::database::{map_tr_err, Database};
use crate::queries::orders;

/// SQLite-backed order store.
///
/// The database is lazily opened on the first call to
/// [`OrderStore::initialize`].
pub struct SqliteOrderStore {
    config: StorageConfig,
    username_placeholder: String,
    db: OnceCell<Database>,
}

impl SqliteOrderStore {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            username_placeholder: "0".to_string(),
            db: OnceCell::new(),
        }
    }

    /// Value stored when a user has no username.
    pub fn with_username_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.username_placeholder = placeholder.into();
        self
    }

    fn db(&self) -> Result<&Database, IntakeError> {
        self.db.get().ok_or_else(|| IntakeError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteOrderStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, IntakeError> {
        self.db()?
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), IntakeError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl OrderStore for SqliteOrderStore {
    async fn initialize(&self) -> Result<(), IntakeError> {
        let db = Database::open(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| IntakeError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "order store initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), IntakeError> {
        self.db()?.checkpoint().await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    async fn create_order(
        &self,
        user_id: UserId,
        username: Option<&str>,
    ) -> Result<OrderId, IntakeError> {
        let username = username
            .filter(|u| !u.is_empty())
            .unwrap_or(self.username_placeholder.as_str());
        let order_id = orders::create_order(self.db()?, user_id, username).await?;
        debug!(%order_id, %user_id, "order created");
        Ok(order_id)
    }

    async fn get_step(&self, order_id: OrderId) -> Result<Step, IntakeError> {
        orders::get_step(self.db()?, order_id).await
    }

    async fn set_step(&self, order_id: OrderId, step: Step) -> Result<(), IntakeError> {
        orders::set_step(self.db()?, order_id, step).await
    }

    async fn record_answer(
        &self,
        order_id: OrderId,
        slot: AnswerSlot,
        text: &str,
    ) -> Result<(), IntakeError> {
        orders::record_answer(self.db()?, order_id, slot, text).await
    }

    async fn is_complete(&self, order_id: OrderId) -> Result<bool, IntakeError> {
        orders::is_complete(self.db()?, order_id).await
    }

    async fn fetch_for_notification(
        &self,
        order_id: OrderId,
    ) -> Result<OrderSnapshot, IntakeError> {
        orders::fetch_snapshot(self.db()?, order_id).await
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>, IntakeError> {
        orders::get_order(self.db()?, order_id).await
    }

    async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, IntakeError> {
        orders::list_orders(self.db()?, filter).await
    }

    async fn open_sessions(&self) -> Result<Vec<(UserId, OrderId)>, IntakeError> {
        orders::open_sessions(self.db()?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn make_config(path: &std::path::Path) -> StorageConfig {
        StorageConfig {
            database_path: path.to_str().unwrap().to_string(),
            wal_mode: true,
        }
    }

    #[tokio::test]
    async fn implements_plugin_adapter() {
        let dir = tempdir().unwrap();
        let store = SqliteOrderStore::new(make_config(&dir.path().join("a.db")));

        assert_eq!(store.name(), "sqlite");
        assert_eq!(store.version(), semver::Version::new(0, 1, 0));
        assert_eq!(store.adapter_type(), AdapterType::Storage);
    }

    #[tokio::test]
    async fn initialize_twice_returns_error() {
        let dir = tempdir().unwrap();
        let store = SqliteOrderStore::new(make_config(&dir.path().join("twice.db")));

        store.initialize().await.unwrap();
        assert!(store.initialize().await.is_err());
    }

    #[tokio::test]
    async fn operations_fail_before_initialize() {
        let dir = tempdir().unwrap();
        let store = SqliteOrderStore::new(make_config(&dir.path().join("none.db")));

        assert!(store.health_check().await.is_err());
        assert!(matches!(
            store.create_order(UserId(1), None).await,
            Err(IntakeError::Storage { .. })
        ));
        // Shutdown without a database is a no-op.
        store.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn missing_username_uses_placeholder() {
        let dir = tempdir().unwrap();
        let store = SqliteOrderStore::new(make_config(&dir.path().join("user.db")))
            .with_username_placeholder("anon");
        store.initialize().await.unwrap();

        let a = store.create_order(UserId(5), None).await.unwrap();
        let b = store.create_order(UserId(5), Some("")).await.unwrap();
        let c = store.create_order(UserId(5), Some("alex")).await.unwrap();

        assert_eq!(store.get_order(a).await.unwrap().unwrap().username, "anon");
        assert_eq!(store.get_order(b).await.unwrap().unwrap().username, "anon");
        assert_eq!(store.get_order(c).await.unwrap().unwrap().username, "alex");
    }

    #[tokio::test]
    async fn full_order_lifecycle_through_adapter() {
        let dir = tempdir().unwrap();
        let store = SqliteOrderStore::new(make_config(&dir.path().join("life.db")));
        store.initialize().await.unwrap();
        assert_eq!(store.health_check().await.unwrap(), HealthStatus::Healthy);

        let id = store.create_order(UserId(42), Some("alex_tg")).await.unwrap();
        store.set_step(id, Step::AskName).await.unwrap();
        store.record_answer(id, AnswerSlot::Name, "Alex").await.unwrap();
        store.set_step(id, Step::AskTask).await.unwrap();
        store.record_answer(id, AnswerSlot::Task, "need a bot").await.unwrap();
        store.set_step(id, Step::AskContact).await.unwrap();
        store.record_answer(id, AnswerSlot::Contact, "@alex_tg").await.unwrap();
        store.set_step(id, Step::Done).await.unwrap();

        assert!(store.is_complete(id).await.unwrap());
        let snap = store.fetch_for_notification(id).await.unwrap();
        assert_eq!(snap.user_id, UserId(42));
        assert_eq!(snap.username, "alex_tg");
        assert_eq!(snap.task.as_deref(), Some("need a bot"));
        assert!(store.open_sessions().await.unwrap().is_empty());

        store.close().await.unwrap();
        store.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn data_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reopen.db");

        let first = SqliteOrderStore::new(make_config(&path));
        first.initialize().await.unwrap();
        let id = first.create_order(UserId(7), None).await.unwrap();
        first.set_step(id, Step::AskName).await.unwrap();
        first.close().await.unwrap();
        drop(first);

        let second = SqliteOrderStore::new(make_config(&path));
        second.initialize().await.unwrap();
        assert_eq!(second.get_step(id).await.unwrap(), Step::AskName);
        assert_eq!(second.open_sessions().await.unwrap(), vec![(UserId(7), id)]);
    }
}
