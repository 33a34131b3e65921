// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! An order store that behaves like a database that went away.

use async_trait::async_trait;
use intake_core::{
    AdapterType, AnswerSlot, HealthStatus, IntakeError, Order, OrderFilter, OrderId,
    OrderSnapshot, OrderStore, PluginAdapter, Step, UserId,
};

/// Every [`OrderStore`] call fails with a storage error.
#[derive(Debug, Default)]
pub struct UnavailableStore;

fn unavailable() -> IntakeError {
    IntakeError::Storage {
        source: "database unavailable".into(),
    }
}

#[async_trait]
impl PluginAdapter for UnavailableStore {
    fn name(&self) -> &str {
        "unavailable"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, IntakeError> {
        Ok(HealthStatus::Unhealthy("database unavailable".into()))
    }

    async fn shutdown(&self) -> Result<(), IntakeError> {
        Ok(())
    }
}

#[async_trait]
impl OrderStore for UnavailableStore {
    async fn initialize(&self) -> Result<(), IntakeError> {
        Err(unavailable())
    }

    async fn close(&self) -> Result<(), IntakeError> {
        Ok(())
    }

    async fn create_order(
        &self,
        _user_id: UserId,
        _username: Option<&str>,
    ) -> Result<OrderId, IntakeError> {
        Err(unavailable())
    }

    async fn get_step(&self, _order_id: OrderId) -> Result<Step, IntakeError> {
        Err(unavailable())
    }

    async fn set_step(&self, _order_id: OrderId, _step: Step) -> Result<(), IntakeError> {
        Err(unavailable())
    }

    async fn record_answer(
        &self,
        _order_id: OrderId,
        _slot: AnswerSlot,
        _text: &str,
    ) -> Result<(), IntakeError> {
        Err(unavailable())
    }

    async fn is_complete(&self, _order_id: OrderId) -> Result<bool, IntakeError> {
        Err(unavailable())
    }

    async fn fetch_for_notification(
        &self,
        _order_id: OrderId,
    ) -> Result<OrderSnapshot, IntakeError> {
        Err(unavailable())
    }

    async fn get_order(&self, _order_id: OrderId) -> Result<Option<Order>, IntakeError> {
        Err(unavailable())
    }

    async fn list_orders(&self, _filter: &OrderFilter) -> Result<Vec<Order>, IntakeError> {
        Err(unavailable())
    }

    async fn open_sessions(&self) -> Result<Vec<(UserId, OrderId)>, IntakeError> {
        Err(unavailable())
    }
}
