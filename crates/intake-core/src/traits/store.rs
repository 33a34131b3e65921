// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Order store trait: the sole read/write path to durable order data.

use async_trait::async_trait;

use crate::error::IntakeError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{AnswerSlot, Order, OrderFilter, OrderId, OrderSnapshot, Step, UserId};

/// Durable order storage.
///
/// Every operation touches at most one order row and is atomic with respect
/// to it. Operations on an id that does not exist fail with
/// [`IntakeError::OrderNotFound`].
#[async_trait]
pub trait OrderStore: PluginAdapter {
    /// Initializes the backend (connection, migrations).
    async fn initialize(&self) -> Result<(), IntakeError>;

    /// Flushes pending writes and releases the backend.
    async fn close(&self) -> Result<(), IntakeError>;

    /// Inserts a new order at [`Step::AwaitConsent`] and returns its id.
    ///
    /// Ids are strictly increasing and never reused.
    async fn create_order(
        &self,
        user_id: UserId,
        username: Option<&str>,
    ) -> Result<OrderId, IntakeError>;

    /// Returns the current step of an order.
    async fn get_step(&self, order_id: OrderId) -> Result<Step, IntakeError>;

    /// Moves an order to `step`.
    ///
    /// Fails with [`IntakeError::StepRegression`] when `step` is behind the
    /// stored step. Re-setting the current step succeeds.
    async fn set_step(&self, order_id: OrderId, step: Step) -> Result<(), IntakeError>;

    /// Writes exactly one answer slot, leaving the others untouched.
    async fn record_answer(
        &self,
        order_id: OrderId,
        slot: AnswerSlot,
        text: &str,
    ) -> Result<(), IntakeError>;

    /// True iff the order exists and all three answers are recorded.
    async fn is_complete(&self, order_id: OrderId) -> Result<bool, IntakeError>;

    /// Returns the identity and answers of an order for the operator notification.
    async fn fetch_for_notification(&self, order_id: OrderId)
    -> Result<OrderSnapshot, IntakeError>;

    /// Returns the full order row, or `None` if absent.
    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>, IntakeError>;

    /// Lists orders newest first.
    async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, IntakeError>;

    /// For every user, their newest order if it has not reached [`Step::Done`].
    async fn open_sessions(&self) -> Result<Vec<(UserId, OrderId)>, IntakeError>;
}
