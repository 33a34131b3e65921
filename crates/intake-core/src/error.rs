// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Intake order bot.

use thiserror::Error;

use crate::types::{OrderId, Step};

/// The primary error type used across adapter traits and the conversation engine.
#[derive(Debug, Error)]
pub enum IntakeError {
    /// Configuration errors (invalid TOML, missing required values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database open, query failure, migration).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// An operation referenced an order that does not exist.
    ///
    /// Upstream this means a session points at a vanished order; the session
    /// must be reset.
    #[error("order #{order_id} not found")]
    OrderNotFound { order_id: OrderId },

    /// The store refused to move an order's step backwards.
    #[error("order #{order_id} is at {current}, refusing to move back to {requested}")]
    StepRegression {
        order_id: OrderId,
        current: Step,
        requested: Step,
    },

    /// Chat transport errors (delivery failure, malformed handle, closed stream).
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntakeError {
    /// Returns true when the error means the in-memory session no longer
    /// matches the store and should be dropped.
    pub fn is_session_inconsistency(&self) -> bool {
        matches!(
            self,
            IntakeError::OrderNotFound { .. } | IntakeError::StepRegression { .. }
        )
    }
}
