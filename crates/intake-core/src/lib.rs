// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Intake order bot.
//!
//! This crate provides the domain types, the error type, and the adapter
//! traits shared by every other crate in the workspace. The conversation
//! engine only ever talks to storage and to the chat platform through the
//! traits defined here.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::IntakeError;
pub use types::{
    AdapterType, AnswerSlot, HealthStatus, InboundEvent, InlineButton, MessageHandle, Order,
    OrderFilter, OrderId, OrderSnapshot, OutboundMessage, ParseMode, Step, UserId,
};

pub use traits::{ChatTransport, OrderStore, PluginAdapter};
