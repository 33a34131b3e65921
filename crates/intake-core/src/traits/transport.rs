// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat transport trait for messaging platform integrations.

use async_trait::async_trait;

use crate::error::IntakeError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{InboundEvent, MessageHandle, OutboundMessage};

/// Bidirectional connection to a chat platform.
///
/// Outbound delivery is best-effort from the engine's point of view: a failed
/// send is logged by the caller and never retried.
#[async_trait]
pub trait ChatTransport: PluginAdapter {
    /// Starts receiving events from the platform.
    async fn connect(&mut self) -> Result<(), IntakeError>;

    /// Sends a text message or a captioned image, with optional inline buttons.
    async fn send(&self, msg: OutboundMessage) -> Result<MessageHandle, IntakeError>;

    /// Deletes a previously sent or received message.
    async fn delete_message(&self, handle: &MessageHandle) -> Result<(), IntakeError>;

    /// Receives the next inbound event.
    async fn receive(&self) -> Result<InboundEvent, IntakeError>;
}
