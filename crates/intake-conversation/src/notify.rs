// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operator notification for completed orders.
//!
//! A notification is attempted exactly once. Failures are logged and reported
//! as `false`; they never touch the order itself.

use std::sync::Arc;

use intake_core::{ChatTransport, OrderId, OrderSnapshot, OrderStore, OutboundMessage, UserId};
use tracing::{error, info, warn};

/// Formats completed orders and delivers them to the operator chat.
pub struct NotificationDispatcher {
    store: Arc<dyn OrderStore>,
    transport: Arc<dyn ChatTransport>,
    operator: Option<UserId>,
}

impl NotificationDispatcher {
    pub fn new(
        store: Arc<dyn OrderStore>,
        transport: Arc<dyn ChatTransport>,
        operator: Option<UserId>,
    ) -> Self {
        Self {
            store,
            transport,
            operator,
        }
    }

    /// Send the summary of `order_id` to the operator. Returns whether it was delivered.
    pub async fn notify(&self, order_id: OrderId) -> bool {
        let Some(operator) = self.operator else {
            warn!(%order_id, "operator.chat_id is not configured, notification skipped");
            return false;
        };

        let snapshot = match self.store.fetch_for_notification(order_id).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!(%order_id, error = %e, "failed to load order for notification");
                return false;
            }
        };

        let msg = OutboundMessage::text(operator, format_summary(&snapshot)).html();
        match self.transport.send(msg).await {
            Ok(_) => {
                info!(%order_id, operator = %operator, "operator notified");
                true
            }
            Err(e) => {
                error!(%order_id, error = %e, "failed to notify operator");
                false
            }
        }
    }
}

/// HTML summary of an order for the operator.
pub fn format_summary(order: &OrderSnapshot) -> String {
    let answer = |value: &Option<String>| {
        value
            .as_deref()
            .map(escape_html)
            .unwrap_or_else(|| "-".to_string())
    };

    format!(
        "🚀 <b>New order #{id}!</b>\n\
         \n\
         👤 User: <code>@{username}</code> / <code>{user_id}</code>\n\
         🧑 Introduced as: <b>{name}</b>\n\
         \n\
         📋 Needs:\n\
         <blockquote>{task}</blockquote>\n\
         \n\
         📞 Contacts:\n\
         <blockquote>{contact}</blockquote>",
        id = order.order_id,
        username = escape_html(&order.username),
        user_id = order.user_id,
        name = answer(&order.name),
        task = answer(&order.task),
        contact = answer(&order.contact),
    )
}

/// Escape the characters Telegram's HTML parse mode treats as markup.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
