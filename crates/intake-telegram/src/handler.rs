// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Update filtering and conversion into [`InboundEvent`]s.
//!
//! Only private chats are served. Text matching the entry command becomes
//! [`InboundEvent::EntryCommand`], other text becomes [`InboundEvent::Text`],
//! and any other user message (photo, document, sticker, voice, ...) becomes
//! [`InboundEvent::Media`].

use intake_core::{InboundEvent, IntakeError, MessageHandle, UserId};
use regex::Regex;
use teloxide::prelude::*;
use teloxide::types::{ChatKind, MessageKind};

/// Recognizes the entry command, with an optional `@botname` suffix and an
/// optional numeric start parameter (`/start 42`).
#[derive(Debug, Clone)]
pub struct EntryMatcher {
    pattern: Regex,
}

impl EntryMatcher {
    pub fn new(entry_command: &str) -> Result<Self, IntakeError> {
        let pattern = Regex::new(&format!(
            r"^{}(?:@\w+)?(?:\s+(\d+))?$",
            regex::escape(entry_command.trim())
        ))
        .map_err(|e| IntakeError::Config(format!("invalid entry command: {e}")))?;
        Ok(Self { pattern })
    }

    pub fn matches(&self, text: &str) -> bool {
        self.pattern.is_match(text.trim())
    }
}

/// Checks whether the message is from a private (DM) chat.
///
/// Group, supergroup, and channel messages return `false`.
pub fn is_dm(msg: &Message) -> bool {
    matches!(msg.chat.kind, ChatKind::Private(_))
}

pub fn message_handle(msg: &Message) -> MessageHandle {
    MessageHandle::new(UserId(msg.chat.id.0), msg.id.0.to_string())
}

/// Convert a private-chat message into an event. Service messages yield `None`.
pub fn to_inbound_event(msg: &Message, entry: &EntryMatcher) -> Option<InboundEvent> {
    let user = UserId(msg.chat.id.0);
    let message = Some(message_handle(msg));

    if let Some(text) = msg.text() {
        if entry.matches(text) {
            let username = msg.from.as_ref().and_then(|u| u.username.clone());
            return Some(InboundEvent::EntryCommand {
                user,
                username,
                message,
            });
        }
        return Some(InboundEvent::Text {
            user,
            text: text.to_string(),
            message,
        });
    }

    match msg.kind {
        MessageKind::Common(_) => Some(InboundEvent::Media { user, message }),
        _ => None,
    }
}

/// Convert a callback query into an event. Queries without data yield `None`.
pub fn callback_to_event(query: &CallbackQuery) -> Option<InboundEvent> {
    let payload = query.data.clone()?;
    Some(InboundEvent::Callback {
        user: UserId(query.from.id.0 as i64),
        payload,
    })
}
