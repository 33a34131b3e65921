// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the store, the conversation engine, and transports.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Chat platform user identifier. In private chats this is also the chat id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Persistence-assigned order identifier. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId(pub i64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle to a message that was sent or received, usable for deletion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageHandle {
    /// Chat the message lives in.
    pub chat: UserId,
    /// Platform message id.
    pub id: String,
}

impl MessageHandle {
    pub fn new(chat: UserId, id: impl Into<String>) -> Self {
        Self {
            chat,
            id: id.into(),
        }
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Transport,
    Storage,
}

/// Position of an order in the question sequence.
///
/// The "no order yet" state is not a step: it is the absence of a session.
/// Discriminants are the persisted codes in the `orders.step` column.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(i64)]
pub enum Step {
    AwaitConsent = 0,
    AskName = 1,
    AskTask = 2,
    AskContact = 3,
    Done = 4,
}

impl Step {
    /// All steps in conversation order.
    pub const ALL: [Step; 5] = [
        Step::AwaitConsent,
        Step::AskName,
        Step::AskTask,
        Step::AskContact,
        Step::Done,
    ];

    /// Persisted integer code.
    pub fn code(self) -> i64 {
        self as i64
    }

    /// Decodes a persisted step code. Unknown codes yield `None`.
    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.code() == code)
    }

    /// The step that follows this one, `None` for [`Step::Done`].
    pub fn next(self) -> Option<Self> {
        Self::from_code(self.code() + 1)
    }

    /// The answer slot collected while in this step, if it is a question step.
    pub fn answer_slot(self) -> Option<AnswerSlot> {
        match self {
            Step::AskName => Some(AnswerSlot::Name),
            Step::AskTask => Some(AnswerSlot::Task),
            Step::AskContact => Some(AnswerSlot::Contact),
            Step::AwaitConsent | Step::Done => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Step::Done
    }
}

/// One of the three answer columns of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
pub enum AnswerSlot {
    Name,
    Task,
    Contact,
}

impl AnswerSlot {
    /// 1-based slot number.
    pub fn index(self) -> u8 {
        match self {
            AnswerSlot::Name => 1,
            AnswerSlot::Task => 2,
            AnswerSlot::Contact => 3,
        }
    }

    /// Column holding this answer.
    pub fn column(self) -> &'static str {
        match self {
            AnswerSlot::Name => "answer_1",
            AnswerSlot::Task => "answer_2",
            AnswerSlot::Contact => "answer_3",
        }
    }
}

/// A stored order row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub username: String,
    /// RFC 3339 UTC timestamp, set once at creation.
    pub created_at: String,
    pub name: Option<String>,
    pub task: Option<String>,
    pub contact: Option<String>,
    pub step: Step,
}

impl Order {
    /// An order is complete iff all three answers are present.
    pub fn is_complete(&self) -> bool {
        self.name.is_some() && self.task.is_some() && self.contact.is_some()
    }

    pub fn answer(&self, slot: AnswerSlot) -> Option<&str> {
        match slot {
            AnswerSlot::Name => self.name.as_deref(),
            AnswerSlot::Task => self.task.as_deref(),
            AnswerSlot::Contact => self.contact.as_deref(),
        }
    }
}

/// Immutable view of an order used to format the operator notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSnapshot {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub username: String,
    pub name: Option<String>,
    pub task: Option<String>,
    pub contact: Option<String>,
}

/// Filter for listing stored orders.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub user_id: Option<UserId>,
    pub limit: Option<usize>,
}

/// An inline button attached to an outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineButton {
    pub label: String,
    /// Callback payload delivered back as [`InboundEvent::Callback`].
    pub payload: String,
}

/// Text formatting of an outbound message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParseMode {
    #[default]
    Plain,
    Html,
}

/// A message to deliver through a [`ChatTransport`](crate::ChatTransport).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub recipient: UserId,
    /// Message text, or the caption when `media` is set.
    pub text: String,
    /// Local path of an image to send with `text` as its caption.
    pub media: Option<String>,
    pub buttons: Vec<InlineButton>,
    pub parse_mode: ParseMode,
}

impl OutboundMessage {
    /// A plain text message.
    pub fn text(recipient: UserId, text: impl Into<String>) -> Self {
        Self {
            recipient,
            text: text.into(),
            media: None,
            buttons: Vec::new(),
            parse_mode: ParseMode::Plain,
        }
    }

    /// An image with a caption.
    pub fn media(recipient: UserId, media: impl Into<String>, caption: impl Into<String>) -> Self {
        Self {
            media: Some(media.into()),
            ..Self::text(recipient, caption)
        }
    }

    pub fn with_button(mut self, label: impl Into<String>, payload: impl Into<String>) -> Self {
        self.buttons.push(InlineButton {
            label: label.into(),
            payload: payload.into(),
        });
        self
    }

    pub fn html(mut self) -> Self {
        self.parse_mode = ParseMode::Html;
        self
    }

    /// The same message without its media, keeping caption and buttons.
    pub fn without_media(mut self) -> Self {
        self.media = None;
        self
    }
}

/// An event received from the chat platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// The user issued the entry command.
    EntryCommand {
        user: UserId,
        username: Option<String>,
        message: Option<MessageHandle>,
    },
    /// The user pressed an inline button.
    Callback { user: UserId, payload: String },
    /// A plain text message.
    Text {
        user: UserId,
        text: String,
        message: Option<MessageHandle>,
    },
    /// Any message carrying media instead of text.
    Media {
        user: UserId,
        message: Option<MessageHandle>,
    },
}

impl InboundEvent {
    pub fn user(&self) -> UserId {
        match self {
            InboundEvent::EntryCommand { user, .. }
            | InboundEvent::Callback { user, .. }
            | InboundEvent::Text { user, .. }
            | InboundEvent::Media { user, .. } => *user,
        }
    }

    /// The user's own message, when the event carries one.
    pub fn message(&self) -> Option<&MessageHandle> {
        match self {
            InboundEvent::EntryCommand { message, .. }
            | InboundEvent::Text { message, .. }
            | InboundEvent::Media { message, .. } => message.as_ref(),
            InboundEvent::Callback { .. } => None,
        }
    }

    /// Short name for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            InboundEvent::EntryCommand { .. } => "entry_command",
            InboundEvent::Callback { .. } => "callback",
            InboundEvent::Text { .. } => "text",
            InboundEvent::Media { .. } => "media",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn step_codes_match_persisted_layout() {
        assert_eq!(Step::AwaitConsent.code(), 0);
        assert_eq!(Step::AskName.code(), 1);
        assert_eq!(Step::AskTask.code(), 2);
        assert_eq!(Step::AskContact.code(), 3);
        assert_eq!(Step::Done.code(), 4);
    }

    #[test]
    fn step_sequence_is_linear() {
        assert_eq!(Step::AwaitConsent.next(), Some(Step::AskName));
        assert_eq!(Step::AskName.next(), Some(Step::AskTask));
        assert_eq!(Step::AskTask.next(), Some(Step::AskContact));
        assert_eq!(Step::AskContact.next(), Some(Step::Done));
        assert_eq!(Step::Done.next(), None);
        assert!(Step::Done.is_terminal());
    }

    #[test]
    fn only_question_steps_have_slots() {
        assert_eq!(Step::AwaitConsent.answer_slot(), None);
        assert_eq!(Step::AskName.answer_slot(), Some(AnswerSlot::Name));
        assert_eq!(Step::AskTask.answer_slot(), Some(AnswerSlot::Task));
        assert_eq!(Step::AskContact.answer_slot(), Some(AnswerSlot::Contact));
        assert_eq!(Step::Done.answer_slot(), None);
    }

    #[test]
    fn step_display_is_screaming_snake() {
        assert_eq!(Step::AwaitConsent.to_string(), "AWAIT_CONSENT");
        assert_eq!(Step::AskContact.to_string(), "ASK_CONTACT");
    }

    #[test]
    fn answer_slot_columns() {
        assert_eq!(AnswerSlot::Name.column(), "answer_1");
        assert_eq!(AnswerSlot::Task.column(), "answer_2");
        assert_eq!(AnswerSlot::Contact.column(), "answer_3");
        assert_eq!(AnswerSlot::Contact.index(), 3);
    }

    #[test]
    fn order_completeness_requires_all_answers() {
        let mut order = Order {
            order_id: OrderId(1),
            user_id: UserId(10),
            username: "alex".into(),
            created_at: "2026-01-01T00:00:00.000Z".into(),
            name: Some("Alex".into()),
            task: Some("need a bot".into()),
            contact: None,
            step: Step::AskContact,
        };
        assert!(!order.is_complete());
        order.contact = Some("@alex_tg".into());
        assert!(order.is_complete());
        assert_eq!(order.answer(AnswerSlot::Task), Some("need a bot"));
    }

    #[test]
    fn outbound_builders() {
        let msg = OutboundMessage::media(UserId(5), "pics/start.png", "hello")
            .with_button("Yes!", "yes");
        assert_eq!(msg.media.as_deref(), Some("pics/start.png"));
        assert_eq!(msg.text, "hello");
        assert_eq!(msg.buttons.len(), 1);
        assert_eq!(msg.parse_mode, ParseMode::Plain);

        let plain = msg.clone().without_media();
        assert!(plain.media.is_none());
        assert_eq!(plain.buttons, msg.buttons);

        let html = OutboundMessage::text(UserId(5), "<b>x</b>").html();
        assert_eq!(html.parse_mode, ParseMode::Html);
    }

    #[test]
    fn inbound_event_accessors() {
        let handle = MessageHandle::new(UserId(9), "42");
        let event = InboundEvent::Text {
            user: UserId(9),
            text: "hi".into(),
            message: Some(handle.clone()),
        };
        assert_eq!(event.user(), UserId(9));
        assert_eq!(event.message(), Some(&handle));
        assert_eq!(event.kind(), "text");

        let cb = InboundEvent::Callback {
            user: UserId(9),
            payload: "yes".into(),
        };
        assert!(cb.message().is_none());
    }

    #[test]
    fn step_serializes_by_name() {
        let json = serde_json::to_string(&Step::AskName).expect("serialize");
        let back: Step = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, Step::AskName);
    }

    proptest! {
        #[test]
        fn unknown_step_codes_are_rejected(code in any::<i64>()) {
            let decoded = Step::from_code(code);
            prop_assert_eq!(decoded.is_some(), (0..=4).contains(&code));
            if let Some(step) = decoded {
                prop_assert_eq!(step.code(), code);
            }
        }
    }
}
