// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The conversation state machine.
//!
//! One [`ConversationEngine`] drives every user through the fixed question
//! sequence:
//!
//! ```text
//! (no session) --entry--> AWAIT_CONSENT --consent--> ASK_NAME --text-->
//! ASK_TASK --text--> ASK_CONTACT --text--> DONE (notify, session removed)
//! ```
//!
//! The store is the authority on an order's step; the engine only keeps the
//! `user -> order` pointer in its [`SessionRegistry`].

use std::sync::Arc;

use intake_config::model::ConversationConfig;
use intake_config::IntakeConfig;
use intake_core::{
    ChatTransport, InboundEvent, IntakeError, MessageHandle, OrderId, OrderStore,
    OutboundMessage, Step, UserId,
};
use tracing::{debug, error, info, warn};

use crate::notify::NotificationDispatcher;
use crate::prompts::Prompts;
use crate::session::SessionRegistry;

/// Why an event was refused without changing any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The user has no conversation in progress.
    NoSession,
    /// Media arrived where only text is accepted.
    MediaNotAccepted,
    /// Text arrived while the consent button is pending.
    ButtonExpected,
}

/// Result of handling one inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A new order was created. `abandoned` is the in-flight order it replaced.
    Started {
        order_id: OrderId,
        abandoned: Option<OrderId>,
    },
    /// The order moved to `step`.
    Advanced { order_id: OrderId, step: Step },
    /// The last answer was stored and the order is `DONE`.
    Completed { order_id: OrderId, notified: bool },
    Rejected(Rejection),
    /// The event did not apply to the current state.
    Ignored,
    /// Handling failed; the user was shown the failure prompt.
    Failed { session_reset: bool },
}

/// Flow settings taken from `[conversation]`.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub consent_payload: String,
    pub welcome_image: Option<String>,
    pub farewell_image: Option<String>,
}

impl EngineSettings {
    pub fn from_config(config: &ConversationConfig) -> Self {
        Self {
            consent_payload: config.consent_payload.clone(),
            welcome_image: config.welcome_image.clone(),
            farewell_image: config.farewell_image.clone(),
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from_config(&ConversationConfig::default())
    }
}

pub struct ConversationEngine {
    store: Arc<dyn OrderStore>,
    transport: Arc<dyn ChatTransport>,
    notifier: NotificationDispatcher,
    sessions: SessionRegistry,
    settings: EngineSettings,
    prompts: Prompts,
}

impl ConversationEngine {
    pub fn new(
        store: Arc<dyn OrderStore>,
        transport: Arc<dyn ChatTransport>,
        notifier: NotificationDispatcher,
        settings: EngineSettings,
        prompts: Prompts,
    ) -> Self {
        Self {
            store,
            transport,
            notifier,
            sessions: SessionRegistry::new(),
            settings,
            prompts,
        }
    }

    /// Build an engine, and its notifier, from the loaded configuration.
    pub fn from_config(
        config: &IntakeConfig,
        store: Arc<dyn OrderStore>,
        transport: Arc<dyn ChatTransport>,
    ) -> Self {
        let notifier = NotificationDispatcher::new(
            store.clone(),
            transport.clone(),
            config.operator.chat_id.map(UserId),
        );
        Self::new(
            store,
            transport,
            notifier,
            EngineSettings::from_config(&config.conversation),
            Prompts::from_config(&config.prompts, &config.conversation.entry_command),
        )
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Rebuild the session registry from orders left unfinished in storage.
    pub async fn restore_sessions(&self) -> Result<usize, IntakeError> {
        let open = self.store.open_sessions().await?;
        let restored = self.sessions.restore(open);
        info!(restored, "sessions restored from storage");
        Ok(restored)
    }

    /// Handle one event under the user's lock. Never fails: errors are
    /// logged, reported to the user, and turned into [`Outcome::Failed`].
    pub async fn dispatch(&self, event: InboundEvent) -> Outcome {
        let user = event.user();
        let kind = event.kind();
        let _lock = self.sessions.lock(user).await;

        match self.handle(event).await {
            Ok(outcome) => {
                debug!(%user, kind, ?outcome, "event handled");
                outcome
            }
            Err(e) if e.is_session_inconsistency() => {
                let dropped = self.sessions.remove(user);
                warn!(%user, kind, order_id = ?dropped, error = %e, "session inconsistent with storage, reset");
                self.say(user, &self.prompts.failure).await;
                Outcome::Failed {
                    session_reset: true,
                }
            }
            Err(e) => {
                error!(%user, kind, error = %e, "failed to handle event");
                self.say(user, &self.prompts.failure).await;
                Outcome::Failed {
                    session_reset: false,
                }
            }
        }
    }

    /// Apply one event. The caller must hold the user's lock.
    pub async fn handle(&self, event: InboundEvent) -> Result<Outcome, IntakeError> {
        match event {
            InboundEvent::EntryCommand {
                user,
                username,
                message,
            } => self.on_entry(user, username.as_deref(), message).await,
            InboundEvent::Callback { user, payload } => self.on_callback(user, &payload).await,
            InboundEvent::Text {
                user,
                text,
                message,
            } => self.on_text(user, &text, message).await,
            InboundEvent::Media { user, message } => {
                if self.sessions.get(user).is_none() {
                    return Ok(self.reject_no_session(user, message).await);
                }
                self.say(user, &self.prompts.no_files).await;
                self.discard(message).await;
                Ok(Outcome::Rejected(Rejection::MediaNotAccepted))
            }
        }
    }

    async fn on_entry(
        &self,
        user: UserId,
        username: Option<&str>,
        message: Option<MessageHandle>,
    ) -> Result<Outcome, IntakeError> {
        let wait = self.say(user, &self.prompts.wait_indicator).await;

        let order_id = match self.store.create_order(user, username).await {
            Ok(order_id) => order_id,
            Err(e) => {
                self.discard(message).await;
                self.discard(wait).await;
                return Err(e);
            }
        };
        let abandoned = self.sessions.insert(user, order_id);
        match abandoned {
            Some(previous) => info!(%user, %order_id, abandoned = %previous, "order restarted, previous order abandoned"),
            None => info!(%user, %order_id, "order started"),
        }

        let welcome = OutboundMessage::text(user, &self.prompts.welcome)
            .with_button(&self.prompts.consent_button, &self.settings.consent_payload);
        self.send_illustrated(welcome, self.settings.welcome_image.as_deref())
            .await;

        self.discard(message).await;
        self.discard(wait).await;

        Ok(Outcome::Started {
            order_id,
            abandoned,
        })
    }

    async fn on_callback(&self, user: UserId, payload: &str) -> Result<Outcome, IntakeError> {
        let Some(order_id) = self.sessions.get(user) else {
            self.say(user, &self.prompts.use_entry_command).await;
            return Ok(Outcome::Rejected(Rejection::NoSession));
        };

        if payload != self.settings.consent_payload {
            debug!(%user, %order_id, payload, "unknown callback payload ignored");
            return Ok(Outcome::Ignored);
        }

        let step = self.store.get_step(order_id).await?;
        if step != Step::AwaitConsent {
            debug!(%user, %order_id, %step, "consent outside AWAIT_CONSENT ignored");
            return Ok(Outcome::Ignored);
        }

        self.advance(user, order_id, Step::AskName).await
    }

    async fn on_text(
        &self,
        user: UserId,
        text: &str,
        message: Option<MessageHandle>,
    ) -> Result<Outcome, IntakeError> {
        let Some(order_id) = self.sessions.get(user) else {
            return Ok(self.reject_no_session(user, message).await);
        };

        let step = self.store.get_step(order_id).await?;
        match step {
            Step::AwaitConsent => {
                self.say(user, &self.prompts.press_button).await;
                self.discard(message).await;
                Ok(Outcome::Rejected(Rejection::ButtonExpected))
            }
            Step::AskName | Step::AskTask => {
                self.record(order_id, step, text).await?;
                // Both steps have a successor and an answer slot.
                let next = step.next().unwrap_or(Step::Done);
                self.advance(user, order_id, next).await
            }
            Step::AskContact => {
                self.record(order_id, step, text).await?;
                self.complete(user, order_id).await
            }
            Step::Done => {
                self.sessions.remove(user);
                Ok(self.reject_no_session(user, message).await)
            }
        }
    }

    async fn record(&self, order_id: OrderId, step: Step, text: &str) -> Result<(), IntakeError> {
        let slot = step.answer_slot().ok_or_else(|| {
            IntakeError::Internal(format!("step {step} does not collect an answer"))
        })?;
        self.store.record_answer(order_id, slot, text).await?;
        debug!(%order_id, %slot, "answer recorded");
        Ok(())
    }

    async fn advance(
        &self,
        user: UserId,
        order_id: OrderId,
        step: Step,
    ) -> Result<Outcome, IntakeError> {
        self.store.set_step(order_id, step).await?;
        debug!(%user, %order_id, %step, "order advanced");
        if let Some(question) = self.prompts.question(step) {
            self.say(user, question).await;
        }
        Ok(Outcome::Advanced { order_id, step })
    }

    async fn complete(&self, user: UserId, order_id: OrderId) -> Result<Outcome, IntakeError> {
        self.store.set_step(order_id, Step::Done).await?;
        self.sessions.remove(user);
        info!(%user, %order_id, "order completed");

        let wait = self.say(user, &self.prompts.wait_indicator).await;
        self.send_illustrated(
            OutboundMessage::text(user, &self.prompts.farewell),
            self.settings.farewell_image.as_deref(),
        )
        .await;
        let notified = self.notifier.notify(order_id).await;
        self.discard(wait).await;

        Ok(Outcome::Completed { order_id, notified })
    }

    async fn reject_no_session(&self, user: UserId, message: Option<MessageHandle>) -> Outcome {
        self.say(user, &self.prompts.use_entry_command).await;
        self.discard(message).await;
        Outcome::Rejected(Rejection::NoSession)
    }

    /// Send a plain text message, best-effort.
    async fn say(&self, user: UserId, text: &str) -> Option<MessageHandle> {
        self.deliver(OutboundMessage::text(user, text)).await
    }

    /// Send `msg` with `image` attached, falling back to text when the image fails.
    async fn send_illustrated(&self, msg: OutboundMessage, image: Option<&str>) {
        let Some(image) = image else {
            self.deliver(msg).await;
            return;
        };

        let illustrated = OutboundMessage {
            media: Some(image.to_string()),
            ..msg
        };
        match self.transport.send(illustrated.clone()).await {
            Ok(_) => {}
            Err(e) => {
                warn!(recipient = %illustrated.recipient, image, error = %e, "image send failed, falling back to text");
                self.deliver(illustrated.without_media()).await;
            }
        }
    }

    async fn deliver(&self, msg: OutboundMessage) -> Option<MessageHandle> {
        let recipient = msg.recipient;
        match self.transport.send(msg).await {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!(%recipient, error = %e, "failed to send message");
                None
            }
        }
    }

    /// Delete a message if there is one, ignoring failures.
    async fn discard(&self, message: Option<MessageHandle>) {
        if let Some(handle) = message
            && let Err(e) = self.transport.delete_message(&handle).await
        {
            debug!(chat = %handle.chat, id = %handle.id, error = %e, "message delete failed");
        }
    }
}
