// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram transport for the Intake order bot.
//!
//! Implements [`ChatTransport`] for the Telegram Bot API via teloxide,
//! providing long polling, private-chat filtering, inline consent buttons,
//! and captioned images.

pub mod handler;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use intake_config::model::TelegramConfig;
use intake_core::{
    AdapterType, ChatTransport, HealthStatus, InboundEvent, IntakeError, MessageHandle,
    OutboundMessage, ParseMode as OutboundParseMode, PluginAdapter,
};
use teloxide::prelude::*;
use teloxide::types::{
    ChatId, InlineKeyboardButton, InlineKeyboardMarkup, InputFile, MessageId, ParseMode,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::handler::EntryMatcher;

/// Telegram transport implementing [`ChatTransport`].
pub struct TelegramChannel {
    bot: Bot,
    entry: Arc<EntryMatcher>,
    inbound_rx: tokio::sync::Mutex<mpsc::Receiver<InboundEvent>>,
    inbound_tx: mpsc::Sender<InboundEvent>,
    polling_handle: Option<tokio::task::JoinHandle<()>>,
}

impl TelegramChannel {
    /// Creates a new Telegram transport.
    ///
    /// Requires `config.bot_token` to be set.
    pub fn new(config: &TelegramConfig, entry_command: &str) -> Result<Self, IntakeError> {
        let token = config.bot_token.as_deref().ok_or_else(|| {
            IntakeError::Config("telegram.bot_token is required for Telegram transport".into())
        })?;

        if token.is_empty() {
            return Err(IntakeError::Config(
                "telegram.bot_token cannot be empty".into(),
            ));
        }

        let (inbound_tx, inbound_rx) = mpsc::channel(100);

        Ok(Self {
            bot: Bot::new(token),
            entry: Arc::new(EntryMatcher::new(entry_command)?),
            inbound_rx: tokio::sync::Mutex::new(inbound_rx),
            inbound_tx,
            polling_handle: None,
        })
    }

    /// Returns a reference to the underlying teloxide Bot.
    pub fn bot(&self) -> &Bot {
        &self.bot
    }
}

fn transport_err(action: &str, e: teloxide::RequestError) -> IntakeError {
    IntakeError::Transport {
        message: format!("failed to {action}: {e}"),
        source: Some(Box::new(e)),
    }
}

fn keyboard(msg: &OutboundMessage) -> Option<InlineKeyboardMarkup> {
    if msg.buttons.is_empty() {
        return None;
    }
    let row = msg
        .buttons
        .iter()
        .map(|b| InlineKeyboardButton::callback(b.label.clone(), b.payload.clone()))
        .collect::<Vec<_>>();
    Some(InlineKeyboardMarkup::new([row]))
}

#[async_trait]
impl PluginAdapter for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transport
    }

    async fn health_check(&self) -> Result<HealthStatus, IntakeError> {
        match self.bot.get_me().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!(
                "Telegram bot unreachable: {e}"
            ))),
        }
    }

    async fn shutdown(&self) -> Result<(), IntakeError> {
        if let Some(handle) = &self.polling_handle {
            handle.abort();
        }
        debug!("Telegram transport shut down");
        Ok(())
    }
}

#[async_trait]
impl ChatTransport for TelegramChannel {
    async fn connect(&mut self) -> Result<(), IntakeError> {
        if self.polling_handle.is_some() {
            return Ok(());
        }

        let bot = self.bot.clone();
        let message_tx = self.inbound_tx.clone();
        let callback_tx = self.inbound_tx.clone();
        let entry = self.entry.clone();

        info!("starting Telegram long polling");

        let handle = tokio::spawn(async move {
            let handler = dptree::entry()
                .branch(Update::filter_message().endpoint(move |msg: Message| {
                    let tx = message_tx.clone();
                    let entry = entry.clone();
                    async move {
                        if !handler::is_dm(&msg) {
                            debug!(chat_id = msg.chat.id.0, "ignoring non-DM message");
                            return respond(());
                        }
                        match handler::to_inbound_event(&msg, &entry) {
                            Some(event) => {
                                if tx.send(event).await.is_err() {
                                    warn!("inbound channel closed, dropping message");
                                }
                            }
                            None => debug!(msg_id = msg.id.0, "ignoring service message"),
                        }
                        respond(())
                    }
                }))
                .branch(Update::filter_callback_query().endpoint(
                    move |bot: Bot, query: CallbackQuery| {
                        let tx = callback_tx.clone();
                        async move {
                            if let Err(e) = bot.answer_callback_query(query.id.clone()).await {
                                debug!(error = %e, "failed to answer callback query");
                            }
                            // Buttons are single-use: strip the keyboard once pressed.
                            if let Some(message) = query.regular_message() {
                                if let Err(e) = bot
                                    .edit_message_reply_markup(message.chat.id, message.id)
                                    .await
                                {
                                    debug!(error = %e, "failed to clear inline keyboard");
                                }
                            }
                            if let Some(event) = handler::callback_to_event(&query) {
                                if tx.send(event).await.is_err() {
                                    warn!("inbound channel closed, dropping callback");
                                }
                            }
                            respond(())
                        }
                    },
                ));

            Dispatcher::builder(bot, handler)
                .default_handler(|_| async {})
                .build()
                .dispatch()
                .await;
        });

        self.polling_handle = Some(handle);
        Ok(())
    }

    async fn send(&self, msg: OutboundMessage) -> Result<MessageHandle, IntakeError> {
        let chat_id = ChatId(msg.recipient.0);
        let markup = keyboard(&msg);
        let html = msg.parse_mode == OutboundParseMode::Html;

        let sent = match &msg.media {
            Some(path) => {
                if !Path::new(path).is_file() {
                    return Err(IntakeError::Transport {
                        message: format!("image not found: {path}"),
                        source: None,
                    });
                }
                let mut request = self
                    .bot
                    .send_photo(chat_id, InputFile::file(path))
                    .caption(msg.text.clone());
                if let Some(markup) = markup {
                    request = request.reply_markup(markup);
                }
                if html {
                    request = request.parse_mode(ParseMode::Html);
                }
                request.await.map_err(|e| transport_err("send photo", e))?
            }
            None => {
                let mut request = self.bot.send_message(chat_id, msg.text.clone());
                if let Some(markup) = markup {
                    request = request.reply_markup(markup);
                }
                if html {
                    request = request.parse_mode(ParseMode::Html);
                }
                request.await.map_err(|e| transport_err("send message", e))?
            }
        };

        Ok(MessageHandle::new(msg.recipient, sent.id.0.to_string()))
    }

    async fn delete_message(&self, handle: &MessageHandle) -> Result<(), IntakeError> {
        let message_id = handle
            .id
            .parse::<i32>()
            .map(MessageId)
            .map_err(|e| IntakeError::Transport {
                message: format!("invalid message id `{}`: {e}", handle.id),
                source: None,
            })?;

        self.bot
            .delete_message(ChatId(handle.chat.0), message_id)
            .await
            .map_err(|e| transport_err("delete message", e))?;
        Ok(())
    }

    async fn receive(&self) -> Result<InboundEvent, IntakeError> {
        let mut rx = self.inbound_rx.lock().await;
        rx.recv().await.ok_or_else(|| IntakeError::Transport {
            message: "Telegram inbound channel closed".into(),
            source: None,
        })
    }
}
