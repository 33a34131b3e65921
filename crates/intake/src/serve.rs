// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `intake serve` command implementation.
//!
//! Opens the SQLite order store, connects the Telegram transport, restores
//! unfinished sessions and runs the intake loop until a shutdown signal.

use std::path::Path;
use std::sync::Arc;

use intake_config::IntakeConfig;
use intake_conversation::{ConversationEngine, IntakeLoop, shutdown};
use intake_core::{ChatTransport, IntakeError, OrderStore};
use intake_storage::SqliteOrderStore;
use intake_telegram::TelegramChannel;
use tracing::{error, info, warn};

/// Runs the `intake serve` command.
pub async fn run_serve(config: IntakeConfig) -> Result<(), IntakeError> {
    init_tracing(&config.bot.log_level);

    info!(name = %config.bot.name, "starting intake serve");

    let mut channel =
        TelegramChannel::new(&config.telegram, &config.conversation.entry_command).map_err(|e| {
            error!(error = %e, "failed to initialize Telegram transport");
            eprintln!(
                "error: Telegram bot token required. Set telegram.bot_token or INTAKE_TELEGRAM_BOT_TOKEN"
            );
            e
        })?;

    let store = SqliteOrderStore::new(config.storage.clone())
        .with_username_placeholder(config.conversation.username_placeholder.clone());
    store.initialize().await?;
    let store: Arc<dyn OrderStore> = Arc::new(store);
    info!(path = %config.storage.database_path, "order store opened");

    warn_on_missing_setup(&config);

    channel.connect().await?;
    let transport: Arc<dyn ChatTransport> = Arc::new(channel);

    let engine = Arc::new(ConversationEngine::from_config(
        &config,
        store.clone(),
        transport.clone(),
    ));

    if config.conversation.restore_sessions {
        engine.restore_sessions().await?;
    }

    let cancel = shutdown::install_signal_handler();
    let intake_loop = IntakeLoop::new(
        transport,
        store,
        engine,
        config.conversation.max_concurrent_events,
    );
    intake_loop.run(cancel).await?;

    info!("intake serve stopped");
    Ok(())
}

/// Log setup problems that degrade the bot without stopping it.
fn warn_on_missing_setup(config: &IntakeConfig) {
    if config.operator.chat_id.is_none() {
        warn!("operator.chat_id is not set, completed orders will not be forwarded");
    }

    let images = [
        ("welcome_image", &config.conversation.welcome_image),
        ("farewell_image", &config.conversation.farewell_image),
    ];
    for (key, path) in images
        .into_iter()
        .filter_map(|(key, image)| image.as_deref().map(|path| (key, path)))
    {
        if !Path::new(path).is_file() {
            warn!(key, path, "image not found, text will be sent without it");
        }
    }
}

/// Initialize the tracing subscriber with an env filter.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("intake={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
