// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Intake order bot.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Intake configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IntakeConfig {
    /// Bot identity and logging.
    #[serde(default)]
    pub bot: BotConfig,

    /// Telegram bot integration settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Where completed orders are reported.
    #[serde(default)]
    pub operator: OperatorConfig,

    /// Conversation flow settings.
    #[serde(default)]
    pub conversation: ConversationConfig,

    /// User-facing texts.
    #[serde(default)]
    pub prompts: PromptsConfig,
}

/// Bot identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BotConfig {
    /// Display name used in logs and `doctor` output.
    #[serde(default = "default_bot_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_bot_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_bot_name() -> String {
    "intake".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Telegram bot integration configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Telegram Bot API token. Required by `serve`.
    #[serde(default)]
    pub bot_token: Option<String>,
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL journal mode.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: true,
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|d| d.join("intake").join("intake.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("intake.db"))
        .display()
        .to_string()
}

fn default_true() -> bool {
    true
}

/// Operator notification target.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OperatorConfig {
    /// Chat that receives completed-order summaries. `None` disables notifications.
    #[serde(default)]
    pub chat_id: Option<i64>,
}

/// Conversation flow configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConversationConfig {
    /// Command that starts a new order, e.g. `/start`.
    #[serde(default = "default_entry_command")]
    pub entry_command: String,

    /// Callback payload carried by the consent button.
    #[serde(default = "default_consent_payload")]
    pub consent_payload: String,

    /// Rebuild in-flight sessions from storage at startup.
    #[serde(default = "default_true")]
    pub restore_sessions: bool,

    /// Upper bound on events processed at the same time.
    #[serde(default = "default_max_concurrent_events")]
    pub max_concurrent_events: usize,

    /// Stored in place of a missing username.
    #[serde(default = "default_username_placeholder")]
    pub username_placeholder: String,

    /// Image sent with the welcome text.
    #[serde(default)]
    pub welcome_image: Option<String>,

    /// Image sent with the farewell text.
    #[serde(default)]
    pub farewell_image: Option<String>,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            entry_command: default_entry_command(),
            consent_payload: default_consent_payload(),
            restore_sessions: true,
            max_concurrent_events: default_max_concurrent_events(),
            username_placeholder: default_username_placeholder(),
            welcome_image: None,
            farewell_image: None,
        }
    }
}

fn default_entry_command() -> String {
    "/start".to_string()
}

fn default_consent_payload() -> String {
    "yes".to_string()
}

fn default_max_concurrent_events() -> usize {
    64
}

fn default_username_placeholder() -> String {
    "0".to_string()
}

/// User-facing texts. `{command}` is replaced with the entry command.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct PromptsConfig {
    pub wait_indicator: String,
    pub welcome: String,
    pub consent_button: String,
    pub ask_name: String,
    pub ask_task: String,
    pub ask_contact: String,
    pub farewell: String,
    pub use_entry_command: String,
    pub press_button: String,
    pub no_files: String,
    pub failure: String,
}

impl PromptsConfig {
    /// All prompts with their key names, for validation.
    pub fn entries(&self) -> [(&'static str, &str); 11] {
        [
            ("wait_indicator", self.wait_indicator.as_str()),
            ("welcome", self.welcome.as_str()),
            ("consent_button", self.consent_button.as_str()),
            ("ask_name", self.ask_name.as_str()),
            ("ask_task", self.ask_task.as_str()),
            ("ask_contact", self.ask_contact.as_str()),
            ("farewell", self.farewell.as_str()),
            ("use_entry_command", self.use_entry_command.as_str()),
            ("press_button", self.press_button.as_str()),
            ("no_files", self.no_files.as_str()),
            ("failure", self.failure.as_str()),
        ]
    }
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            wait_indicator: "⏳".to_string(),
            welcome: "👋 Hi! I take requests for building bots. I'll help you file one \
                      quickly, without calls or long chats.\n\n\
                      May I ask a couple of questions about your order?"
                .to_string(),
            consent_button: "✅ Yes!".to_string(),
            ask_name: "How should I address you?".to_string(),
            ask_task: "Describe the task you want to solve.".to_string(),
            ask_contact: "Leave your contact details. If you have none, the reply will \
                          come to this Telegram account."
                .to_string(),
            farewell: "Thank you! Everything you told me goes to the developer, who \
                       will get in touch with you."
                .to_string(),
            use_entry_command: "Press {command} first!".to_string(),
            press_button: "Press the button above first!".to_string(),
            no_files: "This bot does not accept files!".to_string(),
            failure: "Something went wrong. Press {command} to start over.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_populated() {
        let config = IntakeConfig::default();
        assert_eq!(config.bot.name, "intake");
        assert_eq!(config.conversation.entry_command, "/start");
        assert_eq!(config.conversation.consent_payload, "yes");
        assert!(config.conversation.restore_sessions);
        assert_eq!(config.conversation.max_concurrent_events, 64);
        assert_eq!(config.conversation.username_placeholder, "0");
        assert!(config.storage.database_path.ends_with("intake.db"));
        assert!(config.operator.chat_id.is_none());
    }

    #[test]
    fn prompts_entries_cover_every_field() {
        let prompts = PromptsConfig::default();
        assert!(prompts.entries().iter().all(|(_, v)| !v.is_empty()));
        assert_eq!(prompts.ask_name, "How should I address you?");
    }
}
