// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::IntakeConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every failure instead of stopping at the first one.
pub fn validate_config(config: &IntakeConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::validation(
            "storage.database_path must not be empty",
        ));
    }

    let entry = config.conversation.entry_command.trim();
    if !entry.starts_with('/') || entry.len() < 2 || entry.contains(char::is_whitespace) {
        errors.push(ConfigError::validation(format!(
            "conversation.entry_command must look like `/command`, got `{entry}`"
        )));
    }

    if config.conversation.consent_payload.trim().is_empty() {
        errors.push(ConfigError::validation(
            "conversation.consent_payload must not be empty",
        ));
    }

    if config.conversation.max_concurrent_events == 0 {
        errors.push(ConfigError::validation(
            "conversation.max_concurrent_events must be at least 1",
        ));
    }

    if config.operator.chat_id == Some(0) {
        errors.push(ConfigError::validation("operator.chat_id must not be 0"));
    }

    for (key, value) in config.prompts.entries() {
        if value.trim().is_empty() {
            errors.push(ConfigError::validation(format!(
                "prompts.{key} must not be empty"
            )));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&IntakeConfig::default()).is_ok());
    }

    #[test]
    fn all_errors_are_collected() {
        let mut config = IntakeConfig::default();
        config.storage.database_path = "  ".into();
        config.conversation.entry_command = "start".into();
        config.conversation.max_concurrent_events = 0;
        config.prompts.ask_task = String::new();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.iter().any(|e| e.to_string().contains("prompts.ask_task")));
    }

    #[test]
    fn zero_operator_chat_is_rejected() {
        let mut config = IntakeConfig::default();
        config.operator.chat_id = Some(0);
        let errors = validate_config(&config).unwrap_err();
        assert!(errors[0].to_string().contains("operator.chat_id"));
    }
}
