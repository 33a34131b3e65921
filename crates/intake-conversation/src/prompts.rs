// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resolved user-facing texts.

use intake_config::model::PromptsConfig;
use intake_core::Step;

const COMMAND_PLACEHOLDER: &str = "{command}";

/// Prompt texts with the entry command substituted in.
#[derive(Debug, Clone)]
pub struct Prompts {
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

impl Prompts {
    pub fn from_config(config: &PromptsConfig, entry_command: &str) -> Self {
        let render = |text: &str| text.replace(COMMAND_PLACEHOLDER, entry_command);
        Self {
            wait_indicator: render(&config.wait_indicator),
            welcome: render(&config.welcome),
            consent_button: render(&config.consent_button),
            ask_name: render(&config.ask_name),
            ask_task: render(&config.ask_task),
            ask_contact: render(&config.ask_contact),
            farewell: render(&config.farewell),
            use_entry_command: render(&config.use_entry_command),
            press_button: render(&config.press_button),
            no_files: render(&config.no_files),
            failure: render(&config.failure),
        }
    }

    /// The question asked while the order sits at `step`.
    pub fn question(&self, step: Step) -> Option<&str> {
        match step {
            Step::AskName => Some(&self.ask_name),
            Step::AskTask => Some(&self.ask_task),
            Step::AskContact => Some(&self.ask_contact),
            Step::AwaitConsent | Step::Done => None,
        }
    }
}

impl Default for Prompts {
    fn default() -> Self {
        Self::from_config(&PromptsConfig::default(), "/start")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_command_is_substituted() {
        let prompts = Prompts::from_config(&PromptsConfig::default(), "/order");
        assert_eq!(prompts.use_entry_command, "Press /order first!");
        assert!(prompts.failure.contains("/order"));
        assert!(!prompts.failure.contains(COMMAND_PLACEHOLDER));
    }

    #[test]
    fn questions_exist_only_for_question_steps() {
        let prompts = Prompts::default();
        assert_eq!(prompts.question(Step::AskName), Some("How should I address you?"));
        assert!(prompts.question(Step::AskTask).is_some());
        assert!(prompts.question(Step::AskContact).is_some());
        assert!(prompts.question(Step::AwaitConsent).is_none());
        assert!(prompts.question(Step::Done).is_none());
    }
}
