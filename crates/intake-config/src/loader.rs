// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./intake.toml` > `~/.config/intake/intake.toml` > `/etc/intake/intake.toml`
//! with environment variable overrides via the `INTAKE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::IntakeConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/intake/intake.toml`
/// 3. `~/.config/intake/intake.toml`
/// 4. `./intake.toml`
/// 5. `INTAKE_*` environment variables
pub fn load_config() -> Result<IntakeConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no files, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<IntakeConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(IntakeConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<IntakeConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(IntakeConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(IntakeConfig::default()))
        .merge(Toml::file("/etc/intake/intake.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("intake/intake.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("intake.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider with explicit section mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `INTAKE_TELEGRAM_BOT_TOKEN` must map to `telegram.bot_token`.
fn env_provider() -> Env {
    Env::prefixed("INTAKE_").map(|key| map_env_key(key.as_str()).into())
}

/// Map a lowercased, prefix-stripped env var name to a dotted config path.
pub(crate) fn map_env_key(key: &str) -> String {
    const SECTIONS: [&str; 6] = [
        "bot",
        "telegram",
        "storage",
        "operator",
        "conversation",
        "prompts",
    ];

    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|r| r.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}
