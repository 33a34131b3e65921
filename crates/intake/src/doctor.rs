// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `intake doctor` command implementation.
//!
//! Runs diagnostic checks against the configuration, the order database and
//! the Telegram Bot API.

use std::io::IsTerminal;
use std::path::Path;
use std::time::{Duration, Instant};

use intake_config::IntakeConfig;
use intake_core::{HealthStatus, IntakeError, PluginAdapter};
use intake_telegram::TelegramChannel;

/// Status of a diagnostic check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

/// Result of a single diagnostic check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub duration: Duration,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, message: impl Into<String>, start: Instant) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.into(),
            duration: start.elapsed(),
        }
    }
}

/// Run the `intake doctor` command.
pub async fn run_doctor(
    config: &IntakeConfig,
    config_path: Option<&Path>,
    plain: bool,
) -> Result<(), IntakeError> {
    let use_color = !plain && std::io::stdout().is_terminal();

    let results = vec![
        check_config(config_path),
        check_database(&config.storage.database_path).await,
        check_operator(config),
        check_images(config),
        check_telegram(config).await,
        check_memory(),
    ];

    println!();
    println!("  intake doctor");
    println!("  {}", "-".repeat(50));

    let mut issues = 0;
    for result in &results {
        if result.status != CheckStatus::Pass {
            issues += 1;
        }
        println!("{}", render_line(result, use_color));
    }

    println!();
    if issues > 0 {
        let issue_word = if issues == 1 { "issue" } else { "issues" };
        println!("  {issues} {issue_word} found.");
    } else {
        println!("  All checks passed.");
    }
    println!();

    Ok(())
}

fn render_line(result: &CheckResult, use_color: bool) -> String {
    let duration_ms = result.duration.as_millis();
    if use_color {
        use colored::Colorize;
        let (symbol, message) = match result.status {
            CheckStatus::Pass => ("✓".green().to_string(), result.message.normal()),
            CheckStatus::Warn => ("!".yellow().to_string(), result.message.yellow()),
            CheckStatus::Fail => ("✗".red().to_string(), result.message.red()),
        };
        format!(
            "    {symbol} {:<16} {message} ({duration_ms}ms)",
            result.name
        )
    } else {
        let tag = match result.status {
            CheckStatus::Pass => "[OK]  ",
            CheckStatus::Warn => "[WARN]",
            CheckStatus::Fail => "[FAIL]",
        };
        format!(
            "    {tag} {:<16} {} ({duration_ms}ms)",
            result.name, result.message
        )
    }
}

/// Check configuration loads without errors.
fn check_config(path: Option<&Path>) -> CheckResult {
    let start = Instant::now();
    let loaded = match path {
        Some(path) => intake_config::load_and_validate_path(path),
        None => intake_config::load_and_validate(),
    };
    match loaded {
        Ok(_) => CheckResult::new("Configuration", CheckStatus::Pass, "valid", start),
        Err(errors) => CheckResult::new(
            "Configuration",
            CheckStatus::Fail,
            format!("{} error(s)", errors.len()),
            start,
        ),
    }
}

/// Check the database exists, opens, and passes an integrity check.
async fn check_database(db_path: &str) -> CheckResult {
    let start = Instant::now();

    if !Path::new(db_path).exists() {
        return CheckResult::new(
            "Database",
            CheckStatus::Warn,
            format!("not found: {db_path} (will be created on first run)"),
            start,
        );
    }

    let conn = match tokio_rusqlite::Connection::open(db_path).await {
        Ok(conn) => conn,
        Err(e) => {
            return CheckResult::new(
                "Database",
                CheckStatus::Fail,
                format!("open failed: {e}"),
                start,
            );
        }
    };

    let result = conn
        .call(|conn| -> Result<(String, i64), rusqlite::Error> {
            let integrity: String = conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
            let orders: i64 = conn
                .query_row(
                    "SELECT count(*) FROM sqlite_master WHERE type = 'table' AND name = 'orders'",
                    [],
                    |row| row.get(0),
                )?;
            let count = if orders > 0 {
                conn.query_row("SELECT count(*) FROM orders", [], |row| row.get(0))?
            } else {
                -1
            };
            Ok((integrity, count))
        })
        .await;

    match result {
        Ok((integrity, _)) if integrity != "ok" => CheckResult::new(
            "Database",
            CheckStatus::Fail,
            format!("integrity check failed: {integrity}"),
            start,
        ),
        Ok((_, -1)) => CheckResult::new(
            "Database",
            CheckStatus::Warn,
            "no orders table (migrations run on first serve)",
            start,
        ),
        Ok((_, count)) => CheckResult::new(
            "Database",
            CheckStatus::Pass,
            format!("ok, {count} order(s)"),
            start,
        ),
        Err(e) => CheckResult::new(
            "Database",
            CheckStatus::Fail,
            format!("query failed: {e}"),
            start,
        ),
    }
}

fn check_operator(config: &IntakeConfig) -> CheckResult {
    let start = Instant::now();
    match config.operator.chat_id {
        Some(chat_id) => CheckResult::new(
            "Operator",
            CheckStatus::Pass,
            format!("chat {chat_id}"),
            start,
        ),
        None => CheckResult::new(
            "Operator",
            CheckStatus::Warn,
            "operator.chat_id not set (orders will not be forwarded)",
            start,
        ),
    }
}

fn check_images(config: &IntakeConfig) -> CheckResult {
    let start = Instant::now();
    let missing: Vec<&str> = [
        &config.conversation.welcome_image,
        &config.conversation.farewell_image,
    ]
    .into_iter()
    .filter_map(|image| image.as_deref())
    .filter(|path| !Path::new(path).is_file())
    .collect();

    if missing.is_empty() {
        CheckResult::new("Images", CheckStatus::Pass, "ok", start)
    } else {
        CheckResult::new(
            "Images",
            CheckStatus::Warn,
            format!("not found: {}", missing.join(", ")),
            start,
        )
    }
}

/// Check the bot token is set and accepted by Telegram.
async fn check_telegram(config: &IntakeConfig) -> CheckResult {
    let start = Instant::now();

    let channel = match TelegramChannel::new(&config.telegram, &config.conversation.entry_command)
    {
        Ok(channel) => channel,
        Err(e) => return CheckResult::new("Telegram", CheckStatus::Fail, e.to_string(), start),
    };

    match tokio::time::timeout(Duration::from_secs(5), channel.health_check()).await {
        Ok(Ok(HealthStatus::Healthy)) => {
            CheckResult::new("Telegram", CheckStatus::Pass, "bot reachable", start)
        }
        Ok(Ok(HealthStatus::Degraded(msg))) => {
            CheckResult::new("Telegram", CheckStatus::Warn, msg, start)
        }
        Ok(Ok(HealthStatus::Unhealthy(msg))) => {
            CheckResult::new("Telegram", CheckStatus::Fail, msg, start)
        }
        Ok(Err(e)) => CheckResult::new("Telegram", CheckStatus::Fail, e.to_string(), start),
        Err(_) => CheckResult::new("Telegram", CheckStatus::Fail, "timeout (5s)", start),
    }
}

/// Heap and resident memory as reported by jemalloc.
fn check_memory() -> CheckResult {
    let start = Instant::now();

    #[cfg(not(target_env = "msvc"))]
    {
        let _ = tikv_jemalloc_ctl::epoch::advance();
        let allocated = tikv_jemalloc_ctl::stats::allocated::read().unwrap_or(0);
        let resident = tikv_jemalloc_ctl::stats::resident::read().unwrap_or(0);
        let allocated_mb = allocated as f64 / (1024.0 * 1024.0);
        let resident_mb = resident as f64 / (1024.0 * 1024.0);
        CheckResult::new(
            "Memory",
            CheckStatus::Pass,
            format!("heap: {allocated_mb:.1} MB, resident: {resident_mb:.1} MB"),
            start,
        )
    }

    #[cfg(target_env = "msvc")]
    {
        CheckResult::new(
            "Memory",
            CheckStatus::Warn,
            "jemalloc not available on MSVC",
            start,
        )
    }
}
