// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `intake orders` command implementation.
//!
//! Read-only view of the order table for operators auditing what the bot
//! has collected.

use std::io::IsTerminal;
use std::path::Path;

use intake_config::IntakeConfig;
use intake_config::model::StorageConfig;
use intake_core::{IntakeError, Order, OrderFilter, OrderId, OrderStore, Step, UserId};
use intake_storage::SqliteOrderStore;

/// Open the configured store, refusing to create a database that does not exist.
async fn open_store(storage: &StorageConfig) -> Result<SqliteOrderStore, IntakeError> {
    if !Path::new(&storage.database_path).exists() {
        return Err(IntakeError::Config(format!(
            "database not found: {} (run `intake serve` first)",
            storage.database_path
        )));
    }
    let store = SqliteOrderStore::new(storage.clone());
    store.initialize().await?;
    Ok(store)
}

/// Load orders newest first.
async fn load_orders(
    storage: &StorageConfig,
    filter: &OrderFilter,
) -> Result<Vec<Order>, IntakeError> {
    let store = open_store(storage).await?;
    let orders = store.list_orders(filter).await?;
    store.close().await?;
    Ok(orders)
}

/// Run `intake orders [--user ID] [--limit N]`.
pub async fn run_list(
    config: &IntakeConfig,
    user: Option<i64>,
    limit: usize,
    json: bool,
    plain: bool,
) -> Result<(), IntakeError> {
    let filter = OrderFilter {
        user_id: user.map(UserId),
        limit: Some(limit),
    };
    let orders = load_orders(&config.storage, &filter).await?;

    if json {
        println!("{}", to_json(&orders)?);
        return Ok(());
    }

    let use_color = !plain && std::io::stdout().is_terminal();
    println!();
    println!("  intake orders");
    println!("  {}", "-".repeat(60));
    if orders.is_empty() {
        println!("    no orders");
    }
    for order in &orders {
        println!("    {}", summary_line(order, use_color));
    }
    println!();
    Ok(())
}

/// Run `intake orders show <ID>`.
pub async fn run_show(
    config: &IntakeConfig,
    id: i64,
    json: bool,
    plain: bool,
) -> Result<(), IntakeError> {
    let store = open_store(&config.storage).await?;
    let order = store.get_order(OrderId(id)).await?;
    store.close().await?;

    let order = order.ok_or(IntakeError::OrderNotFound {
        order_id: OrderId(id),
    })?;

    if json {
        println!("{}", to_json(&order)?);
        return Ok(());
    }

    let use_color = !plain && std::io::stdout().is_terminal();
    println!();
    for line in detail_lines(&order, use_color) {
        println!("  {line}");
    }
    println!();
    Ok(())
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, IntakeError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| IntakeError::Internal(format!("failed to serialize orders: {e}")))
}

fn step_label(step: Step, use_color: bool) -> String {
    let label = format!("{:<13}", step.to_string());
    if !use_color {
        return label;
    }
    use colored::Colorize;
    if step.is_terminal() {
        label.green().to_string()
    } else {
        label.yellow().to_string()
    }
}

fn summary_line(order: &Order, use_color: bool) -> String {
    format!(
        "#{:<6} {} {}  @{} ({})  {}",
        order.order_id.0,
        step_label(order.step, use_color),
        order.created_at,
        order.username,
        order.user_id.0,
        order.name.as_deref().unwrap_or("-"),
    )
}

fn detail_lines(order: &Order, use_color: bool) -> Vec<String> {
    let field = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());
    vec![
        format!("Order #{}", order.order_id.0),
        "-".repeat(40),
        format!("Step:     {}", step_label(order.step, use_color).trim_end()),
        format!("Created:  {}", order.created_at),
        format!("User:     @{} ({})", order.username, order.user_id.0),
        format!("Name:     {}", field(&order.name)),
        format!("Task:     {}", field(&order.task)),
        format!("Contact:  {}", field(&order.contact)),
    ]
}
