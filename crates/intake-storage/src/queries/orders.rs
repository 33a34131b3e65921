// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Order operations.
//!
//! Every function is a single statement (or a read followed by a write in the
//! same closure) on the serialized connection, so each call is atomic with
//! respect to its order row.

use intake_core::{AnswerSlot, IntakeError, Order, OrderFilter, OrderId, OrderSnapshot, Step, UserId};
use rusqlite::{params, OptionalExtension, Row};

use crate::database::{map_tr_err, Database};

const ORDER_COLUMNS: &str =
    "order_id, user_id, username, created_at, answer_1, answer_2, answer_3, step";

/// Current UTC time in the stored timestamp format.
pub fn now_timestamp() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}

fn decode_step(row: &Row<'_>, idx: usize) -> rusqlite::Result<Step> {
    let code: i64 = row.get(idx)?;
    Step::from_code(code).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Integer,
            format!("unknown step code {code}").into(),
        )
    })
}

fn row_to_order(row: &Row<'_>) -> rusqlite::Result<Order> {
    Ok(Order {
        order_id: OrderId(row.get(0)?),
        user_id: UserId(row.get(1)?),
        username: row.get(2)?,
        created_at: row.get(3)?,
        name: row.get(4)?,
        task: row.get(5)?,
        contact: row.get(6)?,
        step: decode_step(row, 7)?,
    })
}

/// Insert a new order at `AWAIT_CONSENT` and return its id.
pub async fn create_order(
    db: &Database,
    user_id: UserId,
    username: &str,
) -> Result<OrderId, IntakeError> {
    let username = username.to_string();
    let created_at = now_timestamp();
    db.connection()
        .call(move |conn| -> Result<OrderId, rusqlite::Error> {
            conn.execute(
                "INSERT INTO orders (user_id, username, created_at, step)
                 VALUES (?1, ?2, ?3, ?4)",
                params![user_id.0, username, created_at, Step::AwaitConsent.code()],
            )?;
            Ok(OrderId(conn.last_insert_rowid()))
        })
        .await
        .map_err(map_tr_err)
}

/// Current step of an order.
pub async fn get_step(db: &Database, order_id: OrderId) -> Result<Step, IntakeError> {
    db.connection()
        .call(move |conn| -> Result<Option<Step>, rusqlite::Error> {
            conn.query_row(
                "SELECT step FROM orders WHERE order_id = ?1",
                params![order_id.0],
                |row| decode_step(row, 0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)?
        .ok_or(IntakeError::OrderNotFound { order_id })
}

enum StepUpdate {
    Applied,
    Missing,
    Regressed(Step),
}

/// Move an order to `step`. Moving backwards is refused.
pub async fn set_step(db: &Database, order_id: OrderId, step: Step) -> Result<(), IntakeError> {
    let outcome = db
        .connection()
        .call(move |conn| -> Result<StepUpdate, rusqlite::Error> {
            let changed = conn.execute(
                "UPDATE orders SET step = ?1 WHERE order_id = ?2 AND step <= ?1",
                params![step.code(), order_id.0],
            )?;
            if changed > 0 {
                return Ok(StepUpdate::Applied);
            }
            let current = conn
                .query_row(
                    "SELECT step FROM orders WHERE order_id = ?1",
                    params![order_id.0],
                    |row| decode_step(row, 0),
                )
                .optional()?;
            Ok(match current {
                Some(current) => StepUpdate::Regressed(current),
                None => StepUpdate::Missing,
            })
        })
        .await
        .map_err(map_tr_err)?;

    match outcome {
        StepUpdate::Applied => Ok(()),
        StepUpdate::Missing => Err(IntakeError::OrderNotFound { order_id }),
        StepUpdate::Regressed(current) => Err(IntakeError::StepRegression {
            order_id,
            current,
            requested: step,
        }),
    }
}

/// Write one answer slot, leaving the others untouched.
pub async fn record_answer(
    db: &Database,
    order_id: OrderId,
    slot: AnswerSlot,
    text: &str,
) -> Result<(), IntakeError> {
    let text = text.to_string();
    let sql = format!(
        "UPDATE orders SET {} = ?1 WHERE order_id = ?2",
        slot.column()
    );
    let changed = db
        .connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(&sql, params![text, order_id.0])
        })
        .await
        .map_err(map_tr_err)?;

    if changed == 0 {
        return Err(IntakeError::OrderNotFound { order_id });
    }
    Ok(())
}

/// True iff the order exists and all three answers are non-null.
pub async fn is_complete(db: &Database, order_id: OrderId) -> Result<bool, IntakeError> {
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let found = conn
                .query_row(
                    "SELECT 1 FROM orders
                     WHERE order_id = ?1
                       AND answer_1 IS NOT NULL
                       AND answer_2 IS NOT NULL
                       AND answer_3 IS NOT NULL",
                    params![order_id.0],
                    |_| Ok(()),
                )
                .optional()?;
            Ok(found.is_some())
        })
        .await
        .map_err(map_tr_err)
}

/// Full order row, if it exists.
pub async fn get_order(db: &Database, order_id: OrderId) -> Result<Option<Order>, IntakeError> {
    db.connection()
        .call(move |conn| -> Result<Option<Order>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {ORDER_COLUMNS} FROM orders WHERE order_id = ?1"),
                params![order_id.0],
                row_to_order,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// The fields needed to notify the operator about an order.
pub async fn fetch_snapshot(db: &Database, order_id: OrderId) -> Result<OrderSnapshot, IntakeError> {
    let order = get_order(db, order_id)
        .await?
        .ok_or(IntakeError::OrderNotFound { order_id })?;
    Ok(OrderSnapshot {
        order_id: order.order_id,
        user_id: order.user_id,
        username: order.username,
        name: order.name,
        task: order.task,
        contact: order.contact,
    })
}

/// Orders newest first, optionally for one user and capped at `limit`.
pub async fn list_orders(db: &Database, filter: &OrderFilter) -> Result<Vec<Order>, IntakeError> {
    let user_id = filter.user_id.map(|u| u.0);
    let limit = filter.limit.map_or(-1, |l| l as i64);
    db.connection()
        .call(move |conn| -> Result<Vec<Order>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ORDER_COLUMNS} FROM orders
                 WHERE (?1 IS NULL OR user_id = ?1)
                 ORDER BY order_id DESC
                 LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![user_id, limit], row_to_order)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// For each user, their newest order when it is not yet `DONE`.
pub async fn open_sessions(db: &Database) -> Result<Vec<(UserId, OrderId)>, IntakeError> {
    db.connection()
        .call(|conn| -> Result<Vec<(UserId, OrderId)>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT o.user_id, o.order_id FROM orders o
                 WHERE o.order_id = (SELECT MAX(i.order_id) FROM orders i WHERE i.user_id = o.user_id)
                   AND o.step < ?1
                 ORDER BY o.user_id",
            )?;
            let rows = stmt.query_map(params![Step::Done.code()], |row| {
                Ok((UserId(row.get(0)?), OrderId(row.get(1)?)))
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
