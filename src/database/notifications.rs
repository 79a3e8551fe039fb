use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use super::models::{json_column, to_json_text};
use crate::domain::Notification;

pub fn insert_notification(conn: &Connection, n: &Notification) -> Result<()> {
    let data = to_json_text(&n.data)?;

    conn.execute(
        "INSERT INTO notifications (id, user_id, title, message, kind, data, read, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![n.id, n.user_id, n.title, n.message, n.kind, data, n.read, n.created_at],
    )
    .context("Failed to insert notification")
    .map(|_| ())
}

fn parse_notification_row(row: &rusqlite::Row) -> rusqlite::Result<Notification> {
    Ok(Notification {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        message: row.get(3)?,
        kind: row.get(4)?,
        data: json_column(row, 5)?,
        read: row.get(6)?,
        created_at: row.get(7)?,
    })
}

pub fn list_for_user(conn: &Connection, user_id: &str) -> Result<Vec<Notification>> {
    let sql = "SELECT id, user_id, title, message, kind, data, read, created_at FROM notifications WHERE user_id = ?1 ORDER BY created_at";

    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params![user_id], parse_notification_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}
