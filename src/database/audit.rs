use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use super::models::{optional_json_column, to_json_text};
use crate::domain::AuditEntry;

pub fn insert_entry(conn: &Connection, entry: &AuditEntry) -> Result<()> {
    let old_value = entry.old_value.as_ref().map(to_json_text).transpose()?;
    let new_value = entry.new_value.as_ref().map(to_json_text).transpose()?;

    conn.execute(
        "INSERT INTO audit_logs (id, user_id, user_display_name, action, resource_type, resource_id, old_value, new_value, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            entry.id,
            entry.user_id,
            entry.user_display_name,
            entry.action,
            entry.resource_type,
            entry.resource_id,
            old_value,
            new_value,
            entry.created_at,
        ],
    )
    .context("Failed to insert audit entry")
    .map(|_| ())
}

pub fn list_for_resource(
    conn: &Connection,
    resource_type: &str,
    resource_id: &str,
) -> Result<Vec<AuditEntry>> {
    let sql = "SELECT id, user_id, user_display_name, action, resource_type, resource_id, old_value, new_value, created_at FROM audit_logs WHERE resource_type = ?1 AND resource_id = ?2 ORDER BY created_at";

    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params![resource_type, resource_id], |row| {
            Ok(AuditEntry {
                id: row.get(0)?,
                user_id: row.get(1)?,
                user_display_name: row.get(2)?,
                action: row.get(3)?,
                resource_type: row.get(4)?,
                resource_id: row.get(5)?,
                old_value: optional_json_column(row, 6)?,
                new_value: optional_json_column(row, 7)?,
                created_at: row.get(8)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}
