use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::domain::{PaymentStatus, Registration};

const REGISTRATION_COLUMNS: &str = "id, tournament_id, user_id, team_id, team_name, player_game_id, payment_status, verified_by, verified_at, notes, created_at";

pub fn insert_registration(conn: &Connection, r: &Registration) -> Result<()> {
    let sql = format!(
        "INSERT INTO registrations ({REGISTRATION_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
    );

    conn.execute(
        &sql,
        params![
            r.id,
            r.tournament_id,
            r.user_id,
            r.team_id,
            r.team_name,
            r.player_game_id,
            r.payment_status,
            r.verified_by,
            r.verified_at,
            r.notes,
            r.created_at,
        ],
    )
    .context("Failed to insert registration")
    .map(|_| ())
}

fn parse_registration_row(row: &rusqlite::Row) -> rusqlite::Result<Registration> {
    Ok(Registration {
        id: row.get(0)?,
        tournament_id: row.get(1)?,
        user_id: row.get(2)?,
        team_id: row.get(3)?,
        team_name: row.get(4)?,
        player_game_id: row.get(5)?,
        payment_status: row.get(6)?,
        verified_by: row.get(7)?,
        verified_at: row.get(8)?,
        notes: row.get(9)?,
        created_at: row.get(10)?,
    })
}

pub fn find_by_id(conn: &Connection, id: &str) -> Result<Option<Registration>> {
    let sql = format!("SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE id = ?1");

    conn.query_row(&sql, params![id], parse_registration_row)
        .optional()
        .context("Failed to query registration by id")
}

/// Approved registrations of a tournament in the order they were made.
pub fn list_approved(conn: &Connection, tournament_id: &str) -> Result<Vec<Registration>> {
    let sql = format!(
        "SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE tournament_id = ?1 AND payment_status = ?2 ORDER BY created_at, id"
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![tournament_id, PaymentStatus::Approved], parse_registration_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

pub fn update_payment_status(
    conn: &Connection,
    id: &str,
    status: PaymentStatus,
    verified_by: &str,
    notes: Option<&str>,
    now: DateTime<Utc>,
) -> Result<()> {
    conn.execute(
        "UPDATE registrations SET payment_status = ?1, verified_by = ?2, verified_at = ?3, notes = COALESCE(?4, notes) WHERE id = ?5",
        params![status, verified_by, now, notes, id],
    )
    .context("Failed to update registration payment status")
    .map(|_| ())
}
