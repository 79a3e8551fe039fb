use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::domain::{PrizeShare, Room, Tournament, TournamentStatus};

const TOURNAMENT_COLUMNS: &str = "id, title, organizer_id, status, prize_pool, room_id, room_password, room_visible_from, room_revealed, created_at, updated_at";

pub fn insert_tournament(conn: &Connection, tournament: &Tournament) -> Result<()> {
    let room = tournament.room.as_ref();
    let sql = format!(
        "INSERT INTO tournaments ({TOURNAMENT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
    );

    conn.execute(
        &sql,
        params![
            tournament.id,
            tournament.title,
            tournament.organizer_id,
            tournament.status,
            tournament.prize_pool,
            room.map(|r| r.id.as_str()),
            room.map(|r| r.password.as_str()),
            room.and_then(|r| r.visible_from),
            room.is_some_and(|r| r.revealed),
            tournament.created_at,
            tournament.updated_at,
        ],
    )
    .context("Failed to insert tournament")?;

    insert_prize_distribution(conn, &tournament.id, &tournament.prize_distribution)
}

fn insert_prize_distribution(
    conn: &Connection,
    tournament_id: &str,
    shares: &[PrizeShare],
) -> Result<()> {
    let sql = "INSERT INTO prize_distribution (tournament_id, position, percentage, amount, sort_order) VALUES (?1, ?2, ?3, ?4, ?5)";

    for (idx, share) in shares.iter().enumerate() {
        conn.execute(
            sql,
            params![tournament_id, share.position, share.percentage, share.amount, idx as i64],
        )
        .context("Failed to insert prize share")?;
    }
    Ok(())
}

fn parse_tournament_row(row: &rusqlite::Row) -> rusqlite::Result<Tournament> {
    let room_id: Option<String> = row.get(5)?;
    let room = match room_id {
        Some(id) => Some(Room {
            id,
            password: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
            visible_from: row.get(7)?,
            revealed: row.get(8)?,
        }),
        None => None,
    };

    Ok(Tournament {
        id: row.get(0)?,
        title: row.get(1)?,
        organizer_id: row.get(2)?,
        status: row.get(3)?,
        prize_pool: row.get(4)?,
        prize_distribution: Vec::new(),
        room,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn load_prize_distribution(conn: &Connection, tournament_id: &str) -> Result<Vec<PrizeShare>> {
    let sql = "SELECT position, percentage, amount FROM prize_distribution WHERE tournament_id = ?1 ORDER BY sort_order";

    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params![tournament_id], |row| {
            Ok(PrizeShare {
                position: row.get(0)?,
                percentage: row.get(1)?,
                amount: row.get(2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

pub fn find_by_id(conn: &Connection, id: &str) -> Result<Option<Tournament>> {
    let sql = format!("SELECT {TOURNAMENT_COLUMNS} FROM tournaments WHERE id = ?1");

    let tournament = conn
        .query_row(&sql, params![id], parse_tournament_row)
        .optional()
        .context("Failed to query tournament by id")?;

    match tournament {
        Some(mut t) => {
            t.prize_distribution = load_prize_distribution(conn, &t.id)?;
            Ok(Some(t))
        }
        None => Ok(None),
    }
}

pub fn update_status(
    conn: &Connection,
    id: &str,
    status: TournamentStatus,
    now: DateTime<Utc>,
) -> Result<()> {
    conn.execute(
        "UPDATE tournaments SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status, now, id],
    )
    .context("Failed to update tournament status")
    .map(|_| ())
}

/// Live tournaments holding a room that has not been revealed yet.
pub fn list_live_with_hidden_room(conn: &Connection) -> Result<Vec<Tournament>> {
    let sql = format!(
        "SELECT {TOURNAMENT_COLUMNS} FROM tournaments WHERE status = ?1 AND room_id IS NOT NULL AND room_revealed = 0 ORDER BY created_at"
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![TournamentStatus::Live], parse_tournament_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

/// Flips the room's revealed flag. Returns `false` when another sweep
/// already flipped it.
pub fn mark_room_revealed(conn: &Connection, id: &str, now: DateTime<Utc>) -> Result<bool> {
    let changed = conn
        .execute(
            "UPDATE tournaments SET room_revealed = 1, updated_at = ?1 WHERE id = ?2 AND room_id IS NOT NULL AND room_revealed = 0",
            params![now, id],
        )
        .context("Failed to mark room revealed")?;

    Ok(changed == 1)
}
