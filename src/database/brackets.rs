use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

use super::models::{json_column, to_json_text};
use crate::domain::Bracket;

pub fn insert_bracket(conn: &Connection, bracket: &Bracket) -> Result<()> {
    let rounds = to_json_text(&bracket.rounds)?;

    conn.execute(
        "INSERT INTO brackets (id, tournament_id, bracket_type, rounds, is_locked, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            bracket.id,
            bracket.tournament_id,
            bracket.bracket_type,
            rounds,
            bracket.is_locked,
            bracket.created_at,
        ],
    )
    .context("Failed to insert bracket")
    .map(|_| ())
}

fn parse_bracket_row(row: &rusqlite::Row) -> rusqlite::Result<Bracket> {
    Ok(Bracket {
        id: row.get(0)?,
        tournament_id: row.get(1)?,
        bracket_type: row.get(2)?,
        rounds: json_column(row, 3)?,
        is_locked: row.get(4)?,
        created_at: row.get(5)?,
    })
}

pub fn find_by_tournament(conn: &Connection, tournament_id: &str) -> Result<Option<Bracket>> {
    let sql = "SELECT id, tournament_id, bracket_type, rounds, is_locked, created_at FROM brackets WHERE tournament_id = ?1";

    conn.query_row(sql, params![tournament_id], parse_bracket_row)
        .optional()
        .context("Failed to query bracket by tournament")
}
