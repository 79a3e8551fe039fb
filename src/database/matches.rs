use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::domain::{EntrantKind, Match, MatchStatus, Participant, Scores, Side, TournamentStatus};

const MATCH_COLUMNS: &str = "id, tournament_id, round, position, team1_id, team1_name, team1_kind, team2_id, team2_name, team2_kind, status, winner_id, winner_name, team1_score, team2_score, completed_at, created_at, updated_at";

pub fn insert_match(conn: &Connection, m: &Match) -> Result<()> {
    let sql = format!(
        "INSERT INTO matches ({MATCH_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)"
    );
    let team1 = m.team1.as_ref();
    let team2 = m.team2.as_ref();

    conn.execute(
        &sql,
        params![
            m.id,
            m.tournament_id,
            m.round,
            m.position,
            team1.map(|p| p.id.as_str()),
            team1.map(|p| p.name.as_str()),
            team1.map(|p| p.kind),
            team2.map(|p| p.id.as_str()),
            team2.map(|p| p.name.as_str()),
            team2.map(|p| p.kind),
            m.status,
            m.winner_id,
            m.winner_name,
            m.scores.map(|s| s.team1_score),
            m.scores.map(|s| s.team2_score),
            m.completed_at,
            m.created_at,
            m.updated_at,
        ],
    )
    .with_context(|| {
        format!("Failed to insert match {} (round {}, position {})", m.id, m.round, m.position)
    })
    .map(|_| ())
}

fn parse_participant(
    row: &rusqlite::Row,
    first_column: usize,
) -> rusqlite::Result<Option<Participant>> {
    let id: Option<String> = row.get(first_column)?;
    let name: Option<String> = row.get(first_column + 1)?;
    let kind: Option<EntrantKind> = row.get(first_column + 2)?;

    Ok(id.map(|id| Participant {
        name: name.unwrap_or_else(|| id.clone()),
        kind: kind.unwrap_or(EntrantKind::Solo),
        id,
    }))
}

fn parse_match_row(row: &rusqlite::Row) -> rusqlite::Result<Match> {
    let team1_score: Option<i32> = row.get(13)?;
    let team2_score: Option<i32> = row.get(14)?;
    let scores = match (team1_score, team2_score) {
        (Some(team1_score), Some(team2_score)) => Some(Scores {
            team1_score,
            team2_score,
        }),
        _ => None,
    };

    Ok(Match {
        id: row.get(0)?,
        tournament_id: row.get(1)?,
        round: row.get(2)?,
        position: row.get(3)?,
        team1: parse_participant(row, 4)?,
        team2: parse_participant(row, 7)?,
        status: row.get(10)?,
        winner_id: row.get(11)?,
        winner_name: row.get(12)?,
        scores,
        completed_at: row.get(15)?,
        created_at: row.get(16)?,
        updated_at: row.get(17)?,
    })
}

pub fn find_by_id(conn: &Connection, id: &str) -> Result<Option<Match>> {
    let sql = format!("SELECT {MATCH_COLUMNS} FROM matches WHERE id = ?1");

    conn.query_row(&sql, params![id], parse_match_row)
        .optional()
        .context("Failed to query match by id")
}

/// The match at a bracket coordinate.
pub fn find_at(
    conn: &Connection,
    tournament_id: &str,
    round: u32,
    position: u32,
) -> Result<Option<Match>> {
    let sql = format!(
        "SELECT {MATCH_COLUMNS} FROM matches WHERE tournament_id = ?1 AND round = ?2 AND position = ?3"
    );

    conn.query_row(&sql, params![tournament_id, round, position], parse_match_row)
        .optional()
        .context("Failed to query match by coordinates")
}

pub fn list_by_tournament(conn: &Connection, tournament_id: &str) -> Result<Vec<Match>> {
    let sql = format!(
        "SELECT {MATCH_COLUMNS} FROM matches WHERE tournament_id = ?1 ORDER BY round, position"
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![tournament_id], parse_match_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

/// Completed matches with a winner, across every live tournament, earliest
/// rounds first.
pub fn list_decided_in_live_tournaments(conn: &Connection) -> Result<Vec<Match>> {
    let columns = MATCH_COLUMNS
        .split(", ")
        .map(|c| format!("m.{c}"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "SELECT {columns} FROM matches m JOIN tournaments t ON t.id = m.tournament_id WHERE t.status = ?1 AND m.status = ?2 AND m.winner_id IS NOT NULL AND m.winner_id != '' ORDER BY m.tournament_id, m.round, m.position"
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![TournamentStatus::Live, MatchStatus::Completed], parse_match_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

/// Writes `participant` into one side of a match.
pub fn assign_side(
    conn: &Connection,
    match_id: &str,
    side: Side,
    participant: &Participant,
    now: DateTime<Utc>,
) -> Result<()> {
    let prefix = side.column_prefix();
    let sql = format!(
        "UPDATE matches SET {prefix}_id = ?1, {prefix}_name = ?2, {prefix}_kind = ?3, updated_at = ?4 WHERE id = ?5"
    );

    conn.execute(&sql, params![participant.id, participant.name, participant.kind, now, match_id])
        .context("Failed to assign match side")
        .map(|_| ())
}

/// Marks a match completed in favour of `winner`.
pub fn complete(
    conn: &Connection,
    match_id: &str,
    winner: &Participant,
    scores: Option<Scores>,
    now: DateTime<Utc>,
) -> Result<()> {
    conn.execute(
        "UPDATE matches SET status = ?1, winner_id = ?2, winner_name = ?3, team1_score = ?4, team2_score = ?5, completed_at = ?6, updated_at = ?6 WHERE id = ?7",
        params![
            MatchStatus::Completed,
            winner.id,
            winner.name,
            scores.map(|s| s.team1_score),
            scores.map(|s| s.team2_score),
            now,
            match_id,
        ],
    )
    .context("Failed to complete match")
    .map(|_| ())
}
