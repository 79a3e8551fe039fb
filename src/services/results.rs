use chrono::{DateTime, Utc};
use log::info;
use rusqlite::Connection;
use serde_json::json;

use super::access::{authenticate, authorize_organizer};
use crate::database::{self, audit, matches, tournaments, DbPool};
use crate::domain::{Match, MatchStatus, Scores, Side, TournamentStatus};
use crate::errors::{EngineError, EngineResult};

/// Records match outcomes reported by organizers. Publishing the completion
/// event is left to the caller.
#[derive(Clone)]
pub struct ResultService {
    pool: DbPool,
}

impl ResultService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn record(
        &self,
        match_id: &str,
        caller_id: Option<&str>,
        winner: Side,
        scores: Option<Scores>,
    ) -> EngineResult<Match> {
        let caller_id = authenticate(caller_id)?;
        let mut conn = database::get_connection(&self.pool)?;
        let recorded = database::with_write_tx(&mut conn, |tx| {
            record_in(tx, match_id, caller_id, winner, scores, Utc::now())
        })?;

        info!(
            "Match {} (round {}, position {}) won by {}",
            recorded.id,
            recorded.round,
            recorded.position,
            recorded.winner_name.as_deref().unwrap_or("?")
        );
        Ok(recorded)
    }
}

fn record_in(
    conn: &Connection,
    match_id: &str,
    caller_id: &str,
    winner: Side,
    scores: Option<Scores>,
    now: DateTime<Utc>,
) -> EngineResult<Match> {
    let current = matches::find_by_id(conn, match_id)?
        .ok_or_else(|| EngineError::not_found("match", match_id))?;
    let tournament = tournaments::find_by_id(conn, &current.tournament_id)?
        .ok_or_else(|| EngineError::not_found("tournament", current.tournament_id.as_str()))?;
    let actor = authorize_organizer(conn, &tournament, caller_id)?;

    if tournament.status != TournamentStatus::Live {
        return Err(EngineError::InvalidState(format!(
            "results can only be recorded while tournament {} is live, it is {}",
            tournament.id, tournament.status
        )));
    }
    if current.status == MatchStatus::Completed {
        return Err(EngineError::InvalidState(format!("match {} is already completed", current.id)));
    }

    let (Some(_), Some(_)) = (&current.team1, &current.team2) else {
        return Err(EngineError::Precondition(format!(
            "match {} is still waiting for both sides",
            current.id
        )));
    };
    let Some(participant) = current.side(winner).cloned() else {
        return Err(EngineError::Precondition(format!(
            "match {} has no {}",
            current.id,
            winner.column_prefix()
        )));
    };

    matches::complete(conn, &current.id, &participant, scores, now)?;

    let entry = actor.audit(
        "match_result_recorded",
        "match",
        &current.id,
        Some(json!({ "status": current.status })),
        Some(json!({
            "status": MatchStatus::Completed,
            "winnerId": participant.id,
            "scores": scores,
        })),
        now,
    );
    audit::insert_entry(conn, &entry)?;

    matches::find_by_id(conn, &current.id)?
        .ok_or_else(|| EngineError::not_found("match", current.id.as_str()))
}
