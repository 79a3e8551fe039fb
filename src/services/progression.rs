use chrono::{DateTime, Utc};
use log::{debug, error, info};
use rusqlite::Connection;

use super::settlement::{self, SettlementOutcome, SettlementReport};
use crate::database::{self, brackets, matches, DbPool};
use crate::domain::{Match, Side};
use crate::errors::{EngineError, EngineResult};

/// What handling one "match completed" event did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    /// The match is not completed with a winner; nothing to do.
    Ignored,
    Advanced { next_match_id: String, side: Side },
    /// The winner already sits in the next match.
    AlreadyAdvanced { next_match_id: String },
    Settled(SettlementReport),
    AlreadySettled,
}

/// Moves winners forward through the bracket.
///
/// Safe under at-least-once delivery: every write is guarded by a read made
/// under the same write lock, so replaying an event changes nothing.
#[derive(Clone)]
pub struct ProgressionEngine {
    pool: DbPool,
}

impl ProgressionEngine {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn process(&self, match_id: &str) -> EngineResult<Progress> {
        let mut conn = database::get_connection(&self.pool)?;
        database::with_write_tx(&mut conn, |tx| advance(tx, match_id, Utc::now()))
    }

    /// Entry point for background delivery: failures are logged, never
    /// returned, and the next delivery of the same event retries.
    pub fn handle(&self, match_id: &str) -> Option<Progress> {
        match self.process(match_id) {
            Ok(progress) => {
                log_progress(match_id, &progress);
                Some(progress)
            }
            Err(e) => {
                error!("Progression of match {} failed [{}]: {:#}", match_id, e.kind(), e);
                None
            }
        }
    }
}

fn log_progress(match_id: &str, progress: &Progress) {
    match progress {
        Progress::Advanced { next_match_id, side } => info!(
            "Match {}: winner advanced into {} of match {}",
            match_id,
            side.column_prefix(),
            next_match_id
        ),
        Progress::Settled(report) => info!(
            "Match {}: final decided, tournament {} settled",
            match_id, report.tournament_id
        ),
        other => debug!("Match {}: {:?}", match_id, other),
    }
}

pub(crate) fn advance(
    conn: &Connection,
    match_id: &str,
    now: DateTime<Utc>,
) -> EngineResult<Progress> {
    let completed = matches::find_by_id(conn, match_id)?
        .ok_or_else(|| EngineError::not_found("match", match_id))?;

    if !completed.is_decided() {
        return Ok(Progress::Ignored);
    }

    let bracket = brackets::find_by_tournament(conn, &completed.tournament_id)?
        .ok_or_else(|| EngineError::not_found("bracket", completed.tournament_id.as_str()))?;

    if completed.round >= bracket.final_round() {
        return Ok(match settlement::settle(conn, &completed, now)? {
            SettlementOutcome::Settled(report) => Progress::Settled(report),
            SettlementOutcome::AlreadySettled => Progress::AlreadySettled,
        });
    }

    advance_winner(conn, &completed, now)
}

fn advance_winner(
    conn: &Connection,
    completed: &Match,
    now: DateTime<Utc>,
) -> EngineResult<Progress> {
    let winner = completed.winner().cloned().ok_or_else(|| {
        EngineError::Integrity(format!(
            "match {} has winner {:?} on neither side",
            completed.id, completed.winner_id
        ))
    })?;

    let next_round = completed.round + 1;
    let next_position = completed.position / 2;
    let next = matches::find_at(conn, &completed.tournament_id, next_round, next_position)?
        .ok_or_else(|| {
            let message = format!(
                "tournament {} has no match at round {} position {} to receive the winner of match {}",
                completed.tournament_id, next_round, next_position, completed.id
            );
            error!("{}", message);
            EngineError::Integrity(message)
        })?;

    let side = Side::fed_by(completed.position);
    match next.side(side) {
        Some(occupant) if occupant.id == winner.id => Ok(Progress::AlreadyAdvanced {
            next_match_id: next.id,
        }),
        Some(occupant) => Err(EngineError::InvalidState(format!(
            "{} of match {} already holds {}, refusing to overwrite with {}",
            side.column_prefix(),
            next.id,
            occupant.id,
            winner.id
        ))),
        None if next.is_decided() => Err(EngineError::InvalidState(format!(
            "match {} is already completed",
            next.id
        ))),
        None => {
            matches::assign_side(conn, &next.id, side, &winner, now)?;
            Ok(Progress::Advanced {
                next_match_id: next.id,
                side,
            })
        }
    }
}
