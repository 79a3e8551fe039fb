//! End-of-tournament settlement, run when the final match is decided.
//!
//! Everything happens on the caller's transaction: a failure anywhere leaves
//! the tournament live and the final match completed, so the same
//! completion event can settle it later.

use chrono::{DateTime, Utc};
use log::{info, warn};
use rusqlite::Connection;
use serde::Serialize;
use serde_json::json;

use super::access::Actor;
use super::notifier::{NewNotification, Notifier};
use crate::database::{audit, registrations, teams, tournaments, users};
use crate::domain::{
    EntrantKind, Match, NotificationKind, Participant, Tournament, TournamentStatus,
};
use crate::errors::{EngineError, EngineResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementReport {
    pub tournament_id: String,
    pub winner_id: String,
    pub winner_kind: EntrantKind,
    pub prize: i64,
    pub member_credits: Vec<(String, i64)>,
    pub notifications: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementOutcome {
    Settled(SettlementReport),
    AlreadySettled,
}

pub fn settle(
    conn: &Connection,
    final_match: &Match,
    now: DateTime<Utc>,
) -> EngineResult<SettlementOutcome> {
    let tournament = tournaments::find_by_id(conn, &final_match.tournament_id)?
        .ok_or_else(|| EngineError::not_found("tournament", final_match.tournament_id.as_str()))?;

    match tournament.status {
        TournamentStatus::Completed => return Ok(SettlementOutcome::AlreadySettled),
        TournamentStatus::Live => {}
        other => {
            return Err(EngineError::InvalidState(format!(
                "tournament {} cannot be settled while {}",
                tournament.id, other
            )));
        }
    }

    let winner = final_match.winner().cloned().ok_or_else(|| {
        EngineError::Integrity(format!(
            "final match {} has winner {:?} on neither side",
            final_match.id, final_match.winner_id
        ))
    })?;
    let prize = tournament.winner_share();

    tournaments::update_status(conn, &tournament.id, TournamentStatus::Completed, now)?;

    let member_credits = match winner.kind {
        EntrantKind::Solo => {
            credit_user(conn, &winner.id, prize)?;
            Vec::new()
        }
        EntrantKind::Team => credit_team(conn, &winner.id, prize)?,
    };

    let notifications = notify_entrants(conn, &tournament, &winner, now)?;

    let entry = Actor::system().audit(
        "tournament_settled",
        "tournament",
        &tournament.id,
        Some(json!({ "status": TournamentStatus::Live })),
        Some(json!({
            "status": TournamentStatus::Completed,
            "finalMatchId": final_match.id,
            "winnerId": winner.id,
            "winnerKind": winner.kind,
            "prize": prize,
        })),
        now,
    );
    audit::insert_entry(conn, &entry)?;

    info!(
        "Tournament {} settled: winner {} ({}) credited {}",
        tournament.id, winner.name, winner.id, prize
    );

    Ok(SettlementOutcome::Settled(SettlementReport {
        tournament_id: tournament.id,
        winner_id: winner.id,
        winner_kind: winner.kind,
        prize,
        member_credits,
        notifications,
    }))
}

fn credit_user(conn: &Connection, user_id: &str, prize: i64) -> EngineResult<()> {
    if !users::credit(conn, user_id, 1, prize)? {
        warn!("Winner {} has no user record; stats not credited", user_id);
    }
    Ok(())
}

fn credit_team(conn: &Connection, team_id: &str, prize: i64) -> EngineResult<Vec<(String, i64)>> {
    let Some(team) = teams::find_by_id(conn, team_id)? else {
        warn!("Winning team {} has no team record; stats not credited", team_id);
        return Ok(Vec::new());
    };

    teams::credit(conn, &team.id, 1, prize)?;

    let credits = split_evenly(prize, &team.member_ids);
    for (member_id, amount) in &credits {
        credit_user(conn, member_id, *amount)?;
    }
    Ok(credits)
}

/// Splits `amount` minor units across `members`. Leftover units go one each
/// to the first members, so the parts always add back up to `amount`.
pub fn split_evenly(amount: i64, members: &[String]) -> Vec<(String, i64)> {
    if members.is_empty() {
        return Vec::new();
    }

    let count = members.len() as i64;
    let base = amount / count;
    let remainder = amount % count;

    members
        .iter()
        .enumerate()
        .map(|(idx, member)| {
            let extra = if (idx as i64) < remainder { 1 } else { 0 };
            (member.clone(), base + extra)
        })
        .collect()
}

fn notify_entrants(
    conn: &Connection,
    tournament: &Tournament,
    winner: &Participant,
    now: DateTime<Utc>,
) -> EngineResult<usize> {
    let approved = registrations::list_approved(conn, &tournament.id)?;

    for registration in &approved {
        let notification = NewNotification {
            user_id: registration.user_id.clone(),
            title: "Tournament Completed".to_string(),
            message: format!("\"{}\" has been completed! Check the results.", tournament.title),
            kind: NotificationKind::ResultPosted,
            data: json!({
                "tournamentId": tournament.id,
                "winnerId": winner.id,
                "winnerName": winner.name,
            }),
        };
        Notifier::record(conn, notification, now)?;
    }

    Ok(approved.len())
}
