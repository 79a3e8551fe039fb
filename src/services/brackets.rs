use chrono::{DateTime, Utc};
use log::info;
use rand::Rng;
use rusqlite::Connection;
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use super::access::{authenticate, authorize_organizer};
use super::progression::ProgressionEngine;
use crate::database::{self, audit, brackets, matches, registrations, tournaments, DbPool};
use crate::domain::seeding::{pad_with_byes, plan_matches, shuffle_entrants};
use crate::domain::{
    resolve_entrants, Bracket, BracketRound, BracketType, Match, PlannedMatch, TournamentStatus,
};
use crate::errors::{EngineError, EngineResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationSummary {
    pub bracket_id: String,
    pub total_entrants: usize,
    pub total_matches: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundView {
    pub round_number: u32,
    pub matches: Vec<Match>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BracketView {
    pub bracket: Bracket,
    pub tournament_status: TournamentStatus,
    pub rounds: Vec<RoundView>,
}

struct Generated {
    summary: GenerationSummary,
    bye_match_ids: Vec<String>,
}

#[derive(Clone)]
pub struct BracketService {
    pool: DbPool,
    progression: ProgressionEngine,
}

impl BracketService {
    pub fn new(pool: DbPool, progression: ProgressionEngine) -> Self {
        Self { pool, progression }
    }

    pub fn generate(
        &self,
        tournament_id: &str,
        caller_id: Option<&str>,
    ) -> EngineResult<GenerationSummary> {
        self.generate_with_rng(tournament_id, caller_id, &mut rand::thread_rng())
    }

    /// Builds and stores the bracket, then pushes bye winners into round two.
    pub fn generate_with_rng<R: Rng + ?Sized>(
        &self,
        tournament_id: &str,
        caller_id: Option<&str>,
        rng: &mut R,
    ) -> EngineResult<GenerationSummary> {
        let caller_id = authenticate(caller_id)?;

        let generated = {
            let mut conn = database::get_connection(&self.pool)?;
            database::with_write_tx(&mut conn, |tx| {
                generate_in(tx, tournament_id, caller_id, rng, Utc::now())
            })?
        };

        for match_id in &generated.bye_match_ids {
            self.progression.handle(match_id);
        }

        let summary = generated.summary;
        info!(
            "Bracket {} generated for tournament {}: {} entrants, {} matches, {} byes",
            summary.bracket_id,
            tournament_id,
            summary.total_entrants,
            summary.total_matches,
            generated.bye_match_ids.len()
        );
        Ok(summary)
    }

    pub fn view(&self, tournament_id: &str) -> EngineResult<BracketView> {
        let conn = database::get_connection(&self.pool)?;

        let tournament = tournaments::find_by_id(&conn, tournament_id)?
            .ok_or_else(|| EngineError::not_found("tournament", tournament_id))?;
        let bracket = brackets::find_by_tournament(&conn, tournament_id)?
            .ok_or_else(|| EngineError::not_found("bracket", tournament_id))?;

        let mut all_matches = matches::list_by_tournament(&conn, tournament_id)?;
        let rounds = bracket
            .rounds
            .iter()
            .map(|round| {
                let (in_round, rest): (Vec<Match>, Vec<Match>) = all_matches
                    .drain(..)
                    .partition(|m| m.round == round.round_number);
                all_matches = rest;
                RoundView {
                    round_number: round.round_number,
                    matches: in_round,
                }
            })
            .collect();

        Ok(BracketView {
            bracket,
            tournament_status: tournament.status,
            rounds,
        })
    }
}

fn generate_in<R: Rng + ?Sized>(
    conn: &Connection,
    tournament_id: &str,
    caller_id: &str,
    rng: &mut R,
    now: DateTime<Utc>,
) -> EngineResult<Generated> {
    let tournament = tournaments::find_by_id(conn, tournament_id)?
        .ok_or_else(|| EngineError::not_found("tournament", tournament_id))?;
    let actor = authorize_organizer(conn, &tournament, caller_id)?;

    if tournament.status != TournamentStatus::Registration {
        return Err(EngineError::InvalidState(format!(
            "tournament {} is {}, brackets can only be generated during registration",
            tournament.id, tournament.status
        )));
    }

    let approved = registrations::list_approved(conn, tournament_id)?;
    let mut entrants = resolve_entrants(&approved)?;
    let total_entrants = entrants.len();

    shuffle_entrants(&mut entrants, rng);
    let slots = pad_with_byes(entrants);
    let planned = plan_matches(&slots);

    let records: Vec<Match> = planned
        .into_iter()
        .map(|p| materialize(tournament_id, p, now))
        .collect();

    for record in &records {
        matches::insert_match(conn, record)?;
    }

    let bracket = Bracket {
        id: Uuid::new_v4().to_string(),
        tournament_id: tournament_id.to_string(),
        bracket_type: BracketType::SingleElimination,
        rounds: group_rounds(&records),
        is_locked: true,
        created_at: now,
    };
    brackets::insert_bracket(conn, &bracket)?;

    tournaments::update_status(conn, tournament_id, TournamentStatus::Live, now)?;

    let bye_match_ids: Vec<String> = records
        .iter()
        .filter(|m| m.round == 1 && m.is_decided())
        .map(|m| m.id.clone())
        .collect();

    let entry = actor.audit(
        "brackets_generated",
        "tournament",
        tournament_id,
        Some(json!({ "status": tournament.status })),
        Some(json!({
            "status": TournamentStatus::Live,
            "bracketId": bracket.id,
            "totalEntrants": total_entrants,
            "totalMatches": records.len(),
            "byes": bye_match_ids.len(),
        })),
        now,
    );
    audit::insert_entry(conn, &entry)?;

    Ok(Generated {
        summary: GenerationSummary {
            bracket_id: bracket.id,
            total_entrants,
            total_matches: records.len(),
        },
        bye_match_ids,
    })
}

fn materialize(tournament_id: &str, planned: PlannedMatch, now: DateTime<Utc>) -> Match {
    let completed_at = planned.winner.as_ref().map(|_| now);

    Match {
        id: Uuid::new_v4().to_string(),
        tournament_id: tournament_id.to_string(),
        round: planned.round,
        position: planned.position,
        status: planned.status,
        winner_id: planned.winner.as_ref().map(|w| w.id.clone()),
        winner_name: planned.winner.map(|w| w.name),
        team1: planned.team1,
        team2: planned.team2,
        scores: None,
        completed_at,
        created_at: now,
        updated_at: now,
    }
}

/// Match ids per round, in position order. `records` is already sorted by
/// round then position.
fn group_rounds(records: &[Match]) -> Vec<BracketRound> {
    let mut rounds: Vec<BracketRound> = Vec::new();
    for record in records {
        match rounds.last_mut() {
            Some(round) if round.round_number == record.round => {
                round.match_ids.push(record.id.clone())
            }
            _ => rounds.push(BracketRound {
                round_number: record.round,
                match_ids: vec![record.id.clone()],
            }),
        }
    }
    rounds
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EntrantKind, MatchStatus, PaymentStatus, UserRole};
    use crate::testing::TestStore;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::sync::Barrier;
    use std::thread;

    fn service(store: &TestStore) -> BracketService {
        BracketService::new(store.pool.clone(), ProgressionEngine::new(store.pool.clone()))
    }

    fn seeded(entrants: usize) -> TestStore {
        let store = TestStore::new();
        let conn = store.conn();
        store.seed_user(&conn, "org", UserRole::Organizer, None);
        store.seed_tournament(&conn, "t1", "org", TournamentStatus::Registration);
        store.seed_solo_entrants(&conn, "t1", entrants);
        drop(conn);
        store
    }

    fn generate(store: &TestStore, seed: u64) -> EngineResult<GenerationSummary> {
        service(store).generate_with_rng("t1", Some("org"), &mut StdRng::seed_from_u64(seed))
    }

    #[test]
    fn test_five_entrants_layout() {
        let store = seeded(5);
        let summary = generate(&store, 11).unwrap();
        assert_eq!(summary.total_entrants, 5);
        assert_eq!(summary.total_matches, 7);

        let conn = store.conn();
        let all = matches::list_by_tournament(&conn, "t1").unwrap();
        let per_round: Vec<usize> = (1..=3)
            .map(|r| all.iter().filter(|m| m.round == r).count())
            .collect();
        assert_eq!(per_round, vec![4, 2, 1]);

        let round_one: Vec<&Match> = all.iter().filter(|m| m.round == 1).collect();
        let byes = round_one.iter().filter(|m| m.status == MatchStatus::Completed).count();
        let upcoming = round_one.iter().filter(|m| m.status == MatchStatus::Upcoming).count();
        assert_eq!((byes, upcoming), (3, 1));
        assert!(round_one.iter().all(|m| m.team1.is_some() || m.team2.is_some()));

        // Three bye winners already advanced into round two.
        let filled: usize = all
            .iter()
            .filter(|m| m.round == 2)
            .map(|m| m.team1.iter().count() + m.team2.iter().count())
            .sum();
        assert_eq!(filled, 3);

        let bracket = brackets::find_by_tournament(&conn, "t1").unwrap().unwrap();
        assert_eq!(bracket.id, summary.bracket_id);
        assert!(bracket.is_locked);
        assert_eq!(bracket.final_round(), 3);
        assert_eq!(bracket.total_matches(), 7);

        let tournament = tournaments::find_by_id(&conn, "t1").unwrap().unwrap();
        assert_eq!(tournament.status, TournamentStatus::Live);

        let log = audit::list_for_resource(&conn, "tournament", "t1").unwrap();
        assert!(log.iter().any(|e| e.action == "brackets_generated" && e.user_id == "org"));
    }

    #[test]
    fn test_two_entrants_single_upcoming_match() {
        let store = seeded(2);
        let summary = generate(&store, 1).unwrap();
        assert_eq!(summary.total_matches, 1);

        let all = matches::list_by_tournament(&store.conn(), "t1").unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].status, MatchStatus::Upcoming);
        assert!(all[0].team1.is_some() && all[0].team2.is_some());
    }

    #[test]
    fn test_power_of_two_has_no_byes() {
        let store = seeded(8);
        generate(&store, 5).unwrap();

        let all = matches::list_by_tournament(&store.conn(), "t1").unwrap();
        assert!(all.iter().all(|m| m.status == MatchStatus::Upcoming));
        assert!(all.iter().filter(|m| m.round > 1).all(|m| m.team1.is_none() && m.team2.is_none()));
    }

    #[test]
    fn test_second_generation_is_rejected() {
        let store = seeded(4);
        generate(&store, 1).unwrap();

        let err = generate(&store, 2).unwrap_err();
        assert!(matches!(err, EngineError::InvalidState(_)));
        assert_eq!(matches::list_by_tournament(&store.conn(), "t1").unwrap().len(), 3);
    }

    #[test]
    fn test_racing_generations_build_one_bracket() {
        let store = seeded(5);
        let svc = service(&store);
        let barrier = Barrier::new(4);

        let outcomes: Vec<EngineResult<GenerationSummary>> = thread::scope(|scope| {
            let handles: Vec<_> = (0..4u64)
                .map(|seed| {
                    let (svc, barrier) = (&svc, &barrier);
                    scope.spawn(move || {
                        let mut rng = StdRng::seed_from_u64(seed);
                        barrier.wait();
                        svc.generate_with_rng("t1", Some("org"), &mut rng)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(outcomes.iter().filter(|o| o.is_ok()).count(), 1);
        assert!(
            outcomes
                .iter()
                .filter_map(|o| o.as_ref().err())
                .all(|e| matches!(e, EngineError::InvalidState(_)))
        );

        let conn = store.conn();
        assert_eq!(matches::list_by_tournament(&conn, "t1").unwrap().len(), 7);
        let tournament = tournaments::find_by_id(&conn, "t1").unwrap().unwrap();
        assert_eq!(tournament.status, TournamentStatus::Live);
    }

    #[test]
    fn test_single_entrant_is_precondition_failure() {
        let store = seeded(1);
        let err = generate(&store, 1).unwrap_err();
        assert!(matches!(err, EngineError::Precondition(_)));

        let conn = store.conn();
        assert!(matches::list_by_tournament(&conn, "t1").unwrap().is_empty());
        let tournament = tournaments::find_by_id(&conn, "t1").unwrap().unwrap();
        assert_eq!(tournament.status, TournamentStatus::Registration);
    }

    #[test]
    fn test_caller_checks() {
        let store = seeded(4);
        store.seed_user(&store.conn(), "player", UserRole::Player, None);
        let svc = service(&store);

        assert!(matches!(svc.generate("t1", None), Err(EngineError::Authentication)));
        assert!(matches!(svc.generate("t1", Some("player")), Err(EngineError::Authorization(_))));
        assert!(matches!(
            svc.generate("missing", Some("org")),
            Err(EngineError::NotFound { kind: "tournament", .. })
        ));
    }

    #[test]
    fn test_only_approved_registrations_play() {
        let store = seeded(3);
        {
            let conn = store.conn();
            store.seed_registration(&conn, "t1", 10, "late", None, PaymentStatus::Pending);
            store.seed_registration(&conn, "t1", 11, "refused", None, PaymentStatus::Rejected);
        }
        let summary = generate(&store, 9).unwrap();
        assert_eq!(summary.total_entrants, 3);

        let ids: Vec<String> = matches::list_by_tournament(&store.conn(), "t1")
            .unwrap()
            .into_iter()
            .flat_map(|m| [m.team1, m.team2])
            .flatten()
            .map(|p| p.id)
            .collect();
        assert!(!ids.iter().any(|id| id == "late" || id == "refused"));
    }

    #[test]
    fn test_team_registration_enters_as_team() {
        let store = TestStore::new();
        {
            let conn = store.conn();
            store.seed_user(&conn, "org", UserRole::Organizer, None);
            store.seed_tournament(&conn, "t1", "org", TournamentStatus::Registration);
            let red = store.seed_team(&conn, "red", &["a", "b"]);
            let blue = store.seed_team(&conn, "blue", &["c", "d"]);
            store.seed_registration(&conn, "t1", 0, "a", Some(&red), PaymentStatus::Approved);
            store.seed_registration(&conn, "t1", 1, "c", Some(&blue), PaymentStatus::Approved);
        }
        generate(&store, 4).unwrap();

        let only = &matches::list_by_tournament(&store.conn(), "t1").unwrap()[0];
        let mut sides = vec![only.team1.clone().unwrap(), only.team2.clone().unwrap()];
        sides.sort_by(|a, b| a.id.cmp(&b.id));
        assert_eq!(sides[0].id, "blue");
        assert_eq!(sides[0].name, "Team blue");
        assert_eq!(sides[0].kind, EntrantKind::Team);
    }

    #[test]
    fn test_view_groups_matches_by_round() {
        let store = seeded(6);
        generate(&store, 2).unwrap();

        let view = service(&store).view("t1").unwrap();
        assert_eq!(view.tournament_status, TournamentStatus::Live);
        let sizes: Vec<usize> = view.rounds.iter().map(|r| r.matches.len()).collect();
        assert_eq!(sizes, vec![4, 2, 1]);
        assert!(view.rounds.iter().all(|r| r.matches.iter().all(|m| m.round == r.round_number)));
    }

    #[test]
    fn test_view_without_bracket_is_not_found() {
        let store = seeded(2);
        assert!(matches!(
            service(&store).view("t1"),
            Err(EngineError::NotFound { kind: "bracket", .. })
        ));
    }
}
