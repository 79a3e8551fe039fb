//! Throwaway SQLite stores and seed data for unit tests.

use chrono::{DateTime, Duration, TimeZone, Utc};
use rusqlite::Connection;
use std::path::PathBuf;
use uuid::Uuid;

use crate::config::settings::StoreSettings;
use crate::database::{self, registrations, setup, teams, tournaments, users, DbConn, DbPool};
use crate::domain::{
    PaymentStatus, PrizeShare, Registration, Stats, Team, Tournament, TournamentStatus, User,
    UserRole,
};

pub struct TestStore {
    pub pool: DbPool,
    path: PathBuf,
}

impl TestStore {
    pub fn new() -> Self {
        let file = format!("bracket_engine_test_{}.db", Uuid::new_v4());
        let path = std::env::temp_dir().join(file);
        let settings = StoreSettings {
            database_path: path.to_string_lossy().into_owned(),
            busy_timeout_ms: 5_000,
        };
        let pool = database::create_pool(&settings).unwrap();
        setup::init_schema(&database::get_connection(&pool).unwrap()).unwrap();

        Self { pool, path }
    }

    pub fn conn(&self) -> DbConn {
        database::get_connection(&self.pool).unwrap()
    }

    pub fn seed_user(
        &self,
        conn: &Connection,
        id: &str,
        role: UserRole,
        fcm_token: Option<&str>,
    ) -> User {
        let user = User {
            id: id.to_string(),
            display_name: format!("User {id}"),
            role,
            fcm_token: fcm_token.map(str::to_string),
            stats: Stats::default(),
        };
        users::insert_user(conn, &user).unwrap();
        user
    }

    fn ensure_user(&self, conn: &Connection, id: &str) {
        if users::find_by_id(conn, id).unwrap().is_none() {
            self.seed_user(conn, id, UserRole::Player, None);
        }
    }

    pub fn seed_team(&self, conn: &Connection, id: &str, members: &[&str]) -> Team {
        for member in members {
            self.ensure_user(conn, member);
        }
        let team = Team {
            id: id.to_string(),
            name: format!("Team {id}"),
            member_ids: members.iter().map(|m| m.to_string()).collect(),
            stats: Stats::default(),
        };
        teams::insert_team(conn, &team).unwrap();
        team
    }

    /// Prize pool 10000 split 50/30/20.
    pub fn seed_tournament(
        &self,
        conn: &Connection,
        id: &str,
        organizer: &str,
        status: TournamentStatus,
    ) -> Tournament {
        let tournament = sample_tournament(id, organizer, status);
        tournaments::insert_tournament(conn, &tournament).unwrap();
        tournament
    }

    /// `count` approved solo registrations, users `{tournament}-p0..`.
    pub fn seed_solo_entrants(
        &self,
        conn: &Connection,
        tournament_id: &str,
        count: usize,
    ) -> Vec<Registration> {
        (0..count)
            .map(|i| {
                let user_id = format!("{tournament_id}-p{i}");
                let status = PaymentStatus::Approved;
                self.seed_registration(conn, tournament_id, i, &user_id, None, status)
            })
            .collect()
    }

    pub fn seed_registration(
        &self,
        conn: &Connection,
        tournament_id: &str,
        index: usize,
        user_id: &str,
        team: Option<&Team>,
        status: PaymentStatus,
    ) -> Registration {
        self.ensure_user(conn, user_id);
        let registration = Registration {
            id: format!("{tournament_id}-reg-{index}"),
            tournament_id: tournament_id.to_string(),
            user_id: user_id.to_string(),
            team_id: team.map(|t| t.id.clone()),
            team_name: team.map(|t| t.name.clone()),
            player_game_id: format!("gamer-{user_id}"),
            payment_status: status,
            verified_by: None,
            verified_at: None,
            notes: None,
            created_at: base_time() + Duration::seconds(index as i64),
        };
        registrations::insert_registration(conn, &registration).unwrap();
        registration
    }
}

impl Drop for TestStore {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
}

pub fn sample_tournament(id: &str, organizer: &str, status: TournamentStatus) -> Tournament {
    Tournament {
        id: id.to_string(),
        title: format!("Cup {id}"),
        organizer_id: organizer.to_string(),
        status,
        prize_pool: 10_000,
        prize_distribution: vec![
            PrizeShare { position: 1, percentage: 50.0, amount: 5_000 },
            PrizeShare { position: 2, percentage: 30.0, amount: 3_000 },
            PrizeShare { position: 3, percentage: 20.0, amount: 2_000 },
        ],
        room: None,
        created_at: base_time(),
        updated_at: base_time(),
    }
}
