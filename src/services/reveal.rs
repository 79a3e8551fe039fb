use chrono::{DateTime, Utc};
use log::{error, info, warn};
use serde::Serialize;
use serde_json::json;

use super::notifier::{Delivery, NewNotification, Notifier};
use crate::config::settings::SchedulerSettings;
use crate::database::{self, registrations, tournaments, DbPool};
use crate::domain::{Notification, NotificationKind, Room, Tournament};
use crate::errors::EngineResult;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub tournaments_revealed: usize,
    pub notifications_sent: usize,
    pub notifications_failed: usize,
}

/// Hands room credentials to every approved entrant once the room's reveal
/// time has passed.
#[derive(Clone)]
pub struct RoomRevealScheduler {
    pool: DbPool,
    notifier: Notifier,
    settings: SchedulerSettings,
}

impl RoomRevealScheduler {
    pub fn new(pool: DbPool, notifier: Notifier, settings: SchedulerSettings) -> Self {
        Self {
            pool,
            notifier,
            settings,
        }
    }

    pub async fn run(self) {
        let period = std::time::Duration::from_secs(self.settings.sweep_interval_secs.max(1));
        let mut ticker = tokio::time::interval(period);
        info!("Room reveal sweep every {}s", period.as_secs());

        loop {
            ticker.tick().await;
            let scheduler = self.clone();
            match tokio::task::spawn_blocking(move || scheduler.sweep(Utc::now())).await {
                Ok(Ok(report)) if report.tournaments_revealed > 0 => info!(
                    "Revealed {} rooms, {} notifications sent, {} failed",
                    report.tournaments_revealed,
                    report.notifications_sent,
                    report.notifications_failed
                ),
                Ok(Ok(_)) => {}
                Ok(Err(e)) => error!("Room reveal sweep failed [{}]: {:#}", e.kind(), e),
                Err(e) => error!("Room reveal sweep panicked: {}", e),
            }
        }
    }

    pub fn sweep(&self, now: DateTime<Utc>) -> EngineResult<SweepReport> {
        let cutoff = now - self.settings.reveal_lead();
        let candidates = {
            let conn = database::get_connection(&self.pool)?;
            tournaments::list_live_with_hidden_room(&conn)?
        };

        let mut report = SweepReport::default();
        for tournament in candidates.iter().filter(|t| is_due(t.room.as_ref(), cutoff)) {
            match self.reveal(tournament, now) {
                Ok(Some((sent, failed))) => {
                    report.tournaments_revealed += 1;
                    report.notifications_sent += sent;
                    report.notifications_failed += failed;
                }
                Ok(None) => {}
                Err(e) => error!(
                    "Revealing room of tournament {} failed [{}]: {:#}",
                    tournament.id,
                    e.kind(),
                    e
                ),
            }
        }

        Ok(report)
    }

    /// Flips the room and stores the notifications in one transaction, then
    /// pushes. `None` when the room was already revealed.
    fn reveal(
        &self,
        tournament: &Tournament,
        now: DateTime<Utc>,
    ) -> EngineResult<Option<(usize, usize)>> {
        let Some(room) = tournament.room.as_ref() else {
            return Ok(None);
        };

        let mut conn = database::get_connection(&self.pool)?;
        let stored = database::with_write_tx(&mut conn, |tx| {
            if !tournaments::mark_room_revealed(tx, &tournament.id, now)? {
                return Ok(None);
            }

            let mut stored: Vec<Notification> = Vec::new();
            for registration in registrations::list_approved(tx, &tournament.id)? {
                let notification = credentials_notice(tournament, room, &registration.user_id);
                stored.push(Notifier::record(tx, notification, now)?);
            }
            Ok(Some(stored))
        })?;

        let Some(stored) = stored else {
            return Ok(None);
        };

        let mut failed = 0;
        for notification in &stored {
            if self.notifier.push(&conn, notification) == Delivery::PushFailed {
                failed += 1;
            }
        }
        if failed > 0 {
            warn!(
                "Room of tournament {}: {} of {} pushes failed",
                tournament.id,
                failed,
                stored.len()
            );
        }

        info!("Room of tournament {} revealed to {} entrants", tournament.id, stored.len());
        Ok(Some((stored.len(), failed)))
    }
}

fn is_due(room: Option<&Room>, cutoff: DateTime<Utc>) -> bool {
    room.and_then(|r| r.visible_from)
        .is_some_and(|visible_from| visible_from <= cutoff)
}

fn credentials_notice(tournament: &Tournament, room: &Room, user_id: &str) -> NewNotification {
    NewNotification {
        user_id: user_id.to_string(),
        title: "Room Credentials Available".to_string(),
        message: format!(
            "Room ID: {}, Password: {} for \"{}\"",
            room.id, room.password, tournament.title
        ),
        kind: NotificationKind::MatchStart,
        data: json!({
            "tournamentId": tournament.id,
            "roomId": room.id,
            "roomPassword": room.password,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::notifications;
    use crate::domain::{PaymentStatus, TournamentStatus, UserRole};
    use crate::services::notifier::PushSender;
    use crate::testing::{base_time, sample_tournament, TestStore};
    use chrono::Duration;
    use serde_json::Value;
    use std::sync::{Arc, Barrier};
    use std::thread;

    struct RefusingSender;

    impl PushSender for RefusingSender {
        fn send(
            &self,
            token: &str,
            _title: &str,
            _body: &str,
            _data: &Value,
        ) -> anyhow::Result<()> {
            if token == "bad-device" {
                anyhow::bail!("device {token} unregistered");
            }
            Ok(())
        }
    }

    fn live_with_room(store: &TestStore, id: &str, visible_from: DateTime<Utc>) {
        let conn = store.conn();
        let mut tournament = sample_tournament(id, "org", TournamentStatus::Live);
        tournament.room = Some(Room {
            id: format!("room-{id}"),
            password: "hunter2".to_string(),
            visible_from: Some(visible_from),
            revealed: false,
        });
        tournaments::insert_tournament(&conn, &tournament).unwrap();
    }

    fn scheduler(store: &TestStore, notifier: Notifier) -> RoomRevealScheduler {
        RoomRevealScheduler::new(store.pool.clone(), notifier, SchedulerSettings::default())
    }

    fn setup() -> TestStore {
        let store = TestStore::new();
        store.seed_user(&store.conn(), "org", UserRole::Organizer, None);
        store
    }

    #[test]
    fn test_reveals_once() {
        let store = setup();
        live_with_room(&store, "t1", base_time());
        store.seed_solo_entrants(&store.conn(), "t1", 3);
        store.seed_registration(&store.conn(), "t1", 7, "pending", None, PaymentStatus::Pending);
        let sched = scheduler(&store, Notifier::default());
        let now = base_time() + Duration::minutes(20);

        let first = sched.sweep(now).unwrap();
        assert_eq!(first.tournaments_revealed, 1);
        assert_eq!(first.notifications_sent, 3);

        let second = sched.sweep(now).unwrap();
        assert_eq!(second, SweepReport::default());

        let conn = store.conn();
        let inbox = notifications::list_for_user(&conn, "t1-p0").unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].kind, NotificationKind::MatchStart);
        assert_eq!(inbox[0].data["roomId"], "room-t1");
        assert_eq!(inbox[0].data["roomPassword"], "hunter2");
        assert!(notifications::list_for_user(&conn, "pending").unwrap().is_empty());

        let revealed = tournaments::find_by_id(&conn, "t1").unwrap().unwrap();
        assert!(revealed.room.unwrap().revealed);
    }

    #[test]
    fn test_room_inside_lead_window_waits() {
        let store = setup();
        live_with_room(&store, "t1", base_time());
        store.seed_solo_entrants(&store.conn(), "t1", 2);
        let sched = scheduler(&store, Notifier::default());

        let early = sched.sweep(base_time() + Duration::minutes(10)).unwrap();
        assert_eq!(early.tournaments_revealed, 0);

        let due = sched.sweep(base_time() + Duration::minutes(15)).unwrap();
        assert_eq!(due.tournaments_revealed, 1);
    }

    #[test]
    fn test_failed_push_does_not_stop_fan_out() {
        let store = setup();
        live_with_room(&store, "t1", base_time());
        {
            let conn = store.conn();
            store.seed_user(&conn, "good", UserRole::Player, Some("good-device"));
            store.seed_user(&conn, "bad", UserRole::Player, Some("bad-device"));
            store.seed_registration(&conn, "t1", 0, "bad", None, PaymentStatus::Approved);
            store.seed_registration(&conn, "t1", 1, "good", None, PaymentStatus::Approved);
        }
        let sched = scheduler(&store, Notifier::new(Arc::new(RefusingSender)));

        let report = sched.sweep(base_time() + Duration::hours(1)).unwrap();
        assert_eq!(report.notifications_sent, 2);
        assert_eq!(report.notifications_failed, 1);
        assert_eq!(notifications::list_for_user(&store.conn(), "good").unwrap().len(), 1);
    }

    #[test]
    fn test_overlapping_sweeps_notify_each_entrant_once() {
        let store = setup();
        live_with_room(&store, "t1", base_time());
        store.seed_solo_entrants(&store.conn(), "t1", 5);
        let sched = scheduler(&store, Notifier::default());
        let now = base_time() + Duration::hours(1);
        let barrier = Barrier::new(4);

        let reports: Vec<SweepReport> = thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let (sched, barrier) = (&sched, &barrier);
                    scope.spawn(move || {
                        barrier.wait();
                        sched.sweep(now).unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let revealed: usize = reports.iter().map(|r| r.tournaments_revealed).sum();
        let sent: usize = reports.iter().map(|r| r.notifications_sent).sum();
        assert_eq!(revealed, 1);
        assert_eq!(sent, 5);

        let conn = store.conn();
        for i in 0..5 {
            let inbox = notifications::list_for_user(&conn, &format!("t1-p{i}")).unwrap();
            assert_eq!(inbox.len(), 1);
        }
    }

    #[test]
    fn test_failing_tournament_does_not_block_others() {
        let store = setup();
        live_with_room(&store, "t1", base_time());
        live_with_room(&store, "t2", base_time());
        store.seed_solo_entrants(&store.conn(), "t1", 2);
        store.seed_solo_entrants(&store.conn(), "t2", 2);
        store
            .conn()
            .execute_batch(
                "CREATE TRIGGER refuse_t1_notices BEFORE INSERT ON notifications
                 WHEN NEW.data LIKE '%room-t1%'
                 BEGIN SELECT RAISE(ABORT, 'inbox unavailable'); END;",
            )
            .unwrap();
        let sched = scheduler(&store, Notifier::default());
        let now = base_time() + Duration::hours(1);

        let report = sched.sweep(now).unwrap();
        assert_eq!(report.tournaments_revealed, 1);
        assert_eq!(report.notifications_sent, 2);

        let conn = store.conn();
        let t1 = tournaments::find_by_id(&conn, "t1").unwrap().unwrap();
        let t2 = tournaments::find_by_id(&conn, "t2").unwrap().unwrap();
        assert!(!t1.room.unwrap().revealed);
        assert!(t2.room.unwrap().revealed);
        assert!(notifications::list_for_user(&conn, "t1-p0").unwrap().is_empty());
        assert_eq!(notifications::list_for_user(&conn, "t2-p0").unwrap().len(), 1);

        conn.execute_batch("DROP TRIGGER refuse_t1_notices").unwrap();
        let retry = sched.sweep(now).unwrap();
        assert_eq!(retry.tournaments_revealed, 1);
        assert_eq!(notifications::list_for_user(&conn, "t1-p0").unwrap().len(), 1);
    }

    #[test]
    fn test_only_live_tournaments_are_swept() {
        let store = setup();
        {
            let conn = store.conn();
            let mut draft = sample_tournament("t2", "org", TournamentStatus::Registration);
            draft.room = Some(Room {
                id: "room-t2".to_string(),
                password: "pw".to_string(),
                visible_from: Some(base_time()),
                revealed: false,
            });
            tournaments::insert_tournament(&conn, &draft).unwrap();
        }

        let report = scheduler(&store, Notifier::default())
            .sweep(base_time() + Duration::hours(1))
            .unwrap();
        assert_eq!(report.tournaments_revealed, 0);
    }
}
