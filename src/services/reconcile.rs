use log::info;
use serde::Serialize;

use super::progression::{Progress, ProgressionEngine};
use super::queue::ProgressionQueue;
use crate::database::{self, matches, DbPool};
use crate::errors::EngineResult;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayReport {
    pub events: usize,
    pub advanced: usize,
    pub settled: usize,
    pub unchanged: usize,
    pub failed: usize,
}

/// Re-delivers completion events for decided matches of live tournaments,
/// recovering progressions lost to a crash or a dropped event.
#[derive(Clone)]
pub struct Reconciler {
    pool: DbPool,
    engine: ProgressionEngine,
}

impl Reconciler {
    pub fn new(pool: DbPool, engine: ProgressionEngine) -> Self {
        Self { pool, engine }
    }

    /// Match ids to re-deliver, earliest rounds first.
    pub fn pending(&self) -> EngineResult<Vec<String>> {
        let conn = database::get_connection(&self.pool)?;
        let decided = matches::list_decided_in_live_tournaments(&conn)?;
        Ok(decided.into_iter().map(|m| m.id).collect())
    }

    /// Runs every pending event through the engine in place.
    pub fn replay(&self) -> EngineResult<ReplayReport> {
        let mut report = ReplayReport::default();

        for match_id in self.pending()? {
            report.events += 1;
            match self.engine.handle(&match_id) {
                Some(Progress::Advanced { .. }) => report.advanced += 1,
                Some(Progress::Settled(_)) => report.settled += 1,
                Some(_) => report.unchanged += 1,
                None => report.failed += 1,
            }
        }

        info!(
            "Reconciled {} events: {} advanced, {} settled, {} unchanged, {} failed",
            report.events, report.advanced, report.settled, report.unchanged, report.failed
        );
        Ok(report)
    }

    /// Hands every pending event to the progression worker.
    pub async fn publish_all(&self, queue: &ProgressionQueue) -> EngineResult<usize> {
        let reconciler = self.clone();
        let pending = tokio::task::spawn_blocking(move || reconciler.pending())
            .await
            .map_err(anyhow::Error::from)??;

        for match_id in &pending {
            queue.publish(match_id.as_str()).await?;
        }
        info!("Re-published {} completion events", pending.len());
        Ok(pending.len())
    }
}
