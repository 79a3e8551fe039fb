use log::{debug, error, info};
use tokio::sync::mpsc;

use super::progression::ProgressionEngine;
use crate::errors::{EngineError, EngineResult};

/// "This match now has a winner."
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchCompleted {
    pub match_id: String,
}

/// Producer side of the progression channel.
#[derive(Clone)]
pub struct ProgressionQueue {
    sender: mpsc::Sender<MatchCompleted>,
}

impl ProgressionQueue {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<MatchCompleted>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    pub async fn publish(&self, match_id: impl Into<String>) -> EngineResult<()> {
        let event = MatchCompleted {
            match_id: match_id.into(),
        };
        debug!("Publishing completion of match {}", event.match_id);
        self.sender.send(event).await.map_err(|e| {
            let message = format!("progression worker is gone, dropped match {}", e.0.match_id);
            EngineError::Store(anyhow::anyhow!(message))
        })
    }
}

/// Drains the channel one event at a time until every sender is dropped.
/// Returns how many events were handled.
pub async fn run_worker(
    engine: ProgressionEngine,
    mut receiver: mpsc::Receiver<MatchCompleted>,
) -> usize {
    info!("Progression worker started");
    let mut handled = 0;

    while let Some(event) = receiver.recv().await {
        let engine = engine.clone();
        let match_id = event.match_id.clone();
        if let Err(e) = tokio::task::spawn_blocking(move || engine.handle(&event.match_id)).await {
            error!("Progression task for match {} panicked: {}", match_id, e);
        }
        handled += 1;
    }

    info!("Progression worker stopped after {} events", handled);
    handled
}
