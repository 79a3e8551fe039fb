use anyhow::Result;
use log::{info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::api::handlers::AppState;
use crate::api::routes::create_router;
use crate::config::settings::AppConfig;
use crate::database::{self, setup};
use crate::services::queue::run_worker;
use crate::services::{
    BracketService, Notifier, PaymentService, ProgressionEngine, ProgressionQueue, Reconciler,
    ResultService, RoomRevealScheduler,
};

pub struct ServerService {
    port: u16,
    config: AppConfig,
}

impl ServerService {
    pub fn new(port: u16, config: AppConfig) -> Self {
        Self { port, config }
    }

    pub async fn run(&self) -> Result<()> {
        let pool = database::create_pool(&self.config.store)?;
        {
            let conn = database::get_connection(&pool)?;
            setup::init_schema(&conn)?;
        }

        let notifier = Notifier::default();
        let engine = ProgressionEngine::new(pool.clone());
        let (queue, receiver) = ProgressionQueue::new(self.config.progression.queue_capacity);
        tokio::spawn(run_worker(engine.clone(), receiver));

        let reconciler = Reconciler::new(pool.clone(), engine.clone());
        if let Err(e) = reconciler.publish_all(&queue).await {
            warn!("Startup reconciliation failed: {:#}", e);
        }

        let scheduler =
            RoomRevealScheduler::new(pool.clone(), notifier.clone(), self.config.scheduler.clone());
        tokio::spawn(scheduler.run());

        let state = Arc::new(AppState {
            brackets: BracketService::new(pool.clone(), engine),
            results: ResultService::new(pool.clone()),
            payments: PaymentService::new(pool.clone(), notifier),
            queue,
            pool,
        });

        let app = create_router(state).layer(CorsLayer::permissive());

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        info!("Server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}
