pub mod api;
pub mod cli;
pub mod config;
pub mod database;
pub mod domain;
pub mod errors;
pub mod services;

#[cfg(test)]
pub mod testing;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use colored::Colorize;
use cli::Cli;

use crate::config::settings::AppConfig;
use crate::database::{setup, DbPool};
use crate::services::server::ServerService;
use crate::services::{BracketService, Notifier, ProgressionEngine, Reconciler, RoomRevealScheduler};

pub fn interpret() -> Cli {
    Cli::parse()
}

/// Defaults, with the `--database` flag taking precedence over the
/// environment.
pub fn load_config(database: Option<&str>) -> AppConfig {
    match database {
        Some(path) => AppConfig::new().with_database_path(path),
        None => AppConfig::new(),
    }
}

fn open_store(config: &AppConfig) -> Result<DbPool> {
    let pool = database::create_pool(&config.store)?;
    let conn = database::get_connection(&pool)?;
    setup::init_schema(&conn)?;
    Ok(pool)
}

pub fn handle_serve(config: &AppConfig, port: u16) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let service = ServerService::new(port, config.clone());
        service.run().await
    })
}

pub fn handle_init(config: &AppConfig) -> Result<()> {
    open_store(config)?;
    println!("{} {}", "Schema ready in".green(), config.store.database_path.bold());
    Ok(())
}

pub fn handle_generate(config: &AppConfig, tournament_id: &str, caller: &str) -> Result<()> {
    let pool = open_store(config)?;
    let service = BracketService::new(pool.clone(), ProgressionEngine::new(pool));

    let summary = service.generate(tournament_id, Some(caller))?;
    println!(
        "{} {} ({} entrants, {} matches)",
        "Bracket generated:".green().bold(),
        summary.bracket_id,
        summary.total_entrants,
        summary.total_matches
    );
    Ok(())
}

pub fn handle_sweep(config: &AppConfig) -> Result<()> {
    let pool = open_store(config)?;
    let scheduler = RoomRevealScheduler::new(pool, Notifier::default(), config.scheduler.clone());

    let report = scheduler.sweep(chrono::Utc::now())?;
    let failed = report.notifications_failed.to_string();
    println!(
        "{} {} rooms, {} notifications, {} failed pushes",
        "Revealed".green().bold(),
        report.tournaments_revealed,
        report.notifications_sent,
        if report.notifications_failed > 0 { failed.red() } else { failed.normal() }
    );
    Ok(())
}

pub fn handle_reconcile(config: &AppConfig) -> Result<()> {
    let pool = open_store(config)?;
    let reconciler = Reconciler::new(pool.clone(), ProgressionEngine::new(pool));

    let report = reconciler.replay()?;
    println!(
        "{} {} events: {} advanced, {} settled, {} unchanged, {} failed",
        "Reconciled".green().bold(),
        report.events,
        report.advanced,
        report.settled,
        report.unchanged,
        report.failed
    );
    Ok(())
}

pub fn handle_completions(shell: Shell) -> Result<()> {
    let mut command = Cli::command();
    let name = command.get_name().to_string();
    clap_complete::generate(shell, &mut command, name, &mut std::io::stdout());
    Ok(())
}
