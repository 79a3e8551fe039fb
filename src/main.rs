use anyhow::Result;

use bracket_engine::cli::{Cli, Command};
use bracket_engine::config::AppConfig;
use bracket_engine::{
    handle_completions, handle_generate, handle_init, handle_reconcile, handle_serve, handle_sweep,
    interpret, load_config,
};

fn main() {
    setup_logging();
    parse_and_execute().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });
}

fn setup_logging() {
    sensible_env_logger::init!();
}

fn parse_and_execute() -> Result<()> {
    let Cli { database, command } = interpret();
    let config = load_config(database.as_deref());
    execute_command(&config, &command)
}

fn execute_command(config: &AppConfig, command: &Command) -> Result<()> {
    match command {
        Command::Serve { port } => handle_serve(config, *port),
        Command::Init => handle_init(config),
        Command::Generate {
            tournament_id,
            caller,
        } => handle_generate(config, tournament_id, caller),
        Command::Sweep => handle_sweep(config),
        Command::Reconcile => handle_reconcile(config),
        Command::Completions { shell } => handle_completions(*shell),
    }
}
