use clap::{Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser, Debug)]
#[command(author, version, about = "Single-elimination bracket engine")]
pub struct Cli {
    /// SQLite database file (defaults to $DATABASE_PATH, then tournaments.db)
    #[arg(long, global = true)]
    pub database: Option<String>,

    /// Command
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
#[clap(rename_all = "lower_case")]
pub enum Command {
    /// Start the HTTP server, progression worker and room-reveal timer
    Serve {
        /// Port number (optional, defaults to 3000)
        #[arg(short, long, default_value_t = 3000)]
        port: u16,
    },
    /// Create the database schema
    Init,
    /// Generate the bracket of a tournament
    Generate {
        /// Tournament id
        tournament_id: String,
        /// User id of the organizer or admin asking for it
        #[arg(short, long)]
        caller: String,
    },
    /// Run one room-reveal sweep
    Sweep,
    /// Re-deliver completion events of decided matches in live tournaments
    Reconcile,
    /// Print shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_generate() {
        let cli = Cli::parse_from(["bracket_engine", "generate", "t1", "--caller", "org"]);
        assert_eq!(
            cli.command,
            Command::Generate {
                tournament_id: "t1".to_string(),
                caller: "org".to_string(),
            }
        );
    }

    #[test]
    fn test_database_flag_after_subcommand() {
        let cli = Cli::parse_from(["bracket_engine", "sweep", "--database", "/tmp/cup.db"]);
        assert_eq!(cli.database.as_deref(), Some("/tmp/cup.db"));
        assert_eq!(cli.command, Command::Sweep);
    }

    #[test]
    fn test_serve_default_port() {
        let cli = Cli::parse_from(["bracket_engine", "serve"]);
        assert_eq!(cli.command, Command::Serve { port: 3000 });
    }
}
