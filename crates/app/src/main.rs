//! Accounts - local username/password account manager
//!
//! Runs an interactive login/registration menu on the terminal, backed by a
//! SQLite file chosen from configuration.

use std::io;
use std::path::PathBuf;

use accounts_core::{Config, Console, Environment, Result, Session};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Local username/password account manager
#[derive(Parser, Debug)]
#[command(name = "accounts")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file (defaults to the platform config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Database file, overriding the configured path
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Use the configured test database
    #[arg(long)]
    test: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// Interactive login/registration menu (default)
    Shell,

    /// List stored usernames
    Users,
}

impl Cli {
    fn environment(&self) -> Environment {
        if self.test {
            Environment::Test
        } else {
            Environment::Development
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so they never interleave with prompts
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    if let Err(e) = run(cli) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    let env = cli.environment();
    let db_path = cli
        .database
        .clone()
        .unwrap_or_else(|| config.database_path(env).to_path_buf());

    // Ensure parent directory exists
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!(path = %db_path.display(), ?env, "Opening account database");
    let mut session = Session::open(&db_path)?;

    match cli.command.unwrap_or(Commands::Shell) {
        Commands::Shell => {
            let stdin = io::stdin();
            let mut console = Console::new(stdin.lock(), io::stdout()).with_config(&config);
            console.run(&mut session)
        }
        Commands::Users => {
            for username in session.usernames()? {
                println!("{username}");
            }
            Ok(())
        }
    }
}

/// Explicit `--config` must exist; the platform default is optional
fn load_config(cli: &Cli) -> Result<Config> {
    if let Some(path) = &cli.config {
        return Config::load(path);
    }

    match Config::default_path() {
        Ok(path) if path.exists() => Config::load(path),
        _ => {
            tracing::debug!("No config file found, using defaults");
            Ok(Config::default())
        }
    }
}
