use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use gator::commands::{Command, Commands, State};
use gator::config::Config;
use gator::feed::build_client;
use gator::storage::Database;

#[derive(Parser, Debug)]
#[command(name = "gator", about = "A personal RSS aggregator for the command line")]
struct Args {
    /// Config file (default: ~/.gatorconfig.json)
    #[arg(long, value_name = "FILE", env = "GATOR_CONFIG")]
    config: Option<PathBuf>,

    /// Command to run: login, register, reset, users, agg, addfeed, feeds,
    /// follow, following, unfollow
    command: String,

    /// Arguments for the command
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

async fn run(args: Args) -> Result<()> {
    let config_path = match args.config {
        Some(path) => path,
        None => Config::default_path()?,
    };
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let db_url = config.resolved_db_url()?;
    let db = Database::open(&db_url)
        .await
        .context("Failed to open database")?;
    let http = build_client().context("Failed to build HTTP client")?;

    let mut state = State::new(config, config_path, db, http, Box::new(std::io::stdout()));
    let command = Command::new(args.command, args.args);

    Commands::with_defaults().run(&mut state, &command).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr so command output on stdout stays clean
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
