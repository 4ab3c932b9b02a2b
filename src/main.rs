//! davlock: in-memory WebDAV server with hierarchical write locking.
//!
//! This is the main entry point for the `davlock` binary. It parses
//! arguments, loads configuration, and runs the server (or the requested
//! maintenance command), handling errors with a proper exit status.

mod cli;
pub mod config;
pub mod dav;
pub mod error;
pub mod locks;
pub mod path;
pub mod storage;
pub mod token;

use cli::{Cli, Command, ServeArgs};
use config::Config;
use dav::AppState;
use error::Result;
use locks::LockManager;
use std::process::ExitCode;
use std::sync::Arc;
use storage::MemoryStore;
use token::DigestTokenFactory;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "davlock=info,tower_http=info".into()),
        )
        .init();

    let cli = Cli::parse_args();
    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // Print user-actionable error message to stderr
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> Result<()> {
    match command {
        Command::Serve(args) => serve(args).await,
        Command::CheckConfig(args) => {
            let config = Config::load(&args.config)?;
            print!("{}", config.to_yaml()?);
            Ok(())
        }
    }
}

async fn serve(args: ServeArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if args.read_only {
        config.read_only = true;
    }
    config.validate()?;

    let tokens = match &config.secret {
        Some(secret) => DigestTokenFactory::new(secret.clone()),
        None => DigestTokenFactory::from_startup_entropy(),
    };
    let manager = LockManager::new(
        Box::new(tokens),
        chrono::Duration::seconds(config.sweep_interval_secs as i64),
    );

    let state = AppState {
        manager: Arc::new(manager),
        store: Arc::new(MemoryStore::new()),
        config: Arc::new(config),
    };
    dav::serve(state).await
}
