use chrono::Duration;
use services::{AppServices, AppServicesConfig, Clock, StaticIdentity};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use config::{Args, ArgsError, print_usage};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn prepare_sqlite_dir(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let Some(rest) = db_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let path = rest.split('?').next().unwrap_or(rest);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }
    if let Some(parent) = std::path::Path::new(path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse(std::env::args().skip(1)).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;
    tracing::debug!(db_url = %args.db_url, command = ?args.command, "starting");

    prepare_sqlite_dir(&args.db_url)?;
    let clock = Clock::default();
    let remote = args.remote.is_some();
    let app = AppServices::new_sqlite(
        &args.db_url,
        AppServicesConfig {
            clock,
            cache_max_age: Duration::seconds(args.max_age_secs),
            remote: args.remote,
            identity: Arc::new(StaticIdentity::new(args.principal)),
        },
    )
    .await?;

    commands::run(&app, clock, remote, args.command).await
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
