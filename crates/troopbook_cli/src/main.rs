//! Operator CLI over a troopbook database.
//!
//! # Responsibility
//! - Export and import the troop document.
//! - Print the leaderboard and the current signature code.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use troopbook_core::service::leaderboard::available_metrics;
use troopbook_core::service::signature::{seconds_until_rotation, signature_payload};
use troopbook_core::{
    default_log_level, init_logging, open_db, LeaderboardMetric, SqliteDocumentRepository,
    TroopService,
};

#[derive(Parser, Debug)]
#[command(name = "troopbook", version, about = "Troop activity tracker operator tool")]
struct Cli {
    /// SQLite database file.
    #[arg(long, env = "TROOPBOOK_DB_PATH")]
    db: Option<PathBuf>,
    #[arg(long)]
    log_level: Option<String>,
    /// Absolute directory for rotating log files.
    #[arg(long)]
    log_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Writes the whole document as JSON to stdout or a file.
    Export {
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Replaces the whole document with an export file.
    Import {
        file: PathBuf,
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Prints the ranking of one level (the active one by default).
    Leaderboard {
        #[arg(long)]
        level: Option<String>,
        /// Rank by the cached all-time total instead of the last 30 days.
        #[arg(long)]
        all_time: bool,
    },
    /// Prints the current signature payload and its remaining lifetime.
    Signature,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_dir = cli
        .log_dir
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join("troopbook-logs"));
    let level = cli.log_level.as_deref().unwrap_or(default_log_level());
    init_logging(level, &log_dir.to_string_lossy()).context("failed to start logging")?;
    log::info!(
        "event=cli_start module=cli status=ok core_version={}",
        troopbook_core::core_version()
    );

    let db_path = cli
        .db
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join("troopbook.sqlite3"));
    let conn = open_db(&db_path)
        .with_context(|| format!("failed to open database `{}`", db_path.display()))?;
    let repo = SqliteDocumentRepository::try_new(&conn)?;
    let mut store = TroopService::open(repo).context("failed to load troop document")?;

    match cli.command {
        Command::Export { out } => {
            let json = store.export(Utc::now())?;
            match out {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("failed to write `{}`", path.display()))?;
                    println!("exported to {}", path.display());
                }
                None => println!("{json}"),
            }
        }
        Command::Import {
            file,
            username,
            password,
        } => {
            let json = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read `{}`", file.display()))?;
            let session = store.login(&username, &password)?;
            store.import(&session, &json)?;
            println!(
                "imported members={} games={}",
                store.document().members.len(),
                store.document().games.len()
            );
        }
        Command::Leaderboard { level, all_time } => {
            let metric = if all_time {
                LeaderboardMetric::AllTime
            } else {
                LeaderboardMetric::Trailing30Days
            };
            if !available_metrics(&store.document().settings).contains(&metric) {
                bail!("the all-time leaderboard is hidden in settings");
            }
            let level_id = level.unwrap_or_else(|| store.active_level_id().clone());
            if store.document().level(&level_id).is_none() {
                bail!("unknown level `{level_id}`");
            }
            for (rank, row) in store
                .leaderboard(&level_id, Utc::now(), metric)
                .iter()
                .enumerate()
            {
                println!(
                    "{:>3}. {} {:<20} {:>6}",
                    rank + 1,
                    row.avatar,
                    row.nickname,
                    row.value(metric)
                );
            }
        }
        Command::Signature => {
            let now = Utc::now();
            let secret = &store.document().settings.signing_secret;
            println!("payload={}", signature_payload(secret, now));
            println!("rotates_in={}s", seconds_until_rotation(now));
        }
    }

    log::info!("event=cli_exit module=cli status=ok");
    Ok(())
}
