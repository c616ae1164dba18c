use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use tender_watch::config::load_config;
use tender_watch::storage::{SqliteStore, Store};
use tender_watch::{run_once, RunStatus};
use tracing_subscriber::EnvFilter;

/// Procurement-announcement watcher: crawl, filter, summarize, notify
#[derive(Parser, Debug)]
#[command(name = "tender-watch", version, about)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Classify and count items without persisting or notifying
    #[arg(long)]
    dry_run: bool,

    /// Print recent run statistics and exit
    #[arg(long)]
    stats: bool,
}

fn setup_logging(verbose: u8, quiet: bool) {
    let default_filter = if quiet {
        "tender_watch=warn"
    } else {
        match verbose {
            0 => "tender_watch=info,warn",
            1 => "tender_watch=debug,info",
            _ => "trace",
        }
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn print_stats(database_path: &Path, strategy: tender_watch::DedupeStrategy) -> anyhow::Result<()> {
    let store = SqliteStore::open(database_path, strategy).context("could not open database")?;
    let total = store.count_announcements()?;
    println!("announcements stored: {total}");
    println!();

    let runs = store.list_runs(10)?;
    if runs.is_empty() {
        println!("no runs recorded yet");
        return Ok(());
    }
    println!("recent runs (newest first):");
    for run in runs {
        println!(
            "  {}  {:9}  started {}  processed {:4}  new {:4}  duplicate {:4}{}",
            run.run_id,
            run.status.to_db_string(),
            run.started_at,
            run.total_processed,
            run.total_new,
            run.total_duplicate,
            run.error
                .map(|e| format!("  error: {e}"))
                .unwrap_or_default(),
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    let mut cfg = load_config(&cli.config)
        .with_context(|| format!("could not load config from {}", cli.config.display()))?;
    if cli.dry_run {
        cfg.run.dry_run = true;
    }

    if cli.stats {
        return print_stats(Path::new(&cfg.store.database_path), cfg.store.dedupe_strategy);
    }

    let report = run_once(&cfg).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if report.status == RunStatus::Failed {
        std::process::exit(1);
    }
    Ok(())
}
