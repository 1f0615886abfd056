//! tubecache - operator CLI for the local cache store.
//!
//! Inspects, validates, repairs, backs up and syncs the cached collections
//! in the platform cache directory (or `cache_dir` from the config file).

use std::io;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tubecache_core::clock::{Clock, SystemClock};
use tubecache_core::config::{Config, SUBSCRIPTIONS, VIDEOS};
use tubecache_core::cache::load_metadata;
use tubecache_core::recovery::{build_plan, AutoRecoverOutcome};
use tubecache_core::utils::{age_display, format_timestamp, truncate_string};
use tubecache_core::{
    CacheEngine, ChannelSubscription, CollectionConfig, FileStore, HttpRemoteApi, Record,
    Session, SyncOutcome, VideoSummary,
};

/// Issue messages can list many ids; keep each line readable.
const MAX_ISSUE_MESSAGE_CHARS: usize = 120;

const USAGE: &str = "\
Usage: tubecache <command> [collection]

Commands:
  status            Show sync age, size and health of each collection
  check             Validate and print the recovery plan (read-only)
  repair            Run validation and automatic recovery
  backup            Snapshot the collection
  restore [ts]      Restore the newest backup, or the one taken at ts (ms)
  sync              Fetch from the server using the saved session
  clear             Delete the cached collection

Collections: videos, subscriptions (default: both)";

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // RUST_LOG controls the level (e.g. RUST_LOG=tubecache_core=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first().map(String::as_str) else {
        println!("{}", USAGE);
        return Ok(());
    };
    if matches!(command, "-h" | "--help" | "help") {
        println!("{}", USAGE);
        return Ok(());
    }

    let config = Config::load()?;
    let cache_dir = config.cache_dir()?;
    let store = Arc::new(FileStore::new(cache_dir.clone()).context("Failed to open cache store")?);
    let engine = CacheEngine::with_system_clock(store, config.engine()?);
    let swept = engine.start().await.context("Failed to sweep interrupted transactions")?;
    if swept > 0 {
        info!(swept, "Discarded interrupted transactions");
    }

    // `restore` takes an optional timestamp before the collection.
    let (timestamp, rest) = match (command, args.get(1)) {
        ("restore", Some(arg)) if arg.parse::<i64>().is_ok() => (arg.parse::<i64>().ok(), &args[2..]),
        _ => (None, args.get(1..).unwrap_or(&[])),
    };
    let collections = select_collections(&config, rest.first().map(String::as_str))?;

    for collection in collections {
        match command {
            "status" => status(&engine, &collection).await?,
            "check" => check(&engine, &collection).await?,
            "repair" => repair(&engine, &collection).await,
            "backup" => {
                let backup = engine.recovery(&collection).create_backup().await?;
                println!("{}: backup {} ({})", collection.name, backup.timestamp, format_timestamp(backup.timestamp));
            }
            "restore" => {
                let restored = engine
                    .recovery(&collection)
                    .restore_from_backup(timestamp)
                    .await
                    .with_context(|| format!("Failed to restore {}", collection.name))?;
                println!("{}: restored backup {}", collection.name, restored.timestamp);
            }
            "sync" => sync(&engine, &config, &cache_dir, collection).await?,
            "clear" => {
                engine.recovery(&collection).wipe().await?;
                println!("{}: cleared", collection.name);
            }
            other => bail!("Unknown command '{}'\n\n{}", other, USAGE),
        }
    }

    Ok(())
}

fn select_collections(config: &Config, name: Option<&str>) -> Result<Vec<CollectionConfig>> {
    match name {
        None => Ok(vec![config.videos()?, config.subscriptions()?]),
        Some(name) => config
            .collection(name)?
            .map(|c| vec![c])
            .ok_or_else(|| anyhow::anyhow!("Unknown collection '{}' (expected {} or {})", name, VIDEOS, SUBSCRIPTIONS)),
    }
}

async fn status(engine: &CacheEngine, collection: &CollectionConfig) -> Result<()> {
    let recovery = engine.recovery(collection);
    let report = recovery.validator().validate_cache().await?;
    let backups = recovery.list_backups().await?;
    let metadata = load_metadata(engine.store().as_ref(), recovery.keys())
        .await
        .ok()
        .flatten();

    println!("{}", collection.name);
    match metadata {
        Some(meta) => {
            let now = SystemClock.now();
            println!("  last sync:  {}", age_display(meta.last_sync_timestamp, now));
            println!("  entries:    {} (max {})", meta.total_count, collection.max_entries);
            println!("  owner:      {}", meta.owner_id.as_deref().unwrap_or("-"));
            println!("  more pages: {}", if meta.has_more { "yes" } else { "no" });
        }
        None => println!("  not cached"),
    }
    println!(
        "  health:     {} ({} issues, accuracy {:.2})",
        if report.is_valid { "ok" } else { "damaged" },
        report.issues.len(),
        report.metrics.metadata_accuracy
    );
    println!("  backups:    {}", backups.len());
    Ok(())
}

async fn check(engine: &CacheEngine, collection: &CollectionConfig) -> Result<()> {
    let report = engine.validator(collection).validate_cache().await?;
    for issue in &report.issues {
        println!(
            "{}: [{}] {}: {}",
            collection.name,
            issue.severity,
            issue.kind,
            truncate_string(&issue.message, MAX_ISSUE_MESSAGE_CHARS)
        );
    }
    let plan = build_plan(report);
    if plan.is_empty() {
        println!("{}: healthy", collection.name);
        return Ok(());
    }
    println!(
        "{}: strategy {} / risk {} / ~{}ms{}",
        collection.name,
        plan.strategy,
        plan.risk,
        plan.estimated_duration_ms,
        if plan.data_loss_risk { " / may lose data" } else { "" }
    );
    for action in &plan.actions {
        println!("  {} {}: {}", action.priority, action.kind, action.description);
    }
    Ok(())
}

async fn repair(engine: &CacheEngine, collection: &CollectionConfig) {
    match engine.recovery(collection).repair_or_wipe().await {
        AutoRecoverOutcome::Healthy => println!("{}: healthy", collection.name),
        AutoRecoverOutcome::Repaired(result) => println!(
            "{}: repaired ({} kept, {} removed, {} actions)",
            collection.name,
            result.recovered_entries,
            result.removed_entries,
            result.actions_applied.len()
        ),
        AutoRecoverOutcome::Wiped { reason } => println!("{}: wiped ({})", collection.name, reason),
        AutoRecoverOutcome::Degraded { error } => eprintln!("{}: degraded: {}", collection.name, error),
    }
}

async fn sync(
    engine: &CacheEngine,
    config: &Config,
    cache_dir: &std::path::Path,
    collection: CollectionConfig,
) -> Result<()> {
    let base_url = config
        .api_base_url
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("api_base_url is not set in the config file"))?;

    let mut session = Session::new(cache_dir.to_path_buf());
    session.load()?;
    let token = session
        .token()
        .ok_or_else(|| anyhow::anyhow!("No valid session. Log in first."))?
        .to_string();
    let remote = Arc::new(HttpRemoteApi::new(base_url)?.with_token(token));
    let identity = Arc::new(session);

    match collection.name.as_str() {
        SUBSCRIPTIONS => {
            let outcome = engine
                .coordinator::<ChannelSubscription>(collection, remote, identity)
                .get_collection()
                .await;
            report_sync(SUBSCRIPTIONS, &outcome)
        }
        _ => {
            let outcome = engine
                .coordinator::<VideoSummary>(collection, remote, identity)
                .get_collection()
                .await;
            report_sync(VIDEOS, &outcome)
        }
    }
}

fn report_sync<R: Record>(name: &str, outcome: &SyncOutcome<R>) -> Result<()> {
    println!(
        "{}: {} sync, {} fetched, {} evicted, {} cached",
        name,
        outcome.tier,
        outcome.fetched,
        outcome.evicted,
        outcome.records.len()
    );
    if let Some(ref e) = outcome.error {
        bail!("{}: served from cache: {}", name, e);
    }
    Ok(())
}
