//! # pulse-sweep
//!
//! Batch aggregation sweep binary — folds pending raw events into user
//! actions for every account (or a named subset) and prints one JSON report
//! per account.
//!
//! Exits non-zero when any pair finished with an exception, so schedulers
//! can alert on partial sweeps.

#![deny(unsafe_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pulse_aggregate::{
    AggregateOptions, AggregationConfig, RangeOverride, TrackingService,
};
use pulse_core::AggregatorKind;
use pulse_events::{
    ConnectionConfig, FlatHierarchy, HierarchyLookup, StaticHierarchy, TrackingStore,
};

/// Usage aggregation sweep.
#[derive(Parser, Debug)]
#[command(name = "pulse-sweep", about = "Aggregate pending usage events into user actions")]
struct Cli {
    /// Path to the `SQLite` database.
    #[arg(long)]
    db_path: PathBuf,

    /// Account to sweep (repeatable). Defaults to every account in the log.
    #[arg(long = "account")]
    accounts: Vec<String>,

    /// Aggregator to run (repeatable, e.g. `item-edits`). Defaults to all.
    #[arg(long = "aggregator")]
    aggregators: Vec<AggregatorKind>,

    /// Maximum events fetched per (account, aggregator) pair.
    #[arg(long)]
    limit: Option<u32>,

    /// Ignore stored cursors and replay the whole log.
    #[arg(long)]
    backfill_from_epoch: bool,

    /// Path to a JSON file mapping parent item IDs to child ID arrays.
    #[arg(long)]
    hierarchy_json: Option<PathBuf>,

    /// Accounts aggregated per engine call.
    #[arg(long, default_value = "50")]
    page_size: usize,
}

/// Load the item hierarchy, or fall back to a flat one.
fn load_hierarchy(path: Option<&std::path::Path>) -> Result<Arc<dyn HierarchyLookup>> {
    match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read hierarchy file: {}", path.display()))?;
            let edges: HashMap<String, Vec<String>> = serde_json::from_str(&raw)
                .with_context(|| format!("invalid hierarchy JSON: {}", path.display()))?;
            Ok(Arc::new(StaticHierarchy::new(edges)))
        }
        None => Ok(Arc::new(FlatHierarchy)),
    }
}

/// Run the sweep. Returns whether any pair finished with an exception.
fn run(args: &Cli) -> Result<bool> {
    let db_str = args.db_path.to_string_lossy();
    let store = Arc::new(
        TrackingStore::open_file(&db_str, &ConnectionConfig::default())
            .context("failed to open database")?,
    );
    let hierarchy = load_hierarchy(args.hierarchy_json.as_deref())?;
    let service = TrackingService::new(store, hierarchy, AggregationConfig::default());

    let accounts = if args.accounts.is_empty() {
        service.known_account_ids().context("failed to list accounts")?
    } else {
        args.accounts.clone()
    };
    if accounts.is_empty() {
        tracing::info!("event log is empty, nothing to sweep");
        return Ok(false);
    }

    let opts = AggregateOptions {
        aggregator_kinds: (!args.aggregators.is_empty()).then(|| args.aggregators.clone()),
        limit_number_of_events: args.limit,
        range_override: args
            .backfill_from_epoch
            .then_some(RangeOverride { range_start: 0 }),
    };

    let mut had_exceptions = false;
    for page in accounts.chunks(args.page_size.max(1)) {
        let report = service
            .aggregate_user_events(page, &opts)
            .context("aggregation run failed")?;
        had_exceptions |= report.has_exceptions();
        for (account_id, account_report) in &report.0 {
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "accountId": account_id,
                    "aggregation": account_report,
                }))?
            );
        }
    }
    Ok(had_exceptions)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Cli::parse();
    if run(&args)? {
        tracing::error!("sweep finished with exceptions");
        std::process::exit(1);
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
