use ajopool::application::ledger_writer::LedgerWriter;
use ajopool::application::processor::CycleProcessor;
use ajopool::application::scheduler::CycleScheduler;
use ajopool::config::EngineConfig;
use ajopool::domain::ports::{CycleStore, GroupStore, LedgerStore, MemberStore, WalletStore};
use ajopool::infrastructure::in_memory::{
    InMemoryCycleStore, InMemoryGroupStore, InMemoryLedgerStore, InMemoryMemberStore,
    InMemoryWalletStore,
};
use ajopool::infrastructure::lock::InMemoryLockManager;
use ajopool::infrastructure::notify::LogNotifier;
use ajopool::interfaces::csv::report_writer::ReportWriter;
use ajopool::interfaces::scenario::Scenario;
use chrono::{DateTime, Utc};
use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Scenario JSON file with groups, members and wallet seeds
    scenario: PathBuf,

    /// Reference time for the sweep (RFC 3339). Defaults to now.
    #[arg(long)]
    at: Option<DateTime<Utc>>,

    /// Keep sweeping every N seconds instead of exiting after one sweep
    #[arg(long)]
    watch_secs: Option<u64>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[cfg(feature = "storage-rocksdb")]
    #[arg(long)]
    db_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let scenario = Scenario::from_path(&cli.scenario).into_diagnostic()?;

    #[cfg(feature = "storage-rocksdb")]
    if let Some(db_path) = &cli.db_path {
        let store =
            ajopool::infrastructure::rocksdb::RocksDbStore::open(db_path).into_diagnostic()?;
        return drive(
            &cli,
            &scenario,
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store,
        )
        .await;
    }

    drive(
        &cli,
        &scenario,
        InMemoryGroupStore::new(),
        InMemoryMemberStore::new(),
        InMemoryCycleStore::new(),
        InMemoryLedgerStore::new(),
        InMemoryWalletStore::new(),
    )
    .await
}

/// Seeds the scenario, runs the scheduler (once, or on a cadence with
/// `--watch-secs`), then prints the cycle and wallet reports to stdout.
async fn drive<G, M, C, L, W>(
    cli: &Cli,
    scenario: &Scenario,
    groups: G,
    members: M,
    cycles: C,
    ledger: L,
    wallets: W,
) -> Result<()>
where
    G: GroupStore + Clone + 'static,
    M: MemberStore + Clone + 'static,
    C: CycleStore + Clone + 'static,
    L: LedgerStore + Clone + 'static,
    W: WalletStore + Clone + 'static,
{
    scenario
        .seed(&groups, &members, &wallets)
        .await
        .into_diagnostic()?;

    let config = EngineConfig::default();
    let writer = LedgerWriter::new(
        Box::new(ledger),
        Box::new(wallets.clone()),
        Box::new(members.clone()),
    );
    let processor = CycleProcessor::new(
        Box::new(groups.clone()),
        Box::new(members),
        Box::new(cycles.clone()),
        writer,
        Box::new(InMemoryLockManager::new()),
        Box::new(LogNotifier::new()),
        config.clone(),
    );
    let scheduler = CycleScheduler::new(Box::new(groups), Box::new(cycles.clone()), processor, config);

    loop {
        let now = cli.at.unwrap_or_else(Utc::now);
        scheduler.scan_due(now).await.into_diagnostic()?;

        match cli.watch_secs {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => break,
        }
    }

    let mut all_cycles = Vec::new();
    for seed in &scenario.groups {
        all_cycles.extend(cycles.list_for(seed.id).await.into_diagnostic()?);
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    ReportWriter::new(&mut out)
        .write_cycles(all_cycles)
        .into_diagnostic()?;
    writeln!(out).into_diagnostic()?;
    ReportWriter::new(&mut out)
        .write_wallets(wallets.all().await.into_diagnostic()?)
        .into_diagnostic()?;

    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
