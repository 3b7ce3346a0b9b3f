use anyhow::Result;
use ariadne::repo::SqliteRepository;
use clap::Parser;
use std::process::ExitCode;
use std::time::Instant;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "ariadne")]
#[command(about = "Migrate legacy XML catalogs into SQLite")]
struct Cli {
    /// Path to the unit-hierarchy XML document
    hierarchy: String,

    /// Path to the record stream (.xml or .xml.gz)
    records: String,

    /// Output SQLite database path
    #[arg(short, long, default_value = "migration.db")]
    database: String,

    /// Limit number of records to ingest (for testing)
    #[arg(long)]
    limit: Option<u64>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn run(cli: Cli) -> Result<()> {
    let mut repo = SqliteRepository::open(&cli.database)?;

    let start = Instant::now();
    let stats = ariadne::migrate::run_migration(
        &cli.hierarchy,
        &cli.records,
        &mut repo,
        cli.limit,
    )?;
    let elapsed = start.elapsed();

    println!();
    println!("=== Summary ===");
    println!("Total time:         {:.2}s", elapsed.as_secs_f64());
    println!();
    println!("Units created:      {}", stats.units_created);
    println!("Closure edges:      {} ({} direct, {} indirect)",
        stats.closure_edges(), stats.closure_direct, stats.closure_indirect);
    println!("Records processed:  {}", stats.records_processed);
    println!("Items created:      {}", stats.items_created);
    println!("Authors created:    {}", stats.authors_created);
    println!("Unit memberships:   {} ({} direct, {} inherited)",
        stats.unit_items(), stats.unit_items_direct, stats.unit_items_indirect);
    println!("Unknown units:      {}", stats.unknown_units_skipped);
    println!();
    println!("Database:           {}", cli.database);

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    match run(cli) {
        Ok(()) => {
            info!("Completed successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Error: {:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
