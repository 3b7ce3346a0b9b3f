//! Two-phase migration driver.
//!
//! Phase 1 loads the unit hierarchy and materializes the closure relation;
//! phase 2 streams record fragments through the item ingester. Each phase
//! runs inside its own all-or-nothing transaction, and phase 2 only starts
//! once phase 1 has committed -- the ingester's ancestor resolution depends
//! on a fully-populated closure relation.

use crate::closure::build_closure;
use crate::config::PROGRESS_INTERVAL;
use crate::hierarchy::{load_units, UnitGraph};
use crate::items::ingest_record;
use crate::repo::Repository;
use crate::stats::MigrationStats;
use crate::stream::FragmentStream;
use crate::xml;
use anyhow::{Context, Result};
use indicatif::ProgressBar;
use tracing::{info, warn};

pub fn run_migration(
    hierarchy_path: &str,
    records_path: &str,
    repo: &mut dyn Repository,
    limit: Option<u64>,
) -> Result<MigrationStats> {
    let mut stats = MigrationStats::new();

    info!("Loading unit hierarchy from: {}", hierarchy_path);
    let root = xml::parse_file(hierarchy_path)?;

    repo.begin()?;
    let graph = match hierarchy_phase(&root, repo, &mut stats) {
        Ok(graph) => {
            repo.commit()?;
            graph
        }
        Err(e) => {
            roll_back(repo);
            return Err(e).context("Hierarchy phase failed");
        }
    };

    info!("Ingesting records from: {}", records_path);
    let stream = FragmentStream::open(records_path)?;

    repo.begin()?;
    match ingest_phase(stream, &graph, repo, &mut stats, limit) {
        Ok(()) => repo.commit()?,
        Err(e) => {
            roll_back(repo);
            return Err(e).context("Ingestion phase failed");
        }
    }

    info!(
        records = stats.records_processed,
        items = stats.items_created,
        "Migration complete"
    );
    Ok(stats)
}

fn hierarchy_phase(
    root: &xml::XmlNode,
    repo: &mut dyn Repository,
    stats: &mut MigrationStats,
) -> Result<UnitGraph> {
    let graph = load_units(root, repo, stats)?;
    build_closure(&graph, repo, stats)?;
    Ok(graph)
}

fn ingest_phase(
    stream: FragmentStream,
    graph: &UnitGraph,
    repo: &mut dyn Repository,
    stats: &mut MigrationStats,
    limit: Option<u64>,
) -> Result<()> {
    let pb = ProgressBar::new_spinner();
    for fragment in stream {
        if let Some(limit) = limit {
            if stats.records_processed >= limit {
                info!(limit, "Record limit reached");
                break;
            }
        }
        let fragment = fragment?;
        ingest_record(&fragment.root, graph, repo, stats)
            .with_context(|| format!("Failed to ingest record fragment:\n{}", fragment.raw))?;
        if stats.records_processed % PROGRESS_INTERVAL == 0 {
            pb.tick();
        }
    }
    pb.finish_and_clear();
    Ok(())
}

fn roll_back(repo: &mut dyn Repository) {
    if let Err(e) = repo.rollback() {
        warn!(error = %e, "Rollback failed");
    }
}
