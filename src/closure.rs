//! Closure Table Builder: materializes every ancestor/descendant pair of
//! the unit hierarchy as exactly one edge.
//!
//! The traversal interleaves, per child, the direct edge, the child's own
//! subtree, and an indirect walk of the child's descendants. With the dedup
//! set shared across the whole invocation this guarantees one edge per
//! (ancestor, descendant) pair even when the DAG connects them over several
//! paths, and a pair is either direct or indirect, never both.

use crate::config::ROOT_UNIT_ID;
use crate::hierarchy::UnitGraph;
use crate::models::ClosureEdge;
use crate::repo::Repository;
use crate::stats::MigrationStats;
use anyhow::Result;
use rustc_hash::FxHashSet;
use tracing::info;

type PairSet = FxHashSet<(String, String)>;

/// Builds the full closure relation below the synthetic root. Recursion
/// depth is bounded by the catalog depth, which stays shallow for
/// organizational hierarchies.
pub fn build_closure(
    graph: &UnitGraph,
    repo: &mut dyn Repository,
    stats: &mut MigrationStats,
) -> Result<()> {
    let mut done = PairSet::default();
    link_children(graph, repo, ROOT_UNIT_ID, &mut done, stats)?;
    info!(
        direct = stats.closure_direct,
        indirect = stats.closure_indirect,
        "Closure relation built"
    );
    Ok(())
}

/// Direct edges from `parent` to each child in sibling order, recursing
/// into each child's subtree and extending indirect edges from `parent`.
fn link_children(
    graph: &UnitGraph,
    repo: &mut dyn Repository,
    parent: &str,
    done: &mut PairSet,
    stats: &mut MigrationStats,
) -> Result<()> {
    for (idx, child) in graph.children_of(parent).iter().enumerate() {
        let key = (parent.to_string(), child.clone());
        if !done.contains(&key) {
            repo.create_closure_edge(&ClosureEdge {
                ancestor: parent.to_string(),
                unit: child.clone(),
                is_direct: true,
                ordering: Some(idx as i64),
            })?;
            stats.closure_direct += 1;
            done.insert(key);
        }
        if graph.has_children(child) {
            link_children(graph, repo, child, done, stats)?;
            link_indirect(graph, repo, parent, child, done, stats)?;
        }
    }
    Ok(())
}

/// Indirect edges from `ancestor` to every descendant reachable below
/// `via`, one level at a time. Pairs already recorded (direct or indirect)
/// are left untouched.
fn link_indirect(
    graph: &UnitGraph,
    repo: &mut dyn Repository,
    ancestor: &str,
    via: &str,
    done: &mut PairSet,
    stats: &mut MigrationStats,
) -> Result<()> {
    for descendant in graph.children_of(via) {
        let key = (ancestor.to_string(), descendant.clone());
        if !done.contains(&key) {
            repo.create_closure_edge(&ClosureEdge {
                ancestor: ancestor.to_string(),
                unit: descendant.clone(),
                is_direct: false,
                ordering: None,
            })?;
            stats.closure_indirect += 1;
            done.insert(key);
        }
        link_indirect(graph, repo, ancestor, descendant, done, stats)?;
    }
    Ok(())
}
