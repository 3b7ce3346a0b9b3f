//! Unit Tree Loader: one depth-first pass over the hierarchy document.
//!
//! Creates a Unit per concrete `<division>` node (reference nodes only link)
//! and builds the adjacency context the closure builder and the item
//! ingester both consume.

use crate::config::{ROOT_UNIT_ID, SUBMISSIONS_RETIRED};
use crate::models::Unit;
use crate::repo::Repository;
use crate::stats::MigrationStats;
use crate::xml::XmlNode;
use anyhow::{bail, Result};
use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::{Map, Value};
use tracing::{debug, info};

/// Adjacency context built by the loader.
///
/// A unit may have multiple parents (reference nodes make the hierarchy a
/// DAG, not a tree). `defined` holds only concretely-defined identifiers;
/// the ingester uses it to drop stale unit references.
#[derive(Debug, Default)]
pub struct UnitGraph {
    children: FxHashMap<String, Vec<String>>,
    parents: FxHashMap<String, Vec<String>>,
    defined: FxHashSet<String>,
}

impl UnitGraph {
    /// Children of `id` in source sibling order.
    pub fn children_of(&self, id: &str) -> &[String] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn parents_of(&self, id: &str) -> &[String] {
        self.parents.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_children(&self, id: &str) -> bool {
        !self.children_of(id).is_empty()
    }

    pub fn is_defined(&self, id: &str) -> bool {
        self.defined.contains(id)
    }

    pub(crate) fn link(&mut self, parent: &str, child: &str) {
        self.children
            .entry(parent.to_string())
            .or_default()
            .push(child.to_string());
        self.parents
            .entry(child.to_string())
            .or_default()
            .push(parent.to_string());
    }

    pub(crate) fn mark_defined(&mut self, id: &str) {
        self.defined.insert(id.to_string());
    }
}

/// Walks the hierarchy document and creates every Unit, including the
/// synthetic root. Returns the adjacency context for the later phases.
pub fn load_units(
    root: &XmlNode,
    repo: &mut dyn Repository,
    stats: &mut MigrationStats,
) -> Result<UnitGraph> {
    let mut graph = UnitGraph::default();

    repo.create_unit(&Unit {
        id: ROOT_UNIT_ID.to_string(),
        name: "Root".to_string(),
        unit_type: "root".to_string(),
        active: true,
        attrs: Map::new(),
    })?;
    stats.units_created += 1;

    for child in root.children_named("division") {
        walk_division(child, ROOT_UNIT_ID, &mut graph, repo, stats)?;
    }

    info!(
        units = stats.units_created,
        defined = graph.defined.len(),
        "Unit hierarchy loaded"
    );
    Ok(graph)
}

fn walk_division(
    node: &XmlNode,
    parent_id: &str,
    graph: &mut UnitGraph,
    repo: &mut dyn Repository,
    stats: &mut MigrationStats,
) -> Result<()> {
    let (id, is_reference) = match (node.attr("id"), node.attr("ref")) {
        (Some(id), _) => (id.to_string(), false),
        (None, Some(target)) => (target.to_string(), true),
        (None, None) => {
            if !node.children.is_empty() {
                bail!(
                    "Division node under '{}' has children but no resolvable identifier",
                    parent_id
                );
            }
            debug!(parent = parent_id, "Skipping anonymous childless division node");
            return Ok(());
        }
    };

    if !is_reference {
        repo.create_unit(&make_unit(node, &id))?;
        stats.units_created += 1;
        graph.mark_defined(&id);
    }

    graph.link(parent_id, &id);

    for child in node.children_named("division") {
        walk_division(child, &id, graph, repo, stats)?;
    }
    Ok(())
}

fn make_unit(node: &XmlNode, id: &str) -> Unit {
    let mut attrs = Map::new();
    let submissions = node.attr("submissions");
    if let Some(value) = submissions {
        attrs.insert("submissions".into(), Value::String(value.to_string()));
    }
    if let Some(value) = node.attr("hidden") {
        attrs.insert("hidden".into(), Value::String(value.to_string()));
    }

    Unit {
        id: id.to_string(),
        name: node.attr("label").unwrap_or(id).to_string(),
        unit_type: node.attr("type").unwrap_or("division").to_string(),
        active: submissions != Some(SUBMISSIONS_RETIRED),
        attrs,
    }
}
