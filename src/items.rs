//! Item Ingester: turns one parsed record fragment into an Item, its
//! author rows, and its direct plus inherited unit memberships.

use crate::config::{DEFAULT_DATE, DEFAULT_RIGHTS, DEFAULT_STATUS, INDIRECT_ORDER_BASE};
use crate::hierarchy::UnitGraph;
use crate::models::{Item, ItemAuthor, UnitItem};
use crate::repo::Repository;
use crate::stats::MigrationStats;
use crate::xml::XmlNode;
use anyhow::{Context, Result};
use rustc_hash::FxHashSet;
use serde_json::{Map, Value};
use tracing::debug;

/// Ingests one record. Any error is fatal for the batch; the caller wraps
/// it with the raw fragment for diagnosis.
pub fn ingest_record(
    doc: &XmlNode,
    graph: &UnitGraph,
    repo: &mut dyn Repository,
    stats: &mut MigrationStats,
) -> Result<()> {
    let item = extract_item(doc)?;
    let item_id = item.id.clone();
    repo.create_item(&item)?;
    stats.items_created += 1;

    if let Some(creators) = doc.child_text("creators") {
        for (ordering, token) in split_tokens(creators, ';').enumerate() {
            repo.create_item_author(&parse_author(&item_id, ordering as i64, token))?;
            stats.authors_created += 1;
        }
    }

    if let Some(divisions) = doc.child_text("divisions") {
        link_units(&item_id, divisions, graph, repo, stats)?;
    }

    stats.records_processed += 1;
    Ok(())
}

fn extract_item(doc: &XmlNode) -> Result<Item> {
    let id = doc
        .child_text("identifier")
        .context("Record is missing its identifier")?
        .to_string();

    let mut attrs = Map::new();
    if let Some(flag) = doc.child_flag("content") {
        attrs.insert("content_exists".into(), Value::Bool(flag));
    }
    if let Some(flag) = doc.child_flag("pdf") {
        attrs.insert("pdf_exists".into(), Value::Bool(flag));
    }
    if let Some(lang) = doc.child_text("language") {
        attrs.insert("language".into(), Value::String(lang.to_string()));
    }
    if let Some(flag) = doc.child_flag("peer_reviewed") {
        attrs.insert("peer_reviewed".into(), Value::Bool(flag));
    }

    let text = |name: &str| doc.child_text(name).unwrap_or_default().to_string();
    let text_or = |name: &str, default: &str| doc.child_text(name).unwrap_or(default).to_string();

    Ok(Item {
        id,
        source: text("source"),
        status: text_or("status", DEFAULT_STATUS),
        title: text("title"),
        format: text("format"),
        genre: text("genre"),
        published: text_or("published", DEFAULT_DATE),
        deposited: text_or("deposited", DEFAULT_DATE),
        rights: text_or("rights", DEFAULT_RIGHTS),
        attrs,
    })
}

fn split_tokens(list: &str, sep: char) -> impl Iterator<Item = &str> {
    list.split(sep).map(str::trim).filter(|t| !t.is_empty())
}

/// Two comma-separated parts are (last name, first name); any other shape
/// is a single organization name.
fn parse_author(item_id: &str, ordering: i64, token: &str) -> ItemAuthor {
    let parts: Vec<&str> = token.split(',').map(str::trim).collect();
    match parts.as_slice() {
        [last, first] => ItemAuthor::person(item_id, ordering, last, first),
        _ => ItemAuthor::organization(item_id, ordering, token),
    }
}

/// Direct rows for each known declared unit, then one inherited row per
/// unique indirect ancestor not already covered for this record.
fn link_units(
    item_id: &str,
    divisions: &str,
    graph: &UnitGraph,
    repo: &mut dyn Repository,
    stats: &mut MigrationStats,
) -> Result<()> {
    let retained: Vec<&str> = split_tokens(divisions, '|')
        .filter(|token| {
            let known = graph.is_defined(token);
            if !known {
                debug!(item = item_id, unit = token, "Skipping unknown unit reference");
                stats.unknown_units_skipped += 1;
            }
            known
        })
        .collect();

    let mut emitted: FxHashSet<String> = retained.iter().map(|t| t.to_string()).collect();
    let mut indirect_order = INDIRECT_ORDER_BASE;

    for (ordering, unit_id) in retained.iter().enumerate() {
        repo.create_unit_item(&UnitItem {
            unit_id: unit_id.to_string(),
            item_id: item_id.to_string(),
            ordering: ordering as i64,
            is_direct: true,
        })?;
        stats.unit_items_direct += 1;

        for ancestor in repo.indirect_ancestors(unit_id)? {
            if !emitted.insert(ancestor.clone()) {
                continue;
            }
            repo.create_unit_item(&UnitItem {
                unit_id: ancestor,
                item_id: item_id.to_string(),
                ordering: indirect_order,
                is_direct: false,
            })?;
            indirect_order += 1;
            stats.unit_items_indirect += 1;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::closure::build_closure;
    use crate::hierarchy::load_units;
    use crate::repo::MemoryRepository;
    use crate::xml::parse_fragment;

    const HIERARCHY: &str = r#"<structure>
        <division id="a">
            <division id="b"><division id="d"/></division>
            <division id="c"/>
        </division>
    </structure>"#;

    fn setup() -> (UnitGraph, MemoryRepository, MigrationStats) {
        let root = parse_fragment(HIERARCHY).unwrap();
        let mut repo = MemoryRepository::new();
        let mut stats = MigrationStats::new();
        let graph = load_units(&root, &mut repo, &mut stats).unwrap();
        build_closure(&graph, &mut repo, &mut stats).unwrap();
        (graph, repo, stats)
    }

    fn ingest(xml: &str) -> (MemoryRepository, MigrationStats) {
        let (graph, mut repo, mut stats) = setup();
        let doc = parse_fragment(xml).unwrap();
        ingest_record(&doc, &graph, &mut repo, &mut stats).unwrap();
        (repo, stats)
    }

    #[test]
    fn extracts_fields_and_flags() {
        let (repo, _) = ingest(
            r#"<document>
                <identifier>rec-1</identifier>
                <source>legacy</source>
                <status>published</status>
                <title>A Title</title>
                <format>text</format>
                <genre>article</genre>
                <published>2003-04-01</published>
                <deposited>2003-05-01</deposited>
                <rights>restricted</rights>
                <content>TRUE</content>
                <pdf>false</pdf>
                <language>en</language>
                <peer_reviewed>true</peer_reviewed>
            </document>"#,
        );
        let item = &repo.items[0];
        assert_eq!(item.id, "rec-1");
        assert_eq!(item.status, "published");
        assert_eq!(item.rights, "restricted");
        assert_eq!(item.attrs.get("content_exists").unwrap(), &Value::Bool(true));
        assert_eq!(item.attrs.get("pdf_exists").unwrap(), &Value::Bool(false));
        assert_eq!(item.attrs.get("peer_reviewed").unwrap(), &Value::Bool(true));
        assert_eq!(item.attrs.get("language").unwrap(), "en");
    }

    #[test]
    fn missing_optionals_take_defaults() {
        let (repo, _) = ingest(
            "<document><identifier>rec-2</identifier><title>T</title></document>",
        );
        let item = &repo.items[0];
        assert_eq!(item.status, "unknown");
        assert_eq!(item.published, "1900-01-01");
        assert_eq!(item.deposited, "1900-01-01");
        assert_eq!(item.rights, "public");
        assert!(item.attrs.is_empty());
    }

    #[test]
    fn missing_identifier_is_fatal() {
        let (graph, mut repo, mut stats) = setup();
        let doc = parse_fragment("<document><title>No id</title></document>").unwrap();
        let err = ingest_record(&doc, &graph, &mut repo, &mut stats).unwrap_err();
        assert!(err.to_string().contains("identifier"));
    }

    #[test]
    fn splits_people_and_organizations() {
        let (repo, stats) = ingest(
            "<document><identifier>r</identifier><creators>Smith, John; Example Org</creators></document>",
        );
        assert_eq!(stats.authors_created, 2);
        assert_eq!(
            repo.item_authors[0],
            ItemAuthor::person("r", 0, "Smith", "John")
        );
        assert_eq!(
            repo.item_authors[1],
            ItemAuthor::organization("r", 1, "Example Org")
        );
    }

    #[test]
    fn three_part_token_is_an_organization() {
        let (repo, _) = ingest(
            "<document><identifier>r</identifier><creators>Dept, of, Things</creators></document>",
        );
        assert_eq!(
            repo.item_authors[0].attrs.get("organization").unwrap(),
            "Dept, of, Things"
        );
    }

    #[test]
    fn empty_author_tokens_are_dropped() {
        let (repo, _) = ingest(
            "<document><identifier>r</identifier><creators>; Solo Org ;;</creators></document>",
        );
        assert_eq!(repo.item_authors.len(), 1);
        assert_eq!(repo.item_authors[0].ordering, 0);
    }

    #[test]
    fn membership_creates_direct_and_inherited_rows() {
        // d is two levels below a: direct row for d, inherited row for a
        // (root is also an indirect ancestor of d).
        let (repo, stats) = ingest(
            "<document><identifier>r</identifier><divisions>d</divisions></document>",
        );
        let direct: Vec<_> = repo.unit_items.iter().filter(|u| u.is_direct).collect();
        let indirect: Vec<_> = repo.unit_items.iter().filter(|u| !u.is_direct).collect();

        assert_eq!(direct.len(), 1);
        assert_eq!(direct[0].unit_id, "d");
        assert_eq!(direct[0].ordering, 0);

        let mut inherited: Vec<_> = indirect.iter().map(|u| u.unit_id.as_str()).collect();
        inherited.sort();
        assert_eq!(inherited, vec!["a", "root"]);
        assert!(indirect.iter().all(|u| u.ordering >= 1000));
        assert_eq!(stats.unit_items_direct, 1);
        assert_eq!(stats.unit_items_indirect, 2);
    }

    #[test]
    fn shared_ancestors_deduplicated_per_record() {
        // b and d share ancestor a (indirect for d, direct parent chains
        // aside): only one inherited row per unique ancestor.
        let (repo, _) = ingest(
            "<document><identifier>r</identifier><divisions>b|d</divisions></document>",
        );
        let rows_for = |unit: &str| {
            repo.unit_items
                .iter()
                .filter(|u| u.unit_id == unit)
                .count()
        };
        assert_eq!(rows_for("b"), 1);
        assert_eq!(rows_for("d"), 1);
        assert_eq!(rows_for("a"), 1);
        assert_eq!(rows_for("root"), 1);
    }

    #[test]
    fn direct_unit_never_gets_inherited_row() {
        // a is an indirect ancestor of d, but also declared directly.
        let (repo, _) = ingest(
            "<document><identifier>r</identifier><divisions>a|d</divisions></document>",
        );
        let a_rows: Vec<_> = repo.unit_items.iter().filter(|u| u.unit_id == "a").collect();
        assert_eq!(a_rows.len(), 1);
        assert!(a_rows[0].is_direct);
    }

    #[test]
    fn inherited_ordering_increments_from_base() {
        let (repo, _) = ingest(
            "<document><identifier>r</identifier><divisions>d</divisions></document>",
        );
        let mut orders: Vec<_> = repo
            .unit_items
            .iter()
            .filter(|u| !u.is_direct)
            .map(|u| u.ordering)
            .collect();
        orders.sort();
        assert_eq!(orders, vec![1000, 1001]);
    }

    #[test]
    fn unknown_units_silently_skipped() {
        let (repo, stats) = ingest(
            "<document><identifier>r</identifier><divisions>ghost|c|gone</divisions></document>",
        );
        assert_eq!(stats.unknown_units_skipped, 2);
        let direct: Vec<_> = repo.unit_items.iter().filter(|u| u.is_direct).collect();
        assert_eq!(direct.len(), 1);
        assert_eq!(direct[0].unit_id, "c");
        // retained tokens keep a contiguous 0-based ordering
        assert_eq!(direct[0].ordering, 0);
        assert!(repo.unit_items.iter().all(|u| u.unit_id != "ghost"));
    }

    #[test]
    fn no_membership_produces_no_rows() {
        let (repo, _) = ingest("<document><identifier>r</identifier></document>");
        assert!(repo.unit_items.is_empty());
    }
}
