use serde::Serialize;
use serde_json::{Map, Value};

/// An organizational unit (department, series, ...) items can belong to.
#[derive(Debug, Clone, Serialize)]
pub struct Unit {
    pub id: String,
    pub name: String,
    pub unit_type: String,
    pub active: bool,
    pub attrs: Map<String, Value>,
}

/// One row of the materialized ancestor/descendant closure relation.
///
/// `ordering` is the sibling position under the direct parent and is only
/// meaningful when `is_direct` is true.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClosureEdge {
    pub ancestor: String,
    pub unit: String,
    pub is_direct: bool,
    pub ordering: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Item {
    pub id: String,
    pub source: String,
    pub status: String,
    pub title: String,
    pub format: String,
    pub genre: String,
    pub published: String,
    pub deposited: String,
    pub rights: String,
    pub attrs: Map<String, Value>,
}

/// One author token of a record, in source order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemAuthor {
    pub item_id: String,
    pub ordering: i64,
    pub attrs: Map<String, Value>,
}

impl ItemAuthor {
    pub fn person(item_id: &str, ordering: i64, last: &str, first: &str) -> Self {
        let mut attrs = Map::new();
        attrs.insert("last_name".into(), Value::String(last.to_string()));
        attrs.insert("first_name".into(), Value::String(first.to_string()));
        Self {
            item_id: item_id.to_string(),
            ordering,
            attrs,
        }
    }

    pub fn organization(item_id: &str, ordering: i64, name: &str) -> Self {
        let mut attrs = Map::new();
        attrs.insert("organization".into(), Value::String(name.to_string()));
        Self {
            item_id: item_id.to_string(),
            ordering,
            attrs,
        }
    }
}

/// Membership of an item in a unit, either declared (direct) or inherited
/// from a closure ancestor (indirect).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitItem {
    pub unit_id: String,
    pub item_id: String,
    pub ordering: i64,
    pub is_direct: bool,
}
