//! Repository boundary for the target store.
//!
//! The pipeline only ever asks for entity creation, one closure query, and
//! per-phase transaction scoping, so the trait stays small. `SqliteRepository`
//! is the production backend; `MemoryRepository` backs the tests.

use crate::models::{ClosureEdge, Item, ItemAuthor, Unit, UnitItem};
use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use std::path::Path;
use tracing::{debug, info};

pub trait Repository {
    fn begin(&mut self) -> Result<()>;
    fn commit(&mut self) -> Result<()>;
    fn rollback(&mut self) -> Result<()>;

    fn create_unit(&mut self, unit: &Unit) -> Result<()>;
    fn create_closure_edge(&mut self, edge: &ClosureEdge) -> Result<()>;
    fn create_item(&mut self, item: &Item) -> Result<()>;
    fn create_item_author(&mut self, author: &ItemAuthor) -> Result<()>;
    fn create_unit_item(&mut self, row: &UnitItem) -> Result<()>;

    /// Ancestor ids connected to `unit_id` by indirect closure edges.
    fn indirect_ancestors(&self, unit_id: &str) -> Result<Vec<String>>;
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS units (
    id        TEXT PRIMARY KEY NOT NULL,
    name      TEXT NOT NULL,
    unit_type TEXT NOT NULL,
    active    INTEGER NOT NULL,
    attrs     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS closure (
    ancestor  TEXT NOT NULL,
    unit      TEXT NOT NULL,
    is_direct INTEGER NOT NULL,
    ordering  INTEGER,
    PRIMARY KEY (ancestor, unit)
);

CREATE INDEX IF NOT EXISTS closure_unit ON closure (unit, is_direct);

CREATE TABLE IF NOT EXISTS items (
    id        TEXT PRIMARY KEY NOT NULL,
    source    TEXT NOT NULL,
    status    TEXT NOT NULL,
    title     TEXT NOT NULL,
    format    TEXT NOT NULL,
    genre     TEXT NOT NULL,
    published TEXT NOT NULL,
    deposited TEXT NOT NULL,
    rights    TEXT NOT NULL,
    attrs     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS item_authors (
    item_id  TEXT NOT NULL,
    ordering INTEGER NOT NULL,
    attrs    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS unit_items (
    unit_id   TEXT NOT NULL,
    item_id   TEXT NOT NULL,
    ordering  INTEGER NOT NULL,
    is_direct INTEGER NOT NULL
);
"#;

/// SQLite-backed repository. Single connection, single writer; the pipeline
/// is strictly sequential so no pooling is needed.
pub struct SqliteRepository {
    conn: Connection,
}

impl SqliteRepository {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        info!(path = ?path.as_ref(), "Opening SQLite database");
        let conn = Connection::open(path.as_ref())
            .with_context(|| format!("Failed to open database: {:?}", path.as_ref()))?;
        Self::initialize(conn)
    }

    /// In-memory database, used by tests.
    pub fn memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::initialize(conn)
    }

    fn initialize(conn: Connection) -> Result<Self> {
        debug!("Configuring SQLite pragmas");
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;\n\
             PRAGMA synchronous = NORMAL;\n\
             PRAGMA temp_store = MEMORY;",
        )
        .context("Failed to configure pragmas")?;
        conn.execute_batch(SCHEMA)
            .context("Failed to apply schema")?;
        Ok(Self { conn })
    }

    fn attrs_json(attrs: &serde_json::Map<String, serde_json::Value>) -> Result<String> {
        serde_json::to_string(attrs).context("Failed to serialize attribute map")
    }
}

impl Repository for SqliteRepository {
    fn begin(&mut self) -> Result<()> {
        self.conn
            .execute_batch("BEGIN")
            .context("Failed to begin transaction")
    }

    fn commit(&mut self) -> Result<()> {
        self.conn
            .execute_batch("COMMIT")
            .context("Failed to commit transaction")
    }

    fn rollback(&mut self) -> Result<()> {
        self.conn
            .execute_batch("ROLLBACK")
            .context("Failed to roll back transaction")
    }

    fn create_unit(&mut self, unit: &Unit) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO units (id, name, unit_type, active, attrs) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    unit.id,
                    unit.name,
                    unit.unit_type,
                    unit.active,
                    Self::attrs_json(&unit.attrs)?
                ],
            )
            .with_context(|| format!("Failed to insert unit: {}", unit.id))?;
        Ok(())
    }

    fn create_closure_edge(&mut self, edge: &ClosureEdge) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO closure (ancestor, unit, is_direct, ordering) VALUES (?1, ?2, ?3, ?4)",
                params![edge.ancestor, edge.unit, edge.is_direct, edge.ordering],
            )
            .with_context(|| {
                format!("Failed to insert closure edge: {} -> {}", edge.ancestor, edge.unit)
            })?;
        Ok(())
    }

    fn create_item(&mut self, item: &Item) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO items (id, source, status, title, format, genre, published, deposited, rights, attrs)\n\
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    item.id,
                    item.source,
                    item.status,
                    item.title,
                    item.format,
                    item.genre,
                    item.published,
                    item.deposited,
                    item.rights,
                    Self::attrs_json(&item.attrs)?
                ],
            )
            .with_context(|| format!("Failed to insert item: {}", item.id))?;
        Ok(())
    }

    fn create_item_author(&mut self, author: &ItemAuthor) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO item_authors (item_id, ordering, attrs) VALUES (?1, ?2, ?3)",
                params![author.item_id, author.ordering, Self::attrs_json(&author.attrs)?],
            )
            .with_context(|| format!("Failed to insert author for item: {}", author.item_id))?;
        Ok(())
    }

    fn create_unit_item(&mut self, row: &UnitItem) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO unit_items (unit_id, item_id, ordering, is_direct) VALUES (?1, ?2, ?3, ?4)",
                params![row.unit_id, row.item_id, row.ordering, row.is_direct],
            )
            .with_context(|| {
                format!("Failed to insert unit-item row: {} / {}", row.unit_id, row.item_id)
            })?;
        Ok(())
    }

    fn indirect_ancestors(&self, unit_id: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT ancestor FROM closure WHERE unit = ?1 AND is_direct = 0")
            .context("Failed to prepare ancestor query")?;
        let rows = stmt
            .query_map(params![unit_id], |row| row.get::<_, String>(0))
            .with_context(|| format!("Failed to query ancestors of unit: {}", unit_id))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.context("Failed to read ancestor row")?);
        }
        Ok(out)
    }
}

/// Vec-backed repository for tests. A transaction snapshots the lengths of
/// every table so a rollback can truncate back to them.
#[derive(Default)]
pub struct MemoryRepository {
    pub units: Vec<Unit>,
    pub closure: Vec<ClosureEdge>,
    pub items: Vec<Item>,
    pub item_authors: Vec<ItemAuthor>,
    pub unit_items: Vec<UnitItem>,
    snapshot: Option<[usize; 5]>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Repository for MemoryRepository {
    fn begin(&mut self) -> Result<()> {
        self.snapshot = Some([
            self.units.len(),
            self.closure.len(),
            self.items.len(),
            self.item_authors.len(),
            self.unit_items.len(),
        ]);
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.snapshot = None;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        if let Some([u, c, i, a, m]) = self.snapshot.take() {
            self.units.truncate(u);
            self.closure.truncate(c);
            self.items.truncate(i);
            self.item_authors.truncate(a);
            self.unit_items.truncate(m);
        }
        Ok(())
    }

    fn create_unit(&mut self, unit: &Unit) -> Result<()> {
        self.units.push(unit.clone());
        Ok(())
    }

    fn create_closure_edge(&mut self, edge: &ClosureEdge) -> Result<()> {
        self.closure.push(edge.clone());
        Ok(())
    }

    fn create_item(&mut self, item: &Item) -> Result<()> {
        self.items.push(item.clone());
        Ok(())
    }

    fn create_item_author(&mut self, author: &ItemAuthor) -> Result<()> {
        self.item_authors.push(author.clone());
        Ok(())
    }

    fn create_unit_item(&mut self, row: &UnitItem) -> Result<()> {
        self.unit_items.push(row.clone());
        Ok(())
    }

    fn indirect_ancestors(&self, unit_id: &str) -> Result<Vec<String>> {
        Ok(self
            .closure
            .iter()
            .filter(|e| e.unit == unit_id && !e.is_direct)
            .map(|e| e.ancestor.clone())
            .collect())
    }
}
