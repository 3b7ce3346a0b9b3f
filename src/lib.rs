//! Ariadne: legacy XML catalog migration into SQLite
//!
//! This crate provides a two-phase pipeline for migrating a legacy XML
//! catalog -- a hierarchy of organizational units plus a multi-gigabyte
//! stream of bibliographic records -- into a relational store:
//!
//! 1. **Hierarchy Phase** -- Walk the unit-hierarchy document once,
//!    creating unit rows and materializing the full ancestor/descendant
//!    closure relation with correct sibling ordering and no duplicate
//!    edges, even when reference nodes make the hierarchy a DAG
//! 2. **Ingestion Phase** -- Stream the record dump one fragment at a
//!    time, creating each item with its author rows and resolving unit
//!    memberships (declared and inherited) against the closure relation
//!
//! # Architecture
//!
//! The pipeline is single-threaded and strictly sequential by design:
//! each phase runs inside its own all-or-nothing transaction, and the
//! ingestion phase only starts once the closure relation is fully
//! populated. The record stream is never held in memory -- the splitter
//! buffers one fragment at a time and yields it before reading on.
//!
//! # Key Modules
//!
//! - [`hierarchy`] -- Unit tree loader and the adjacency context
//! - [`closure`] -- Closure table builder over the unit DAG
//! - [`stream`] -- Fragment splitter with gzip decompression
//! - [`items`] -- Per-record item, author, and membership ingestion
//! - [`migrate`] -- Two-phase orchestration and transaction scoping
//! - [`repo`] -- Repository trait, SQLite and in-memory backends
//! - [`xml`] -- Fragment-to-tree parsing with namespace stripping
//! - [`models`] -- Core data types (Unit, ClosureEdge, Item, ...)
//! - [`stats`] -- Migration counters
//! - [`config`] -- Constants (markers, defaults, ordering base)
//!
//! # Example Usage
//!
//! ```bash
//! # Migrate a catalog into migration.db
//! ariadne hierarchy.xml records.xml.gz
//!
//! # Choose the database path and cap records for a smoke run
//! ariadne hierarchy.xml records.xml.gz -d out.db --limit 1000
//! ```

pub mod closure;
pub mod config;
pub mod hierarchy;
pub mod items;
pub mod migrate;
pub mod models;
pub mod repo;
pub mod stats;
pub mod stream;
pub mod xml;
