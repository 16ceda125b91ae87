//! Persistence layer for the Event Manager backend.
//!
//! This crate contains:
//! - Database connection management and migrations
//! - Entity definitions (database row mappings)
//! - Repository implementations
//! - `RecordStore` implementations backed by PostgreSQL or memory

pub mod db;
pub mod entities;
pub mod memory;
pub mod metrics;
pub mod pg_store;
pub mod repositories;

pub use memory::InMemoryRecordStore;
pub use pg_store::PgRecordStore;
