use rusqlite::Connection;
use std::sync::{Arc, Mutex};

// Repository traits, one per table group the sync layer touches.
pub mod company_repository;
pub mod cost_cache_repository;
pub mod engagement_repository;
pub mod migration_repository;
pub mod pay_app_repository;
pub mod token_repository;

// Backends and the manager handing out repositories for the configured one.
pub mod database_manager;
pub mod postgrest;
pub(crate) mod sqlite;

/// A thread-safe, shared connection to an ``SQLite`` database,
/// used across multiple repository layers.
pub(crate) type SharedSqliteConnection = Arc<Mutex<Connection>>;
