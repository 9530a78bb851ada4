// Database module
// This module handles SQLite storage, schema versioning and the entity repositories

pub mod connection;
pub mod migrations;
pub mod models;
pub mod ordering;
pub mod repositories;
pub mod schema;

pub use connection::{DatabaseConnection, FailureKind, Record, StatementOutcome, StorageFailure};
pub use migrations::{MigrationReport, TableReport};
pub use schema::{Schema, TableSchema, LIBRARY_SCHEMA};
