//! Storage Module
//!
//! SQLite-based storage layer with:
//! - Cards grouped into decks
//! - Per-(user, card) SM-2 mastery state
//! - Append-only review log
//! - Versioned schema migrations

mod migrations;
mod sqlite;

pub use migrations::{Migration, MIGRATIONS};
pub use sqlite::{default_db_path, Result, Storage, StorageError, DATA_DIR_ENV, DB_FILE_NAME};
