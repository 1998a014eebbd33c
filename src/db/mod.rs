//! Postgres access. Each submodule owns one table family and exposes plain
//! async functions over any `PgExecutor`, so callers choose pool or transaction.

pub mod carts;
pub mod catalog;
pub mod orders;
pub mod payments;
pub mod reviews;
pub mod users;

/// True for a unique-constraint violation.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// True for a foreign-key violation (e.g. deleting a category still in use).
pub fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}
