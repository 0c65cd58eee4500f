// JobRelay Infrastructure - SQLite Adapter
// Implements: StatusRepository

mod connection;
mod error;
mod migration;
mod status_repository;

pub use connection::create_pool;
pub use migration::run_migrations;
pub use status_repository::SqliteStatusRepository;

// Note: sqlx::Error conversion is handled by wrapping in helper functions
// due to Rust's orphan rules (cannot implement From<sqlx::Error> for AppError here)
