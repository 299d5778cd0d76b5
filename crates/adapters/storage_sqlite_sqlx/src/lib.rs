//! # relayhub-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement the storage port traits defined in `relayhub-app::ports::storage`
//! - Manage `SQLite` connection pool lifecycle
//! - Run database migrations (using sqlx embedded migrations)
//! - Map between domain types and database rows, applying the legacy
//!   target-identity aliases when device rows are decoded
//!
//! ## Dependency rule
//! Depends on `relayhub-app` (for port traits) and `relayhub-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

pub mod device_directory;
pub mod error;
pub mod pool;
pub mod response_store;

pub use device_directory::SqliteDeviceDirectory;
pub use pool::{Config, Database};
pub use response_store::SqliteResponseStore;
