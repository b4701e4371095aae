//! # Warden Archive
//!
//! Encrypted, retention-bounded snapshots of directory trees.
//!
//! ## Components
//!
//! - **ResourceArchiver**: gzip tar bundles, optional AES-256-GCM sealing via a
//!   [`KeyCustodian`](warden_vault::KeyCustodian), durable placement, metadata rows
//! - **RetentionSweeper**: idempotent removal of expired artifacts, keys and rows
//! - **run_maintenance**: the scheduled archive-then-sweep job
//!
//! ## Stores
//!
//! ```text
//! archive/
//! ├── store/     - ArchiveStore trait + in-memory store
//! └── postgres/  - PostgreSQL store (feature "postgres")
//! ```

pub mod archiver;
pub mod bundle;
pub mod config;
pub mod error;
pub mod maintenance;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod store;
pub mod sweeper;
pub mod types;

pub use archiver::ResourceArchiver;
pub use config::ArchiveConfig;
pub use error::{ArchiveError, Result};
pub use maintenance::{run_maintenance, MaintenanceReport};
#[cfg(feature = "postgres")]
pub use postgres::PostgresArchiveStore;
pub use store::{ArchiveStore, InMemoryArchiveStore};
pub use sweeper::{RetentionSweeper, SweepReport, SweeperConfig};
pub use types::{AccessLevel, Archive, ArchiveFilter, ArchiveOptions, ArchiveType};
