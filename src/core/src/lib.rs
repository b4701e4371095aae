//! # Warden Core
//!
//! Shared types, the clock abstraction, and error handling for the Warden
//! governance crates. Kept dependency-light so vault, authz and archive can
//! all build on it without depending on each other.

pub mod clock;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use error::{CoreError, Result};
pub use types::{add_days, ActorId, ArchiveId, SECONDS_PER_DAY};
