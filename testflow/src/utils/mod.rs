//! Timestamp and identifier helpers.

pub mod timestamps;

pub use timestamps::{duration_ms, iso_timestamp, now_utc, Timestamp};

/// Generates a new random run identifier.
#[must_use]
pub fn generate_run_id() -> uuid::Uuid {
    uuid::Uuid::new_v4()
}
