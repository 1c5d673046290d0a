//! Utility functions for run identifiers and timestamps.

mod timestamps;

pub use timestamps::{iso_timestamp, now_utc};

use uuid::Uuid;

/// Generates a new UUID v4.
#[must_use]
pub fn generate_uuid() -> Uuid {
    Uuid::new_v4()
}
