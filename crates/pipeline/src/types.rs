//! Shared value types for the commit ingestion domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! meaningful values that participate in computations (timestamps are ordered,
//! change counts are summed).

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly. Serialises as an RFC 3339 / ISO-8601 string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Parses an RFC 3339 string carrying an explicit offset and normalises it to UTC.
    ///
    /// Returns `None` for strings without a timezone designator.
    pub fn parse_rfc3339(value: &str) -> Option<Self> {
        DateTime::<FixedOffset>::parse_from_rfc3339(value.trim())
            .ok()
            .map(|dt| Self(dt.with_timezone(&Utc)))
    }

    /// Returns the underlying [`DateTime<Utc>`].
    pub fn as_datetime(self) -> DateTime<Utc> {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

// ---------------------------------------------------------------------------
// Change counts
// ---------------------------------------------------------------------------

/// Line and file change counts of one commit.
///
/// All three counts use the same unsigned integer width so sums and means are
/// computed at one precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChangeCounts {
    /// Number of files touched by the commit.
    pub files_changed: u64,
    /// Lines added across all files.
    pub lines_added: u64,
    /// Lines deleted across all files.
    pub lines_deleted: u64,
}

impl ChangeCounts {
    /// `lines_added + lines_deleted`, saturating on overflow.
    pub fn total_changes(self) -> u64 {
        self.lines_added.saturating_add(self.lines_deleted)
    }
}

impl std::ops::AddAssign for ChangeCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.files_changed = self.files_changed.saturating_add(rhs.files_changed);
        self.lines_added = self.lines_added.saturating_add(rhs.lines_added);
        self.lines_deleted = self.lines_deleted.saturating_add(rhs.lines_deleted);
    }
}
