//! Core type definitions for PixRecall identifiers and timestamps.
//!
//! All ID types use UUID v7 for time-ordered unique identification.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Photo record identifier (UUID v7 for time-ordering).
///
/// Each successfully ingested image gets exactly one `PhotoId`. Ingesting
/// the same file twice produces two independent records.
///
/// # Example
/// ```
/// use pixrecall::PhotoId;
///
/// let id = PhotoId::new();
/// println!("Stored photo: {}", id);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PhotoId(pub Uuid);

impl PhotoId {
    /// Creates a new PhotoId with a UUID v7 (time-ordered).
    #[inline]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a nil (all zeros) PhotoId.
    #[inline]
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }

    /// Returns the raw UUID bytes for storage.
    #[inline]
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    /// Creates a PhotoId from raw bytes.
    #[inline]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }
}

impl Default for PhotoId {
    /// Returns a nil (all zeros) PhotoId.
    ///
    /// For a new unique ID, use [`PhotoId::new()`].
    fn default() -> Self {
        Self::nil()
    }
}

impl fmt::Display for PhotoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reference face identifier (UUID v7 for time-ordering).
///
/// One per registered reference photo; several may share a person name.
/// Because v7 UUIDs sort by creation time, scanning the reference table in
/// key order replays registrations in the order they happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReferenceId(pub Uuid);

impl ReferenceId {
    /// Creates a new ReferenceId with a UUID v7 (time-ordered).
    #[inline]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Returns the raw UUID bytes for storage.
    #[inline]
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    /// Creates a ReferenceId from raw bytes.
    #[inline]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }
}

impl Default for ReferenceId {
    fn default() -> Self {
        Self(Uuid::nil())
    }
}

impl fmt::Display for ReferenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unix timestamp in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Creates a timestamp for the current moment.
    ///
    /// If the system clock is before the Unix epoch, returns a timestamp
    /// of 0 rather than panicking.
    #[inline]
    pub fn now() -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self(duration.as_millis() as i64)
    }

    /// Creates a timestamp from Unix milliseconds.
    #[inline]
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as Unix milliseconds.
    #[inline]
    pub const fn as_millis(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Embedding vector type alias.
///
/// Used for both face signatures (`D_face`) and semantic image/text
/// embeddings (`D_image`). The two spaces are never compared to each other.
pub type Embedding = Vec<f32>;
