//! Type definitions for reference identities.

use serde::{Deserialize, Serialize};

use crate::types::{Embedding, ReferenceId, Timestamp};

/// A known person's reference face signature.
///
/// Several references may share a `name` (one per registered reference
/// photo). References are append-only and never mutated once written.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReferenceIdentity {
    /// Unique identifier (UUID v7, time-ordered).
    pub id: ReferenceId,

    /// Person name.
    pub name: String,

    /// Normalized face signature (`D_face`).
    ///
    /// Stored as raw `f32` bytes in its own table.
    #[serde(skip)]
    pub signature: Embedding,

    /// When the reference was registered.
    pub created_at: Timestamp,
}

impl ReferenceIdentity {
    /// Creates a new reference with a fresh id.
    pub fn new(name: impl Into<String>, signature: Embedding) -> Self {
        Self {
            id: ReferenceId::new(),
            name: name.into(),
            signature,
            created_at: Timestamp::now(),
        }
    }
}

/// A known person and how many reference photos they have.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonSummary {
    /// Person name.
    pub name: String,

    /// Number of registered reference signatures.
    pub references: usize,
}

/// Outcome of registering one photo in a multi-photo registration.
#[derive(Debug)]
pub struct RegistrationOutcome {
    /// The photo that was registered.
    pub path: std::path::PathBuf,

    /// The new reference, or why registration failed.
    pub result: crate::error::Result<ReferenceId>,
}
