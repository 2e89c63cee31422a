//! Per-stage results for the ingestion pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::PixRecallError;

/// The stages that degrade instead of failing, in execution order.
///
/// Persisting is not listed: a failed write fails the whole image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Face detection and identity resolution.
    Identify,
    /// Semantic image embedding.
    Embed,
    /// Caption generation.
    Caption,
}

impl Stage {
    /// Stage name used in logs and reports.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Identify => "identify",
            Self::Embed => "embed",
            Self::Caption => "caption",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of one pipeline stage.
///
/// A stage either completes with its value or degrades to a fallback value
/// plus the reason. Either way the pipeline carries on with the value.
#[derive(Clone, Debug, PartialEq)]
pub enum StageOutcome<T> {
    /// The stage produced its value.
    Completed(T),

    /// The stage failed and fell back to a default.
    Degraded {
        /// The fallback value.
        value: T,
        /// Why the stage failed.
        reason: String,
    },
}

impl<T> StageOutcome<T> {
    /// Completes with the value, or degrades to `fallback` on error.
    pub fn from_result(result: Result<T, PixRecallError>, fallback: impl FnOnce() -> T) -> Self {
        match result {
            Ok(value) => Self::Completed(value),
            Err(err) => Self::Degraded {
                value: fallback(),
                reason: err.to_string(),
            },
        }
    }

    /// Returns true if the stage fell back.
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    /// The failure reason, if degraded.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Completed(_) => None,
            Self::Degraded { reason, .. } => Some(reason),
        }
    }

    /// Borrows the carried value.
    pub fn value(&self) -> &T {
        match self {
            Self::Completed(value) | Self::Degraded { value, .. } => value,
        }
    }

    /// Splits into the value and an optional degraded-stage record.
    pub fn into_parts(self, stage: Stage) -> (T, Option<DegradedStage>) {
        match self {
            Self::Completed(value) => (value, None),
            Self::Degraded { value, reason } => (value, Some(DegradedStage { stage, reason })),
        }
    }
}

/// A stage that fell back during ingestion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegradedStage {
    /// Which stage.
    pub stage: Stage,
    /// Why it failed.
    pub reason: String,
}

impl From<DegradedStage> for PixRecallError {
    fn from(degraded: DegradedStage) -> Self {
        PixRecallError::stage_degraded(degraded.stage.name(), degraded.reason)
    }
}
