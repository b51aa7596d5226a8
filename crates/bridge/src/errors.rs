//! Top-level error, error-class and retry-policy types.
//!
//! [`BridgeError`] is what a reconciliation cycle returns when it has to be
//! abandoned as a whole. Component-level errors ([`crate::SourceError`],
//! [`crate::BoardError`], [`crate::StoreError`]) are defined beside the port
//! traits that produce them.
//!
//! Every error type can report its [`ErrorClass`] (how the engine reacts) and
//! its [`RetryPolicy`] (whether the next cycle may try again).

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{SourceError, StoreError};

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether an error condition is safe to retry and, if so, after what delay.
///
/// offense-deck never retries inside a cycle; a retryable failure is simply
/// attempted again on the next scheduled cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// The operation may be retried on a later cycle.
    Retryable {
        /// Minimum back-off before the next attempt. `None` means the regular
        /// polling interval applies.
        after: Option<Duration>,
    },
    /// Retrying cannot help; an operator must intervene.
    NonRetryable,
}

// ---------------------------------------------------------------------------
// Error classes
// ---------------------------------------------------------------------------

/// How the engine reacts to a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Listing offenses or fetching notes failed. The cycle (or transition)
    /// is abandoned without touching the mapping.
    SourceUnavailable,
    /// A board call needed for a transition failed. Only that offense's
    /// transition is abandoned.
    BoardUnavailable,
    /// The mapping file is malformed. Fatal for the cycle.
    DataCorruption,
    /// The mapping file could not be read or written. Fatal for the cycle;
    /// the next cycle tries again.
    StoreUnavailable,
    /// The runtime configuration is invalid. The process does not start.
    Configuration,
    /// A best-effort enrichment (comment, assignment, delete after archive)
    /// failed. Logged; committed state is kept.
    BestEffortFailure,
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::SourceUnavailable => "source_unavailable",
            Self::BoardUnavailable => "board_unavailable",
            Self::DataCorruption => "data_corruption",
            Self::StoreUnavailable => "store_unavailable",
            Self::Configuration => "configuration",
            Self::BestEffortFailure => "best_effort_failure",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Cycle-level errors
// ---------------------------------------------------------------------------

/// Errors that abandon a whole reconciliation cycle, or stop the process
/// before the first cycle.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The offense listing could not be fetched.
    #[error("Incident source unavailable: {0}")]
    Source(#[from] SourceError),

    /// The mapping store could not be read or written.
    #[error("Mapping store failure: {0}")]
    Store(#[from] StoreError),

    /// The runtime configuration is invalid.
    ///
    /// Produced at load time; the process never starts with an invalid config.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },
}

impl BridgeError {
    /// Returns the engine-facing class of this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Source(e) => e.class(),
            Self::Store(e) => e.class(),
            Self::Configuration { .. } => ErrorClass::Configuration,
        }
    }

    /// Returns whether the next cycle may try again.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            Self::Source(e) => e.retry_policy(),
            Self::Store(e) => e.retry_policy(),
            Self::Configuration { .. } => RetryPolicy::NonRetryable,
        }
    }
}
