//! Port trait for the incident source.
//!
//! The source is read-only from offense-deck's point of view: listing offenses
//! and reading notes never changes anything on the source side, so both calls
//! may be repeated freely.

use async_trait::async_trait;
use thiserror::Error;

use crate::{ErrorClass, Offense, OffenseId, RetryPolicy};

/// Read-only access to the offense feed.
#[async_trait]
pub trait SourceGateway: Send + Sync {
    /// Lists the offenses currently visible to offense-deck.
    ///
    /// The list is bounded by the adapter's paging window; offenses outside
    /// the window are simply absent.
    async fn list_offenses(&self) -> Result<Vec<Offense>, SourceError>;

    /// Returns the note texts attached to `offense`, in source order.
    ///
    /// Returns [`SourceError::OffenseDeleted`] when the source reports the
    /// offense as already deleted.
    async fn list_notes(&self, offense: OffenseId) -> Result<Vec<String>, SourceError>;
}

/// Errors produced by a [`SourceGateway`].
#[derive(Debug, Error)]
pub enum SourceError {
    /// The source answered with a non-success status.
    #[error("{endpoint} returned HTTP {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        /// Response body, kept verbatim for diagnostics.
        body: String,
    },

    /// The request never produced a response (DNS, TLS, timeout, ...).
    #[error("{endpoint} request failed: {message}")]
    Transport { endpoint: String, message: String },

    /// The response arrived but could not be decoded.
    #[error("{endpoint} returned an unreadable payload: {message}")]
    Decode { endpoint: String, message: String },

    /// The source refused to return notes because the offense is deleted.
    ///
    /// Expected during archival; the transition is skipped for the cycle.
    #[error("offense {offense} is already deleted on the source")]
    OffenseDeleted { offense: OffenseId },
}

impl SourceError {
    pub fn class(&self) -> ErrorClass {
        ErrorClass::SourceUnavailable
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::Retryable { after: None }
    }

    /// Returns `true` for the distinguished "already deleted" condition.
    pub fn is_offense_deleted(&self) -> bool {
        matches!(self, Self::OffenseDeleted { .. })
    }
}
