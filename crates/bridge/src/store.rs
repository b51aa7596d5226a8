//! Port trait for the durable offense → card mapping.

use std::path::PathBuf;

use thiserror::Error;

use crate::{CardId, ErrorClass, MappingState, OffenseId, RetryPolicy};

/// Durable storage for [`MappingState`].
///
/// Only one engine may use a store at a time. Every method either completes
/// its write durably or returns an error; a later [`MappingStore::load`]
/// reflects exactly the writes that completed.
pub trait MappingStore: Send + Sync {
    /// Reads the full mapping. A store that was never written is empty.
    fn load(&self) -> Result<MappingState, StoreError>;

    /// Records that `card` now tracks `offense`.
    fn record(&self, offense: OffenseId, card: CardId) -> Result<(), StoreError>;

    /// Clears the live card id for `offense`, keeping a tombstone.
    fn tombstone(&self, offense: OffenseId) -> Result<(), StoreError>;
}

/// Errors produced by a [`MappingStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A persisted line could not be parsed.
    #[error("corrupt mapping entry at {path}:{line}: {reason}")]
    Corrupt {
        path: PathBuf,
        /// 1-based line number.
        line: usize,
        reason: String,
    },
}

impl StoreError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Io { .. } => ErrorClass::StoreUnavailable,
            Self::Corrupt { .. } => ErrorClass::DataCorruption,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            Self::Io { .. } => RetryPolicy::Retryable { after: None },
            Self::Corrupt { .. } => RetryPolicy::NonRetryable,
        }
    }
}
