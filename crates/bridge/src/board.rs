//! Port trait for the ticketing board.
//!
//! Card creation and deletion mutate the board; label resolution and card
//! reads do not. Label ids must be re-resolved by every process because they
//! change when labels are edited on the board.

use async_trait::async_trait;
use thiserror::Error;

use crate::{Card, CardId, CardSpec, ErrorClass, LabelId, LabelName, RetryPolicy, StackId, UserId};

/// Access to one Deck board.
#[async_trait]
pub trait BoardGateway: Send + Sync {
    /// Looks up a label by exact title.
    ///
    /// Returns [`BoardError::LabelNotFound`] if no label carries that title.
    async fn resolve_label(&self, name: &LabelName) -> Result<LabelId, BoardError>;

    /// Creates a card on `stack` and returns the id the board assigned.
    async fn create_card(&self, stack: StackId, spec: &CardSpec) -> Result<CardId, BoardError>;

    /// Reads one card.
    async fn get_card(&self, stack: StackId, card: CardId) -> Result<Card, BoardError>;

    /// Deletes one card.
    async fn delete_card(&self, stack: StackId, card: CardId) -> Result<(), BoardError>;

    /// Lists the cards currently on `stack`.
    async fn list_cards(&self, stack: StackId) -> Result<Vec<Card>, BoardError>;

    /// Adds a comment to a card.
    async fn add_comment(&self, card: CardId, message: &str) -> Result<(), BoardError>;

    /// Assigns a user to a card.
    async fn assign_user(
        &self,
        stack: StackId,
        card: CardId,
        user: &UserId,
    ) -> Result<(), BoardError>;
}

/// Errors produced by a [`BoardGateway`].
#[derive(Debug, Error)]
pub enum BoardError {
    /// The board answered with a non-success status.
    #[error("{operation} returned HTTP {status}: {body}")]
    Status {
        operation: String,
        status: u16,
        /// Response body, kept verbatim for diagnostics.
        body: String,
    },

    /// The request never produced a response.
    #[error("{operation} request failed: {message}")]
    Transport { operation: String, message: String },

    /// The response arrived but could not be decoded.
    #[error("{operation} returned an unreadable payload: {message}")]
    Decode { operation: String, message: String },

    /// No label on the board has this title.
    #[error("label '{name}' not found on the board")]
    LabelNotFound { name: LabelName },

    /// The card does not exist (any more).
    #[error("card {card} not found on the board")]
    CardNotFound { card: CardId },
}

impl BoardError {
    pub fn class(&self) -> ErrorClass {
        ErrorClass::BoardUnavailable
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::Retryable { after: None }
    }
}
