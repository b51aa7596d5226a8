//! Shared value types for the offense-deck domain.
//!
//! [`Offense`] is the read-only view of a QRadar offense; [`Card`] and
//! [`CardSpec`] describe Deck cards as read from and written to the board.
//! Adapters convert their wire payloads into these types; nothing here knows
//! about JSON field names or HTTP.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{CardId, LabelId, OffenseId, UserId};

// ---------------------------------------------------------------------------
// Offense
// ---------------------------------------------------------------------------

/// Open/closed state of an offense.
///
/// QRadar reports free text (`"OPEN"`, `"HIDDEN"`, `"CLOSED"`). Only `"OPEN"`
/// means open; every other value is treated as closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OffenseStatus {
    /// The offense is still being worked on the source side.
    Open,
    /// The offense was closed, hidden, or otherwise retired by the source.
    Closed,
}

impl OffenseStatus {
    /// Maps the source's status text onto the two-state model.
    pub fn from_source(text: &str) -> Self {
        if text == "OPEN" {
            Self::Open
        } else {
            Self::Closed
        }
    }

    /// Returns `true` for [`OffenseStatus::Open`].
    pub fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }
}

impl std::fmt::Display for OffenseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "OPEN"),
            Self::Closed => write!(f, "CLOSED"),
        }
    }
}

/// A security offense as reported by the incident source.
///
/// Created and mutated entirely by the source; offense-deck never writes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offense {
    pub id: OffenseId,
    pub status: OffenseStatus,
    /// Analyst the offense is assigned to, if any.
    pub assigned_to: Option<UserId>,
    /// Free-text description of the triggering source (IP, user name, ...).
    pub offense_source: String,
    pub categories: Vec<String>,
    pub description: String,
    pub severity: u32,
    pub magnitude: u32,
    pub event_count: u64,
}

// ---------------------------------------------------------------------------
// Card
// ---------------------------------------------------------------------------

/// A snapshot of a Deck card as read from the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub title: String,
    pub description: String,
    /// Deck card type; offense-deck always writes `"plain"`.
    pub card_type: String,
    pub order: i64,
    pub due_date: Option<Timestamp>,
    pub owner: Option<UserId>,
    pub labels: Vec<LabelId>,
}

/// Everything needed to create a card. The board assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardSpec {
    pub title: String,
    pub description: String,
    pub card_type: String,
    pub order: i64,
    pub due_date: Option<Timestamp>,
    pub owner: Option<UserId>,
    pub labels: Vec<LabelId>,
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly; the underlying representation can change without affecting the
/// domain API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a [`Timestamp`] from a [`DateTime<Utc>`].
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns this timestamp shifted forward by `hours`.
    pub fn plus_hours(self, hours: u32) -> Self {
        Self(self.0 + Duration::hours(i64::from(hours)))
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}
