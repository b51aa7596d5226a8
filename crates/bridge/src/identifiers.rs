//! Newtype domain identifiers.
//!
//! Offense ids, card ids, label ids and stack ids are all plain integers on the
//! wire. Each gets its own newtype so an [`OffenseId`] can never be handed to
//! an operation expecting a [`CardId`], even though both are `u64` under the
//! hood.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Macro for u64-wrapped newtypes (ids assigned by QRadar or Deck).
// Generates: struct (Copy), new(), as_u64(), Display, FromStr.
// ---------------------------------------------------------------------------
macro_rules! u64_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Creates a new identifier from a raw integer.
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            /// Returns the underlying integer value.
            pub fn as_u64(self) -> u64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<u64>().map(Self)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Identifiers: source-assigned
// ---------------------------------------------------------------------------

u64_id! {
    /// Identifies a QRadar offense.
    ///
    /// Stable for the lifetime of the offense; never reused by the source.
    OffenseId
}

// ---------------------------------------------------------------------------
// Identifiers: board-assigned
// ---------------------------------------------------------------------------

u64_id! {
    /// Identifies a Deck card. Assigned by the board on creation.
    CardId
}

u64_id! {
    /// Identifies a Deck label within one board.
    ///
    /// Label ids change when labels are edited on the board, so they are
    /// resolved from names at runtime and never persisted.
    LabelId
}

u64_id! {
    /// Identifies a Deck stack (column) within one board.
    StackId
}

u64_id! {
    /// Identifies a Deck board.
    BoardId
}

// ---------------------------------------------------------------------------
// Identifiers: UUID-backed (internally generated)
// ---------------------------------------------------------------------------

/// Identifies a single reconciliation cycle.
///
/// Generated fresh for every cycle and attached to the cycle's tracing span so
/// every board and source call made during that cycle can be correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CycleId(Uuid);

impl CycleId {
    /// Generates a new random cycle identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for CycleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Identifiers: String-backed
// ---------------------------------------------------------------------------

string_id! {
    /// A Nextcloud user id, as used for card ownership and assignment.
    ///
    /// The offense's `assigned_to` field is mapped onto this verbatim.
    UserId
}

string_id! {
    /// The human-readable title of a board label (e.g. `"Action needed"`).
    LabelName
}
