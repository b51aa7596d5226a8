//! Core domain for offense-deck.
//!
//! offense-deck mirrors open QRadar offenses as Nextcloud Deck cards and
//! archives each card once its offense closes. This crate contains every
//! domain concept, identifier, error type and port trait the reconciliation
//! engine works with. Adapter crates implement the traits defined here; they
//! never add domain rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* is needed; `qradar`, `deck` and `mapping-store` define
//! *how* to supply it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`OffenseId`, `CardId`, `LabelId`, ...) |
//! | [`types`] | `Offense`, `Card`, `CardSpec`, `Timestamp` |
//! | [`mapping`] | The offense → card mapping and its tombstones |
//! | [`card`] | Card title, description and archive-copy rules |
//! | [`source`] | `SourceGateway` port and `SourceError` |
//! | [`board`] | `BoardGateway` port and `BoardError` |
//! | [`store`] | `MappingStore` port and `StoreError` |
//! | [`errors`] | `BridgeError`, `ErrorClass`, `RetryPolicy` |

pub mod board;
pub mod card;
pub mod errors;
pub mod identifiers;
pub mod mapping;
pub mod source;
pub mod store;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use board::{BoardError, BoardGateway};
pub use errors::{BridgeError, ErrorClass, RetryPolicy};
pub use identifiers::{BoardId, CardId, CycleId, LabelId, LabelName, OffenseId, StackId, UserId};
pub use mapping::{CardSlot, MappingEntry, MappingState};
pub use source::{SourceError, SourceGateway};
pub use store::{MappingStore, StoreError};
pub use types::{Card, CardSpec, Offense, OffenseStatus, Timestamp};
