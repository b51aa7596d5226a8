//! The offense → card mapping: the only state offense-deck owns.
//!
//! Every offense the engine has ever acted on has exactly one [`CardSlot`].
//! A slot starts [`CardSlot::Live`] when a card is created and becomes
//! [`CardSlot::Retired`] (a tombstone) once the card has been archived. A
//! retired slot is never made live again.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{CardId, OffenseId};

/// What the mapping knows about one offense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardSlot {
    /// A card tracks the offense on the active stack.
    Live(CardId),
    /// The offense was archived; its card id has been cleared.
    Retired,
}

impl CardSlot {
    /// Returns the live card id, or `None` for a tombstone.
    pub fn live_card(self) -> Option<CardId> {
        match self {
            Self::Live(card) => Some(card),
            Self::Retired => None,
        }
    }
}

/// One persisted (offense, card) association.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MappingEntry {
    pub offense: OffenseId,
    pub slot: CardSlot,
}

/// The full mapping, keyed by offense id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingState {
    entries: BTreeMap<OffenseId, CardSlot>,
}

impl MappingState {
    /// Creates an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one entry; later entries for the same offense win.
    pub fn apply(&mut self, entry: MappingEntry) {
        self.entries.insert(entry.offense, entry.slot);
    }

    /// Returns the slot recorded for `offense`, if any.
    pub fn get(&self, offense: OffenseId) -> Option<CardSlot> {
        self.entries.get(&offense).copied()
    }

    /// Returns the live card tracking `offense`, if any.
    pub fn live_card(&self, offense: OffenseId) -> Option<CardId> {
        self.get(offense).and_then(CardSlot::live_card)
    }

    /// Returns `true` if the offense has ever been tracked (live or retired).
    pub fn is_known(&self, offense: OffenseId) -> bool {
        self.entries.contains_key(&offense)
    }

    /// Records a live card for `offense`.
    pub fn track(&mut self, offense: OffenseId, card: CardId) {
        self.entries.insert(offense, CardSlot::Live(card));
    }

    /// Tombstones `offense`. Unknown offenses are tombstoned too, so that a
    /// retired offense can never be picked up as new.
    pub fn retire(&mut self, offense: OffenseId) {
        self.entries.insert(offense, CardSlot::Retired);
    }

    /// Iterates over `(offense, card)` for every live entry.
    pub fn live_entries(&self) -> impl Iterator<Item = (OffenseId, CardId)> + '_ {
        self.entries
            .iter()
            .filter_map(|(offense, slot)| slot.live_card().map(|card| (*offense, card)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<MappingEntry> for MappingState {
    fn from_iter<I: IntoIterator<Item = MappingEntry>>(iter: I) -> Self {
        let mut state = Self::new();
        for entry in iter {
            state.apply(entry);
        }
        state
    }
}
