//! Transition planning.
//!
//! [`plan`] is a pure function of the current mapping and the current offense
//! listing. It decides what must happen this cycle; the [`crate::Engine`]
//! carries it out.
//!
//! Per offense the lifecycle is `UNSEEN → TRACKED(card) → ARCHIVED` and never
//! runs backwards:
//!
//! | Mapping slot | Offense status | Transition |
//! |--------------|----------------|------------|
//! | none | any | [`Transition::Create`] |
//! | `Live(card)` | open | none |
//! | `Live(card)` | closed | [`Transition::Archive`] |
//! | `Retired` | any | none |
//!
//! Tracked offenses missing from the listing get no transition: the source is
//! the status authority and absence is not evidence of closure.

use std::collections::HashSet;

use bridge::{CardId, CardSlot, MappingState, Offense, OffenseId};

/// One state change the engine must drive this cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// `UNSEEN → TRACKED`: create (or adopt) a card for the offense.
    Create(Offense),
    /// `TRACKED → ARCHIVED`: copy the card to the archive stack and retire it.
    Archive { offense: OffenseId, card: CardId },
}

impl Transition {
    pub fn offense_id(&self) -> OffenseId {
        match self {
            Self::Create(offense) => offense.id,
            Self::Archive { offense, .. } => *offense,
        }
    }
}

/// Computes this cycle's transitions, in listing order.
///
/// New and closing work are both planned every cycle. If the listing repeats
/// an offense id only its first occurrence counts.
pub fn plan(mapping: &MappingState, offenses: &[Offense]) -> Vec<Transition> {
    let mut seen = HashSet::new();
    offenses
        .iter()
        .filter(|offense| seen.insert(offense.id))
        .filter_map(|offense| match mapping.get(offense.id) {
            None => Some(Transition::Create(offense.clone())),
            Some(CardSlot::Live(card)) if !offense.status.is_open() => Some(Transition::Archive {
                offense: offense.id,
                card,
            }),
            Some(CardSlot::Live(_)) | Some(CardSlot::Retired) => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::offense;
    use bridge::OffenseStatus;

    #[test]
    fn test_empty_mapping_creates_every_listed_offense() {
        let offenses = vec![
            offense(1, OffenseStatus::Open),
            offense(2, OffenseStatus::Closed),
        ];
        let transitions = plan(&MappingState::new(), &offenses);
        assert_eq!(
            transitions,
            vec![
                Transition::Create(offenses[0].clone()),
                Transition::Create(offenses[1].clone()),
            ]
        );
    }

    #[test]
    fn test_new_and_closing_work_planned_in_the_same_cycle() {
        let mut mapping = MappingState::new();
        mapping.track(OffenseId::new(100), CardId::new(55));

        let offenses = vec![
            offense(100, OffenseStatus::Closed),
            offense(101, OffenseStatus::Open),
        ];
        let transitions = plan(&mapping, &offenses);
        assert_eq!(
            transitions,
            vec![
                Transition::Archive {
                    offense: OffenseId::new(100),
                    card: CardId::new(55),
                },
                Transition::Create(offenses[1].clone()),
            ]
        );
    }

    #[test]
    fn test_tracked_open_offense_needs_nothing() {
        let mut mapping = MappingState::new();
        mapping.track(OffenseId::new(100), CardId::new(55));
        assert!(plan(&mapping, &[offense(100, OffenseStatus::Open)]).is_empty());
    }

    #[test]
    fn test_retired_offense_is_never_recreated() {
        let mut mapping = MappingState::new();
        mapping.retire(OffenseId::new(100));
        assert!(plan(&mapping, &[offense(100, OffenseStatus::Closed)]).is_empty());
        assert!(plan(&mapping, &[offense(100, OffenseStatus::Open)]).is_empty());
    }

    #[test]
    fn test_vanished_tracked_offense_is_left_alone() {
        let mut mapping = MappingState::new();
        mapping.track(OffenseId::new(100), CardId::new(55));
        assert!(plan(&mapping, &[]).is_empty());
    }

    #[test]
    fn test_duplicate_listing_entries_plan_once() {
        let offenses = vec![
            offense(7, OffenseStatus::Open),
            offense(7, OffenseStatus::Open),
        ];
        assert_eq!(plan(&MappingState::new(), &offenses).len(), 1);
    }
}
