//! Card content rules: how an offense is rendered onto a card, and how an
//! archive copy is derived from a live card.
//!
//! Pure functions only; the engine decides when to call them.

use crate::{Card, CardSpec, LabelId, Offense, OffenseId, Timestamp};

/// Deck card type written for every card offense-deck creates.
pub const CARD_TYPE: &str = "plain";

/// Sort order written for new cards (sorts them after manually placed ones).
pub const CARD_ORDER: i64 = 999;

/// Separator placed between the original description and the notes on an
/// archive copy.
pub const NOTES_HEADING: &str = "\n\nNotes:\n";

/// Title of the card that tracks `offense`.
///
/// The title doubles as the lookup key for orphan adoption, so it must stay
/// stable across releases.
pub fn card_title(offense: OffenseId) -> String {
    format!("Offense ID {offense}")
}

/// Extracts the offense id from a card title produced by [`card_title`].
///
/// Only the exact canonical rendering matches, so `Offense ID 0100` or
/// `Offense ID +100` never resolve to offense 100.
pub fn parse_card_title(title: &str) -> Option<OffenseId> {
    let offense: OffenseId = title.strip_prefix("Offense ID ")?.parse().ok()?;
    (card_title(offense) == title).then_some(offense)
}

/// Renders the offense summary shown in a card description.
pub fn offense_description(offense: &Offense) -> String {
    let assignee = offense
        .assigned_to
        .as_ref()
        .map(|user| user.as_str())
        .unwrap_or("unassigned");

    [
        format!("This event has been triggered: {}", offense.event_count),
        format!("The user who handles this offense: {assignee}"),
        format!("Offense Source: {}", offense.offense_source),
        format!("Status: {}", offense.status),
        format!("Categories: {}", offense.categories.join(", ")),
        format!("Description: {}", offense.description),
        format!("Severity: {}", offense.severity),
        format!("Magnitude: {}", offense.magnitude),
    ]
    .join("\n")
}

/// Builds the spec of the card that starts tracking `offense`.
pub fn tracking_card(
    offense: &Offense,
    labels: Vec<LabelId>,
    now: Timestamp,
    due_in_hours: u32,
) -> CardSpec {
    CardSpec {
        title: card_title(offense.id),
        description: offense_description(offense),
        card_type: CARD_TYPE.to_string(),
        order: CARD_ORDER,
        due_date: Some(now.plus_hours(due_in_hours)),
        owner: offense.assigned_to.clone(),
        labels,
    }
}

/// Builds the archive copy of `card`: same immutable fields, the notes
/// appended to the description, and `finished` as the only label.
pub fn archive_card(card: &Card, notes: &[String], finished: LabelId) -> CardSpec {
    let mut description = card.description.clone();
    description.push_str(NOTES_HEADING);
    description.push_str(&notes.join("\n"));

    CardSpec {
        title: card.title.clone(),
        description,
        card_type: card.card_type.clone(),
        order: card.order,
        due_date: card.due_date,
        owner: card.owner.clone(),
        labels: vec![finished],
    }
}
