//! Deck JSON payloads.

use bridge::{Card, CardId, CardSpec, LabelId, Timestamp, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// `GET /boards/{id}`: only the labels are read.
#[derive(Debug, Deserialize)]
pub struct BoardPayload {
    #[serde(default)]
    pub labels: Vec<LabelPayload>,
}

#[derive(Debug, Deserialize)]
pub struct LabelPayload {
    pub id: u64,
    pub title: String,
}

/// `GET /boards/{id}/stacks/{stack}`. Deck omits `cards` on empty stacks.
#[derive(Debug, Deserialize)]
pub struct StackPayload {
    #[serde(default)]
    pub cards: Option<Vec<CardPayload>>,
}

/// Card owner: a plain uid on some endpoints, a user object on others.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum OwnerPayload {
    Uid(String),
    User { uid: String },
}

impl OwnerPayload {
    fn into_user(self) -> Option<UserId> {
        match self {
            Self::Uid(uid) | Self::User { uid } => UserId::new(uid),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CardPayload {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type", default)]
    pub card_type: String,
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub duedate: Option<String>,
    #[serde(default)]
    pub owner: Option<OwnerPayload>,
    #[serde(default)]
    pub labels: Option<Vec<LabelPayload>>,
}

impl CardPayload {
    pub fn into_card(self) -> Card {
        let due_date = self.duedate.as_deref().and_then(|raw| {
            match DateTime::parse_from_rfc3339(raw) {
                Ok(dt) => Some(Timestamp::from_utc(dt.with_timezone(&Utc))),
                Err(e) => {
                    warn!(card_id = self.id, duedate = raw, error = %e, "Ignoring unparseable due date");
                    None
                }
            }
        });

        Card {
            id: CardId::new(self.id),
            title: self.title,
            description: self.description.unwrap_or_default(),
            card_type: self.card_type,
            order: self.order,
            due_date,
            owner: self.owner.and_then(OwnerPayload::into_user),
            labels: self
                .labels
                .unwrap_or_default()
                .into_iter()
                .map(|l| LabelId::new(l.id))
                .collect(),
        }
    }
}

/// Body of `POST …/cards`.
#[derive(Debug, Serialize)]
pub struct CreateCardBody {
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub card_type: String,
    pub order: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duedate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    pub labels: Vec<u64>,
}

impl From<&CardSpec> for CreateCardBody {
    fn from(spec: &CardSpec) -> Self {
        Self {
            title: spec.title.clone(),
            description: spec.description.clone(),
            card_type: spec.card_type.clone(),
            order: spec.order,
            duedate: spec.due_date.map(|t| t.to_string()),
            owner: spec.owner.as_ref().map(|u| u.as_str().to_string()),
            labels: spec.labels.iter().map(|l| l.as_u64()).collect(),
        }
    }
}

/// Body of `POST /cards/{id}/comments`.
#[derive(Debug, Serialize)]
pub struct CommentBody {
    pub message: String,
    #[serde(rename = "parentId")]
    pub parent_id: Option<u64>,
}

impl CommentBody {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
            parent_id: None,
        }
    }
}
