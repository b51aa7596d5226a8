//! In-memory doubles for the three ports, used by the engine tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use bridge::{
    BoardError, BoardGateway, Card, CardId, CardSpec, LabelId, LabelName, MappingState,
    MappingStore, Offense, OffenseId, OffenseStatus, SourceError, SourceGateway, StackId,
    StoreError, UserId,
};

pub const ACTIVE: StackId = StackId::new(4);
pub const ARCHIVE: StackId = StackId::new(5);
pub const ACTION_NEEDED: LabelId = LabelId::new(1);
pub const FINISHED: LabelId = LabelId::new(2);

pub fn offense(id: u64, status: OffenseStatus) -> Offense {
    Offense {
        id: OffenseId::new(id),
        status,
        assigned_to: UserId::new("alice"),
        offense_source: "10.0.0.5".to_string(),
        categories: vec!["Brute Force".to_string()],
        description: format!("offense {id}"),
        severity: 5,
        magnitude: 3,
        event_count: 12,
    }
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct SourceState {
    pub offenses: Vec<Offense>,
    pub notes: HashMap<OffenseId, Vec<String>>,
    pub deleted: HashSet<OffenseId>,
    pub fail_listing: bool,
    pub fail_notes: bool,
}

#[derive(Default)]
pub struct FakeSource {
    pub state: Mutex<SourceState>,
}

impl FakeSource {
    pub fn with_offenses(offenses: Vec<Offense>) -> Self {
        let source = Self::default();
        source.state.lock().unwrap().offenses = offenses;
        source
    }

    pub fn set_offenses(&self, offenses: Vec<Offense>) {
        self.state.lock().unwrap().offenses = offenses;
    }
}

#[async_trait]
impl SourceGateway for FakeSource {
    async fn list_offenses(&self) -> Result<Vec<Offense>, SourceError> {
        let state = self.state.lock().unwrap();
        if state.fail_listing {
            return Err(SourceError::Status {
                endpoint: "GET /offenses".to_string(),
                status: 503,
                body: "maintenance".to_string(),
            });
        }
        Ok(state.offenses.clone())
    }

    async fn list_notes(&self, offense: OffenseId) -> Result<Vec<String>, SourceError> {
        let state = self.state.lock().unwrap();
        if state.deleted.contains(&offense) {
            return Err(SourceError::OffenseDeleted { offense });
        }
        if state.fail_notes {
            return Err(SourceError::Transport {
                endpoint: format!("GET /offenses/{offense}/notes"),
                message: "connection reset".to_string(),
            });
        }
        Ok(state.notes.get(&offense).cloned().unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Board
// ---------------------------------------------------------------------------

pub struct BoardState {
    pub labels: HashMap<String, LabelId>,
    pub cards: BTreeMap<CardId, (StackId, Card)>,
    pub next_id: u64,
    /// Names of every gateway method called, in order.
    pub calls: Vec<&'static str>,
    pub comments: Vec<(CardId, String)>,
    pub assignments: Vec<(CardId, UserId)>,
    /// Card titles whose creation fails.
    pub fail_create: HashSet<String>,
    pub fail_comment: bool,
    pub fail_assign: bool,
    pub fail_delete: bool,
    pub fail_list: bool,
}

impl Default for BoardState {
    fn default() -> Self {
        Self {
            labels: HashMap::from([
                ("Action needed".to_string(), ACTION_NEEDED),
                ("Finished".to_string(), FINISHED),
            ]),
            cards: BTreeMap::new(),
            next_id: 1000,
            calls: Vec::new(),
            comments: Vec::new(),
            assignments: Vec::new(),
            fail_create: HashSet::new(),
            fail_comment: false,
            fail_assign: false,
            fail_delete: false,
            fail_list: false,
        }
    }
}

#[derive(Default)]
pub struct FakeBoard {
    pub state: Mutex<BoardState>,
}

fn http_500(operation: &str) -> BoardError {
    BoardError::Status {
        operation: operation.to_string(),
        status: 500,
        body: "internal error".to_string(),
    }
}

impl FakeBoard {
    /// Places an existing card on `stack`.
    pub fn insert_card(&self, stack: StackId, id: u64, title: &str, description: &str) -> CardId {
        let card = Card {
            id: CardId::new(id),
            title: title.to_string(),
            description: description.to_string(),
            card_type: "plain".to_string(),
            order: 999,
            due_date: None,
            owner: UserId::new("alice"),
            labels: vec![ACTION_NEEDED, FINISHED],
        };
        self.state
            .lock()
            .unwrap()
            .cards
            .insert(card.id, (stack, card));
        CardId::new(id)
    }

    pub fn cards_on(&self, stack: StackId) -> Vec<Card> {
        self.state
            .lock()
            .unwrap()
            .cards
            .values()
            .filter(|(s, _)| *s == stack)
            .map(|(_, c)| c.clone())
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }

    pub fn calls_to(&self, name: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| **c == name)
            .count()
    }
}

#[async_trait]
impl BoardGateway for FakeBoard {
    async fn resolve_label(&self, name: &LabelName) -> Result<LabelId, BoardError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("resolve_label");
        state
            .labels
            .get(name.as_str())
            .copied()
            .ok_or_else(|| BoardError::LabelNotFound { name: name.clone() })
    }

    async fn create_card(&self, stack: StackId, spec: &CardSpec) -> Result<CardId, BoardError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("create_card");
        if state.fail_create.contains(&spec.title) {
            return Err(http_500("POST card"));
        }
        let id = CardId::new(state.next_id);
        state.next_id += 1;
        let card = Card {
            id,
            title: spec.title.clone(),
            description: spec.description.clone(),
            card_type: spec.card_type.clone(),
            order: spec.order,
            due_date: spec.due_date,
            owner: spec.owner.clone(),
            labels: spec.labels.clone(),
        };
        state.cards.insert(id, (stack, card));
        Ok(id)
    }

    async fn get_card(&self, stack: StackId, card: CardId) -> Result<Card, BoardError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("get_card");
        match state.cards.get(&card) {
            Some((s, c)) if *s == stack => Ok(c.clone()),
            _ => Err(BoardError::CardNotFound { card }),
        }
    }

    async fn delete_card(&self, _stack: StackId, card: CardId) -> Result<(), BoardError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("delete_card");
        if state.fail_delete {
            return Err(http_500("DELETE card"));
        }
        state
            .cards
            .remove(&card)
            .map(|_| ())
            .ok_or(BoardError::CardNotFound { card })
    }

    async fn list_cards(&self, stack: StackId) -> Result<Vec<Card>, BoardError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("list_cards");
        if state.fail_list {
            return Err(http_500("GET stack"));
        }
        Ok(state
            .cards
            .values()
            .filter(|(s, _)| *s == stack)
            .map(|(_, c)| c.clone())
            .collect())
    }

    async fn add_comment(&self, card: CardId, message: &str) -> Result<(), BoardError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("add_comment");
        if state.fail_comment {
            return Err(http_500("POST comment"));
        }
        state.comments.push((card, message.to_string()));
        Ok(())
    }

    async fn assign_user(
        &self,
        _stack: StackId,
        card: CardId,
        user: &UserId,
    ) -> Result<(), BoardError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("assign_user");
        if state.fail_assign {
            return Err(http_500("PUT assignUser"));
        }
        state.assignments.push((card, user.clone()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct StoreState {
    pub mapping: MappingState,
    pub corrupt: bool,
    pub fail_writes: bool,
}

#[derive(Default)]
pub struct MemoryStore {
    pub state: Mutex<StoreState>,
}

impl MemoryStore {
    pub fn with_mapping(mapping: MappingState) -> Self {
        let store = Self::default();
        store.state.lock().unwrap().mapping = mapping;
        store
    }

    pub fn mapping(&self) -> MappingState {
        self.state.lock().unwrap().mapping.clone()
    }

    fn write_error() -> StoreError {
        StoreError::Io {
            path: PathBuf::from("memory"),
            source: std::io::Error::other("disk full"),
        }
    }
}

impl MappingStore for MemoryStore {
    fn load(&self) -> Result<MappingState, StoreError> {
        let state = self.state.lock().unwrap();
        if state.corrupt {
            return Err(StoreError::Corrupt {
                path: PathBuf::from("memory"),
                line: 3,
                reason: "expected 2 comma-separated fields, found 1".to_string(),
            });
        }
        Ok(state.mapping.clone())
    }

    fn record(&self, offense: OffenseId, card: CardId) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_writes {
            return Err(Self::write_error());
        }
        state.mapping.track(offense, card);
        Ok(())
    }

    fn tombstone(&self, offense: OffenseId) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_writes {
            return Err(Self::write_error());
        }
        state.mapping.retire(offense);
        Ok(())
    }
}
