//! offense-deck board adapter.
//!
//! Implements [`bridge::BoardGateway`] over the Nextcloud Deck REST API. All
//! requests use basic auth and the `OCS-APIRequest: true` header.
//!
//! | Operation | Endpoint |
//! |-----------|----------|
//! | resolve label | `GET  /index.php/apps/deck/api/v1.0/boards/{board}` |
//! | list cards | `GET  /index.php/apps/deck/api/v1.0/boards/{board}/stacks/{stack}` |
//! | create card | `POST /index.php/apps/deck/api/v1.0/boards/{board}/stacks/{stack}/cards` |
//! | get / delete card | `GET/DELETE …/stacks/{stack}/cards/{card}` |
//! | comment | `POST /ocs/v2.php/apps/deck/api/v1.0/cards/{card}/comments` |
//! | assign | `PUT  /index.php/apps/deck/api/v1.2/boards/{board}/stacks/{stack}/cards/{card}/assignUser` |
//!
//! Success is HTTP 200 (200 or 204 for delete). Everything else becomes a
//! [`BoardError`] carrying the response body.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** URL layout, payload shapes and status mapping live
//! here. The engine sees only [`bridge::BoardGateway`].

mod wire;

use std::time::Duration;

use async_trait::async_trait;
use bridge::{
    BoardError, BoardGateway, BoardId, Card, CardId, CardSpec, LabelId, LabelName, StackId, UserId,
};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use tracing::{debug, instrument};

pub use wire::{
    BoardPayload, CardPayload, CommentBody, CreateCardBody, LabelPayload, OwnerPayload, StackPayload,
};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Connection settings for one Deck board.
#[derive(Clone, Deserialize)]
pub struct DeckConfig {
    /// Nextcloud base URL, e.g. `https://cloud.example.com`.
    pub base_url: String,
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub board_id: BoardId,
    #[serde(default)]
    pub accept_invalid_certs: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl std::fmt::Debug for DeckConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeckConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("board_id", &self.board_id)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl DeckConfig {
    /// Checks values that would otherwise fail on the first request.
    pub fn validate(&self) -> Result<(), String> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(format!(
                "board.base_url must be an http(s) URL, got '{}'",
                self.base_url
            ));
        }
        if self.username.is_empty() {
            return Err("board.username must not be empty".to_string());
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// URL layout
// ---------------------------------------------------------------------------

/// Builds Deck endpoint URLs for one board.
#[derive(Debug, Clone)]
pub struct DeckUrls {
    base: String,
    board: BoardId,
}

impl DeckUrls {
    pub fn new(base_url: &str, board: BoardId) -> Self {
        Self {
            base: base_url.trim_end_matches('/').to_string(),
            board,
        }
    }

    pub fn board(&self) -> String {
        format!("{}/index.php/apps/deck/api/v1.0/boards/{}", self.base, self.board)
    }

    pub fn stack(&self, stack: StackId) -> String {
        format!("{}/stacks/{}", self.board(), stack)
    }

    pub fn cards(&self, stack: StackId) -> String {
        format!("{}/cards", self.stack(stack))
    }

    pub fn card(&self, stack: StackId, card: CardId) -> String {
        format!("{}/{}", self.cards(stack), card)
    }

    pub fn comments(&self, card: CardId) -> String {
        format!("{}/ocs/v2.php/apps/deck/api/v1.0/cards/{}/comments", self.base, card)
    }

    pub fn assign_user(&self, stack: StackId, card: CardId) -> String {
        format!(
            "{}/index.php/apps/deck/api/v1.2/boards/{}/stacks/{}/cards/{}/assignUser",
            self.base, self.board, stack, card
        )
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// [`BoardGateway`] implementation for one Deck board.
pub struct DeckClient {
    http: reqwest::Client,
    urls: DeckUrls,
    username: String,
    password: String,
}

impl DeckClient {
    /// Builds the HTTP client. Fails only if the TLS backend cannot start.
    pub fn new(config: DeckConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            urls: DeckUrls::new(&config.base_url, config.board_id),
            username: config.username,
            password: config.password,
        })
    }

    fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .basic_auth(&self.username, Some(&self.password))
            .header("OCS-APIRequest", "true")
            .header("Accept", "application/json")
    }

    /// Sends `request` and returns the body if the status is one of `ok`.
    async fn call(
        &self,
        operation: &str,
        request: reqwest::RequestBuilder,
        ok: &[StatusCode],
    ) -> Result<String, BoardError> {
        let response = request.send().await.map_err(|e| BoardError::Transport {
            operation: operation.to_string(),
            message: e.to_string(),
        })?;
        let status = response.status();
        let body = response.text().await.map_err(|e| BoardError::Transport {
            operation: operation.to_string(),
            message: e.to_string(),
        })?;

        if ok.contains(&status) {
            Ok(body)
        } else {
            Err(BoardError::Status {
                operation: operation.to_string(),
                status: status.as_u16(),
                body,
            })
        }
    }
}

/// Maps a 404 on a card endpoint onto [`BoardError::CardNotFound`].
fn card_not_found(card: CardId) -> impl FnOnce(BoardError) -> BoardError {
    move |err| match err {
        BoardError::Status { status: 404, .. } => BoardError::CardNotFound { card },
        other => other,
    }
}

fn decode<T: serde::de::DeserializeOwned>(operation: &str, body: &str) -> Result<T, BoardError> {
    serde_json::from_str(body).map_err(|e| BoardError::Decode {
        operation: operation.to_string(),
        message: e.to_string(),
    })
}

/// Finds a label id by exact title.
pub fn find_label(board: &BoardPayload, name: &LabelName) -> Option<LabelId> {
    board
        .labels
        .iter()
        .find(|label| label.title == name.as_str())
        .map(|label| LabelId::new(label.id))
}

#[async_trait]
impl BoardGateway for DeckClient {
    #[instrument(skip(self), fields(label = %name))]
    async fn resolve_label(&self, name: &LabelName) -> Result<LabelId, BoardError> {
        let operation = "GET board labels";
        let body = self
            .call(
                operation,
                self.request(Method::GET, &self.urls.board()),
                &[StatusCode::OK],
            )
            .await?;

        let board: BoardPayload = decode(operation, &body)?;
        let id = find_label(&board, name).ok_or_else(|| BoardError::LabelNotFound {
            name: name.clone(),
        })?;
        debug!(label_id = %id, "Resolved label");
        Ok(id)
    }

    #[instrument(skip(self, spec), fields(stack = %stack, title = %spec.title))]
    async fn create_card(&self, stack: StackId, spec: &CardSpec) -> Result<CardId, BoardError> {
        let operation = "POST card";
        let body = self
            .call(
                operation,
                self.request(Method::POST, &self.urls.cards(stack))
                    .json(&CreateCardBody::from(spec)),
                &[StatusCode::OK],
            )
            .await?;

        let created: CardPayload = decode(operation, &body)?;
        Ok(CardId::new(created.id))
    }

    #[instrument(skip(self), fields(stack = %stack, card_id = %card))]
    async fn get_card(&self, stack: StackId, card: CardId) -> Result<Card, BoardError> {
        let operation = "GET card";
        let body = self
            .call(
                operation,
                self.request(Method::GET, &self.urls.card(stack, card)),
                &[StatusCode::OK],
            )
            .await
            .map_err(card_not_found(card))?;

        let payload: CardPayload = decode(operation, &body)?;
        Ok(payload.into_card())
    }

    #[instrument(skip(self), fields(stack = %stack, card_id = %card))]
    async fn delete_card(&self, stack: StackId, card: CardId) -> Result<(), BoardError> {
        self.call(
            "DELETE card",
            self.request(Method::DELETE, &self.urls.card(stack, card)),
            &[StatusCode::OK, StatusCode::NO_CONTENT],
        )
        .await
        .map_err(card_not_found(card))?;
        Ok(())
    }

    #[instrument(skip(self), fields(stack = %stack))]
    async fn list_cards(&self, stack: StackId) -> Result<Vec<Card>, BoardError> {
        let operation = "GET stack";
        let body = self
            .call(
                operation,
                self.request(Method::GET, &self.urls.stack(stack)),
                &[StatusCode::OK],
            )
            .await?;

        let payload: StackPayload = decode(operation, &body)?;
        Ok(payload
            .cards
            .unwrap_or_default()
            .into_iter()
            .map(CardPayload::into_card)
            .collect())
    }

    #[instrument(skip(self, message), fields(card_id = %card))]
    async fn add_comment(&self, card: CardId, message: &str) -> Result<(), BoardError> {
        self.call(
            "POST comment",
            self.request(Method::POST, &self.urls.comments(card))
                .json(&CommentBody::new(message)),
            &[StatusCode::OK],
        )
        .await?;
        Ok(())
    }

    #[instrument(skip(self), fields(stack = %stack, card_id = %card, user = %user))]
    async fn assign_user(
        &self,
        stack: StackId,
        card: CardId,
        user: &UserId,
    ) -> Result<(), BoardError> {
        self.call(
            "PUT assignUser",
            self.request(Method::PUT, &self.urls.assign_user(stack, card))
                .json(&serde_json::json!({ "userId": user.as_str() })),
            &[StatusCode::OK],
        )
        .await?;
        Ok(())
    }
}
