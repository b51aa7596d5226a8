//! offense-deck incident source adapter.
//!
//! Implements [`bridge::SourceGateway`] over the QRadar SIEM REST API:
//!
//! - `GET {base}/api/siem/offenses`: one page selected by the `Range` header
//!   (`items=0-{page_size - 1}`).
//! - `GET {base}/api/siem/offenses/{id}/notes`: notes in source order. A 403
//!   whose JSON body carries `"message": "Card is deleted"` is reported as
//!   [`SourceError::OffenseDeleted`].
//!
//! Every request carries the `SEC` API token and the `Version` header; basic
//! auth is added when a username is configured.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** HTTP transport, headers and payload decoding live here.
//! The engine sees only [`bridge::SourceGateway`].

use std::time::Duration;

use async_trait::async_trait;
use bridge::{Offense, OffenseId, OffenseStatus, SourceError, SourceGateway, UserId};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

/// Message QRadar puts in a 403 body when the offense was deleted.
pub const DELETED_MESSAGE: &str = "Card is deleted";

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Connection settings for one QRadar console.
#[derive(Clone, Deserialize)]
pub struct QRadarConfig {
    /// Console base URL, e.g. `https://qradar.example.com`.
    pub base_url: String,
    /// Authorized service token sent in the `SEC` header.
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Number of offenses requested per poll.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Value of the `Version` header.
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Skips TLS certificate verification. Only for consoles with
    /// self-signed certificates.
    #[serde(default)]
    pub accept_invalid_certs: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_page_size() -> u32 {
    50
}

fn default_api_version() -> String {
    "12.0".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl std::fmt::Debug for QRadarConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QRadarConfig")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .field("username", &self.username)
            .field("page_size", &self.page_size)
            .field("api_version", &self.api_version)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl QRadarConfig {
    /// Value of the `Range` header selecting the first page.
    pub fn range_header(&self) -> String {
        format!("items=0-{}", self.page_size.saturating_sub(1))
    }

    /// Checks values that would otherwise fail on the first request.
    pub fn validate(&self) -> Result<(), String> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(format!(
                "source.base_url must be an http(s) URL, got '{}'",
                self.base_url
            ));
        }
        if self.page_size == 0 {
            return Err("source.page_size must be at least 1".to_string());
        }
        if self.token.is_empty() && self.username.is_none() {
            return Err("source needs a SEC token or a username".to_string());
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// The subset of a QRadar offense payload offense-deck reads.
#[derive(Debug, Deserialize)]
pub struct OffensePayload {
    pub id: u64,
    pub status: String,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub offense_source: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub severity: u32,
    #[serde(default)]
    pub magnitude: u32,
    #[serde(default)]
    pub event_count: u64,
}

impl From<OffensePayload> for Offense {
    fn from(p: OffensePayload) -> Self {
        Offense {
            id: OffenseId::new(p.id),
            status: OffenseStatus::from_source(&p.status),
            assigned_to: p.assigned_to.and_then(UserId::new),
            offense_source: p.offense_source,
            categories: p.categories,
            // QRadar descriptions end with a newline.
            description: p.description.trim_end().to_string(),
            severity: p.severity,
            magnitude: p.magnitude,
            event_count: p.event_count,
        }
    }
}

/// One offense note.
#[derive(Debug, Deserialize)]
pub struct NotePayload {
    pub note_text: String,
}

#[derive(Debug, Deserialize)]
struct MessageBody {
    message: Option<String>,
}

/// Returns `true` if a notes response means "offense already deleted".
pub fn is_deleted_response(status: u16, body: &str) -> bool {
    status == StatusCode::FORBIDDEN.as_u16()
        && serde_json::from_str::<MessageBody>(body)
            .ok()
            .and_then(|b| b.message)
            .is_some_and(|m| m == DELETED_MESSAGE)
}

/// Decodes an offense listing.
pub fn parse_offenses(endpoint: &str, body: &str) -> Result<Vec<Offense>, SourceError> {
    let payloads: Vec<OffensePayload> =
        serde_json::from_str(body).map_err(|e| SourceError::Decode {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })?;
    Ok(payloads.into_iter().map(Offense::from).collect())
}

/// Decodes a notes listing, keeping source order.
pub fn parse_notes(endpoint: &str, body: &str) -> Result<Vec<String>, SourceError> {
    let notes: Vec<NotePayload> = serde_json::from_str(body).map_err(|e| SourceError::Decode {
        endpoint: endpoint.to_string(),
        message: e.to_string(),
    })?;
    Ok(notes.into_iter().map(|n| n.note_text).collect())
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// [`SourceGateway`] implementation for one QRadar console.
pub struct QRadarClient {
    http: reqwest::Client,
    config: QRadarConfig,
}

impl QRadarClient {
    /// Builds the HTTP client. Fails only if the TLS backend cannot start.
    pub fn new(config: QRadarConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { http, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/siem{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        let mut request = self
            .http
            .get(url)
            .header("Version", &self.config.api_version)
            .header("Accept", "application/json");
        if !self.config.token.is_empty() {
            request = request.header("SEC", &self.config.token);
        }
        if let Some(username) = &self.config.username {
            request = request.basic_auth(username, self.config.password.as_deref());
        }
        request
    }

    /// Sends `request` and returns `(status, body)`.
    async fn send(
        &self,
        endpoint: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<(u16, String), SourceError> {
        let response = request.send().await.map_err(|e| SourceError::Transport {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| SourceError::Transport {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })?;
        Ok((status, body))
    }
}

#[async_trait]
impl SourceGateway for QRadarClient {
    #[instrument(skip(self))]
    async fn list_offenses(&self) -> Result<Vec<Offense>, SourceError> {
        let endpoint = "GET /offenses";
        let request = self
            .get(&self.url("/offenses"))
            .header("Range", self.config.range_header());

        let (status, body) = self.send(endpoint, request).await?;
        if !(200..300).contains(&status) {
            warn!(status, "Offense listing failed");
            return Err(SourceError::Status {
                endpoint: endpoint.to_string(),
                status,
                body,
            });
        }

        let offenses = parse_offenses(endpoint, &body)?;
        debug!(count = offenses.len(), "Fetched offenses");
        Ok(offenses)
    }

    #[instrument(skip(self), fields(offense_id = %offense))]
    async fn list_notes(&self, offense: OffenseId) -> Result<Vec<String>, SourceError> {
        let endpoint = format!("GET /offenses/{offense}/notes");
        let request = self.get(&self.url(&format!("/offenses/{offense}/notes")));

        let (status, body) = self.send(&endpoint, request).await?;
        if is_deleted_response(status, &body) {
            return Err(SourceError::OffenseDeleted { offense });
        }
        if status != StatusCode::OK.as_u16() {
            return Err(SourceError::Status {
                endpoint,
                status,
                body,
            });
        }

        parse_notes(&endpoint, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> QRadarConfig {
        config_from_json(r#"{"base_url": "https://qradar.local", "token": "abc"}"#)
    }

    fn config_from_json(json: &str) -> QRadarConfig {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_config_defaults() {
        let c = config();
        assert_eq!(c.page_size, 50);
        assert_eq!(c.api_version, "12.0");
        assert!(!c.accept_invalid_certs);
        assert_eq!(c.range_header(), "items=0-49");
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut c = config();
        c.page_size = 0;
        assert!(c.validate().is_err());

        let mut c = config();
        c.base_url = "qradar.local".to_string();
        assert!(c.validate().is_err());

        let mut c = config();
        c.token.clear();
        assert!(c.validate().is_err());
        c.username = Some("svc".to_string());
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_debug_redacts_token() {
        let rendered = format!("{:?}", config());
        assert!(!rendered.contains("abc"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_parse_offenses_maps_fields() {
        let body = r#"[
            {
                "id": 100,
                "status": "OPEN",
                "assigned_to": "alice",
                "offense_source": "10.0.0.5",
                "categories": ["Brute Force"],
                "description": "Multiple login failures\n",
                "severity": 7,
                "magnitude": 5,
                "event_count": 42,
                "follow_up": false
            },
            {"id": 101, "status": "HIDDEN", "assigned_to": null}
        ]"#;

        let offenses = parse_offenses("GET /offenses", body).unwrap();
        assert_eq!(offenses.len(), 2);

        let first = &offenses[0];
        assert_eq!(first.id, OffenseId::new(100));
        assert_eq!(first.status, OffenseStatus::Open);
        assert_eq!(first.assigned_to, UserId::new("alice"));
        assert_eq!(first.description, "Multiple login failures");
        assert_eq!(first.event_count, 42);

        let second = &offenses[1];
        assert_eq!(second.status, OffenseStatus::Closed);
        assert!(second.assigned_to.is_none());
        assert!(second.categories.is_empty());
    }

    #[test]
    fn test_parse_offenses_rejects_non_array() {
        let err = parse_offenses("GET /offenses", r#"{"http_response": 500}"#).unwrap_err();
        assert!(matches!(err, SourceError::Decode { .. }));
    }

    #[test]
    fn test_parse_notes_keeps_order() {
        let body = r#"[
            {"id": 1, "note_text": "first", "create_time": 1},
            {"id": 2, "note_text": "second", "create_time": 2}
        ]"#;
        assert_eq!(
            parse_notes("GET /offenses/1/notes", body).unwrap(),
            vec!["first".to_string(), "second".to_string()]
        );
    }

    #[test]
    fn test_deleted_response_detection() {
        assert!(is_deleted_response(403, r#"{"message": "Card is deleted"}"#));
        assert!(!is_deleted_response(403, r#"{"message": "Forbidden"}"#));
        assert!(!is_deleted_response(403, "not json"));
        assert!(!is_deleted_response(404, r#"{"message": "Card is deleted"}"#));
    }
}
