//! Firebase Realtime Database live relay.
//!
//! Implements the `LiveRelay` trait on top of the Realtime Database REST
//! API. `publish` only enqueues; a background worker owns the HTTP client,
//! the OAuth2 token and the retry loop, so request handlers never wait on
//! Firebase.
//!
//! Area snapshots are written with `PUT areas/{areaId}.json`; every other
//! event is appended with `POST live/areas/{areaId}/events.json`.

use std::time::{Duration, Instant};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use domain::services::{LiveEvent, LiveRelay, RelayResult};
use metrics::counter;
use reqwest::{Client, Method, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::config::RelayConfig;

const OAUTH_SCOPE: &str = "https://www.googleapis.com/auth/firebase.database \
                           https://www.googleapis.com/auth/userinfo.email";

/// Error type for relay operations.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Failed to parse credentials: {0}")]
    CredentialsError(String),

    #[error("Failed to create JWT: {0}")]
    JwtError(String),

    #[error("Failed to get access token: {0}")]
    TokenError(String),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Firebase API error ({0}): {1}")]
    ApiError(u16, String),

    #[error("Live relay is not enabled")]
    NotEnabled,
}

/// Google service account credentials structure.
#[derive(Debug, Clone, Deserialize)]
struct ServiceAccountCredentials {
    client_email: String,
    private_key: String,
    #[serde(default = "default_token_uri")]
    token_uri: String,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

/// JWT claims for Google OAuth2 service account authentication.
#[derive(Debug, Serialize)]
struct JwtClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// One REST write derived from a live event.
#[derive(Debug, PartialEq)]
struct RelayWrite {
    method: Method,
    path: String,
    body: serde_json::Value,
}

impl RelayWrite {
    fn from_event(event: &LiveEvent) -> Result<Self, serde_json::Error> {
        match event {
            LiveEvent::AreaUpdated { area } => Ok(Self {
                method: Method::PUT,
                path: format!("areas/{}", area.area_id),
                body: serde_json::to_value(area)?,
            }),
            other => {
                let mut body = serde_json::to_value(other)?;
                if let Some(map) = body.as_object_mut() {
                    // Firebase server timestamp placeholder
                    map.insert(
                        "timestamp".to_string(),
                        serde_json::json!({ ".sv": "timestamp" }),
                    );
                }
                Ok(Self {
                    method: Method::POST,
                    path: format!("live/areas/{}/events", other.area_id()),
                    body,
                })
            }
        }
    }
}

/// Relay handle given to the survey service.
pub struct FirebaseRelay {
    sender: mpsc::Sender<LiveEvent>,
}

impl FirebaseRelay {
    /// Parse credentials, build the HTTP client and spawn the delivery worker.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(config: RelayConfig) -> Result<Self, RelayError> {
        if !config.enabled {
            return Err(RelayError::NotEnabled);
        }

        let credentials = load_credentials(&config.credentials)?;
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let worker = RelayWorker {
            client,
            base_url: config.database_url.trim_end_matches('/').to_string(),
            credentials,
            max_retries: config.max_retries,
            token: None,
        };
        tokio::spawn(worker.run(receiver));

        tracing::info!(
            database_url = %config.database_url,
            queue_capacity = config.queue_capacity,
            "Firebase live relay started"
        );
        Ok(Self { sender })
    }
}

impl LiveRelay for FirebaseRelay {
    fn publish(&self, event: LiveEvent) -> RelayResult {
        let kind = event.kind();
        match self.sender.try_send(event) {
            Ok(()) => RelayResult::Queued,
            Err(mpsc::error::TrySendError::Full(event)) => {
                counter!("soil_relay_events_total", "event" => kind, "outcome" => "dropped")
                    .increment(1);
                tracing::warn!(
                    area_id = %event.area_id(),
                    event = kind,
                    "Live relay queue full, dropping event"
                );
                RelayResult::Dropped("relay queue full".to_string())
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                counter!("soil_relay_events_total", "event" => kind, "outcome" => "dropped")
                    .increment(1);
                RelayResult::Dropped("relay worker stopped".to_string())
            }
        }
    }
}

/// Relay used when `relay.enabled` is false.
#[derive(Debug, Default)]
pub struct DisabledRelay;

impl LiveRelay for DisabledRelay {
    fn publish(&self, event: LiveEvent) -> RelayResult {
        tracing::trace!(area_id = %event.area_id(), event = event.kind(), "Live relay disabled");
        RelayResult::Disabled
    }
}

struct RelayWorker {
    client: Client,
    base_url: String,
    credentials: ServiceAccountCredentials,
    max_retries: u32,
    token: Option<CachedToken>,
}

impl RelayWorker {
    async fn run(mut self, mut receiver: mpsc::Receiver<LiveEvent>) {
        while let Some(event) = receiver.recv().await {
            let kind = event.kind();
            let area_id = event.area_id();

            let write = match RelayWrite::from_event(&event) {
                Ok(write) => write,
                Err(e) => {
                    tracing::error!(error = %e, event = kind, "Failed to serialize live event");
                    continue;
                }
            };

            match self.deliver(&write).await {
                Ok(()) => {
                    counter!("soil_relay_events_total", "event" => kind, "outcome" => "published")
                        .increment(1);
                    tracing::debug!(area_id = %area_id, event = kind, "Live event published");
                }
                Err(e) => {
                    counter!("soil_relay_events_total", "event" => kind, "outcome" => "failed")
                        .increment(1);
                    tracing::error!(
                        error = %e,
                        area_id = %area_id,
                        event = kind,
                        "Failed to publish live event"
                    );
                }
            }
        }
        tracing::info!("Firebase live relay stopped");
    }

    async fn access_token(&mut self) -> Result<String, RelayError> {
        if let Some(token) = &self.token {
            // Refresh a minute early
            if token.expires_at > Instant::now() + Duration::from_secs(60) {
                return Ok(token.access_token.clone());
            }
        }

        let (access_token, expires_at) = self.fetch_access_token().await?;
        self.token = Some(CachedToken {
            access_token: access_token.clone(),
            expires_at,
        });
        Ok(access_token)
    }

    async fn fetch_access_token(&self) -> Result<(String, Instant), RelayError> {
        let now = Utc::now().timestamp();
        let claims = JwtClaims {
            iss: self.credentials.client_email.clone(),
            scope: OAUTH_SCOPE.to_string(),
            aud: self.credentials.token_uri.clone(),
            iat: now,
            exp: now + 3600,
        };

        let header = jsonwebtoken::Header::new(jsonwebtoken::Algorithm::RS256);
        let encoding_key =
            jsonwebtoken::EncodingKey::from_rsa_pem(self.credentials.private_key.as_bytes())
                .map_err(|e| RelayError::JwtError(format!("Invalid private key: {}", e)))?;
        let jwt = jsonwebtoken::encode(&header, &claims, &encoding_key)
            .map_err(|e| RelayError::JwtError(e.to_string()))?;

        let response = self
            .client
            .post(&self.credentials.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", jwt.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(RelayError::TokenError(format!(
                "Token exchange failed: {}",
                error_text
            )));
        }

        let token: TokenResponse = response.json().await?;
        Ok((
            token.access_token,
            Instant::now() + Duration::from_secs(token.expires_in),
        ))
    }

    async fn deliver(&mut self, write: &RelayWrite) -> Result<(), RelayError> {
        let url = format!("{}/{}.json", self.base_url, write.path);

        let mut last_error = None;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                // 100ms, 200ms, 400ms, ...
                tokio::time::sleep(Duration::from_millis(100 * (1u64 << (attempt - 1).min(10))))
                    .await;
            }

            let access_token = self.access_token().await?;
            let response = self
                .client
                .request(write.method.clone(), &url)
                .bearer_auth(&access_token)
                .json(&write.body)
                .send()
                .await;

            match response {
                Ok(resp) if resp.status().is_success() => return Ok(()),
                Ok(resp) => {
                    let status = resp.status();
                    let error_text = resp.text().await.unwrap_or_default();
                    let error = RelayError::ApiError(status.as_u16(), error_text);

                    if status == StatusCode::UNAUTHORIZED {
                        self.token = None;
                    } else if !status.is_server_error() && status != StatusCode::TOO_MANY_REQUESTS {
                        return Err(error);
                    }
                    last_error = Some(error);
                }
                Err(e) => last_error = Some(RelayError::HttpError(e)),
            }
        }

        Err(last_error.unwrap_or_else(|| RelayError::ApiError(0, "no attempt made".to_string())))
    }
}

/// Accepts inline JSON, base64-encoded JSON, or a path to a JSON file.
fn load_credentials(source: &str) -> Result<ServiceAccountCredentials, RelayError> {
    let source = source.trim();
    let json = if source.starts_with('{') {
        source.to_string()
    } else if let Ok(bytes) = STANDARD.decode(source) {
        String::from_utf8(bytes)
            .map_err(|e| RelayError::CredentialsError(format!("Invalid UTF-8: {}", e)))?
    } else {
        std::fs::read_to_string(source).map_err(|e| {
            RelayError::CredentialsError(format!("Failed to read credentials file: {}", e))
        })?
    };

    serde_json::from_str(&json)
        .map_err(|e| RelayError::CredentialsError(format!("Invalid JSON: {}", e)))
}
