//! Backend HTTP client for chirp.
//!
//! This module provides a lightweight client for the chat backend. It focuses
//! on:
//!
//! - Constructing an HTTP client with sensible defaults
//! - Resolving the base URL from a flag or `CHIRP_BACKEND_BASE`
//! - Validating the base URL for safety
//! - Building requests with a consistent User-Agent
//!
//! The primary entry point is [`BackendClient`]. Create an instance via
//! [`BackendClient::new_from_env`] or [`BackendClient::with_base_url`], then
//! call [`BackendClient::health`] or [`BackendClient::generate`].

use std::env;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::{Client, Method, RequestBuilder, Url, header};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use chirp_types::{GenerateRequest, GenerateResponse, HealthReport};

/// Environment variable overriding the backend base URL.
pub const BASE_URL_ENV: &str = "CHIRP_BACKEND_BASE";

/// Default backend for local development, matching the reference deployment.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// Hostnames allowed with any scheme; anything else must use HTTPS.
const LOCALHOST_DOMAINS: &[&str] = &["localhost", "127.0.0.1"];

/// Default timeout for requests the monitor does not bound itself.
const CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Ways a single health check can fail.
///
/// The monitor classifies these into a published state. `DeadlineExceeded`
/// and the transport/protocol variants all land in the same `fail` bucket but
/// carry different message text; `Cancelled` means the caller tore the poll
/// down and nothing should be published at all.
#[derive(Debug, thiserror::Error)]
pub enum HealthError {
    /// The caller cancelled the request through its token.
    #[error("health check cancelled")]
    Cancelled,
    /// The monitor's per-poll deadline expired before a response arrived.
    #[error("health check exceeded its deadline")]
    DeadlineExceeded,
    /// Connection refused, DNS failure, or an interrupted exchange.
    #[error("backend unreachable: {0}")]
    Unavailable(String),
    /// A response arrived but was not usable: non-2xx status or a body that
    /// does not parse as a health report.
    #[error("backend response unusable: {0}")]
    Protocol(String),
}

/// Thin wrapper around a configured `reqwest::Client` for backend access.
///
/// The client pre-configures a default timeout and builds requests against a
/// validated base URL.
#[derive(Debug, Clone)]
pub struct BackendClient {
    base_url: String,
    http: Client,
    user_agent: String,
}

impl BackendClient {
    /// Construct a client from `CHIRP_BACKEND_BASE`, falling back to the
    /// local development default.
    pub fn new_from_env() -> Result<Self> {
        let base_url = env::var(BASE_URL_ENV).unwrap_or_else(|_| DEFAULT_BASE_URL.into());
        Self::with_base_url(&base_url)
    }

    /// Construct a client against an explicit base URL.
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        validate_base_url(base_url)?;
        let http = Client::builder()
            .timeout(CLIENT_TIMEOUT)
            .build()
            .context("build http client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            user_agent: format!("chirp/0.1; {}", env::consts::OS),
        })
    }

    /// The validated base URL this client targets.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a `reqwest::RequestBuilder` for a method and API-relative path.
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "building request");
        self.http.request(method, url).header(header::USER_AGENT, &self.user_agent)
    }

    /// Perform one health check against `GET /health`.
    ///
    /// The exchange races against `cancel`; the monitor cancels a child of
    /// its shutdown token to enforce the per-poll deadline, and cancellation
    /// observed here surfaces as [`HealthError::Cancelled`] so the caller can
    /// tell its own deadline from an external teardown.
    ///
    /// No deadline is imposed here beyond the client-wide default timeout;
    /// bounding the exchange is the caller's responsibility.
    pub async fn health(&self, cancel: &CancellationToken) -> Result<HealthReport, HealthError> {
        let send = self.request(Method::GET, "/health").send();
        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(HealthError::Cancelled),
            sent = send => sent.map_err(|e| HealthError::Unavailable(e.to_string()))?,
        };

        let status = response.status();
        let body = tokio::select! {
            _ = cancel.cancelled() => return Err(HealthError::Cancelled),
            text = response.text() => text.map_err(|e| HealthError::Unavailable(e.to_string()))?,
        };

        if !status.is_success() {
            return Err(HealthError::Protocol(format!("HTTP {}", status.as_u16())));
        }
        parse_health_body(&body)
    }

    /// Send a prompt to `POST /generate` and return the raw reply text.
    ///
    /// An empty reply is returned as-is; substituting fallback copy is a UI
    /// concern.
    pub async fn generate(&self, model_name: &str, prompt: &str) -> Result<String> {
        let body = GenerateRequest {
            model_name: model_name.to_string(),
            prompt: prompt.to_string(),
        };
        let response = self
            .request(Method::POST, "/generate")
            .json(&body)
            .send()
            .await
            .context("send generate request")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("HTTP {}: {}", status.as_u16(), text.trim()));
        }

        let parsed: GenerateResponse = response.json().await.context("decode generate response")?;
        Ok(parsed.response)
    }
}

/// Parse a `GET /health` body into a [`HealthReport`].
///
/// A body that is not a JSON object at all is a protocol failure; a JSON
/// object missing fields still parses, leaving classification to decide what
/// an empty `status` means.
pub fn parse_health_body(body: &str) -> Result<HealthReport, HealthError> {
    serde_json::from_str(body).map_err(|e| HealthError::Protocol(format!("invalid health body: {e}")))
}

/// Validate that a base URL is acceptable for use by the client.
///
/// Rules:
/// - `localhost` or `127.0.0.1`: any scheme is allowed
/// - otherwise: scheme must be HTTPS
fn validate_base_url(base: &str) -> Result<()> {
    let parsed = Url::parse(base).map_err(|e| anyhow!("Invalid backend base URL '{}': {}", base, e))?;

    let host = parsed
        .host_str()
        .ok_or_else(|| anyhow!("backend base URL must include a host"))?;

    if LOCALHOST_DOMAINS.iter().any(|&allowed| host.eq_ignore_ascii_case(allowed)) {
        return Ok(());
    }

    if parsed.scheme() != "https" {
        return Err(anyhow!(
            "backend base URL must use https for non-localhost hosts; got '{}://'",
            parsed.scheme()
        ));
    }

    Ok(())
}
