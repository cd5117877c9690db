//! GitHub repository contents API client
//!
//! Stores the state file as a single file in a GitHub repository using
//! `GET/PUT /repos/{owner}/{repo}/contents/{path}`.
//!
//! The API wraps file content in a JSON envelope:
//!
//! ```text
//! GET  -> { "content": "<base64>", "sha": "<blob sha>", "encoding": "base64" }
//! PUT  <- { "message": "...", "content": "<base64>", "sha": "<blob sha>" }
//! PUT  -> { "content": { "sha": "<new blob sha>" }, ... }
//! ```
//!
//! The blob SHA doubles as the optimistic-concurrency token.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{RemoteBlob, RemoteError, RemoteLocation, RemoteResult, RemoteStore, SyncTarget, VersionToken};

/// GitHub refuses requests without a User-Agent
const USER_AGENT: &str = concat!("keepsake/", env!("CARGO_PKG_VERSION"));

const GITHUB_JSON: &str = "application/vnd.github+json";

/// Per-request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Envelope types
// ============================================================================

/// Response from `GET /repos/{repo}/contents/{path}`
#[derive(Debug, Deserialize)]
struct ContentsResponse {
    /// Base64 content, wrapped at 60 columns
    #[serde(default)]
    content: Option<String>,
    /// Blob SHA
    sha: String,
    /// "base64", or "none" when the file is too large to inline
    #[serde(default)]
    encoding: Option<String>,
}

/// Body of `PUT /repos/{repo}/contents/{path}`
#[derive(Debug, Serialize)]
struct PutContentsRequest<'a> {
    message: &'a str,
    content: String,
    /// Omitted when creating the file
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

/// Response from `PUT /repos/{repo}/contents/{path}`
#[derive(Debug, Deserialize)]
struct PutContentsResponse {
    content: PutContentEntry,
}

#[derive(Debug, Deserialize)]
struct PutContentEntry {
    sha: String,
}

/// GitHub error body
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

// ============================================================================
// GithubContentsClient
// ============================================================================

/// HTTP client for the GitHub contents API
///
/// Holds no state beyond the connection pool; credentials travel with each
/// call inside the [`SyncTarget`].
#[derive(Debug, Clone)]
pub struct GithubContentsClient {
    client: Client,
    base_url: Url,
}

impl GithubContentsClient {
    /// Client for an API root: api.github.com, GitHub Enterprise, or a mock server
    pub fn with_base_url(base_url: &str) -> RemoteResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| RemoteError::Protocol(format!("invalid API URL '{}': {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(RemoteError::Protocol(format!(
                "invalid API URL '{}': not a base URL",
                base_url
            )));
        }

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(RemoteError::Network)?;

        Ok(Self { client, base_url })
    }

    /// `{base}/repos/{owner}/{name}/contents/{path}`, each segment percent-encoded
    fn contents_url(&self, location: &RemoteLocation) -> RemoteResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| RemoteError::Protocol(format!("invalid API URL '{}'", self.base_url)))?
            .pop_if_empty()
            .push("repos")
            .extend(location.repo().split('/'))
            .push("contents")
            .extend(location.path().split('/'));
        Ok(url)
    }

    /// Authenticated request against the blob's contents URL
    fn request(&self, method: Method, target: &SyncTarget) -> RemoteResult<RequestBuilder> {
        Ok(self
            .client
            .request(method, self.contents_url(target.location())?)
            .header(AUTHORIZATION, format!("token {}", target.credential()))
            .header(ACCEPT, GITHUB_JSON))
    }
}

#[async_trait]
impl RemoteStore for GithubContentsClient {
    async fn fetch(&self, target: &SyncTarget) -> RemoteResult<RemoteBlob> {
        debug!(location = %target.location(), "GET contents");

        let response = self
            .request(Method::GET, target)?
            .send()
            .await
            .map_err(RemoteError::Network)?;
        let response = check_status(response, target.location()).await?;

        let body: ContentsResponse = response
            .json()
            .await
            .map_err(|e| RemoteError::Protocol(format!("invalid contents response: {}", e)))?;

        if let Some(encoding) = body.encoding.as_deref() {
            if encoding != "base64" {
                return Err(RemoteError::Protocol(format!(
                    "content not inlined (encoding '{}'); file too large for the contents API",
                    encoding
                )));
            }
        }

        let content = decode_content(body.content.as_deref().unwrap_or_default())?;
        debug!(bytes = content.len(), sha = %body.sha, "fetched remote state");

        Ok(RemoteBlob {
            content,
            version: VersionToken::new(body.sha),
        })
    }

    async fn write(
        &self,
        target: &SyncTarget,
        content: &[u8],
        version: Option<&VersionToken>,
        message: &str,
    ) -> RemoteResult<VersionToken> {
        debug!(
            location = %target.location(),
            bytes = content.len(),
            update = version.is_some(),
            "PUT contents"
        );

        let body = PutContentsRequest {
            message,
            content: STANDARD.encode(content),
            sha: version.map(VersionToken::as_str),
        };

        let response = self
            .request(Method::PUT, target)?
            .json(&body)
            .send()
            .await
            .map_err(RemoteError::Network)?;
        let response = check_status(response, target.location()).await?;

        let created: PutContentsResponse = response
            .json()
            .await
            .map_err(|e| RemoteError::Protocol(format!("invalid write response: {}", e)))?;

        Ok(VersionToken::new(created.content.sha))
    }
}

/// Map non-success statuses onto the error taxonomy
async fn check_status(response: Response, location: &RemoteLocation) -> RemoteResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let details = serde_json::from_str::<ApiErrorBody>(&text)
        .map(|b| b.message)
        .unwrap_or(text);

    Err(classify_status(status, location, details))
}

fn classify_status(status: StatusCode, location: &RemoteLocation, details: String) -> RemoteError {
    match status {
        StatusCode::NOT_FOUND => RemoteError::NotFound {
            location: location.to_string(),
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RemoteError::Auth {
            status: status.as_u16(),
        },
        // 409: sha mismatch; 422: sha missing for an existing file
        StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => RemoteError::Conflict {
            location: location.to_string(),
            details,
        },
        _ => RemoteError::Protocol(format!("HTTP {}: {}", status.as_u16(), details)),
    }
}

/// Decode the API's line-wrapped base64
fn decode_content(encoded: &str) -> RemoteResult<Vec<u8>> {
    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD
        .decode(compact)
        .map_err(|e| RemoteError::Protocol(format!("invalid base64 content: {}", e)))
}
