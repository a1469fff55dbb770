//! HTTP client for an IPFS node's RPC API.

use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::time::Duration;
use votekiosk_types::Cid;

use crate::{ContentStore, ContentStoreError, NodeIdentity};

/// API root of a local IPFS daemon.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:5001/api/v0";

/// Default timeout for uploads.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for the identity and version probes.
const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// `POST /id` response; only the node id is used.
#[derive(Debug, Deserialize)]
struct IdResponse {
    #[serde(rename = "ID")]
    id: String,
}

#[derive(Debug, Deserialize)]
struct VersionResponse {
    #[serde(rename = "Version")]
    version: String,
}

/// One line of the `POST /add` response stream.
#[derive(Debug, Deserialize)]
struct AddResponse {
    #[serde(rename = "Hash")]
    hash: String,
}

/// Client for an IPFS node's `/api/v0` endpoints.
pub struct IpfsClient {
    /// HTTP client (reusable connection pool).
    http_client: reqwest::Client,
    api_url: String,
    probe_timeout: Duration,
}

impl IpfsClient {
    /// Create a client with the default upload and probe timeouts.
    pub fn new(api_url: impl Into<String>) -> Self {
        Self::with_timeouts(api_url, DEFAULT_TIMEOUT, DEFAULT_PROBE_TIMEOUT)
    }

    pub fn with_timeouts(
        api_url: impl Into<String>,
        request_timeout: Duration,
        probe_timeout: Duration,
    ) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(request_timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT.min(request_timeout))
            .build()
            .unwrap_or_default();
        Self {
            http_client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            probe_timeout,
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_url, path)
    }

    /// Ask the node for its version. Failure is not an error; the probe is
    /// informational.
    pub async fn node_version(&self) -> Option<String> {
        let response = self
            .http_client
            .post(self.endpoint("version"))
            .timeout(self.probe_timeout)
            .send()
            .await
            .ok()?;
        if !response.status().is_success() {
            return None;
        }
        response
            .json::<VersionResponse>()
            .await
            .ok()
            .map(|v| v.version)
    }
}

impl ContentStore for IpfsClient {
    async fn check_liveness(&self) -> Result<NodeIdentity, ContentStoreError> {
        let response = self
            .http_client
            .post(self.endpoint("id"))
            .timeout(self.probe_timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ContentStoreError::Unreachable(format!("identity probe timed out: {e}"))
                } else {
                    ContentStoreError::Unreachable(format!("connection failed: {e}"))
                }
            })?;

        if !response.status().is_success() {
            return Err(ContentStoreError::Unreachable(format!(
                "identity probe returned HTTP status {}",
                response.status()
            )));
        }

        let id: IdResponse = response.json().await.map_err(|e| {
            ContentStoreError::InvalidResponse(format!("failed to parse identity response: {e}"))
        })?;

        let version = self.node_version().await;
        tracing::debug!(node_id = %id.id, version = ?version, "content store is live");

        Ok(NodeIdentity {
            node_id: id.id,
            version,
        })
    }

    async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<Cid, ContentStoreError> {
        let size = bytes.len();
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("application/json")
            .map_err(|e| ContentStoreError::UploadFailed(format!("building request: {e}")))?;
        let form = Form::new().part("file", part);

        let response = self
            .http_client
            .post(self.endpoint("add"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ContentStoreError::UploadFailed(format!("request timed out: {e}"))
                } else {
                    ContentStoreError::UploadFailed(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(ContentStoreError::UploadFailed(format!(
                "HTTP status {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ContentStoreError::UploadFailed(format!("reading response: {e}")))?;
        let cid = parse_add_response(&body)?;
        tracing::info!(%cid, size, "uploaded document to content store");
        Ok(cid)
    }
}

/// Extract the CID from an add response.
///
/// The node streams one JSON object per line; the last one names the root.
fn parse_add_response(body: &str) -> Result<Cid, ContentStoreError> {
    let last = body
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()
        .ok_or_else(|| ContentStoreError::InvalidResponse("empty add response".into()))?;
    let parsed: AddResponse = serde_json::from_str(last).map_err(|e| {
        ContentStoreError::InvalidResponse(format!("failed to parse add response: {e}"))
    })?;
    Cid::new(parsed.hash).map_err(|e| ContentStoreError::InvalidResponse(e.to_string()))
}
