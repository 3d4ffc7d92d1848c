//! Pinning service HTTP backend
//!
//! Implements [`PinningBackend`] against a Pinata-flavored pinning API:
//! `pinJSONToIPFS` for creation, `unpin` for deletion, `pinList` with
//! metadata keyvalue predicates for queries and `hashMetadata` for
//! metadata patches. Content is dereferenced through a dedicated gateway
//! URL template.

use crate::error::{Result, StoreError};
use crate::query::PinQuery;
use crate::types::{Keyvalues, PinnedRecord};
use crate::PinningBackend;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::instrument;

/// Configuration for a pinning service backend
#[derive(Clone, Debug)]
pub struct PinningServiceConfig {
    /// API endpoint (e.g., "https://api.pinata.cloud")
    pub api_url: String,
    /// Bearer token for authentication
    pub access_token: String,
    /// Gateway URL template containing a `{cid}` placeholder, used to
    /// dereference content hashes into bodies
    pub gateway_url: String,
    /// Request timeout
    pub timeout: Duration,
}

impl PinningServiceConfig {
    /// Create a new pinning service config
    pub fn new(
        api_url: impl Into<String>,
        access_token: impl Into<String>,
        gateway_url: impl Into<String>,
    ) -> Self {
        Self {
            api_url: api_url.into(),
            access_token: access_token.into(),
            gateway_url: gateway_url.into(),
            timeout: Duration::from_secs(60),
        }
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Substitute a content hash into a gateway URL template
///
/// Strips an optional `ipfs://` scheme prefix from the hash before
/// replacing the `{cid}` placeholder.
pub fn resolve_gateway(template: &str, content_hash: &str) -> String {
    let cid = content_hash.strip_prefix("ipfs://").unwrap_or(content_hash);
    template.replace("{cid}", cid)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PinJsonRequest<'a> {
    pinata_content: &'a Value,
    pinata_metadata: PinMetadata<'a>,
}

#[derive(Debug, Serialize)]
struct PinMetadata<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    keyvalues: &'a Keyvalues,
}

#[derive(Debug, Deserialize)]
struct PinJsonResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
}

#[derive(Debug, Deserialize)]
struct PinListResponse {
    rows: Vec<PinListRow>,
}

#[derive(Debug, Deserialize)]
struct PinListRow {
    ipfs_pin_hash: String,
    date_pinned: DateTime<Utc>,
    #[serde(default)]
    metadata: PinListMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct PinListMetadata {
    name: Option<String>,
    keyvalues: Option<Keyvalues>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HashMetadataRequest<'a> {
    ipfs_pin_hash: &'a str,
    keyvalues: &'a Keyvalues,
}

impl From<PinListRow> for PinnedRecord {
    fn from(row: PinListRow) -> Self {
        PinnedRecord {
            content_hash: row.ipfs_pin_hash,
            created_at: row.date_pinned,
            name: row.metadata.name,
            keyvalues: row.metadata.keyvalues.unwrap_or_default(),
        }
    }
}

/// Pinning service API client
#[derive(Clone)]
pub struct PinningServiceClient {
    client: Client,
    config: PinningServiceConfig,
}

impl PinningServiceClient {
    /// Create a new pinning service client
    pub fn new(config: PinningServiceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Get the authorization header value
    fn auth_header(&self) -> String {
        format!("Bearer {}", self.config.access_token)
    }
}

#[async_trait]
impl PinningBackend for PinningServiceClient {
    #[instrument(skip(self, body, keyvalues))]
    async fn pin_json(
        &self,
        body: &Value,
        name: Option<&str>,
        keyvalues: &Keyvalues,
    ) -> Result<String> {
        let url = format!("{}/pinning/pinJSONToIPFS", self.config.api_url);
        let request = PinJsonRequest {
            pinata_content: body,
            pinata_metadata: PinMetadata { name, keyvalues },
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.auth_header())
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error = response.text().await.unwrap_or_default();
            return Err(StoreError::PinFailed(format!(
                "failed to pin ({}): {}",
                status, error
            )));
        }

        let parsed: PinJsonResponse = response
            .json()
            .await
            .map_err(|e| StoreError::Deserialization(e.to_string()))?;
        Ok(parsed.ipfs_hash)
    }

    #[instrument(skip(self))]
    async fn unpin(&self, content_hash: &str) -> Result<()> {
        let url = format!("{}/pinning/unpin/{}", self.config.api_url, content_hash);

        let response = self
            .client
            .delete(&url)
            .header("Authorization", self.auth_header())
            .send()
            .await?;

        // An already-gone pin is a valid outcome
        if response.status().as_u16() == 404 {
            return Ok(());
        }

        if !response.status().is_success() {
            let status = response.status();
            let error = response.text().await.unwrap_or_default();
            return Err(StoreError::UnpinFailed(format!(
                "failed to unpin ({}): {}",
                status, error
            )));
        }

        Ok(())
    }

    #[instrument(skip(self, query))]
    async fn list_pins(&self, query: &PinQuery) -> Result<Vec<PinnedRecord>> {
        let url = format!("{}/data/pinList", self.config.api_url);
        let params = build_list_params(query)?;

        let response = self
            .client
            .get(&url)
            .header("Authorization", self.auth_header())
            .query(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error = response.text().await.unwrap_or_default();
            return Err(StoreError::PinFailed(format!(
                "failed to list pins ({}): {}",
                status, error
            )));
        }

        let parsed: PinListResponse = response
            .json()
            .await
            .map_err(|e| StoreError::Deserialization(e.to_string()))?;
        Ok(parsed.rows.into_iter().map(PinnedRecord::from).collect())
    }

    #[instrument(skip(self, keyvalues))]
    async fn update_metadata(&self, content_hash: &str, keyvalues: &Keyvalues) -> Result<()> {
        let url = format!("{}/pinning/hashMetadata", self.config.api_url);
        let request = HashMetadataRequest {
            ipfs_pin_hash: content_hash,
            keyvalues,
        };

        let response = self
            .client
            .put(&url)
            .header("Authorization", self.auth_header())
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error = response.text().await.unwrap_or_default();
            return Err(StoreError::PinFailed(format!(
                "failed to update metadata ({}): {}",
                status, error
            )));
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn fetch_content(&self, content_hash: &str) -> Result<Value> {
        let url = resolve_gateway(&self.config.gateway_url, content_hash);

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error = response.text().await.unwrap_or_default();
            return Err(StoreError::Gateway(format!(
                "failed to fetch {} ({}): {}",
                content_hash, status, error
            )));
        }

        response
            .json()
            .await
            .map_err(|e| StoreError::Deserialization(e.to_string()))
    }
}

/// Build the `pinList` query string
///
/// Metadata predicates go into a single `metadata[keyvalues]` parameter as
/// a JSON object of `{"value": .., "op": ".."}` entries; only pinned
/// records are listed.
fn build_list_params(query: &PinQuery) -> Result<Vec<(String, String)>> {
    let mut params = vec![
        ("status".to_string(), "pinned".to_string()),
        ("pageOffset".to_string(), query.offset.to_string()),
        ("pageLimit".to_string(), query.limit.to_string()),
    ];

    if let Some(hash) = &query.content_hash {
        params.push(("hashContains".to_string(), hash.clone()));
    }

    if !query.keyvalues.is_empty() {
        let wire: HashMap<&String, Value> = query
            .keyvalues
            .iter()
            .map(|(k, p)| Ok((k, serde_json::to_value(p)?)))
            .collect::<Result<_>>()?;
        params.push((
            "metadata[keyvalues]".to_string(),
            serde_json::to_string(&wire)?,
        ));
    }

    Ok(params)
}
