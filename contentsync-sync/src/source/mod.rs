//! Source providers.
//!
//! A source provider turns a [`SourceLocation`] into a raw
//! [`SourcePayload`]. Turning the payload into records is the mapper's job
//! (see [`RecordMapper::convert_source_data`](crate::RecordMapper::convert_source_data));
//! [`records_from_payload`] is the default conversion.

pub mod http;

use crate::error::{SourceError, SourceResult};
use async_trait::async_trait;
use contentsync_types::Record;
use reqwest::header::CONTENT_TYPE;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub use http::{HttpConfig, ResilientClient, RetryPolicy};

/// Where source data comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    Path(PathBuf),
    Url(String),
}

impl SourceLocation {
    /// Builds a location from the two mutually exclusive inputs.
    /// Exactly one must be present.
    pub fn from_options(path: Option<PathBuf>, url: Option<String>) -> SourceResult<Self> {
        match (path, url) {
            (Some(path), None) => Ok(Self::Path(path)),
            (None, Some(url)) => Ok(Self::Url(url)),
            (Some(_), Some(_)) => Err(SourceError::Config(
                "source path and source url are mutually exclusive".to_string(),
            )),
            (None, None) => Err(SourceError::Config(
                "either a source path or a source url is required".to_string(),
            )),
        }
    }
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Url(url) => f.write_str(url),
        }
    }
}

/// Raw data as obtained from a source.
#[derive(Debug, Clone, PartialEq)]
pub enum SourcePayload {
    Json(serde_json::Value),
    Text(String),
    Bytes(Vec<u8>),
}

impl SourcePayload {
    /// True when there is nothing to reconcile.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Json(serde_json::Value::Null) => true,
            Self::Json(serde_json::Value::Array(items)) => items.is_empty(),
            Self::Json(serde_json::Value::Object(map)) => map.is_empty(),
            Self::Json(_) => false,
            Self::Text(text) => text.trim().is_empty(),
            Self::Bytes(bytes) => bytes.is_empty(),
        }
    }
}

/// Produces raw source data.
#[async_trait]
pub trait SourceProvider: Send + Sync {
    /// Reads the data at `location`.
    async fn get_data(&self, location: &SourceLocation) -> SourceResult<SourcePayload>;
}

/// Reads local files and fetches remote URLs.
pub struct DefaultSourceProvider {
    http: ResilientClient,
}

impl DefaultSourceProvider {
    pub fn new(http: ResilientClient) -> Self {
        Self { http }
    }

    async fn read_file(&self, path: &Path) -> SourceResult<SourcePayload> {
        let is_file = tokio::fs::metadata(path)
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false);
        if !is_file {
            return Err(SourceError::NotFound(path.to_path_buf()));
        }

        let bytes = tokio::fs::read(path).await?;
        debug!("Read {} bytes from {}", bytes.len(), path.display());
        Ok(match serde_json::from_slice(&bytes) {
            Ok(json) => SourcePayload::Json(json),
            Err(_) => match String::from_utf8(bytes) {
                Ok(text) => SourcePayload::Text(text),
                Err(e) => SourcePayload::Bytes(e.into_bytes()),
            },
        })
    }

    async fn fetch_url(&self, url: &str) -> SourceResult<SourcePayload> {
        let response = self.http.get(url).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Fetch {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("application/json"));
        let body = response.bytes().await?;
        info!("Fetched {} bytes from {}", body.len(), url);

        if is_json {
            if let Ok(json) = serde_json::from_slice(&body) {
                return Ok(SourcePayload::Json(json));
            }
            debug!("Response from {} declared JSON but did not parse", url);
        }
        Ok(SourcePayload::Bytes(body.to_vec()))
    }
}

#[async_trait]
impl SourceProvider for DefaultSourceProvider {
    async fn get_data(&self, location: &SourceLocation) -> SourceResult<SourcePayload> {
        match location {
            SourceLocation::Path(path) => self.read_file(path).await,
            SourceLocation::Url(url) => self.fetch_url(url).await,
        }
    }
}

/// Default payload-to-records conversion.
///
/// - a JSON array yields one record per element
/// - a JSON object with an `items` array (REST listing) yields the items
/// - any other JSON object is a single record
/// - text and bytes are parsed as JSON first
pub fn records_from_payload(payload: SourcePayload) -> SourceResult<Vec<Record>> {
    match payload {
        SourcePayload::Json(json) => records_from_json(json),
        SourcePayload::Text(text) => parse_raw(text.as_bytes()),
        SourcePayload::Bytes(bytes) => parse_raw(&bytes),
    }
}

fn parse_raw(raw: &[u8]) -> SourceResult<Vec<Record>> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    let json = serde_json::from_slice(raw)
        .map_err(|e| SourceError::Malformed(format!("payload is not JSON: {e}")))?;
    records_from_json(json)
}

fn records_from_json(json: serde_json::Value) -> SourceResult<Vec<Record>> {
    match json {
        serde_json::Value::Null => Ok(Vec::new()),
        serde_json::Value::Array(items) => Ok(items.into_iter().map(Record::new).collect()),
        serde_json::Value::Object(mut map) => match map.remove("items") {
            Some(serde_json::Value::Array(items)) => Ok(items.into_iter().map(Record::new).collect()),
            Some(other) => {
                map.insert("items".to_string(), other);
                Ok(vec![Record::new(serde_json::Value::Object(map))])
            }
            None => Ok(vec![Record::new(serde_json::Value::Object(map))]),
        },
        other => Err(SourceError::Malformed(format!(
            "expected a list of records, got {other}"
        ))),
    }
}
