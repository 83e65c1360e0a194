//! Core data models shared by the catalog, search, and ingestion layers.
//!
//! [`PaperChunk`] is the unit the remote store hands out: one indexed
//! fragment of a research paper. Everything else here is either derived on
//! the client ([`PaperGroup`], [`SearchHit`]) or a request/response shape of
//! the remote API.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Content the remote store uses for its internal placeholder chunk.
pub const SENTINEL_CONTENT: &str = "initialization";

/// Epoch values above this are treated as milliseconds rather than seconds.
const EPOCH_MILLIS_THRESHOLD: f64 = 100_000_000_000.0;

/// When a chunk was added to the remote store.
///
/// The store has emitted both ISO-8601 strings and epoch numbers over time,
/// so both are accepted and compared through [`Timestamp::to_millis`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    Epoch(f64),
    Text(String),
}

impl Timestamp {
    /// Milliseconds since the Unix epoch, or `None` if unparseable.
    pub fn to_millis(&self) -> Option<i64> {
        match self {
            Timestamp::Epoch(v) if v.is_finite() => {
                if v.abs() >= EPOCH_MILLIS_THRESHOLD {
                    Some(*v as i64)
                } else {
                    Some((*v * 1000.0) as i64)
                }
            }
            Timestamp::Epoch(_) => None,
            Timestamp::Text(s) => parse_text_timestamp(s.trim()),
        }
    }
}

fn parse_text_timestamp(s: &str) -> Option<i64> {
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.and_utc().timestamp_millis());
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return d
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp_millis());
    }
    s.parse::<f64>()
        .ok()
        .and_then(|v| Timestamp::Epoch(v).to_millis())
}

/// One indexed fragment of a source document.
///
/// Several chunks share a `title` when the server splits a document. The
/// `hash` is assigned by the server and is the only identity the client
/// uses for selection and deletion. Fields the client does not model are
/// kept in `extra` so they round-trip when results are sent back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperChunk {
    pub hash: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_factors: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_to_db: Option<Timestamp>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl PaperChunk {
    pub fn new(hash: impl Into<String>, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            title: title.into(),
            content: content.into(),
            similarity: None,
            relevance_factors: None,
            added_to_db: None,
            extra: Map::new(),
        }
    }

    pub fn with_added_to_db(mut self, ts: Timestamp) -> Self {
        self.added_to_db = Some(ts);
        self
    }

    pub fn with_similarity(mut self, similarity: f64) -> Self {
        self.similarity = Some(similarity);
        self
    }

    /// False for the store's placeholder chunk and for chunks with no text.
    /// Such chunks never reach a user-facing view.
    pub fn is_visible(&self) -> bool {
        let trimmed = self.content.trim();
        !trimmed.is_empty() && trimmed != SENTINEL_CONTENT
    }

    /// Sort key for recency ordering; `None` ranks below every timestamp.
    pub fn added_at_millis(&self) -> Option<i64> {
        self.added_to_db.as_ref().and_then(Timestamp::to_millis)
    }
}

/// Chunks sharing one exact title, shown together as one logical paper.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaperGroup {
    pub title: String,
    pub chunks: Vec<PaperChunk>,
}

/// A search result annotated with whether its hash is already cataloged.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    #[serde(flatten)]
    pub chunk: PaperChunk,
    pub exists_in_db: bool,
}

/// Parameters of a remote keyword search or bulk download.
///
/// Serialized as query parameters for search and as a JSON body for
/// download; unset dates are omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchQuery {
    pub query: String,
    pub max_results: usize,
    pub start_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

/// A single document on its way to the upload endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub title: Option<String>,
}

impl UploadRequest {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>, title: Option<String>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
            title,
        }
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// `GET /papers` and `GET /papers/search` response body.
#[derive(Debug, Clone, Deserialize)]
pub struct PapersResponse {
    #[serde(default)]
    pub papers: Vec<PaperChunk>,
}

/// Response body of every mutating endpoint.
///
/// The server reports some failures as `{"status": "error", "message": ...}`
/// with a success status code, so `status` is checked as well.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl MessageResponse {
    pub fn is_error(&self) -> bool {
        self.status.as_deref() == Some("error")
    }

    /// The server's message if it sent a non-blank one.
    pub fn text(&self) -> Option<&str> {
        self.message.as_deref().filter(|m| !m.trim().is_empty())
    }
}
