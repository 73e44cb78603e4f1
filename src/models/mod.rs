//! Core data model: image records, the persisted manifest, and the response
//! contract served to clients.

use serde::{Deserialize, Serialize};

/// Cache state of an image record.
///
/// Exactly one of these holds for any record: it is waiting to be cached,
/// it has a local compressed copy, or its last fetch/compression attempt
/// failed. Errored records are excluded from every valid view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// Known URL, not yet backed by a local compressed copy.
    Pending,
    /// A local compressed copy exists and `url` points at it.
    Cached,
    /// The last fetch or compression attempt failed with this status code.
    Errored(u16),
}

/// One candidate image and its validation/cache state.
///
/// The persisted form is the flat record (`cached` flag plus optional
/// `error` code); in memory the three legal states live in [`CacheState`]
/// so contradictory flag combinations cannot be constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ImageRecordWire", into = "ImageRecordWire")]
pub struct ImageRecord {
    pub url: String,
    /// Original remote URL, kept once `url` has been rewritten to point at
    /// the local cache.
    pub original_url: Option<String>,
    pub mime_type: Option<String>,
    /// RFC 2822/3339 timestamp of the last compression attempt.
    pub last_cached: Option<String>,
    pub state: CacheState,
}

impl ImageRecord {
    /// A freshly discovered candidate URL.
    pub fn new<S: Into<String>>(url: S) -> Self {
        Self {
            url: url.into(),
            original_url: None,
            mime_type: None,
            last_cached: None,
            state: CacheState::Pending,
        }
    }

    /// A record for an asset already sitting in the local cache directory.
    pub fn cached_local<S: Into<String>>(url: S, mime_type: Option<String>) -> Self {
        Self {
            url: url.into(),
            original_url: None,
            mime_type,
            last_cached: None,
            state: CacheState::Cached,
        }
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self.state, CacheState::Errored(_))
    }

    pub fn is_cached(&self) -> bool {
        self.state == CacheState::Cached
    }

    /// Record a failed fetch or compression attempt.
    pub fn mark_error(&mut self, status: u16) {
        self.state = CacheState::Errored(status);
    }

    /// Record a successful validation fetch, clearing any prior error.
    pub fn mark_fetched(&mut self, mime_type: String) {
        self.mime_type = Some(mime_type);
        self.state = CacheState::Pending;
    }

    /// Rewrite the record to point at a freshly written local copy.
    pub fn mark_cached(&mut self, local_url: String, mime_type: String) {
        self.url = local_url;
        self.mime_type = Some(mime_type);
        self.state = CacheState::Cached;
    }
}

/// Flat wire representation matching the persisted manifest format.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ImageRecordWire {
    url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    original_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    cached: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_cached: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<u16>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl From<ImageRecordWire> for ImageRecord {
    fn from(wire: ImageRecordWire) -> Self {
        // An error code always wins over a stale cached flag.
        let state = match wire.error {
            Some(status) => CacheState::Errored(status),
            None if wire.cached => CacheState::Cached,
            None => CacheState::Pending,
        };
        Self {
            url: wire.url,
            original_url: wire.original_url,
            mime_type: wire.mime_type,
            last_cached: wire.last_cached,
            state,
        }
    }
}

impl From<ImageRecord> for ImageRecordWire {
    fn from(record: ImageRecord) -> Self {
        Self {
            url: record.url,
            original_url: record.original_url,
            mime_type: record.mime_type,
            cached: record.state == CacheState::Cached,
            last_cached: record.last_cached,
            error: match record.state {
                CacheState::Errored(status) => Some(status),
                _ => None,
            },
        }
    }
}

/// Persisted manifest: source-list fingerprint, content identity and the
/// ordered list of known image records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Fingerprint of the source URL list at the last reconciliation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    /// Fingerprint of the manifest's own content, recomputed on every write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub img: Vec<ImageRecord>,
}

impl Manifest {
    pub fn valid_records(&self) -> impl Iterator<Item = &ImageRecord> {
        self.img.iter().filter(|record| record.is_valid())
    }

    /// URLs of the currently valid records, in deterministic order.
    pub fn valid_urls(&self) -> std::collections::BTreeSet<String> {
        self.valid_records()
            .map(|record| record.url.clone())
            .collect()
    }

    /// Drop every errored record.
    pub fn retain_valid(&mut self) {
        self.img.retain(|record| record.is_valid());
    }
}

/// Response contract: `{status, data}` with `data` null on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChooseResponse {
    pub status: ResponseStatus,
    pub data: Option<ImageRecord>,
}

impl ChooseResponse {
    pub fn success(record: ImageRecord) -> Self {
        Self {
            status: ResponseStatus::Success,
            data: Some(record),
        }
    }

    pub fn failure() -> Self {
        Self {
            status: ResponseStatus::Failure,
            data: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Failure,
}
