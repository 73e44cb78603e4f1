//! Compression of validated images through the external shrink API.
//!
//! Constructed only when a credential is configured; without one the whole
//! stage is skipped. Every failure stays on the individual record so one
//! bad image never aborts the batch, and cached records are never
//! resubmitted.

use chrono::Utc;
use reqwest::StatusCode;
use serde::Deserialize;
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::models::ImageRecord;
use crate::utils;

/// Status recorded when the request never produced a response.
const STATUS_UNREACHABLE: u16 = 599;
/// Status recorded when the API answered but its response was unusable.
const STATUS_BAD_UPSTREAM: u16 = 502;

pub struct CacheCompressor {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    cache_dir: PathBuf,
    cache_prefix: String,
}

#[derive(Debug, Deserialize)]
struct ShrinkResponse {
    output: ShrinkOutput,
}

#[derive(Debug, Deserialize)]
struct ShrinkOutput {
    url: String,
    #[serde(rename = "type")]
    mime_type: String,
}

impl CacheCompressor {
    pub fn new(
        client: reqwest::Client,
        endpoint: String,
        api_key: String,
        cache_dir: PathBuf,
        cache_prefix: String,
    ) -> Self {
        Self {
            client,
            endpoint,
            api_key,
            cache_dir,
            cache_prefix,
        }
    }

    /// Run every record through the compressor in order. Per-record errors
    /// are recorded and the batch continues.
    pub async fn compress_all(&self, records: &mut [ImageRecord]) {
        for record in records {
            self.compress(record).await;
        }
    }

    /// Submit one record to the shrink API and replace its URL with a local
    /// compressed copy. Already-cached records are skipped.
    async fn compress(&self, record: &mut ImageRecord) {
        if record.is_cached() {
            debug!("{} already cached, skipping", record.url);
            return;
        }

        debug!("Requesting compression for {}", record.url);
        let response = match self
            .client
            .post(&self.endpoint)
            .basic_auth("api", Some(&self.api_key))
            .json(&serde_json::json!({ "source": { "url": record.url } }))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("Shrink request for {} failed: {}", record.url, e);
                record.mark_error(STATUS_UNREACHABLE);
                return;
            }
        };

        record.original_url = Some(record.url.clone());
        record.last_cached = Some(
            response
                .headers()
                .get(reqwest::header::DATE)
                .and_then(|value| value.to_str().ok())
                .map(String::from)
                .unwrap_or_else(|| Utc::now().to_rfc3339()),
        );

        if response.status() != StatusCode::CREATED {
            debug!(
                "Shrink API returned {} for {}, continuing",
                response.status(),
                record.url
            );
            record.mark_error(response.status().as_u16());
            return;
        }

        let shrink: ShrinkResponse = match response.json().await {
            Ok(shrink) => shrink,
            Err(e) => {
                warn!("Unusable shrink response for {}: {}", record.url, e);
                record.mark_error(STATUS_BAD_UPSTREAM);
                return;
            }
        };

        let data = match self.download(&shrink.output.url).await {
            Ok(data) => data,
            Err(status) => {
                warn!(
                    "Failed to download compressed asset {} (status {})",
                    shrink.output.url, status
                );
                record.mark_error(status);
                return;
            }
        };

        let file_name = format!(
            "{}{}",
            utils::url_basename(&shrink.output.url),
            utils::extension_for_mime(&shrink.output.mime_type)
        );
        if let Err(e) = self.write_asset(&file_name, &data).await {
            // Leave the record pending so the next request retries the
            // write rather than excluding a perfectly valid image.
            warn!("Failed to write cache file {}: {}", file_name, e);
            return;
        }

        record.mark_cached(
            format!("{}{}", self.cache_prefix, file_name),
            shrink.output.mime_type,
        );
        debug!("Cached {} as {}", record.original_url.as_deref().unwrap_or(""), record.url);
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, u16> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| e.status().map(|s| s.as_u16()).unwrap_or(STATUS_UNREACHABLE))?;
        if !response.status().is_success() {
            return Err(response.status().as_u16());
        }
        response
            .bytes()
            .await
            .map(|data| data.to_vec())
            .map_err(|_| STATUS_BAD_UPSTREAM)
    }

    async fn write_asset(&self, file_name: &str, data: &[u8]) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.cache_dir).await?;
        tokio::fs::write(self.cache_dir.join(file_name), data).await
    }
}
