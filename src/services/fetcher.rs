//! Per-record validation fetch.
//!
//! Each uncached record gets a single GET; only the status line and headers
//! are inspected, the body is never read. Failures are recorded on the
//! record, never propagated.

use tracing::debug;

use crate::errors::AppError;
use crate::models::ImageRecord;

/// Status recorded when the request never produced a response (DNS failure,
/// refused connection, timeout).
const STATUS_UNREACHABLE: u16 = 599;

const DEFAULT_MIME_TYPE: &str = "image/jpeg";

pub struct ImageFetcher {
    client: reqwest::Client,
}

impl ImageFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Build the shared HTTP client used for validation and compression.
    pub fn build_client() -> Result<reqwest::Client, AppError> {
        Ok(reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent(concat!("photo-chooser/", env!("CARGO_PKG_VERSION")))
            .build()?)
    }

    /// Validate every record in order. Records are independent; sequential
    /// execution keeps log output readable for the handful of URLs this
    /// service manages.
    pub async fn validate_all(&self, records: &mut [ImageRecord]) {
        for record in records {
            self.validate(record).await;
        }
    }

    /// Check that a record's URL still exists. Cached records pass through
    /// untouched; a non-success status marks the record errored; success
    /// clears any prior error and captures the declared content type.
    pub async fn validate(&self, record: &mut ImageRecord) {
        if record.is_cached() {
            return;
        }

        debug!("Fetching {}", record.url);
        match self.client.get(&record.url).send().await {
            Ok(response) if response.status().is_success() => {
                let mime_type = response
                    .headers()
                    .get(reqwest::header::CONTENT_TYPE)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or(DEFAULT_MIME_TYPE)
                    .to_string();
                debug!("Successfully fetched {}", record.url);
                record.mark_fetched(mime_type);
            }
            Ok(response) => {
                debug!("Unable to fetch {}: {}", record.url, response.status());
                record.mark_error(response.status().as_u16());
            }
            Err(e) => {
                debug!("Unable to fetch {}: {}", record.url, e);
                let status = e
                    .status()
                    .map(|status| status.as_u16())
                    .unwrap_or(STATUS_UNREACHABLE);
                record.mark_error(status);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CacheState;

    #[tokio::test]
    async fn cached_record_is_skipped_without_any_request() {
        // The URL is unroutable; a request attempt would mark an error.
        let mut record =
            ImageRecord::cached_local("cache/a.png", Some("image/png".to_string()));
        let fetcher = ImageFetcher::new(ImageFetcher::build_client().unwrap());

        let before = record.clone();
        fetcher.validate(&mut record).await;
        assert_eq!(record, before);
    }

    #[tokio::test]
    async fn unreachable_host_marks_record_errored() {
        let mut record = ImageRecord::new("http://127.0.0.1:1/missing.jpg");
        let fetcher = ImageFetcher::new(ImageFetcher::build_client().unwrap());

        fetcher.validate(&mut record).await;
        assert_eq!(record.state, CacheState::Errored(STATUS_UNREACHABLE));
        assert!(!record.is_valid());
    }
}
