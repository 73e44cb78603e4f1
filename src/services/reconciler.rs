//! Hash-gated reconciliation of the manifest against the source URL list.
//!
//! The fingerprint check is the idempotence guarantee: while the source
//! list is unchanged, repeated requests do no disk or network work beyond
//! computing the digest.

use std::path::PathBuf;
use tracing::{debug, warn};

use crate::fingerprint;
use crate::manifest::ManifestStore;
use crate::models::{ImageRecord, Manifest};
use crate::utils;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Source list fingerprint matched the manifest; nothing was touched.
    Unchanged,
    /// The record list was rebuilt and still needs validation.
    Rebuilt,
}

pub struct SourceListReconciler {
    cache_dir: PathBuf,
    cache_prefix: String,
}

impl SourceListReconciler {
    pub fn new(cache_dir: PathBuf, cache_prefix: String) -> Self {
        Self {
            cache_dir,
            cache_prefix,
        }
    }

    /// Compare the source list fingerprint against the manifest and rebuild
    /// the record list on mismatch. A missing URL list hashes as empty
    /// content so first runs behave like an empty source list rather than
    /// failing.
    pub async fn reconcile(
        &self,
        manifest: &mut Manifest,
        store: &ManifestStore,
    ) -> ReconcileOutcome {
        let urls_hash = match fingerprint::fingerprint_file(store.urls_path()) {
            Ok(hash) => hash,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to hash {}: {}", store.urls_path().display(), e);
                }
                fingerprint::fingerprint_bytes(b"")
            }
        };

        if manifest.hash.as_deref() == Some(urls_hash.as_str()) {
            debug!("Source list unchanged, keeping manifest as-is");
            return ReconcileOutcome::Unchanged;
        }

        debug!("Source list changed, rebuilding record list");
        manifest.hash = Some(urls_hash);

        let urls = store.load_urls().await;
        let mut records: Vec<ImageRecord> = urls.into_iter().map(ImageRecord::new).collect();

        // Merge in whatever already sits in the cache directory; a cached
        // entry replaces a pending record with the same URL so URLs stay
        // unique within the manifest.
        for cached in self.scan_cache_dir().await {
            match records.iter_mut().find(|record| record.url == cached.url) {
                Some(slot) => *slot = cached,
                None => records.push(cached),
            }
        }

        manifest.img = records;
        ReconcileOutcome::Rebuilt
    }

    /// Records for assets already present in the cache directory, in
    /// file-name order. Each is cached by definition, with its MIME type
    /// inferred from the extension.
    async fn scan_cache_dir(&self) -> Vec<ImageRecord> {
        let mut names = Vec::new();
        match tokio::fs::read_dir(&self.cache_dir).await {
            Ok(mut entries) => {
                while let Ok(Some(entry)) = entries.next_entry().await {
                    if entry.file_type().await.map(|t| t.is_file()).unwrap_or(false) {
                        names.push(entry.file_name().to_string_lossy().into_owned());
                    }
                }
            }
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to scan {}: {}", self.cache_dir.display(), e);
                }
                return Vec::new();
            }
        }
        names.sort();

        names
            .into_iter()
            .map(|name| {
                let mime_type = name
                    .rsplit('.')
                    .next()
                    .and_then(utils::mime_for_extension)
                    .map(String::from);
                ImageRecord::cached_local(format!("{}{}", self.cache_prefix, name), mime_type)
            })
            .collect()
    }
}
