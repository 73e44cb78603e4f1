//! Request orchestration: reconcile, validate, compress, then pick one
//! valid image at random.

use tracing::{debug, error, warn};

use crate::config::Config;
use crate::errors::AppError;
use crate::fingerprint;
use crate::manifest::ManifestStore;
use crate::models::{ChooseResponse, Manifest};
use crate::services::{CacheCompressor, ImageFetcher, ReconcileOutcome, SourceListReconciler};

pub struct ChooserService {
    store: ManifestStore,
    reconciler: SourceListReconciler,
    fetcher: ImageFetcher,
    compressor: Option<CacheCompressor>,
}

impl ChooserService {
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let client = ImageFetcher::build_client()?;

        let compressor = config.shrink.api_key.as_ref().map(|api_key| {
            CacheCompressor::new(
                client.clone(),
                config.shrink.endpoint.clone(),
                api_key.clone(),
                config.cache_path(),
                config.storage.cache_prefix.clone(),
            )
        });

        Ok(Self {
            store: ManifestStore::new(config.manifest_file(), config.urls_file()),
            reconciler: SourceListReconciler::new(
                config.cache_path(),
                config.storage.cache_prefix.clone(),
            ),
            fetcher: ImageFetcher::new(client),
            compressor,
        })
    }

    /// Handle one request: bring the manifest up to date, attempt to drain
    /// the uncompressed backlog, and select a random valid image. Never
    /// fails; an empty valid set yields a failure-status response.
    pub async fn respond(&self) -> ChooseResponse {
        let mut manifest = self.store.load_manifest().await;

        let outcome = self.reconciler.reconcile(&mut manifest, &self.store).await;
        if outcome == ReconcileOutcome::Rebuilt {
            self.validate_rebuilt(&mut manifest).await;
        }

        // Compression runs even on the hash-stable fast path so records
        // that previously failed or were never submitted get another shot.
        if let Some(compressor) = &self.compressor {
            compressor.compress_all(&mut manifest.img).await;
            if let Err(e) = self.store.save_manifest(&mut manifest).await {
                error!("Failed to persist manifest after compression: {}", e);
            }
        }

        self.select(&manifest)
    }

    /// Post-rebuild pass: validate every record, drop the invalid ones,
    /// rewrite the URL list to match, and persist. The stored hash is
    /// recomputed from the rewritten list so the next request takes the
    /// fast path.
    async fn validate_rebuilt(&self, manifest: &mut Manifest) {
        self.fetcher.validate_all(&mut manifest.img).await;
        manifest.retain_valid();

        if let Err(e) = self.store.save_urls(&manifest.valid_urls()).await {
            error!("Failed to rewrite URL list: {}", e);
        }
        match fingerprint::fingerprint_file(self.store.urls_path()) {
            Ok(hash) => manifest.hash = Some(hash),
            Err(e) => warn!("Failed to re-hash URL list: {}", e),
        }

        if let Err(e) = self.store.save_manifest(manifest).await {
            error!("Failed to persist manifest after validation: {}", e);
        }
    }

    fn select(&self, manifest: &Manifest) -> ChooseResponse {
        let valid: Vec<_> = manifest.valid_records().collect();
        if valid.is_empty() {
            debug!("No images to work with");
            return ChooseResponse::failure();
        }
        let chosen = valid[fastrand::usize(..valid.len())].clone();
        debug!("Chose {}", chosen.url);
        ChooseResponse::success(chosen)
    }
}
