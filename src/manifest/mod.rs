//! Persistence for the two state files: the JSON manifest and the
//! line-oriented source URL list.
//!
//! Reads never fail the request. A missing file is the normal first-run
//! case and a corrupt one degrades to the empty default, so reconciliation
//! simply proceeds as a full rebuild.

use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

use crate::errors::AppError;
use crate::fingerprint;
use crate::models::Manifest;

pub struct ManifestStore {
    manifest_path: PathBuf,
    urls_path: PathBuf,
}

impl ManifestStore {
    pub fn new(manifest_path: PathBuf, urls_path: PathBuf) -> Self {
        Self {
            manifest_path,
            urls_path,
        }
    }

    pub fn urls_path(&self) -> &Path {
        &self.urls_path
    }

    /// Read the persisted manifest, falling back to the empty default on
    /// any failure. Missing and corrupt files are distinguished only in the
    /// logs; both trigger a full rebuild downstream.
    pub async fn load_manifest(&self) -> Manifest {
        match fs::read(&self.manifest_path).await {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(manifest) => manifest,
                Err(e) => {
                    warn!(
                        "Corrupt manifest at {}: {}, starting from empty",
                        self.manifest_path.display(),
                        e
                    );
                    Manifest::default()
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No manifest at {} yet", self.manifest_path.display());
                Manifest::default()
            }
            Err(e) => {
                warn!(
                    "Failed to read manifest at {}: {}, starting from empty",
                    self.manifest_path.display(),
                    e
                );
                Manifest::default()
            }
        }
    }

    /// Persist the manifest, restamping `id` with the fingerprint of the
    /// manifest content (the `id` field itself excluded, so identical
    /// content always yields an identical id). Written via a temp file and
    /// rename so a concurrent reader never sees a truncated manifest.
    pub async fn save_manifest(&self, manifest: &mut Manifest) -> Result<(), AppError> {
        let mut unstamped = manifest.clone();
        unstamped.id = None;
        manifest.id = Some(fingerprint::fingerprint_record(&unstamped)?);

        let bytes = serde_json::to_vec(manifest)?;
        let tmp = self.manifest_path.with_extension("json.tmp");
        fs::write(&tmp, &bytes).await?;
        fs::rename(&tmp, &self.manifest_path).await?;
        debug!("Wrote manifest to {}", self.manifest_path.display());
        Ok(())
    }

    /// Read the source URL list: one URL per line, trimmed, duplicates
    /// collapsed. Missing or unreadable files yield the empty set.
    pub async fn load_urls(&self) -> BTreeSet<String> {
        match fs::read_to_string(&self.urls_path).await {
            Ok(contents) => contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(String::from)
                .collect(),
            Err(e) => {
                if e.kind() != ErrorKind::NotFound {
                    warn!("Failed to read {}: {}", self.urls_path.display(), e);
                }
                BTreeSet::new()
            }
        }
    }

    /// Rewrite the source URL list, one newline-terminated URL per entry.
    pub async fn save_urls(&self, urls: &BTreeSet<String>) -> Result<(), AppError> {
        let mut contents = String::new();
        for url in urls {
            contents.push_str(url);
            contents.push('\n');
        }
        fs::write(&self.urls_path, contents).await?;
        Ok(())
    }
}
