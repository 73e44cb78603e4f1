use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub web: WebConfig,
    pub storage: StorageConfig,
    pub shrink: ShrinkConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Filesystem root the application data lives under.
    pub root: PathBuf,
    /// Application directory relative to `root`.
    pub app_root: PathBuf,
    /// Source URL list file, relative to the application directory.
    pub urls_path: PathBuf,
    /// Directory compressed copies are written to, relative to the
    /// application directory.
    pub cache_dir: PathBuf,
    /// Public URL prefix substituted for the cache directory in served
    /// records.
    pub cache_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShrinkConfig {
    /// Compression API credential; compression is skipped entirely when
    /// absent.
    pub api_key: Option<String>,
    pub endpoint: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            web: WebConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            storage: StorageConfig {
                root: PathBuf::from("."),
                app_root: PathBuf::from("data"),
                urls_path: PathBuf::from("urls.txt"),
                cache_dir: PathBuf::from("cache"),
                cache_prefix: "cache/".to_string(),
            },
            shrink: ShrinkConfig {
                api_key: None,
                endpoint: "https://api.tinify.com/shrink".to_string(),
            },
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_file =
            std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".to_string());

        if std::path::Path::new(&config_file).exists() {
            let contents = std::fs::read_to_string(&config_file)?;
            Ok(toml::from_str(&contents)?)
        } else {
            let default_config = Self::default();
            let contents = toml::to_string_pretty(&default_config)?;
            std::fs::create_dir_all(default_config.app_dir())?;
            std::fs::write(&config_file, contents)?;
            Ok(default_config)
        }
    }

    /// Directory holding the URL list, manifest and cache.
    pub fn app_dir(&self) -> PathBuf {
        self.storage.root.join(&self.storage.app_root)
    }

    pub fn urls_file(&self) -> PathBuf {
        self.app_dir().join(&self.storage.urls_path)
    }

    pub fn manifest_file(&self) -> PathBuf {
        self.app_dir().join("manifest.json")
    }

    pub fn cache_path(&self) -> PathBuf {
        self.app_dir().join(&self.storage.cache_dir)
    }
}
