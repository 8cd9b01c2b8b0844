use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::constants::{HTTP_TIMEOUT_SECONDS, TARGET_TILE_SIZE};

/// Fetcher configuration: the allow-list, on-disk layout and tile
/// normalization parameters. Replaces what used to be process-wide
/// constants; an instance is passed explicitly into the fetcher.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    allowed_domains: Vec<String>,
    base_dir: PathBuf,
    tile_url_prefix: String,
    target_tile_size: u32,
    http_timeout_secs: u64,
}

impl FetchConfig {
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read fetch config {}", path.display()))?;
        let file: FetchConfigFile = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse fetch config {}", path.display()))?;
        Self::from_file(file)
    }

    pub fn with_base_dir(mut self, dir: PathBuf) -> Self {
        self.base_dir = dir;
        self
    }

    pub fn allowed_domains(&self) -> &[String] {
        &self.allowed_domains
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Only image sources starting with this prefix are treated as tiles.
    pub fn tile_url_prefix(&self) -> &str {
        &self.tile_url_prefix
    }

    /// Longest side of a normalized tile, in pixels.
    pub fn target_tile_size(&self) -> u32 {
        self.target_tile_size
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    fn from_file(file: FetchConfigFile) -> Result<Self> {
        if file.allowed_domains.is_empty() {
            bail!("allowed_domains must list at least one host");
        }
        if file.allowed_domains.iter().any(|d| d.trim().is_empty()) {
            bail!("allowed_domains must not contain empty entries");
        }
        if file.tile_url_prefix.trim().is_empty() {
            bail!("tile_url_prefix must not be empty");
        }
        if file.target_tile_size == 0 {
            bail!("target_tile_size must be greater than 0");
        }
        if file.http_timeout_secs == 0 {
            bail!("http_timeout_secs must be greater than 0");
        }
        Ok(Self {
            allowed_domains: file.allowed_domains,
            base_dir: file.base_dir,
            tile_url_prefix: file.tile_url_prefix,
            target_tile_size: file.target_tile_size,
            http_timeout_secs: file.http_timeout_secs,
        })
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            allowed_domains: default_allowed_domains(),
            base_dir: default_base_dir(),
            tile_url_prefix: default_tile_url_prefix(),
            target_tile_size: TARGET_TILE_SIZE,
            http_timeout_secs: HTTP_TIMEOUT_SECONDS,
        }
    }
}

#[derive(Debug, Deserialize)]
struct FetchConfigFile {
    #[serde(default = "default_allowed_domains")]
    allowed_domains: Vec<String>,
    #[serde(default = "default_base_dir")]
    base_dir: PathBuf,
    #[serde(default = "default_tile_url_prefix")]
    tile_url_prefix: String,
    #[serde(default = "default_target_tile_size")]
    target_tile_size: u32,
    #[serde(default = "default_http_timeout_secs")]
    http_timeout_secs: u64,
}

fn default_allowed_domains() -> Vec<String> {
    vec!["picsfromspace.com".to_string(), "mt.google.com".to_string()]
}

fn default_base_dir() -> PathBuf {
    PathBuf::from("download")
}

fn default_tile_url_prefix() -> String {
    "https://mt.google.com/vt/lyrs=y".to_string()
}

fn default_target_tile_size() -> u32 {
    TARGET_TILE_SIZE
}

fn default_http_timeout_secs() -> u64 {
    HTTP_TIMEOUT_SECONDS
}
