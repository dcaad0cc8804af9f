//! Bulk-data download and caching for the card store.
//!
//! Fetches the Scryfall bulk-data catalog, downloads a card file from an
//! allowlisted host with retries, replaces the previous file atomically,
//! and tracks freshness metadata next to it. The bulk file itself is a
//! single giant JSON array; [`import::import_cards`] streams it into the
//! store in batches instead of materializing it.

pub mod import;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use jiff::Timestamp;
use reqwest::blocking::{Client, Response};
use reqwest::redirect::Policy;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Hosts bulk data may be downloaded from. Redirects anywhere else abort
/// the download.
const ALLOWED_DOMAINS: &[&str] = &["api.scryfall.com", "data.scryfall.io"];

const BULK_DATA_ENDPOINT: &str = "https://api.scryfall.com/bulk-data";

/// Bulk data type imported by default. Oracle cards carry one entry per
/// distinct card, which is what a rules-text search wants.
pub const DEFAULT_DATA_TYPE: &str = "oracle_cards";

const MAX_REDIRECTS: usize = 5;
const MAX_RETRIES: u32 = 3;

/// One entry of the Scryfall bulk-data catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkEntry {
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub download_uri: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct BulkCatalog {
    #[serde(default)]
    data: Vec<BulkEntry>,
}

/// Freshness metadata written next to the downloaded file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Metadata {
    #[serde(default)]
    data_type: String,
    #[serde(default)]
    downloaded_at: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
    #[serde(default)]
    card_count: u64,
    #[serde(default)]
    filename: Option<String>,
}

/// Status of the local cache, as reported to the user.
#[derive(Debug, Clone, Serialize)]
pub struct DataStatus {
    pub last_updated: Option<String>,
    pub card_count: u64,
    pub version: Option<String>,
    pub stale: bool,
}

/// Manages downloading and caching of bulk card data in one directory.
pub struct DataManager {
    data_dir: PathBuf,
    client: Client,
}

impl DataManager {
    pub fn new(data_dir: impl Into<PathBuf>) -> Result<DataManager> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("create data directory {}", data_dir.display()))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            // Redirects are validated by hand against the allowlist.
            .redirect(Policy::none())
            .build()
            .context("build HTTP client")?;
        Ok(DataManager { data_dir, client })
    }

    fn metadata_path(&self) -> PathBuf {
        self.data_dir.join("metadata.json")
    }

    /// Path of the downloaded bulk file, if metadata records one.
    pub fn bulk_file_path(&self) -> Option<PathBuf> {
        let filename = self.load_metadata()?.filename?;
        let path = self.data_dir.join(filename);
        path.exists().then_some(path)
    }

    pub fn fetch_catalog(&self) -> Result<Vec<BulkEntry>> {
        let response = self.validated_get(BULK_DATA_ENDPOINT)?;
        let catalog: BulkCatalog = response
            .error_for_status()
            .context("bulk-data catalog request failed")?
            .json()
            .context("decode bulk-data catalog")?;
        Ok(catalog.data)
    }

    pub fn bulk_data_info(&self, data_type: &str) -> Result<Option<BulkEntry>> {
        Ok(self
            .fetch_catalog()?
            .into_iter()
            .find(|entry| entry.data_type == data_type))
    }

    /// Downloads the bulk file for `data_type`, retrying with exponential
    /// backoff, and atomically replaces any previous download.
    pub fn download_bulk_data(&self, data_type: &str) -> Result<PathBuf> {
        let info = self
            .bulk_data_info(data_type)?
            .ok_or_else(|| anyhow!("unknown bulk data type: {data_type}"))?;
        let url = info
            .download_uri
            .as_deref()
            .filter(|u| is_valid_download_url(u))
            .ok_or_else(|| anyhow!("invalid download URL: {:?}", info.download_uri))?;

        let filename = url
            .rsplit('/')
            .next()
            .filter(|name| is_safe_filename(name))
            .map(str::to_string)
            .unwrap_or_else(|| format!("{data_type}.json"));
        let output_path = self.data_dir.join(&filename);

        let mut last_error = None;
        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1));
                warn!(
                    attempt,
                    ?delay,
                    error = %last_error.as_ref().map(ToString::to_string).unwrap_or_default(),
                    "download attempt failed, retrying"
                );
                std::thread::sleep(delay);
            }
            match self.download_to(url, &output_path) {
                Ok(()) => {
                    info!(path = %output_path.display(), "bulk data downloaded");
                    self.write_metadata(&Metadata {
                        data_type: data_type.to_string(),
                        downloaded_at: Some(Timestamp::now().to_string()),
                        updated_at: info.updated_at.clone(),
                        card_count: 0,
                        filename: Some(filename.clone()),
                    })?;
                    return Ok(output_path);
                }
                Err(err) => last_error = Some(err),
            }
        }
        Err(last_error.expect("at least one attempt ran"))
            .with_context(|| format!("download failed after {} attempts", MAX_RETRIES + 1))
    }

    /// Streams the response into a temp file in the data directory, then
    /// renames over the target so a crash never leaves a torn file.
    fn download_to(&self, url: &str, output_path: &Path) -> Result<()> {
        let mut response = self.validated_get(url)?;
        if !response.status().is_success() {
            bail!("download returned HTTP {}", response.status());
        }
        let mut tmp = tempfile::NamedTempFile::new_in(&self.data_dir)
            .context("create temporary download file")?;
        io::copy(&mut response, tmp.as_file_mut()).context("write bulk data")?;
        tmp.persist(output_path)
            .with_context(|| format!("persist download to {}", output_path.display()))?;
        Ok(())
    }

    /// GET with redirects followed by hand so every hop stays inside the
    /// allowlist.
    fn validated_get(&self, url: &str) -> Result<Response> {
        let mut url = url.to_string();
        for _ in 0..MAX_REDIRECTS {
            let response = self
                .client
                .get(&url)
                .send()
                .with_context(|| format!("GET {url}"))?;
            if !response.status().is_redirection() {
                return Ok(response);
            }
            let location = response
                .headers()
                .get("location")
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| anyhow!("redirect response missing location header"))?;
            let next = if location.starts_with('/') {
                let base = Url::parse(&url).context("parse redirect base URL")?;
                base.join(location).context("resolve relative redirect")?.to_string()
            } else {
                location.to_string()
            };
            if !is_valid_download_url(&next) {
                bail!("redirect to non-allowed URL: {next}");
            }
            debug!(from = %url, to = %next, "following redirect");
            url = next;
        }
        bail!("too many redirects (max {MAX_REDIRECTS})")
    }

    /// Whether the cache needs a refresh: missing metadata, or an upstream
    /// `updated_at` that differs from ours. Network trouble reads as stale.
    pub fn is_cache_stale(&self) -> bool {
        let Some(metadata) = self.load_metadata() else {
            return true;
        };
        let Some(local_updated) = metadata.updated_at else {
            return true;
        };
        match self.bulk_data_info(&metadata.data_type) {
            Ok(Some(info)) => match info.updated_at {
                Some(server_updated) => server_updated != local_updated,
                None => true,
            },
            Ok(None) => true,
            Err(err) => {
                debug!(%err, "staleness check failed, assuming stale");
                true
            }
        }
    }

    pub fn status(&self) -> DataStatus {
        let Some(metadata) = self.load_metadata() else {
            return DataStatus {
                last_updated: None,
                card_count: 0,
                version: None,
                stale: true,
            };
        };
        DataStatus {
            last_updated: metadata.downloaded_at.clone(),
            card_count: metadata.card_count,
            version: metadata.updated_at.clone(),
            stale: self.is_cache_stale(),
        }
    }

    /// Records the number of cards imported from the current download.
    pub fn update_card_count(&self, count: u64) -> Result<()> {
        let mut metadata = self.load_metadata().unwrap_or_default();
        metadata.card_count = count;
        self.write_metadata(&metadata)
    }

    fn load_metadata(&self) -> Option<Metadata> {
        let bytes = fs::read(self.metadata_path()).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    /// Write-to-temp-then-rename so a crash mid-write cannot corrupt the
    /// metadata file.
    fn write_metadata(&self, metadata: &Metadata) -> Result<()> {
        let mut tmp = tempfile::NamedTempFile::new_in(&self.data_dir)
            .context("create temporary metadata file")?;
        serde_json::to_writer(tmp.as_file_mut(), metadata).context("serialize metadata")?;
        tmp.persist(self.metadata_path())
            .context("persist metadata file")?;
        Ok(())
    }
}

/// A download URL is acceptable only over https from an allowlisted host.
pub fn is_valid_download_url(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    parsed.scheme() == "https"
        && parsed
            .host_str()
            .is_some_and(|host| ALLOWED_DOMAINS.contains(&host))
}

/// Filenames taken from a URL must not traverse out of the data dir.
pub fn is_safe_filename(name: &str) -> bool {
    !name.is_empty()
        && !name.contains("..")
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}
