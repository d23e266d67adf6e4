//! Asset download callback and the default HTTP implementation.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;
use url::Url;

use crate::config::BrowserEngineConfig;
use crate::harvest::PhotoCategory;

/// One asset the pipeline wants persisted.
#[derive(Debug, Clone, Copy)]
pub struct DownloadRequest<'a> {
    pub owner_id: &'a str,
    pub category: PhotoCategory,
    /// Local identifier derived from the normalized URL.
    pub asset_id: &'a str,
    /// Normalized asset URL.
    pub url: &'a Url,
}

/// Persists an asset and returns where it ended up.
///
/// Failures are reported per asset; the pipeline skips the asset and
/// carries on. Retrying is up to the implementation.
#[async_trait]
pub trait AssetDownloader: Send + Sync {
    async fn download(&self, request: &DownloadRequest<'_>) -> Result<PathBuf>;
}

/// Downloads assets over HTTP into `{root}/{owner_id}/{category}/{asset_id}`.
pub struct HttpDownloader {
    client: reqwest::Client,
    root: PathBuf,
}

impl HttpDownloader {
    pub fn new(root: impl Into<PathBuf>, browser: &BrowserEngineConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(browser.user_agent.clone())
            .timeout(Duration::from_secs(browser.timeout));

        if let Some(ref proxy) = browser.proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }

        Ok(Self {
            client: builder.build().context("Failed to build HTTP client")?,
            root: root.into(),
        })
    }

    /// Where an asset is stored.
    pub fn target_path(&self, request: &DownloadRequest<'_>) -> PathBuf {
        self.root
            .join(sanitize_filename(request.owner_id))
            .join(request.category.as_str())
            .join(sanitize_filename(request.asset_id))
    }
}

#[async_trait]
impl AssetDownloader for HttpDownloader {
    async fn download(&self, request: &DownloadRequest<'_>) -> Result<PathBuf> {
        let path = self.target_path(request);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            debug!("Already downloaded {} to {}", request.url, path.display());
            return Ok(path);
        }

        debug!("Downloading {}", request.url);
        let bytes = self
            .client
            .get(request.url.clone())
            .send()
            .await
            .with_context(|| format!("Request to {} failed", request.url))?
            .error_for_status()?
            .bytes()
            .await
            .with_context(|| format!("Failed to read body of {}", request.url))?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let partial = path.with_extension("part");
        tokio::fs::write(&partial, &bytes).await?;
        tokio::fs::rename(&partial, &path).await?;

        Ok(path)
    }
}

/// Replace characters that are unsafe in file names.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("abc123.jpg"), "abc123.jpg");
        assert_eq!(sanitize_filename("../etc/passwd"), "_etc_passwd");
        assert_eq!(sanitize_filename("a b?c.png"), "a_b_c.png");
        assert_eq!(sanitize_filename(""), "_");
    }

    #[test]
    fn test_target_path() {
        let dir = tempdir().unwrap();
        let downloader = HttpDownloader::new(dir.path(), &BrowserEngineConfig::default()).unwrap();
        let url = Url::parse("https://img.example.com/kf/abc123.jpg").unwrap();
        let request = DownloadRequest {
            owner_id: "1005",
            category: PhotoCategory::Thumbnail,
            asset_id: "abc123.jpg",
            url: &url,
        };
        assert_eq!(
            downloader.target_path(&request),
            dir.path().join("1005").join("thumbnail").join("abc123.jpg")
        );
    }

    #[tokio::test]
    async fn test_existing_file_is_not_fetched_again() {
        let dir = tempdir().unwrap();
        let downloader = HttpDownloader::new(dir.path(), &BrowserEngineConfig::default()).unwrap();
        // Unroutable host: any network attempt would fail the test.
        let url = Url::parse("http://127.0.0.1:9/kf/abc123.jpg").unwrap();
        let request = DownloadRequest {
            owner_id: "1005",
            category: PhotoCategory::Comment,
            asset_id: "abc123.jpg",
            url: &url,
        };
        let existing = downloader.target_path(&request);
        std::fs::create_dir_all(existing.parent().unwrap()).unwrap();
        std::fs::write(&existing, b"jpeg").unwrap();

        let path = downloader.download(&request).await.unwrap();
        assert_eq!(path, existing);
    }
}
