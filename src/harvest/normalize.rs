//! Media URL normalization.
//!
//! Listing images are served through a resizing CDN that encodes the
//! requested size in the file name, either as a second extension
//! (`photo.jpg_220x220.jpg`, `photo.jpg_.webp`) or as a `_WxH` token
//! (`photo_220x220.jpg`). Stripping both yields one key per underlying image.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use sha2::{Digest, Sha256};
use url::Url;

/// Everything after the first image extension of the last path segment.
static RESIZE_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(.*/[^/.]+\.(?:jpe?g|png|webp|gif))[^/]*$").expect("valid regex")
});

/// Trailing `_220x220` / `_640x640q75` tokens before the extension.
static SIZE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(.*/[^/]+?)(?:_\d+x\d+(?:q\d+)?)+(\.(?:jpe?g|png|webp|gif))$")
        .expect("valid regex")
});

static SCHEME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.-]*:").expect("valid regex"));

/// Deduplication key: the media URL with resize parameters removed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetKey(String);

impl AssetKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A media reference after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedAsset {
    pub key: AssetKey,
    pub url: Url,
    /// Final path segment, used as the local identifier.
    pub id: String,
}

impl NormalizedAsset {
    /// Local id that stays unique when another asset shares the file name.
    ///
    /// `a.jpg` becomes `a-<hash>.jpg`, where the hash is the first eight hex
    /// digits of the key's SHA-256, so repeated runs pick the same name.
    pub fn disambiguated_id(&self) -> String {
        let digest = hex::encode(Sha256::digest(self.key.as_str().as_bytes()));
        let tag = &digest[..8];
        match self.id.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => format!("{}-{}.{}", stem, tag, ext),
            _ => format!("{}-{}", self.id, tag),
        }
    }
}

/// Why a raw reference could not be normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    Empty,
    Unparseable(String),
    UnsupportedScheme(String),
    NoFileName,
}

impl fmt::Display for NormalizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty source"),
            Self::Unparseable(e) => write!(f, "unparseable URL: {}", e),
            Self::UnsupportedScheme(s) => write!(f, "unsupported scheme: {}", s),
            Self::NoFileName => write!(f, "URL has no file name"),
        }
    }
}

impl std::error::Error for NormalizeError {}

/// Prepend `default_scheme` to scheme-relative values (`//cdn.example.com/a.jpg`).
///
/// Anything else is returned unchanged.
pub fn with_default_scheme(raw: &str, default_scheme: &str) -> String {
    if raw.starts_with("//") {
        format!("{}{}", default_scheme, raw)
    } else {
        raw.to_string()
    }
}

/// Turn a raw `src` value into an absolute URL string.
///
/// Path-relative values (`/kf/a.jpg`, `kf/a.jpg`, `../a.png`) are resolved
/// against `page_url`; without one they cannot be placed on any host.
pub fn absolutize(
    raw: &str,
    page_url: Option<&Url>,
    default_scheme: &str,
) -> Result<String, NormalizeError> {
    if SCHEME.is_match(raw) || raw.starts_with("//") {
        return Ok(with_default_scheme(raw, default_scheme));
    }
    let base = page_url.ok_or_else(|| {
        NormalizeError::Unparseable(format!("relative URL {} without a page URL", raw))
    })?;
    base.join(raw)
        .map(String::from)
        .map_err(|e| NormalizeError::Unparseable(e.to_string()))
}

/// Remove resize and crop suffixes from a media URL string.
pub fn strip_resize_suffix(url: &str) -> String {
    let stripped = RESIZE_SUFFIX.replace(url, "$1");
    SIZE_TOKEN.replace(&stripped, "$1$2").into_owned()
}

/// Normalize a raw `src` value into a dedup key, download URL and local id.
///
/// Relative paths are rejected; see [`normalize_on_page`].
pub fn normalize(raw: &str, default_scheme: &str) -> Result<NormalizedAsset, NormalizeError> {
    normalize_on_page(raw, None, default_scheme)
}

/// [`normalize`], resolving path-relative values against the page they were found on.
pub fn normalize_on_page(
    raw: &str,
    page_url: Option<&Url>,
    default_scheme: &str,
) -> Result<NormalizedAsset, NormalizeError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(NormalizeError::Empty);
    }

    let absolute = absolutize(raw, page_url, default_scheme)?;
    let url = Url::parse(&strip_resize_suffix(&absolute))
        .map_err(|e| NormalizeError::Unparseable(e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(NormalizeError::UnsupportedScheme(url.scheme().to_string()));
    }

    let id = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .ok_or(NormalizeError::NoFileName)?;

    Ok(NormalizedAsset {
        key: AssetKey(url.as_str().to_string()),
        url,
        id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const HTTPS: &str = "https:";

    #[test]
    fn test_size_token_stripped() {
        let asset = normalize("https://img.example.com/kf/abc123_220x220.jpg", HTTPS).unwrap();
        assert_eq!(asset.url.as_str(), "https://img.example.com/kf/abc123.jpg");
        assert_eq!(asset.id, "abc123.jpg");
    }

    #[test]
    fn test_double_extension_stripped() {
        let asset = normalize(
            "https://ae01.alicdn.com/kf/H5f1c2d3e.jpg_640x640q90.jpg_.webp",
            HTTPS,
        )
        .unwrap();
        assert_eq!(asset.url.as_str(), "https://ae01.alicdn.com/kf/H5f1c2d3e.jpg");
        assert_eq!(asset.id, "H5f1c2d3e.jpg");
    }

    #[test]
    fn test_sizes_share_key() {
        let small = normalize("https://img.example.com/kf/x_50x50.png", HTTPS).unwrap();
        let large = normalize("https://img.example.com/kf/x_800x800.png", HTTPS).unwrap();
        assert_eq!(small.key, large.key);
        assert_eq!(small.id, "x.png");
    }

    #[test]
    fn test_scheme_relative_gets_default_scheme() {
        let asset = normalize("//ae01.alicdn.com/kf/abc.jpg_50x50.jpg", HTTPS).unwrap();
        assert_eq!(asset.url.as_str(), "https://ae01.alicdn.com/kf/abc.jpg");
    }

    #[test]
    fn test_query_suffix_stripped() {
        let asset = normalize("https://cdn.example.com/p/photo.jpeg?w=300&h=300", HTTPS).unwrap();
        assert_eq!(asset.url.as_str(), "https://cdn.example.com/p/photo.jpeg");
    }

    #[test]
    fn test_idempotent() {
        let samples = [
            "https://img.example.com/kf/abc123_220x220.jpg",
            "//ae01.alicdn.com/kf/H5f1c2d3e.jpg_640x640q90.jpg_.webp",
            "https://img.example.com/kf/a_10x10_20x20.png",
            "https://img.example.com/kf/a.b_10x10.jpg",
            "https://cdn.example.com/p/photo.jpeg?w=300",
            "https://cdn.example.com/p/plain.gif",
        ];
        for raw in samples {
            let once = normalize(raw, HTTPS).unwrap();
            let twice = normalize(once.url.as_str(), HTTPS).unwrap();
            assert_eq!(once, twice, "not idempotent for {}", raw);
        }
    }

    #[test]
    fn test_rejects_placeholders() {
        assert_eq!(normalize("   ", HTTPS), Err(NormalizeError::Empty));
        assert!(matches!(
            normalize("data:image/gif;base64,R0lGODlhAQABAAAAACw=", HTTPS),
            Err(NormalizeError::UnsupportedScheme(_))
        ));
        assert_eq!(
            normalize("https://cdn.example.com/", HTTPS),
            Err(NormalizeError::NoFileName)
        );
    }

    #[test]
    fn test_relative_paths_without_page_are_rejected() {
        for raw in ["/kf/abc_50x50.jpg", "kf/abc.jpg", "../img/abc.png"] {
            assert!(
                matches!(normalize(raw, HTTPS), Err(NormalizeError::Unparseable(_))),
                "{} should not normalize without a page URL",
                raw
            );
        }
    }

    #[test]
    fn test_relative_paths_resolve_against_page() {
        let page = Url::parse("https://www.example.com/item/1005.html").unwrap();

        let rooted = normalize_on_page("/kf/abc_50x50.jpg", Some(&page), HTTPS).unwrap();
        assert_eq!(rooted.url.as_str(), "https://www.example.com/kf/abc.jpg");
        assert_eq!(rooted.id, "abc.jpg");

        let sibling = normalize_on_page("kf/abc.jpg", Some(&page), HTTPS).unwrap();
        assert_eq!(sibling.url.as_str(), "https://www.example.com/item/kf/abc.jpg");

        let parent = normalize_on_page("../img/abc.png", Some(&page), HTTPS).unwrap();
        assert_eq!(parent.url.as_str(), "https://www.example.com/img/abc.png");
    }

    #[test]
    fn test_scheme_relative_ignores_page() {
        let page = Url::parse("http://www.example.com/item/1005.html").unwrap();
        let asset = normalize_on_page("//ae01.alicdn.com/kf/abc.jpg", Some(&page), HTTPS).unwrap();
        assert_eq!(asset.url.as_str(), "https://ae01.alicdn.com/kf/abc.jpg");
    }

    #[test]
    fn test_relative_path_on_blank_page() {
        let page = Url::parse("about:blank").unwrap();
        assert!(matches!(
            normalize_on_page("/kf/abc.jpg", Some(&page), HTTPS),
            Err(NormalizeError::Unparseable(_))
        ));
    }

    #[test]
    fn test_disambiguated_id_keeps_extension() {
        let first = normalize("https://img.example.com/kf/a.jpg", HTTPS).unwrap();
        let second = normalize("https://img.example.com/kf2/a.jpg", HTTPS).unwrap();
        assert_eq!(first.id, second.id);

        let renamed = second.disambiguated_id();
        assert!(renamed.starts_with("a-") && renamed.ends_with(".jpg"), "{}", renamed);
        assert_eq!(renamed.len(), "a-12345678.jpg".len());
        assert_ne!(renamed, first.disambiguated_id());
        assert_eq!(renamed, second.disambiguated_id());
    }
}
