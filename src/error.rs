//! Error types for page automation and harvesting.

use std::time::Duration;

use thiserror::Error;

use crate::layout::LayoutVariant;

/// Failures reported by a [`PageSurface`](crate::browser::PageSurface) implementation.
#[derive(Debug, Error)]
pub enum PageError {
    #[error("Timed out after {timeout:?} waiting for selector: {selector}")]
    Timeout { selector: String, timeout: Duration },
    #[error("Element not found: {0}")]
    ElementNotFound(String),
    #[error("Script evaluation failed: {0}")]
    Script(String),
    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },
    #[error("Browser error: {0}")]
    Backend(String),
}

/// Errors that abort a harvest pass.
///
/// Element- and asset-level problems (missing attributes, failed downloads)
/// are not represented here; they surface as
/// [`SkipReason`](crate::harvest::SkipReason) events and the pass continues.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("No layout variant recognized in {region} (probed {probed:?})")]
    LayoutNotRecognized {
        region: String,
        probed: Vec<LayoutVariant>,
    },
    #[error("Reveal of {region} did not settle after {steps} steps ({elapsed:?})")]
    RevealTimeout {
        region: String,
        steps: usize,
        elapsed: Duration,
    },
    #[error("Page automation failed: {0}")]
    Page(#[from] PageError),
}

pub type HarvestResult<T> = std::result::Result<T, HarvestError>;

/// Session store failures.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No stored session for identifier {0}")]
    NotFound(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed session file: {0}")]
    Json(#[from] serde_json::Error),
}
