//! Harvest data model.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Extraction passes, in the order their results are returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhotoCategory {
    Thumbnail,
    Description,
    Comment,
}

impl PhotoCategory {
    pub const ALL: [PhotoCategory; 3] = [
        PhotoCategory::Thumbnail,
        PhotoCategory::Description,
        PhotoCategory::Comment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Thumbnail => "thumbnail",
            Self::Description => "description",
            Self::Comment => "comment",
        }
    }

    /// Parse from string (for CLI).
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "thumbnail" | "thumbnails" => Some(Self::Thumbnail),
            "description" => Some(Self::Description),
            "comment" | "comments" | "review" | "reviews" => Some(Self::Comment),
            _ => None,
        }
    }

    /// Requested categories in pass order, without duplicates.
    pub fn in_pass_order(requested: &[PhotoCategory]) -> Vec<PhotoCategory> {
        Self::ALL
            .into_iter()
            .filter(|c| requested.contains(c))
            .collect()
    }
}

impl fmt::Display for PhotoCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PhotoCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str(s).ok_or_else(|| {
            format!(
                "Invalid photo category '{}'. Valid options: thumbnail, description, comment",
                s
            )
        })
    }
}

/// A media URL as found in markup, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaReference {
    pub raw_source_url: String,
}

/// A downloaded photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestedPhoto {
    /// Final path segment of the normalized URL.
    pub id: String,
    /// Listing the photo belongs to.
    pub owner_id: String,
    /// Path returned by the downloader.
    pub local_path: PathBuf,
    pub category: PhotoCategory,
    /// Normalized URL the photo was downloaded from.
    pub source_url: String,
}
