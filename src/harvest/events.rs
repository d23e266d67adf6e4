//! Structured harvest events.
//!
//! The pipeline reports progress and non-fatal problems through a
//! [`HarvestObserver`]. [`TracingObserver`] forwards everything to `tracing`.

use std::fmt;

use tracing::{debug, info, warn};

use super::types::PhotoCategory;
use crate::layout::LayoutVariant;
use crate::reveal::RevealOutcome;

/// Why an element or asset was left out of a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// A matched element lacked its source attribute.
    AttributeMissing { attribute: String },
    /// The attribute value could not be turned into a download URL.
    InvalidUrl { raw: String, reason: String },
    /// The downloader failed for this asset.
    DownloadFailed { url: String, error: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AttributeMissing { attribute } => {
                write!(f, "image element without {} attribute", attribute)
            }
            Self::InvalidUrl { raw, reason } => write!(f, "invalid media URL {}: {}", raw, reason),
            Self::DownloadFailed { url, error } => write!(f, "download of {} failed: {}", url, error),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HarvestEvent {
    PassStarted {
        owner_id: String,
        category: PhotoCategory,
    },
    VariantDetected {
        owner_id: String,
        region: String,
        variant: LayoutVariant,
    },
    RegionRevealed {
        owner_id: String,
        category: PhotoCategory,
        region: String,
        steps: usize,
        outcome: RevealOutcome,
    },
    PanelExpanded {
        owner_id: String,
        region: String,
        rounds: usize,
    },
    AssetSkipped {
        owner_id: String,
        category: PhotoCategory,
        reason: SkipReason,
    },
    PassCompleted {
        owner_id: String,
        category: PhotoCategory,
        found: usize,
        harvested: usize,
    },
    PassFailed {
        owner_id: String,
        category: PhotoCategory,
        error: String,
    },
}

/// Receives harvest events.
pub trait HarvestObserver: Send + Sync {
    fn on_event(&self, event: &HarvestEvent);
}

/// Observer that logs every event through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl HarvestObserver for TracingObserver {
    fn on_event(&self, event: &HarvestEvent) {
        match event {
            HarvestEvent::PassStarted { owner_id, category } => {
                info!(owner_id = %owner_id, category = %category, "Harvest pass started");
            }
            HarvestEvent::VariantDetected {
                owner_id,
                region,
                variant,
            } => {
                info!(owner_id = %owner_id, region = %region, variant = %variant, "Layout variant detected");
            }
            HarvestEvent::RegionRevealed {
                owner_id,
                category,
                region,
                steps,
                outcome,
            } => {
                debug!(
                    owner_id = %owner_id,
                    category = %category,
                    region = %region,
                    steps,
                    outcome = ?outcome,
                    "Region revealed"
                );
            }
            HarvestEvent::PanelExpanded {
                owner_id,
                region,
                rounds,
            } => {
                debug!(owner_id = %owner_id, region = %region, rounds, "Panel expanded");
            }
            HarvestEvent::AssetSkipped {
                owner_id,
                category,
                reason,
            } => {
                warn!(owner_id = %owner_id, category = %category, "Skipped asset: {}", reason);
            }
            HarvestEvent::PassCompleted {
                owner_id,
                category,
                found,
                harvested,
            } => {
                info!(
                    owner_id = %owner_id,
                    category = %category,
                    found,
                    harvested,
                    "Harvest pass completed"
                );
            }
            HarvestEvent::PassFailed {
                owner_id,
                category,
                error,
            } => {
                warn!(owner_id = %owner_id, category = %category, "Harvest pass failed: {}", error);
            }
        }
    }
}
