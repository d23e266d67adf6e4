//! Layout variant detection.
//!
//! A listing renders with one of several mutually exclusive templates. Each
//! template has a marker element; the detector races a bounded wait for every
//! marker and reports the first one that shows up.

use std::fmt;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::browser::PageSurface;
use crate::config::LayoutSelectors;
use crate::error::{HarvestError, HarvestResult, PageError};

/// Known document layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutVariant {
    Modern,
    Classical,
}

impl LayoutVariant {
    /// Every known variant.
    pub const ALL: [LayoutVariant; 2] = [LayoutVariant::Modern, LayoutVariant::Classical];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Modern => "modern",
            Self::Classical => "classical",
        }
    }
}

impl fmt::Display for LayoutVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Probes a page for layout variant markers.
pub struct LayoutDetector<'a> {
    selectors: &'a LayoutSelectors,
    probe_timeout: Duration,
}

impl<'a> LayoutDetector<'a> {
    pub fn new(selectors: &'a LayoutSelectors, probe_timeout: Duration) -> Self {
        Self {
            selectors,
            probe_timeout,
        }
    }

    /// Does `variant`'s marker become visible within the probe timeout?
    ///
    /// A timeout is a negative answer, not an error. Other page failures
    /// propagate.
    pub async fn probe<P>(&self, page: &P, variant: LayoutVariant) -> Result<bool, PageError>
    where
        P: PageSurface + ?Sized,
    {
        let marker = &self.selectors.for_variant(variant).marker;
        match page.wait_for_selector(marker, self.probe_timeout).await {
            Ok(_) => Ok(true),
            Err(PageError::Timeout { .. }) | Err(PageError::ElementNotFound(_)) => {
                debug!("No {} marker ({}) within {:?}", variant, marker, self.probe_timeout);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Determine which variant `region` uses.
    ///
    /// All probes run concurrently; the first positive probe wins and the
    /// rest are dropped. Fails with [`HarvestError::LayoutNotRecognized`] when
    /// every probe times out.
    pub async fn detect<P>(&self, page: &P, region: &str) -> HarvestResult<LayoutVariant>
    where
        P: PageSurface + ?Sized,
    {
        let mut probes: FuturesUnordered<_> = LayoutVariant::ALL
            .iter()
            .map(|&variant| async move { (variant, self.probe(page, variant).await) })
            .collect();

        while let Some((variant, outcome)) = probes.next().await {
            if outcome? {
                debug!("Detected {} layout in {}", variant, region);
                return Ok(variant);
            }
        }

        Err(HarvestError::LayoutNotRecognized {
            region: region.to_string(),
            probed: LayoutVariant::ALL.to_vec(),
        })
    }
}
