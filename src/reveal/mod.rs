//! Incremental reveal of lazily rendered content.
//!
//! Content is revealed by scrolling a region in randomized steps, each a
//! fraction of what is left, and re-measuring the region after every pause
//! since lazy loading keeps growing it. The loop ends once less than
//! [`SETTLED_PERCENT`] of the extent remains uncovered, or as soon as the
//! caller's stop condition holds.

mod expand;
mod pacer;

pub use expand::ExpansionController;
pub use pacer::{Pacer, RandomPacer, MAX_STEP_FRACTION, PAUSE_RANGE_MS};

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::browser::PageSurface;
use crate::config::RevealConfig;
use crate::error::{HarvestError, HarvestResult};

/// Uncovered share of the extent, in percent, below which a region counts as revealed.
pub const SETTLED_PERCENT: f64 = 2.0;

/// What to scroll.
pub enum ScrollRegion<'a, E> {
    /// The top-level document, scrolled through the window offset.
    Document,
    /// A nested scrollable element, scrolled by relative deltas.
    Element { element: &'a E, label: &'a str },
}

impl<E> ScrollRegion<'_, E> {
    pub fn label(&self) -> &str {
        match self {
            Self::Document => "document",
            Self::Element { label, .. } => label,
        }
    }
}

/// Condition that ends a reveal early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopCondition<'a> {
    /// Reveal until the region is exhausted.
    None,
    /// Stop as soon as an element matching the selector exists.
    ElementPresent(&'a str),
}

/// Ceilings that keep a reveal from running forever on endlessly growing content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealLimits {
    pub max_steps: usize,
    pub max_elapsed: Duration,
}

impl Default for RevealLimits {
    fn default() -> Self {
        Self::from(&RevealConfig::default())
    }
}

impl From<&RevealConfig> for RevealLimits {
    fn from(config: &RevealConfig) -> Self {
        Self {
            max_steps: config.max_steps,
            max_elapsed: config.max_elapsed(),
        }
    }
}

/// Progress through one region.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RevealState {
    pub covered_delta: f64,
    pub total_scrollable_extent: f64,
}

impl RevealState {
    pub fn remaining(&self) -> f64 {
        (self.total_scrollable_extent - self.covered_delta).max(0.0)
    }

    /// An empty region is fully revealed.
    pub fn remaining_percent(&self) -> f64 {
        if self.total_scrollable_extent <= 0.0 {
            return 0.0;
        }
        self.remaining() / self.total_scrollable_extent * 100.0
    }
}

/// Why a reveal returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealOutcome {
    Exhausted,
    StopConditionMet,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RevealSummary {
    pub outcome: RevealOutcome,
    pub steps: usize,
    pub state: RevealState,
}

/// Drives the reveal loop over a page.
pub struct RevealController<'a> {
    pacer: &'a dyn Pacer,
    limits: RevealLimits,
}

impl<'a> RevealController<'a> {
    pub fn new(pacer: &'a dyn Pacer, limits: RevealLimits) -> Self {
        Self { pacer, limits }
    }

    /// Reveal `region` until it is exhausted or `stop` holds.
    pub async fn reveal_until<P>(
        &self,
        page: &P,
        region: ScrollRegion<'_, P::Element>,
        stop: StopCondition<'_>,
    ) -> HarvestResult<RevealSummary>
    where
        P: PageSurface + ?Sized,
    {
        let started = Instant::now();
        let mut steps = 0;
        let mut state = RevealState {
            covered_delta: 0.0,
            total_scrollable_extent: measure(page, &region).await?,
        };

        loop {
            if let StopCondition::ElementPresent(selector) = stop {
                if page.query(selector).await?.is_some() {
                    debug!(
                        "Stop condition {} met in {} after {} steps",
                        selector,
                        region.label(),
                        steps
                    );
                    return Ok(RevealSummary {
                        outcome: RevealOutcome::StopConditionMet,
                        steps,
                        state,
                    });
                }
            }

            if state.remaining_percent() < SETTLED_PERCENT {
                debug!("Revealed {} in {} steps", region.label(), steps);
                return Ok(RevealSummary {
                    outcome: RevealOutcome::Exhausted,
                    steps,
                    state,
                });
            }

            let elapsed = started.elapsed();
            if steps >= self.limits.max_steps || elapsed >= self.limits.max_elapsed {
                return Err(HarvestError::RevealTimeout {
                    region: region.label().to_string(),
                    steps,
                    elapsed,
                });
            }

            let step = state.remaining() * self.pacer.step_fraction();
            state.covered_delta += step;
            match region {
                ScrollRegion::Document => page.scroll_document_to(state.covered_delta).await?,
                ScrollRegion::Element { element, .. } => {
                    page.scroll_element_by(element, step).await?
                }
            }
            steps += 1;

            let pause = self.pacer.pause();
            debug!("Scrolled {} by {:.0}px, waiting {:?}", region.label(), step, pause);
            page.wait_timeout(pause).await;

            state.total_scrollable_extent = measure(page, &region).await?;
            debug!(
                "Remaining in {}: {:.0}px ({:.1}%)",
                region.label(),
                state.remaining(),
                state.remaining_percent()
            );
        }
    }
}

async fn measure<P>(page: &P, region: &ScrollRegion<'_, P::Element>) -> HarvestResult<f64>
where
    P: PageSurface + ?Sized,
{
    let metrics = match region {
        ScrollRegion::Document => page.document_metrics().await?,
        ScrollRegion::Element { element, .. } => page.element_metrics(element).await?,
    };
    Ok(metrics.scroll_height)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remaining_percent() {
        let state = RevealState {
            covered_delta: 250.0,
            total_scrollable_extent: 1000.0,
        };
        assert_eq!(state.remaining(), 750.0);
        assert_eq!(state.remaining_percent(), 75.0);
    }

    #[test]
    fn test_empty_region_is_revealed() {
        let state = RevealState::default();
        assert_eq!(state.remaining_percent(), 0.0);
    }

    #[test]
    fn test_overshoot_clamps_to_zero() {
        let state = RevealState {
            covered_delta: 1200.0,
            total_scrollable_extent: 1000.0,
        };
        assert_eq!(state.remaining(), 0.0);
        assert!(state.remaining_percent() < SETTLED_PERCENT);
    }

    #[test]
    fn test_limits_from_config() {
        let config = RevealConfig {
            max_steps: 12,
            max_elapsed: 60,
            ..Default::default()
        };
        let limits = RevealLimits::from(&config);
        assert_eq!(limits.max_steps, 12);
        assert_eq!(limits.max_elapsed, Duration::from_secs(60));
    }
}
