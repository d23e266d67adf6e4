//! Expansion loops over "view more" style controls.

use tokio::time::Instant;
use tracing::debug;

use super::{RevealController, ScrollRegion, StopCondition};
use crate::browser::PageSurface;
use crate::error::{HarvestError, HarvestResult};

/// Repeatedly reveals a panel and activates its expand trigger until the
/// trigger reports it is disabled.
pub struct ExpansionController<'r, 'a> {
    reveal: &'r RevealController<'a>,
    max_rounds: usize,
}

impl<'r, 'a> ExpansionController<'r, 'a> {
    pub fn new(reveal: &'r RevealController<'a>, max_rounds: usize) -> Self {
        Self { reveal, max_rounds }
    }

    /// Expand `panel` until `disabled_marker` matches.
    ///
    /// The panel is fully revealed before every activation so the trigger is
    /// in view and the previous batch has rendered. A missing trigger ends
    /// the loop the same way the disabled marker does. Returns the number of
    /// activations.
    pub async fn expand_fully<P>(
        &self,
        page: &P,
        panel: &P::Element,
        label: &str,
        expand_trigger: &str,
        disabled_marker: &str,
    ) -> HarvestResult<usize>
    where
        P: PageSurface + ?Sized,
    {
        let started = Instant::now();
        let mut rounds = 0;

        self.reveal_panel(page, panel, label).await?;

        while page.query(disabled_marker).await?.is_none() {
            let Some(trigger) = page.query(expand_trigger).await? else {
                debug!("No {} trigger left in {}", expand_trigger, label);
                break;
            };

            if rounds >= self.max_rounds {
                return Err(HarvestError::RevealTimeout {
                    region: label.to_string(),
                    steps: rounds,
                    elapsed: started.elapsed(),
                });
            }

            page.click_element(&trigger).await?;
            rounds += 1;
            debug!("Expanded {} (round {})", label, rounds);

            self.reveal_panel(page, panel, label).await?;
        }

        Ok(rounds)
    }

    async fn reveal_panel<P>(&self, page: &P, panel: &P::Element, label: &str) -> HarvestResult<()>
    where
        P: PageSurface + ?Sized,
    {
        self.reveal
            .reveal_until(
                page,
                ScrollRegion::Element {
                    element: panel,
                    label,
                },
                StopCondition::None,
            )
            .await?;
        Ok(())
    }
}
