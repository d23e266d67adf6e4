//! Listing navigation.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::browser::PageSurface;
use crate::config::{ConsentConfig, SiteConfig};
use crate::error::PageError;

const READY_POLL: Duration = Duration::from_millis(250);

/// Desktop and mobile addresses of one listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingTarget {
    pub owner_id: String,
    pub url: String,
    pub mobile_url: String,
}

impl ListingTarget {
    pub fn new(owner_id: &str, site: &SiteConfig) -> Self {
        Self {
            owner_id: owner_id.to_string(),
            url: site.listing_url(owner_id),
            mobile_url: site.mobile_listing_url(owner_id),
        }
    }

    /// Point the page contexts at this listing.
    ///
    /// Pages already showing the listing are left alone so a harvest can
    /// resume on a page that was prepared beforehand.
    pub async fn open<P>(
        &self,
        page: &P,
        mobile_page: Option<&P>,
        site: &SiteConfig,
        ready_timeout: Duration,
    ) -> Result<(), PageError>
    where
        P: PageSurface + ?Sized,
    {
        open_page(page, &self.url, site, ready_timeout).await?;
        if let Some(mobile) = mobile_page {
            open_page(mobile, &self.mobile_url, site, ready_timeout).await?;
        }
        Ok(())
    }
}

async fn open_page<P>(
    page: &P,
    url: &str,
    site: &SiteConfig,
    ready_timeout: Duration,
) -> Result<(), PageError>
where
    P: PageSurface + ?Sized,
{
    if !navigate_if_needed(page, url).await? {
        return Ok(());
    }
    wait_until_ready(page, ready_timeout).await?;
    if let Some(ref consent) = site.consent {
        accept_consent(page, consent).await?;
    }
    Ok(())
}

/// Navigate unless the page is already at `url`. Returns whether it navigated.
pub async fn navigate_if_needed<P>(page: &P, url: &str) -> Result<bool, PageError>
where
    P: PageSurface + ?Sized,
{
    if page.current_url().await?.as_deref() == Some(url) {
        debug!("Already at {}", url);
        return Ok(false);
    }
    info!("Navigating to {}", url);
    page.navigate(url).await?;
    Ok(true)
}

/// Poll `document.readyState` until the DOM is usable or `timeout` passes.
async fn wait_until_ready<P>(page: &P, timeout: Duration) -> Result<(), PageError>
where
    P: PageSurface + ?Sized,
{
    let deadline = Instant::now() + timeout;
    loop {
        let state = page.evaluate("document.readyState").await?;
        if matches!(state.as_str(), Some("interactive" | "complete")) {
            return Ok(());
        }
        if Instant::now() >= deadline {
            warn!("Timeout waiting for page ready state");
            return Ok(());
        }
        page.wait_timeout(READY_POLL).await;
    }
}

/// Accept the consent banner if it appears. Returns whether it was accepted.
pub async fn accept_consent<P>(page: &P, consent: &ConsentConfig) -> Result<bool, PageError>
where
    P: PageSurface + ?Sized,
{
    match page
        .wait_for_selector(&consent.banner, Duration::from_secs(consent.timeout))
        .await
    {
        Ok(_) => {}
        Err(PageError::Timeout { .. }) | Err(PageError::ElementNotFound(_)) => return Ok(false),
        Err(e) => return Err(e),
    }

    match page.click(&consent.accept).await {
        Ok(()) => {
            debug!("Accepted consent banner");
            Ok(true)
        }
        Err(PageError::ElementNotFound(selector)) => {
            warn!("Consent banner without accept button ({})", selector);
            Ok(false)
        }
        Err(e) => Err(e),
    }
}
