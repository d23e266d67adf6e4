//! Photo harvesting pipeline.
//!
//! A harvest runs up to three independent passes over a listing:
//!
//! - **thumbnail**: detect the layout variant of the preview gallery and
//!   read its images (plus property swatches in the classical layout)
//! - **description**: reveal the whole document, then read the rich-text
//!   description images
//! - **comment**: reveal until the reviews control appears, open the review
//!   panel, expand it completely and read the review thumbnails
//!
//! Every pass normalizes the discovered URLs, drops duplicates by
//! normalized key and hands each unique asset to the [`AssetDownloader`].

mod events;
mod listing;
mod normalize;
mod types;

pub use events::{HarvestEvent, HarvestObserver, SkipReason, TracingObserver};
pub use listing::{accept_consent, navigate_if_needed, ListingTarget};
pub use normalize::{
    absolutize, normalize, normalize_on_page, strip_resize_suffix, with_default_scheme, AssetKey,
    NormalizeError, NormalizedAsset,
};
pub use types::{HarvestedPhoto, MediaReference, PhotoCategory};

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};
use url::Url;

use crate::browser::PageSurface;
use crate::config::{HarvestConfig, RevealConfig, SelectorConfig, SiteConfig};
use crate::download::{AssetDownloader, DownloadRequest};
use crate::error::{HarvestError, HarvestResult, PageError};
use crate::layout::{LayoutDetector, LayoutVariant};
use crate::reveal::{
    ExpansionController, Pacer, RandomPacer, RevealController, RevealLimits, RevealSummary,
    ScrollRegion, StopCondition,
};

/// Region label for layout detection of the preview gallery.
pub const THUMBNAIL_REGION: &str = "thumbnail container";

/// Region label for the review panel scroll container.
pub const REVIEW_PANEL_REGION: &str = "review panel";

/// Outcome of one pass.
#[derive(Debug)]
pub struct PassReport {
    pub category: PhotoCategory,
    pub result: HarvestResult<Vec<HarvestedPhoto>>,
}

/// Outcomes of every requested pass, in pass order.
#[derive(Debug)]
pub struct HarvestReport {
    pub owner_id: String,
    pub passes: Vec<PassReport>,
}

impl HarvestReport {
    /// Photos from the passes that succeeded.
    pub fn photos(&self) -> impl Iterator<Item = &HarvestedPhoto> {
        self.passes
            .iter()
            .filter_map(|pass| pass.result.as_ref().ok())
            .flatten()
    }

    pub fn failures(&self) -> impl Iterator<Item = (PhotoCategory, &HarvestError)> {
        self.passes
            .iter()
            .filter_map(|pass| pass.result.as_ref().err().map(|e| (pass.category, e)))
    }

    /// All photos, or the first pass error.
    pub fn into_result(self) -> HarvestResult<Vec<HarvestedPhoto>> {
        let mut photos = Vec::new();
        for pass in self.passes {
            photos.extend(pass.result?);
        }
        Ok(photos)
    }
}

/// Harvests photos from listing pages.
///
/// The comment pass reveals the whole document, so it must not share a page
/// context with the description pass while both run. Give it a separate
/// page with [`with_comment_page`](Self::with_comment_page) to run it
/// concurrently with the other passes; otherwise all passes run one after
/// another on the main page.
pub struct PhotoHarvester<'p, P: PageSurface> {
    page: &'p P,
    comment_page: Option<&'p P>,
    selectors: SelectorConfig,
    reveal: RevealConfig,
    site: SiteConfig,
    ready_timeout: Duration,
    pacer: Box<dyn Pacer>,
    observer: Arc<dyn HarvestObserver>,
}

impl<'p, P: PageSurface> PhotoHarvester<'p, P> {
    pub fn new(page: &'p P, config: &HarvestConfig) -> Self {
        Self {
            page,
            comment_page: None,
            selectors: config.selectors.clone(),
            reveal: config.reveal.clone(),
            site: config.site.clone(),
            ready_timeout: Duration::from_secs(config.browser.timeout),
            pacer: Box::new(RandomPacer::new()),
            observer: Arc::new(TracingObserver),
        }
    }

    /// Run the comment pass on its own page context.
    pub fn with_comment_page(mut self, page: &'p P) -> Self {
        self.comment_page = Some(page);
        self
    }

    pub fn with_pacer(mut self, pacer: impl Pacer + 'static) -> Self {
        self.pacer = Box::new(pacer);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn HarvestObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Point the page contexts at the listing for `owner_id`.
    pub async fn open_listing(&self, owner_id: &str) -> HarvestResult<ListingTarget> {
        let target = ListingTarget::new(owner_id, &self.site);
        target
            .open(self.page, self.comment_page, &self.site, self.ready_timeout)
            .await?;
        Ok(target)
    }

    /// Navigate to the listing, then harvest it.
    pub async fn harvest_listing(
        &self,
        owner_id: &str,
        categories: &[PhotoCategory],
        downloader: &dyn AssetDownloader,
    ) -> HarvestResult<Vec<HarvestedPhoto>> {
        self.open_listing(owner_id).await?;
        self.harvest(owner_id, categories, downloader).await
    }

    /// Harvest the requested categories from the pages as they are.
    ///
    /// Fails with the first failing pass; see
    /// [`harvest_report`](Self::harvest_report) for per-pass outcomes.
    pub async fn harvest(
        &self,
        owner_id: &str,
        categories: &[PhotoCategory],
        downloader: &dyn AssetDownloader,
    ) -> HarvestResult<Vec<HarvestedPhoto>> {
        self.harvest_report(owner_id, categories, downloader)
            .await
            .into_result()
    }

    /// Run every requested pass and report each outcome separately.
    pub async fn harvest_report(
        &self,
        owner_id: &str,
        categories: &[PhotoCategory],
        downloader: &dyn AssetDownloader,
    ) -> HarvestReport {
        let ordered = PhotoCategory::in_pass_order(categories);

        let passes = match self.comment_page {
            Some(comment_page) if ordered.contains(&PhotoCategory::Comment) => {
                let main_passes = async {
                    let mut reports = Vec::new();
                    for &category in ordered.iter().filter(|c| **c != PhotoCategory::Comment) {
                        reports.push(self.run_pass(self.page, owner_id, category, downloader).await);
                    }
                    reports
                };
                let comment_pass =
                    self.run_pass(comment_page, owner_id, PhotoCategory::Comment, downloader);

                let (mut reports, comment) = tokio::join!(main_passes, comment_pass);
                // Comment is last in pass order.
                reports.push(comment);
                reports
            }
            _ => {
                let mut reports = Vec::with_capacity(ordered.len());
                for category in ordered {
                    reports.push(self.run_pass(self.page, owner_id, category, downloader).await);
                }
                reports
            }
        };

        HarvestReport {
            owner_id: owner_id.to_string(),
            passes,
        }
    }

    async fn run_pass(
        &self,
        page: &P,
        owner_id: &str,
        category: PhotoCategory,
        downloader: &dyn AssetDownloader,
    ) -> PassReport {
        self.emit(HarvestEvent::PassStarted {
            owner_id: owner_id.to_string(),
            category,
        });

        let result = match self.extract(page, owner_id, category).await {
            Ok(references) => {
                let found = references.len();
                let page_url = current_page_url(page).await;
                let photos = self
                    .collect(owner_id, category, page_url.as_ref(), references, downloader)
                    .await;
                self.emit(HarvestEvent::PassCompleted {
                    owner_id: owner_id.to_string(),
                    category,
                    found,
                    harvested: photos.len(),
                });
                Ok(photos)
            }
            Err(e) => {
                self.emit(HarvestEvent::PassFailed {
                    owner_id: owner_id.to_string(),
                    category,
                    error: e.to_string(),
                });
                Err(e)
            }
        };

        PassReport { category, result }
    }

    /// Make the pass's content visible and read its media references.
    async fn extract(
        &self,
        page: &P,
        owner_id: &str,
        category: PhotoCategory,
    ) -> HarvestResult<Vec<MediaReference>> {
        let elements = match category {
            PhotoCategory::Thumbnail => self.thumbnail_elements(page, owner_id).await?,
            PhotoCategory::Description => self.description_elements(page, owner_id).await?,
            PhotoCategory::Comment => self.comment_elements(page, owner_id).await?,
        };
        debug!("Found {} {} image elements", elements.len(), category);
        self.read_sources(page, owner_id, category, &elements).await
    }

    async fn thumbnail_elements(&self, page: &P, owner_id: &str) -> HarvestResult<Vec<P::Element>> {
        let layouts = &self.selectors.layouts;
        let variant = LayoutDetector::new(layouts, self.reveal.probe_timeout())
            .detect(page, THUMBNAIL_REGION)
            .await?;
        self.emit(HarvestEvent::VariantDetected {
            owner_id: owner_id.to_string(),
            region: THUMBNAIL_REGION.to_string(),
            variant,
        });

        let mut elements = page.query_all(&layouts.for_variant(variant).images).await?;
        match variant {
            LayoutVariant::Classical => {
                let swatches = page.query_all(&self.selectors.swatch_images).await?;
                debug!("Found {} property swatch images", swatches.len());
                elements.extend(swatches);
            }
            LayoutVariant::Modern => {}
        }
        Ok(elements)
    }

    async fn description_elements(
        &self,
        page: &P,
        owner_id: &str,
    ) -> HarvestResult<Vec<P::Element>> {
        let reveal = self.reveal_controller();
        let summary = reveal
            .reveal_until(page, ScrollRegion::Document, StopCondition::None)
            .await?;
        self.emit_revealed(owner_id, PhotoCategory::Description, "document", &summary);

        Ok(page.query_all(&self.selectors.description_images).await?)
    }

    async fn comment_elements(&self, page: &P, owner_id: &str) -> HarvestResult<Vec<P::Element>> {
        let selectors = &self.selectors;
        let reveal = self.reveal_controller();

        let summary = reveal
            .reveal_until(
                page,
                ScrollRegion::Document,
                StopCondition::ElementPresent(&selectors.reviews_rating),
            )
            .await?;
        self.emit_revealed(owner_id, PhotoCategory::Comment, "document", &summary);

        let rating = page
            .query(&selectors.reviews_rating)
            .await?
            .ok_or_else(|| PageError::ElementNotFound(selectors.reviews_rating.clone()))?;
        page.scroll_into_view(&rating).await?;
        page.click_element(&rating).await?;

        let panel = page
            .wait_for_selector(&selectors.review_panel, self.reveal.panel_timeout())
            .await?;

        let rounds = ExpansionController::new(&reveal, self.reveal.max_expansion_rounds)
            .expand_fully(
                page,
                &panel,
                REVIEW_PANEL_REGION,
                &selectors.view_more,
                &selectors.view_more_disabled,
            )
            .await?;
        self.emit(HarvestEvent::PanelExpanded {
            owner_id: owner_id.to_string(),
            region: REVIEW_PANEL_REGION.to_string(),
            rounds,
        });

        Ok(page.query_all(&selectors.comment_images).await?)
    }

    async fn read_sources(
        &self,
        page: &P,
        owner_id: &str,
        category: PhotoCategory,
        elements: &[P::Element],
    ) -> HarvestResult<Vec<MediaReference>> {
        let attribute = &self.selectors.source_attribute;
        let mut references = Vec::with_capacity(elements.len());
        for element in elements {
            match page.attribute(element, attribute).await? {
                Some(raw_source_url) => references.push(MediaReference { raw_source_url }),
                None => self.skip(
                    owner_id,
                    category,
                    SkipReason::AttributeMissing {
                        attribute: attribute.clone(),
                    },
                ),
            }
        }
        Ok(references)
    }

    /// Normalize, deduplicate and download one pass's references.
    async fn collect(
        &self,
        owner_id: &str,
        category: PhotoCategory,
        page_url: Option<&Url>,
        references: Vec<MediaReference>,
        downloader: &dyn AssetDownloader,
    ) -> Vec<HarvestedPhoto> {
        let mut seen = HashSet::new();
        // Local id -> key of the asset that claimed it.
        let mut claimed: HashMap<String, AssetKey> = HashMap::new();
        let mut photos = Vec::new();

        for reference in references {
            let asset = match normalize_on_page(
                &reference.raw_source_url,
                page_url,
                &self.site.default_scheme,
            ) {
                Ok(asset) => asset,
                Err(e) => {
                    self.skip(
                        owner_id,
                        category,
                        SkipReason::InvalidUrl {
                            raw: reference.raw_source_url,
                            reason: e.to_string(),
                        },
                    );
                    continue;
                }
            };

            if !seen.insert(asset.key.clone()) {
                debug!("Duplicate {} asset {}", category, asset.key);
                continue;
            }

            let asset_id = match claimed.get(&asset.id) {
                Some(owner) if *owner != asset.key => {
                    let renamed = asset.disambiguated_id();
                    warn!(
                        "{} and {} share the file name {}, storing the latter as {}",
                        owner, asset.key, asset.id, renamed
                    );
                    renamed
                }
                _ => asset.id.clone(),
            };
            claimed.insert(asset_id.clone(), asset.key.clone());

            let request = DownloadRequest {
                owner_id,
                category,
                asset_id: &asset_id,
                url: &asset.url,
            };
            match downloader.download(&request).await {
                Ok(local_path) => photos.push(HarvestedPhoto {
                    id: asset_id.clone(),
                    owner_id: owner_id.to_string(),
                    local_path,
                    category,
                    source_url: asset.url.to_string(),
                }),
                Err(e) => self.skip(
                    owner_id,
                    category,
                    SkipReason::DownloadFailed {
                        url: asset.url.to_string(),
                        error: format!("{:#}", e),
                    },
                ),
            }
        }

        photos
    }

    fn reveal_controller(&self) -> RevealController<'_> {
        RevealController::new(self.pacer.as_ref(), RevealLimits::from(&self.reveal))
    }

    fn emit(&self, event: HarvestEvent) {
        self.observer.on_event(&event);
    }

    fn emit_revealed(
        &self,
        owner_id: &str,
        category: PhotoCategory,
        region: &str,
        summary: &RevealSummary,
    ) {
        self.emit(HarvestEvent::RegionRevealed {
            owner_id: owner_id.to_string(),
            category,
            region: region.to_string(),
            steps: summary.steps,
            outcome: summary.outcome,
        });
    }

    fn skip(&self, owner_id: &str, category: PhotoCategory, reason: SkipReason) {
        self.emit(HarvestEvent::AssetSkipped {
            owner_id: owner_id.to_string(),
            category,
            reason,
        });
    }
}

/// URL of the page the references were read from, if it has a usable one.
async fn current_page_url<P: PageSurface>(page: &P) -> Option<Url> {
    match page.current_url().await {
        Ok(url) => url.and_then(|url| Url::parse(&url).ok()),
        Err(e) => {
            debug!("Could not read page URL: {}", e);
            None
        }
    }
}
