//! Site layout and selector configuration.
//!
//! Defaults target the marketplace listing layout the harvester was built
//! for. Every selector is a CSS selector and can be overridden from the
//! config file when the site changes its markup.

use serde::{Deserialize, Serialize};

use crate::layout::LayoutVariant;

/// Marker and image selectors for one layout variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantSelectors {
    /// Element whose presence identifies the variant.
    pub marker: String,
    /// Thumbnail images inside the variant's preview container.
    pub images: String,
}

/// Selector sets for every known layout variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSelectors {
    pub modern: VariantSelectors,
    pub classical: VariantSelectors,
}

impl Default for LayoutSelectors {
    fn default() -> Self {
        Self {
            modern: VariantSelectors {
                marker: "div.sumImageWrap".to_string(),
                images: "div.sumImageWrap > div.sumImage > div.productImageWrap > img.productImage"
                    .to_string(),
            },
            classical: VariantSelectors {
                marker: "div.img-view-wrap".to_string(),
                images: "div.img-view-wrap ul.images-view-list > li > div.images-view-item > img"
                    .to_string(),
            },
        }
    }
}

impl LayoutSelectors {
    pub fn for_variant(&self, variant: LayoutVariant) -> &VariantSelectors {
        match variant {
            LayoutVariant::Modern => &self.modern,
            LayoutVariant::Classical => &self.classical,
        }
    }
}

/// Selectors used by the harvest passes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub layouts: LayoutSelectors,

    /// Property swatch images, only present in the classical layout.
    pub swatch_images: String,

    /// Images inside the rich-text description.
    pub description_images: String,

    /// Reviews rating control that opens the review panel.
    pub reviews_rating: String,

    /// Scroll container of the review panel.
    pub review_panel: String,

    /// "View more" trigger inside the review panel.
    pub view_more: String,

    /// The trigger in its disabled state (no more reviews).
    pub view_more_disabled: String,

    /// Review thumbnails.
    pub comment_images: String,

    /// Attribute holding the media URL.
    pub source_attribute: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            layouts: LayoutSelectors::default(),
            swatch_images: "div.sku-wrap > div.sku-property > ul.sku-property-list > li.sku-property-item > div.sku-property-image > img".to_string(),
            description_images: "div.detailmodule_html > div.detail-desc-decorate-richtext > div.detailmodule_image > img".to_string(),
            reviews_rating: "div.reviews--rating".to_string(),
            review_panel: "div.scroll-panel-content".to_string(),
            view_more: "div.view-more".to_string(),
            view_more_disabled: "div.view-more.disabled".to_string(),
            comment_images: "img.review-card--thumbinail".to_string(),
            source_attribute: "src".to_string(),
        }
    }
}

/// Cookie consent banner accepted after navigation, when it shows up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentConfig {
    pub banner: String,
    pub accept: String,
    /// Seconds to wait for the banner before assuming there is none.
    #[serde(default = "default_consent_timeout")]
    pub timeout: u64,
}

fn default_consent_timeout() -> u64 {
    10
}

/// Sign-in form used to establish a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginSelectors {
    pub account_link: String,
    pub sign_in_link: String,
    pub username_input: String,
    pub password_input: String,
    pub submit: String,
    /// Seconds to wait for the post-login navigation.
    pub timeout: u64,
}

impl Default for LoginSelectors {
    fn default() -> Self {
        Self {
            account_link: "a[data-role='myaliexpress-link']".to_string(),
            sign_in_link: "a[data-role='sign-link']".to_string(),
            username_input: "input#fm-login-id".to_string(),
            password_input: "input#fm-login-password".to_string(),
            submit: "button.login-submit".to_string(),
            timeout: 30,
        }
    }
}

/// Where listings live and how their URLs are built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub base_url: String,
    pub mobile_base_url: String,
    /// Listing path; `{id}` is replaced with the owner id.
    pub listing_path: String,
    /// Scheme prepended to scheme-relative media URLs.
    pub default_scheme: String,
    pub consent: Option<ConsentConfig>,
    pub login: LoginSelectors,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.aliexpress.com".to_string(),
            mobile_base_url: "https://m.aliexpress.com".to_string(),
            listing_path: "/item/{id}.html".to_string(),
            default_scheme: "https:".to_string(),
            consent: Some(ConsentConfig {
                banner: "div.global-gdpr-btn-wrap".to_string(),
                accept: "div.global-gdpr-btn-wrap > button.btn-accept".to_string(),
                timeout: default_consent_timeout(),
            }),
            login: LoginSelectors::default(),
        }
    }
}

impl SiteConfig {
    pub fn listing_url(&self, owner_id: &str) -> String {
        join_listing(&self.base_url, &self.listing_path, owner_id)
    }

    pub fn mobile_listing_url(&self, owner_id: &str) -> String {
        join_listing(&self.mobile_base_url, &self.listing_path, owner_id)
    }
}

fn join_listing(base: &str, path: &str, owner_id: &str) -> String {
    format!(
        "{}{}",
        base.trim_end_matches('/'),
        path.replace("{id}", owner_id)
    )
}
