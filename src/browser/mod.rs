//! Page automation surface.
//!
//! The harvesting engine never talks to a browser directly. Everything it
//! needs from a live page (locating elements, clicking, reading attributes,
//! reading and changing scroll positions) goes through [`PageSurface`]. The
//! chromiumoxide-backed implementation lives in [`chromium`] behind the
//! `browser` feature.

#[cfg(feature = "browser")]
pub mod chromium;
mod types;

#[cfg(feature = "browser")]
pub use chromium::{ChromiumPage, ChromiumSession};
pub use types::{ScrollMetrics, SessionCookie};

use std::time::Duration;

use async_trait::async_trait;

use crate::error::PageError;

/// Operations the harvester needs from one page context.
///
/// Element handles are opaque to the engine; an implementation picks whatever
/// handle type its backend uses.
#[async_trait]
pub trait PageSurface: Send + Sync {
    type Element: Send + Sync;

    async fn navigate(&self, url: &str) -> Result<(), PageError>;

    async fn current_url(&self) -> Result<Option<String>, PageError>;

    /// First element matching `selector`, or `None` if nothing matches right now.
    async fn query(&self, selector: &str) -> Result<Option<Self::Element>, PageError>;

    /// All elements matching `selector`, in document order.
    async fn query_all(&self, selector: &str) -> Result<Vec<Self::Element>, PageError>;

    /// Wait until `selector` matches, failing with [`PageError::Timeout`].
    async fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<Self::Element, PageError>;

    async fn click_element(&self, element: &Self::Element) -> Result<(), PageError>;

    async fn click(&self, selector: &str) -> Result<(), PageError> {
        let element = self
            .query(selector)
            .await?
            .ok_or_else(|| PageError::ElementNotFound(selector.to_string()))?;
        self.click_element(&element).await
    }

    async fn focus(&self, selector: &str) -> Result<(), PageError>;

    /// Type into the currently focused element.
    async fn type_text(&self, text: &str) -> Result<(), PageError>;

    async fn attribute(
        &self,
        element: &Self::Element,
        name: &str,
    ) -> Result<Option<String>, PageError>;

    /// Scroll metrics of the top-level document body.
    async fn document_metrics(&self) -> Result<ScrollMetrics, PageError>;

    /// Scroll metrics of a nested scrollable element.
    async fn element_metrics(&self, element: &Self::Element) -> Result<ScrollMetrics, PageError>;

    /// Scroll the window to an absolute vertical offset.
    async fn scroll_document_to(&self, offset: f64) -> Result<(), PageError>;

    /// Scroll a nested element by a relative vertical delta.
    async fn scroll_element_by(&self, element: &Self::Element, delta: f64)
        -> Result<(), PageError>;

    async fn scroll_into_view(&self, element: &Self::Element) -> Result<(), PageError>;

    /// Evaluate a JavaScript expression in the page and return its JSON value.
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, PageError>;

    /// Suspend for `duration`, letting the page keep rendering.
    async fn wait_timeout(&self, duration: Duration);
}
