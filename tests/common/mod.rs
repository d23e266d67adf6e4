//! Scripted in-memory page used by the integration tests.
//!
//! Elements are matched by exact selector string. Scroll extents grow per
//! scroll call when configured, elements can be scheduled to appear after a
//! number of document scrolls, and clicks can run scripted effects.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use photoharvest::browser::{PageSurface, ScrollMetrics};
use photoharvest::config::HarvestConfig;
use photoharvest::download::{AssetDownloader, DownloadRequest};
use photoharvest::error::PageError;
use photoharvest::harvest::{HarvestEvent, HarvestObserver};
use photoharvest::reveal::Pacer;

#[derive(Debug, Clone, PartialEq)]
pub struct FakeElement {
    pub id: usize,
    pub selector: String,
    pub attributes: HashMap<String, String>,
}

/// A scroll call observed by the page.
#[derive(Debug, Clone, PartialEq)]
pub enum ScrollCall {
    DocumentTo(f64),
    ElementBy { selector: String, delta: f64 },
}

#[derive(Debug, Clone, Copy)]
struct Extent {
    height: f64,
    growth: f64,
    max: f64,
}

impl Extent {
    fn grow(&mut self) {
        self.height = (self.height + self.growth).min(self.max);
    }
}

/// Mutable document state handed to click effects.
pub struct Dom {
    elements: Vec<FakeElement>,
    next_id: usize,
    url: Option<String>,
}

impl Dom {
    pub fn add(&mut self, selector: &str, attributes: &[(&str, &str)]) {
        let id = self.next_id;
        self.next_id += 1;
        self.elements.push(FakeElement {
            id,
            selector: selector.to_string(),
            attributes: attributes
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        });
    }

    pub fn remove(&mut self, selector: &str) {
        self.elements.retain(|e| e.selector != selector);
    }

    pub fn contains(&self, selector: &str) -> bool {
        self.elements.iter().any(|e| e.selector == selector)
    }

    /// Simulate a navigation triggered from the page itself.
    pub fn set_url(&mut self, url: &str) {
        self.url = Some(url.to_string());
    }
}

type ClickEffect = Box<dyn FnMut(&mut Dom, usize) + Send>;

struct Pending {
    after_scrolls: usize,
    selector: String,
    attributes: Vec<(String, String)>,
}

struct Inner {
    dom: Dom,
    document: Extent,
    element_extents: HashMap<String, Extent>,
    pending: Vec<Pending>,
    on_click: HashMap<String, ClickEffect>,
    click_counts: HashMap<String, usize>,
    document_scrolls: usize,
    scrolls: Vec<ScrollCall>,
    clicks: Vec<String>,
    pauses: Vec<Duration>,
    navigations: Vec<String>,
    focused: Option<String>,
    typed: Vec<(String, String)>,
}

pub struct FakePage {
    inner: Mutex<Inner>,
}

impl Default for FakePage {
    fn default() -> Self {
        Self::new()
    }
}

impl FakePage {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                dom: Dom {
                    elements: Vec::new(),
                    next_id: 0,
                    url: None,
                },
                document: Extent {
                    height: 0.0,
                    growth: 0.0,
                    max: 0.0,
                },
                element_extents: HashMap::new(),
                pending: Vec::new(),
                on_click: HashMap::new(),
                click_counts: HashMap::new(),
                document_scrolls: 0,
                scrolls: Vec::new(),
                clicks: Vec::new(),
                pauses: Vec::new(),
                navigations: Vec::new(),
                focused: None,
                typed: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap()
    }

    pub fn at_url(self, url: &str) -> Self {
        self.lock().dom.set_url(url);
        self
    }

    pub fn with_element(self, selector: &str) -> Self {
        self.lock().dom.add(selector, &[]);
        self
    }

    pub fn with_image(self, selector: &str, src: &str) -> Self {
        self.lock().dom.add(selector, &[("src", src)]);
        self
    }

    /// Fixed document height.
    pub fn with_document_height(self, height: f64) -> Self {
        self.with_growing_document(height, 0.0, height)
    }

    /// Document that grows by `growth` after every scroll, up to `max`.
    pub fn with_growing_document(self, height: f64, growth: f64, max: f64) -> Self {
        self.lock().document = Extent {
            height,
            growth,
            max,
        };
        self
    }

    /// Scroll extent of the element matching `selector`.
    pub fn with_region(self, selector: &str, height: f64, growth: f64, max: f64) -> Self {
        self.lock().element_extents.insert(
            selector.to_string(),
            Extent {
                height,
                growth,
                max,
            },
        );
        self
    }

    /// Insert an element once the document has been scrolled `n` times.
    pub fn appear_after_scrolls(self, n: usize, selector: &str, attributes: &[(&str, &str)]) -> Self {
        self.lock().pending.push(Pending {
            after_scrolls: n,
            selector: selector.to_string(),
            attributes: attributes
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        });
        self
    }

    /// Run `effect` whenever an element matching `selector` is clicked. The
    /// second argument is the number of clicks so far, including this one.
    pub fn on_click(self, selector: &str, effect: impl FnMut(&mut Dom, usize) + Send + 'static) -> Self {
        self.lock()
            .on_click
            .insert(selector.to_string(), Box::new(effect));
        self
    }

    pub fn scrolls(&self) -> Vec<ScrollCall> {
        self.lock().scrolls.clone()
    }

    pub fn clicks(&self) -> Vec<String> {
        self.lock().clicks.clone()
    }

    pub fn pauses(&self) -> Vec<Duration> {
        self.lock().pauses.clone()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.lock().navigations.clone()
    }

    /// Typed text, paired with the selector focused at the time.
    pub fn typed(&self) -> Vec<(String, String)> {
        self.lock().typed.clone()
    }

    pub fn document_height(&self) -> f64 {
        self.lock().document.height
    }

    pub fn has(&self, selector: &str) -> bool {
        self.lock().dom.contains(selector)
    }

    fn find_all(&self, selector: &str) -> Vec<FakeElement> {
        self.lock()
            .dom
            .elements
            .iter()
            .filter(|e| e.selector == selector)
            .cloned()
            .collect()
    }

    fn after_document_scroll(inner: &mut Inner) {
        inner.document.grow();
        inner.document_scrolls += 1;
        let scrolls = inner.document_scrolls;
        let (due, waiting): (Vec<_>, Vec<_>) = inner
            .pending
            .drain(..)
            .partition(|p| p.after_scrolls <= scrolls);
        inner.pending = waiting;
        for p in due {
            let attributes: Vec<(&str, &str)> = p
                .attributes
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect();
            inner.dom.add(&p.selector, &attributes);
        }
    }
}

#[async_trait]
impl PageSurface for FakePage {
    type Element = FakeElement;

    async fn navigate(&self, url: &str) -> Result<(), PageError> {
        let mut inner = self.lock();
        inner.navigations.push(url.to_string());
        inner.dom.set_url(url);
        Ok(())
    }

    async fn current_url(&self) -> Result<Option<String>, PageError> {
        Ok(self.lock().dom.url.clone())
    }

    async fn query(&self, selector: &str) -> Result<Option<FakeElement>, PageError> {
        Ok(self.find_all(selector).into_iter().next())
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<FakeElement>, PageError> {
        Ok(self.find_all(selector))
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<FakeElement, PageError> {
        self.find_all(selector)
            .into_iter()
            .next()
            .ok_or_else(|| PageError::Timeout {
                selector: selector.to_string(),
                timeout,
            })
    }

    async fn click_element(&self, element: &FakeElement) -> Result<(), PageError> {
        let mut guard = self.lock();
        let inner = &mut *guard;
        inner.clicks.push(element.selector.clone());
        let count = inner
            .click_counts
            .entry(element.selector.clone())
            .or_insert(0);
        *count += 1;
        let count = *count;
        if let Some(effect) = inner.on_click.get_mut(&element.selector) {
            effect(&mut inner.dom, count);
        }
        Ok(())
    }

    async fn focus(&self, selector: &str) -> Result<(), PageError> {
        let mut inner = self.lock();
        if inner.dom.contains(selector) {
            inner.focused = Some(selector.to_string());
            Ok(())
        } else {
            Err(PageError::ElementNotFound(selector.to_string()))
        }
    }

    async fn type_text(&self, text: &str) -> Result<(), PageError> {
        let mut inner = self.lock();
        let focused = inner.focused.clone().unwrap_or_default();
        inner.typed.push((focused, text.to_string()));
        Ok(())
    }

    async fn attribute(
        &self,
        element: &FakeElement,
        name: &str,
    ) -> Result<Option<String>, PageError> {
        Ok(element.attributes.get(name).cloned())
    }

    async fn document_metrics(&self) -> Result<ScrollMetrics, PageError> {
        let inner = self.lock();
        Ok(ScrollMetrics {
            scroll_height: inner.document.height,
            client_height: 0.0,
            scroll_top: 0.0,
        })
    }

    async fn element_metrics(&self, element: &FakeElement) -> Result<ScrollMetrics, PageError> {
        let inner = self.lock();
        let extent = inner
            .element_extents
            .get(&element.selector)
            .ok_or_else(|| PageError::Script(format!("{} is not scrollable", element.selector)))?;
        Ok(ScrollMetrics {
            scroll_height: extent.height,
            client_height: 0.0,
            scroll_top: 0.0,
        })
    }

    async fn scroll_document_to(&self, offset: f64) -> Result<(), PageError> {
        let mut inner = self.lock();
        inner.scrolls.push(ScrollCall::DocumentTo(offset));
        Self::after_document_scroll(&mut inner);
        Ok(())
    }

    async fn scroll_element_by(&self, element: &FakeElement, delta: f64) -> Result<(), PageError> {
        let mut inner = self.lock();
        inner.scrolls.push(ScrollCall::ElementBy {
            selector: element.selector.clone(),
            delta,
        });
        if let Some(extent) = inner.element_extents.get_mut(&element.selector) {
            extent.grow();
        }
        Ok(())
    }

    async fn scroll_into_view(&self, _element: &FakeElement) -> Result<(), PageError> {
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, PageError> {
        match script {
            "document.readyState" => Ok(serde_json::json!("complete")),
            other => Err(PageError::Script(format!("unsupported script: {}", other))),
        }
    }

    async fn wait_timeout(&self, duration: Duration) {
        self.lock().pauses.push(duration);
    }
}

/// Always steps the same fraction and pauses the same time.
pub struct FixedPacer {
    pub fraction: f64,
    pub pause: Duration,
}

impl Default for FixedPacer {
    fn default() -> Self {
        Self {
            fraction: 0.2,
            pause: Duration::from_millis(1000),
        }
    }
}

impl Pacer for FixedPacer {
    fn step_fraction(&self) -> f64 {
        self.fraction
    }

    fn pause(&self) -> Duration {
        self.pause
    }
}

#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<HarvestEvent>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<HarvestEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl HarvestObserver for RecordingObserver {
    fn on_event(&self, event: &HarvestEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Records requested URLs; fails for URLs containing any `fail_on` marker.
#[derive(Default)]
pub struct FakeDownloader {
    pub fail_on: Vec<String>,
    requests: Mutex<Vec<String>>,
}

impl FakeDownloader {
    pub fn failing_on(marker: &str) -> Self {
        Self {
            fail_on: vec![marker.to_string()],
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl AssetDownloader for FakeDownloader {
    async fn download(&self, request: &DownloadRequest<'_>) -> anyhow::Result<PathBuf> {
        let url = request.url.to_string();
        self.requests.lock().unwrap().push(url.clone());
        if self.fail_on.iter().any(|marker| url.contains(marker.as_str())) {
            anyhow::bail!("HTTP 404 for {}", url);
        }
        Ok(PathBuf::from("/photos")
            .join(request.owner_id)
            .join(request.category.as_str())
            .join(request.asset_id))
    }
}

/// Default configuration with tight bounds for tests.
pub fn test_config() -> HarvestConfig {
    let mut config = HarvestConfig::default();
    config.reveal.max_steps = 100;
    config.reveal.max_expansion_rounds = 5;
    config.site.consent = None;
    config
}
