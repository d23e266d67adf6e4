//! Chrome DevTools backed page surface.
//!
//! [`ChromiumSession`] owns one browser (launched locally or reached through a
//! remote DevTools endpoint) and hands out [`ChromiumPage`] contexts.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::input::InsertTextParams;
use chromiumoxide::cdp::browser_protocol::network::{CookieParam, SetUserAgentOverrideParams};
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::handler::Handler;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{PageSurface, ScrollMetrics, SessionCookie};
use crate::config::BrowserEngineConfig;
use crate::error::PageError;
use crate::session::SessionState;

const SELECTOR_POLL: Duration = Duration::from_millis(100);

const DOCUMENT_METRICS_SCRIPT: &str = "JSON.stringify({ \
    scroll_height: document.body.scrollHeight, \
    client_height: window.innerHeight, \
    scroll_top: window.scrollY })";

const ELEMENT_METRICS_FN: &str = "function() { return JSON.stringify({ \
    scroll_height: this.scrollHeight, \
    client_height: this.clientHeight, \
    scroll_top: this.scrollTop }); }";

impl From<CdpError> for PageError {
    fn from(e: CdpError) -> Self {
        PageError::Backend(e.to_string())
    }
}

/// A running browser.
pub struct ChromiumSession {
    config: BrowserEngineConfig,
    browser: Browser,
    handler: JoinHandle<()>,
}

impl ChromiumSession {
    /// Name used when deriving session identifiers.
    pub const BROWSER_NAME: &'static str = "chromium";

    /// Common Chrome executable paths to check.
    const CHROME_PATHS: &'static [&'static str] = &[
        // Linux
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        // macOS
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        "/opt/google/chrome/google-chrome",
    ];

    /// Connect to `config.remote_url` if set, otherwise launch a local Chrome.
    pub async fn start(config: BrowserEngineConfig) -> Result<Self> {
        match config.remote_url.clone() {
            Some(remote_url) => Self::connect_remote(config, &remote_url).await,
            None => Self::launch(config).await,
        }
    }

    fn find_chrome() -> Result<PathBuf> {
        for path in Self::CHROME_PATHS {
            let p = std::path::Path::new(path);
            if p.exists() {
                info!("Found Chrome at: {}", path);
                return Ok(p.to_path_buf());
            }
        }

        for cmd in &[
            "google-chrome",
            "google-chrome-stable",
            "chromium",
            "chromium-browser",
        ] {
            if let Ok(path) = which::which(cmd) {
                info!("Found Chrome in PATH: {}", path.display());
                return Ok(path);
            }
        }

        Err(anyhow::anyhow!(
            "Chrome/Chromium not found. Install it or set BROWSER_URL to a running instance"
        ))
    }

    async fn launch(config: BrowserEngineConfig) -> Result<Self> {
        info!("Launching browser (headless={})", config.headless);

        let mut builder = BrowserConfig::builder()
            .chrome_executable(Self::find_chrome()?)
            .request_timeout(Duration::from_secs(config.timeout));

        // with_head means NOT headless
        if !config.headless {
            builder = builder.with_head();
        }

        if let Some(ref proxy) = config.proxy {
            builder = builder.arg(format!("--proxy-server={}", proxy));
        }

        builder = builder
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-infobars")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-sync")
            .arg("--no-sandbox")
            .arg("--disable-gpu");

        for arg in &config.chrome_args {
            builder = builder.arg(arg);
        }

        let browser_config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build browser config: {}", e))?;

        let (browser, handler) = Browser::launch(browser_config)
            .await
            .context("Failed to launch browser")?;

        Ok(Self {
            config,
            browser,
            handler: spawn_handler(handler),
        })
    }

    async fn connect_remote(config: BrowserEngineConfig, url: &str) -> Result<Self> {
        info!(
            "Connecting to remote browser at {} (timeout: {}s)",
            url, config.timeout
        );

        // The DevTools socket address comes from /json/version.
        let http_url = url
            .replace("ws://", "http://")
            .replace("wss://", "https://");
        let version_url = format!("{}/json/version", http_url.trim_end_matches('/'));

        let resp: serde_json::Value = reqwest::Client::new()
            .get(&version_url)
            .send()
            .await
            .context("Failed to connect to remote browser")?
            .json()
            .await
            .context("Failed to parse browser version info")?;

        let ws_url = resp
            .get("webSocketDebuggerUrl")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("No webSocketDebuggerUrl in response"))?;

        info!("Connecting to WebSocket: {}", ws_url);

        let handler_config = chromiumoxide::handler::HandlerConfig {
            request_timeout: Duration::from_secs(config.timeout),
            ..Default::default()
        };

        let (browser, handler) = Browser::connect_with_config(ws_url, handler_config)
            .await
            .context("Failed to connect to remote browser")?;

        Ok(Self {
            config,
            browser,
            handler: spawn_handler(handler),
        })
    }

    /// Open a blank page with the given user agent.
    pub async fn new_page(&self, user_agent: &str) -> Result<ChromiumPage> {
        let page = self.browser.new_page("about:blank").await?;
        page.execute(SetUserAgentOverrideParams::new(user_agent.to_string()))
            .await?;
        Ok(ChromiumPage { page })
    }

    /// Page context for the desktop listing.
    pub async fn desktop_page(&self) -> Result<ChromiumPage> {
        self.new_page(&self.config.user_agent).await
    }

    /// Page context for the mobile listing, used by the comment pass.
    pub async fn mobile_page(&self) -> Result<ChromiumPage> {
        self.new_page(&self.config.mobile_user_agent).await
    }

    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            debug!("Browser close failed: {}", e);
        }
        self.handler.abort();
    }
}

fn spawn_handler(mut handler: Handler) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    })
}

/// One browser tab.
pub struct ChromiumPage {
    page: Page,
}

impl ChromiumPage {
    /// Cookies currently held by this page's browser context.
    pub async fn capture_session(&self) -> Result<SessionState, PageError> {
        let cookies = self
            .page
            .get_cookies()
            .await?
            .into_iter()
            .map(|c| SessionCookie {
                name: c.name,
                value: c.value,
                domain: c.domain,
                path: c.path,
                secure: c.secure,
                http_only: c.http_only,
            })
            .collect::<Vec<_>>();
        debug!("Captured {} cookies", cookies.len());
        Ok(SessionState { cookies })
    }

    /// Install previously captured cookies.
    pub async fn apply_session(&self, state: &SessionState) -> Result<(), PageError> {
        let mut params = Vec::with_capacity(state.cookies.len());
        for cookie in &state.cookies {
            if cookie.name.is_empty() || cookie.domain.is_empty() {
                continue;
            }
            let param = CookieParam::builder()
                .name(cookie.name.clone())
                .value(cookie.value.clone())
                .domain(cookie.domain.clone())
                .path(cookie.path.clone())
                .secure(cookie.secure)
                .http_only(cookie.http_only)
                .build();
            match param {
                Ok(param) => params.push(param),
                Err(e) => warn!("Failed to build cookie {}: {}", cookie.name, e),
            }
        }
        debug!("Applying {} cookies", params.len());
        self.page.set_cookies(params).await?;
        Ok(())
    }

    pub async fn close(self) {
        let _ = self.page.close().await;
    }
}

fn parse_metrics(raw: Option<serde_json::Value>) -> Result<ScrollMetrics, PageError> {
    let json = raw
        .as_ref()
        .and_then(|v| v.as_str())
        .ok_or_else(|| PageError::Script("scroll metrics script returned no value".to_string()))?;
    serde_json::from_str(json).map_err(|e| PageError::Script(e.to_string()))
}

#[async_trait]
impl PageSurface for ChromiumPage {
    type Element = Element;

    async fn navigate(&self, url: &str) -> Result<(), PageError> {
        self.page
            .goto(url)
            .await
            .map_err(|e| PageError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn current_url(&self) -> Result<Option<String>, PageError> {
        Ok(self.page.url().await?)
    }

    async fn query(&self, selector: &str) -> Result<Option<Element>, PageError> {
        Ok(self.page.find_elements(selector).await?.into_iter().next())
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<Element>, PageError> {
        Ok(self.page.find_elements(selector).await?)
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<Element, PageError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(element) = self.query(selector).await? {
                return Ok(element);
            }
            if Instant::now() >= deadline {
                return Err(PageError::Timeout {
                    selector: selector.to_string(),
                    timeout,
                });
            }
            tokio::time::sleep(SELECTOR_POLL).await;
        }
    }

    async fn click_element(&self, element: &Element) -> Result<(), PageError> {
        element.click().await?;
        Ok(())
    }

    async fn focus(&self, selector: &str) -> Result<(), PageError> {
        let element = self
            .query(selector)
            .await?
            .ok_or_else(|| PageError::ElementNotFound(selector.to_string()))?;
        element.focus().await?;
        Ok(())
    }

    async fn type_text(&self, text: &str) -> Result<(), PageError> {
        self.page.execute(InsertTextParams::new(text)).await?;
        Ok(())
    }

    async fn attribute(&self, element: &Element, name: &str) -> Result<Option<String>, PageError> {
        Ok(element.attribute(name).await?)
    }

    async fn document_metrics(&self) -> Result<ScrollMetrics, PageError> {
        let result = self
            .page
            .evaluate(DOCUMENT_METRICS_SCRIPT.to_string())
            .await?;
        parse_metrics(result.value().cloned())
    }

    async fn element_metrics(&self, element: &Element) -> Result<ScrollMetrics, PageError> {
        let returns = element.call_js_fn(ELEMENT_METRICS_FN, false).await?;
        parse_metrics(returns.result.value)
    }

    async fn scroll_document_to(&self, offset: f64) -> Result<(), PageError> {
        self.page
            .evaluate(format!("window.scrollTo(0, {})", offset))
            .await?;
        Ok(())
    }

    async fn scroll_element_by(&self, element: &Element, delta: f64) -> Result<(), PageError> {
        element
            .call_js_fn(format!("function() {{ this.scrollBy(0, {}); }}", delta), false)
            .await?;
        Ok(())
    }

    async fn scroll_into_view(&self, element: &Element) -> Result<(), PageError> {
        element.scroll_into_view().await?;
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, PageError> {
        let result = self
            .page
            .evaluate(script.to_string())
            .await
            .map_err(|e| PageError::Script(e.to_string()))?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn wait_timeout(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
