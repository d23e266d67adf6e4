//! Values exchanged with the page automation surface.

use serde::{Deserialize, Serialize};

/// Vertical scroll measurements of a document or nested element.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScrollMetrics {
    /// Total scrollable height (`scrollHeight`).
    pub scroll_height: f64,
    /// Visible height (`clientHeight` or `innerHeight`).
    pub client_height: f64,
    /// Current vertical offset (`scrollTop` or `scrollY`).
    pub scroll_top: f64,
}

/// Cookie captured from, or restored into, a browser session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub http_only: bool,
}

fn default_path() -> String {
    "/".to_string()
}
