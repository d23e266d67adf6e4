//! Browser engine configuration types.
//!
//! These live outside the `browser` feature so config parsing works in
//! builds without chromiumoxide.

use serde::{Deserialize, Serialize};

pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub const MOBILE_USER_AGENT: &str = "Mozilla/5.0 (Linux; Android 13; Pixel 7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36";

/// Browser engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BrowserEngineConfig {
    /// Run in headless mode.
    /// Set to false for debugging.
    pub headless: bool,

    /// Proxy server URL (e.g., "socks5://127.0.0.1:1080").
    pub proxy: Option<String>,

    /// Page load timeout in seconds.
    pub timeout: u64,

    /// Additional Chrome arguments.
    pub chrome_args: Vec<String>,

    /// Remote Chrome DevTools URL (e.g., "ws://localhost:9222").
    /// If set, connects to an existing browser instead of launching one.
    /// Can also be set via the BROWSER_URL environment variable.
    pub remote_url: Option<String>,

    /// User agent for the desktop page context.
    pub user_agent: String,

    /// User agent for the mobile page context used by the comment pass.
    pub mobile_user_agent: String,
}

impl Default for BrowserEngineConfig {
    fn default() -> Self {
        Self {
            headless: true,
            proxy: None,
            timeout: 30,
            chrome_args: Vec::new(),
            remote_url: None,
            user_agent: DESKTOP_USER_AGENT.to_string(),
            mobile_user_agent: MOBILE_USER_AGENT.to_string(),
        }
    }
}

impl BrowserEngineConfig {
    /// Apply environment variable overrides.
    ///
    /// - `BROWSER_URL` - Remote Chrome DevTools URL
    /// - `SOCKS_PROXY` - Proxy for browser traffic, used when none is configured
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("BROWSER_URL") {
            if !val.is_empty() {
                self.remote_url = Some(val);
            }
        }

        if self.proxy.is_none() {
            if let Ok(val) = std::env::var("SOCKS_PROXY") {
                if !val.is_empty() {
                    self.proxy = Some(val);
                }
            }
        }

        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browser_engine_config_serde_defaults() {
        let config: BrowserEngineConfig = serde_json::from_str("{}").unwrap();
        assert!(config.headless);
        assert_eq!(config.timeout, 30);
        assert!(config.remote_url.is_none());
        assert_eq!(config, BrowserEngineConfig::default());
    }

    #[test]
    fn test_browser_engine_config_serde_with_values() {
        let json = r#"{
            "headless": false,
            "proxy": "socks5://127.0.0.1:1080",
            "timeout": 60,
            "remote_url": "ws://localhost:9222"
        }"#;

        let config: BrowserEngineConfig = serde_json::from_str(json).unwrap();
        assert!(!config.headless);
        assert_eq!(config.proxy, Some("socks5://127.0.0.1:1080".to_string()));
        assert_eq!(config.timeout, 60);
        assert_eq!(config.remote_url, Some("ws://localhost:9222".to_string()));
        assert_eq!(config.mobile_user_agent, MOBILE_USER_AGENT);
    }
}
