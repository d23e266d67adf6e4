//! Persisted sign-in sessions.
//!
//! A session is the cookie jar of a signed-in page context. Sessions are keyed
//! by an identifier derived from the browser name and the credentials, so the
//! same account on the same browser resumes without signing in again.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::browser::{PageSurface, SessionCookie};
use crate::config::LoginSelectors;
use crate::error::{PageError, SessionError};

const NAVIGATION_POLL: Duration = Duration::from_millis(250);

/// Stored state of one signed-in session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub cookies: Vec<SessionCookie>,
}

/// Account credentials.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn identifier(&self, browser: &str) -> String {
        session_identifier(browser, &self.username, &self.password)
    }
}

/// `sha256(browser)_sha256(username)_sha256(password)`, hex encoded.
pub fn session_identifier(browser: &str, username: &str, password: &str) -> String {
    [browser, username, password]
        .iter()
        .map(|part| {
            let mut hasher = Sha256::new();
            hasher.update(part.as_bytes());
            hex::encode(hasher.finalize())
        })
        .collect::<Vec<_>>()
        .join("_")
}

/// Persistence for sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn exists(&self, identifier: &str) -> bool;

    async fn load(&self, identifier: &str) -> Result<SessionState, SessionError>;

    async fn save(&self, identifier: &str, state: &SessionState) -> Result<(), SessionError>;
}

/// Stores each session as `session_{identifier}.json` in a directory.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, identifier: &str) -> PathBuf {
        self.dir.join(format!("session_{}.json", identifier))
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn exists(&self, identifier: &str) -> bool {
        tokio::fs::try_exists(self.path_for(identifier))
            .await
            .unwrap_or(false)
    }

    async fn load(&self, identifier: &str) -> Result<SessionState, SessionError> {
        let path = self.path_for(identifier);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SessionError::NotFound(identifier.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let state: SessionState = serde_json::from_str(&content)?;
        debug!("Loaded {} cookies from {:?}", state.cookies.len(), path);
        Ok(state)
    }

    async fn save(&self, identifier: &str, state: &SessionState) -> Result<(), SessionError> {
        let path = self.path_for(identifier);
        tokio::fs::create_dir_all(&self.dir).await?;
        let json = serde_json::to_string_pretty(state)?;
        tokio::fs::write(&path, json).await?;
        info!("Saved {} cookies to {:?}", state.cookies.len(), path);
        Ok(())
    }
}

/// Submit the sign-in form on `page` and wait for the resulting navigation.
///
/// The page should already show the site. Invalid credentials are not
/// detected; the form simply navigates back to itself.
pub async fn sign_in<P>(
    page: &P,
    form: &LoginSelectors,
    credentials: &Credentials,
) -> Result<(), PageError>
where
    P: PageSurface + ?Sized,
{
    info!("Signing in as {}", credentials.username);

    page.click(&form.account_link).await?;
    page.click(&form.sign_in_link).await?;

    let timeout = Duration::from_secs(form.timeout);
    page.wait_for_selector(&form.username_input, timeout).await?;
    page.focus(&form.username_input).await?;
    page.type_text(&credentials.username).await?;
    page.focus(&form.password_input).await?;
    page.type_text(&credentials.password).await?;

    let before = page.current_url().await?;
    page.click(&form.submit).await?;

    // Waits go through the page so the budget counts page time.
    let polls = (timeout.as_millis() / NAVIGATION_POLL.as_millis()).max(1);
    for _ in 0..polls {
        if page.current_url().await? != before {
            debug!("Sign-in navigated away from the form");
            return Ok(());
        }
        page.wait_timeout(NAVIGATION_POLL).await;
    }
    if page.current_url().await? != before {
        return Ok(());
    }
    Err(PageError::Timeout {
        selector: form.submit.clone(),
        timeout,
    })
}
