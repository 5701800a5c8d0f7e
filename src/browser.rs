//! Chromium-backed browser session.
//!
//! Only available with the `headless` feature. A [`BrowserPool`] owns one
//! browser process, launched lazily on the first page request, and bounds the
//! number of open tabs with a semaphore. Every [`ChromiumPage`] holds a tab
//! permit until it is dropped.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::Page;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};

use crate::page::{BrowserSession, PageHandle, WaitStrategy};
use crate::{Result, SearchError};

/// Desktop Chrome user agent. Headless Chrome otherwise advertises itself
/// as "HeadlessChrome", which search engines block.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

const SCROLL_SCRIPT: &str = "window.scrollTo(0, document.body.scrollHeight)";

/// Configuration for the browser pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserPoolConfig {
    /// Maximum number of concurrently open tabs.
    pub max_tabs: usize,
    pub headless: bool,
    /// Browser executable. Auto-detected when `None`.
    pub chrome_path: Option<PathBuf>,
    pub proxy_url: Option<String>,
    pub user_agent: String,
    /// `Accept-Language` sent with every request, e.g. "en-US,en;q=0.9".
    pub accept_language: Option<String>,
    /// Extra command-line switches.
    pub launch_args: Vec<String>,
}

impl Default for BrowserPoolConfig {
    fn default() -> Self {
        Self {
            max_tabs: 4,
            headless: true,
            chrome_path: None,
            proxy_url: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: None,
            launch_args: Vec::new(),
        }
    }
}

/// A single browser process shared by every engine run.
pub struct BrowserPool {
    config: BrowserPoolConfig,
    browser: Mutex<Option<Arc<Browser>>>,
    tab_semaphore: Arc<Semaphore>,
}

impl BrowserPool {
    pub fn new(config: BrowserPoolConfig) -> Self {
        let max_tabs = config.max_tabs.max(1);
        Self {
            config,
            browser: Mutex::new(None),
            tab_semaphore: Arc::new(Semaphore::new(max_tabs)),
        }
    }

    pub fn config(&self) -> &BrowserPoolConfig {
        &self.config
    }

    /// Tabs that can still be opened without waiting.
    pub fn available_tabs(&self) -> usize {
        self.tab_semaphore.available_permits()
    }

    /// Launches the browser on first use and returns the shared handle.
    pub async fn acquire_browser(&self) -> Result<Arc<Browser>> {
        let mut guard = self.browser.lock().await;
        if let Some(browser) = guard.as_ref() {
            return Ok(Arc::clone(browser));
        }

        let chrome = crate::browser_setup::locate_chrome(self.config.chrome_path.as_deref())?;
        debug!(
            "Launching browser {} (headless: {})",
            chrome.display(),
            self.config.headless
        );

        let mut builder = BrowserConfig::builder().chrome_executable(chrome);
        if self.config.headless {
            builder = builder.arg("--headless=new");
        } else {
            builder = builder.with_head();
        }
        builder = builder
            .arg(format!("--user-agent={}", self.config.user_agent))
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-default-apps")
            .arg("--disable-sync")
            .arg("--mute-audio")
            .arg("--no-first-run");
        if let Some(lang) = &self.config.accept_language {
            builder = builder.arg(format!("--lang={}", lang));
        }
        if let Some(proxy) = &self.config.proxy_url {
            builder = builder.arg(format!("--proxy-server={}", proxy));
        }
        for arg in &self.config.launch_args {
            builder = builder.arg(arg);
        }

        let browser_config = builder
            .build()
            .map_err(|e| SearchError::Browser(format!("Failed to build browser config: {}", e)))?;
        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| SearchError::Browser(format!("Failed to launch browser: {}", e)))?;

        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    warn!("Browser CDP handler error: {}", e);
                }
            }
            debug!("Browser CDP handler exited");
        });

        let browser = Arc::new(browser);
        *guard = Some(Arc::clone(&browser));
        Ok(browser)
    }

    /// Drops the browser handle; the process exits with its last reference.
    pub async fn shutdown(&self) {
        if self.browser.lock().await.take().is_some() {
            debug!("Browser pool shut down");
        }
    }
}

#[async_trait]
impl BrowserSession for BrowserPool {
    async fn open_page(&self) -> Result<Box<dyn PageHandle>> {
        let permit = Arc::clone(&self.tab_semaphore)
            .acquire_owned()
            .await
            .map_err(|e| SearchError::Browser(format!("Tab semaphore closed: {}", e)))?;
        let browser = self.acquire_browser().await?;

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| SearchError::Browser(format!("Failed to open tab: {}", e)))?;

        let mut ua = SetUserAgentOverrideParams::new(self.config.user_agent.clone());
        ua.accept_language = self.config.accept_language.clone();
        page.set_user_agent(ua)
            .await
            .map_err(|e| SearchError::Browser(format!("Failed to set user agent: {}", e)))?;

        Ok(Box::new(ChromiumPage {
            page,
            _permit: permit,
        }))
    }
}

/// One browser tab.
pub struct ChromiumPage {
    page: Page,
    _permit: OwnedSemaphorePermit,
}

impl ChromiumPage {
    async fn wait_for_load(&self) -> Result<()> {
        self.page
            .wait_for_navigation()
            .await
            .map_err(|e| SearchError::Browser(format!("Navigation wait failed: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl PageHandle for ChromiumPage {
    async fn goto(&self, url: &str, wait: &WaitStrategy) -> Result<()> {
        self.page
            .goto(url)
            .await
            .map_err(|e| SearchError::Browser(format!("Failed to load {}: {}", url, e)))?;

        match wait {
            WaitStrategy::Load => self.wait_for_load().await?,
            WaitStrategy::NetworkIdle { idle_ms } => {
                self.wait_for_load().await?;
                tokio::time::sleep(Duration::from_millis(*idle_ms)).await;
            }
            WaitStrategy::Selector { css, timeout_ms } => {
                let found = tokio::time::timeout(
                    Duration::from_millis(*timeout_ms),
                    self.page.find_element(css.as_str()),
                )
                .await;
                if !matches!(found, Ok(Ok(_))) {
                    debug!(
                        "Selector '{}' not found within {}ms, using current content",
                        css, timeout_ms
                    );
                }
            }
            WaitStrategy::Delay { ms } => {
                self.wait_for_load().await?;
                tokio::time::sleep(Duration::from_millis(*ms)).await;
            }
        }
        Ok(())
    }

    async fn click(&self, locator: &str) -> Result<bool> {
        let Ok(element) = self.page.find_element(locator).await else {
            return Ok(false);
        };
        element
            .click()
            .await
            .map_err(|e| SearchError::Browser(format!("Failed to click '{}': {}", locator, e)))?;
        Ok(true)
    }

    async fn scroll_to_bottom(&self) -> Result<()> {
        self.page
            .evaluate(SCROLL_SCRIPT)
            .await
            .map_err(|e| SearchError::Browser(format!("Failed to scroll: {}", e)))?;
        Ok(())
    }

    async fn content(&self) -> Result<String> {
        self.page
            .content()
            .await
            .map_err(|e| SearchError::Browser(format!("Failed to get page content: {}", e)))
    }

    async fn close(&self) -> Result<()> {
        self.page
            .clone()
            .close()
            .await
            .map_err(|e| SearchError::Browser(format!("Failed to close tab: {}", e)))
    }
}
