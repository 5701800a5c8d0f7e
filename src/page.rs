//! Browser capability consumed by the engine runners.
//!
//! The browser runtime itself lives behind these traits: a long-lived
//! [`BrowserSession`] hands out one [`PageHandle`] per engine run, and the
//! runner owns that page until it closes it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Strategy for waiting until a page is considered ready after navigation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WaitStrategy {
    /// Wait for the page load event only.
    #[default]
    Load,
    /// Wait until network activity settles for the given duration.
    NetworkIdle {
        /// Milliseconds of network inactivity to wait for.
        idle_ms: u64,
    },
    /// Wait until a CSS selector matches an element on the page.
    ///
    /// Not finding the selector in time is not an error; the page may be a
    /// "no results" page, which extraction then reports on its own.
    Selector {
        /// CSS selector to wait for.
        css: String,
        /// Maximum time to wait in milliseconds.
        timeout_ms: u64,
    },
    /// Wait a fixed delay after the page load event.
    Delay {
        /// Milliseconds to wait after page load.
        ms: u64,
    },
}

/// A long-lived browser shared by every engine run.
///
/// `open_page` must be safe to call concurrently; each call returns a page
/// no other caller can observe. A runner that times out or is cancelled
/// while a page is opening keeps polling the open for its close grace and
/// closes the page if one arrives within it. An open still pending after
/// that is dropped.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Opens a fresh page (tab).
    async fn open_page(&self) -> Result<Box<dyn PageHandle>>;
}

/// One open page, owned by a single engine run.
#[async_trait]
pub trait PageHandle: Send + Sync {
    /// Navigates to `url` and waits according to `wait`.
    async fn goto(&self, url: &str, wait: &WaitStrategy) -> Result<()>;

    /// Clicks the first element matching `locator`.
    ///
    /// Returns `Ok(false)` when nothing matches.
    async fn click(&self, locator: &str) -> Result<bool>;

    /// Scrolls to the bottom of the page to trigger lazy loading.
    async fn scroll_to_bottom(&self) -> Result<()>;

    /// Returns the currently rendered DOM as HTML.
    async fn content(&self) -> Result<String>;

    /// Closes the page. Called exactly once per page.
    async fn close(&self) -> Result<()>;
}
