//! Fixture browser for pipeline tests: serves canned HTML by URL substring.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use csearch::{
    BrowserSession, CoordinatorConfig, PageHandle, PagingConfig, Result, SearchError,
    WaitStrategy,
};

#[derive(Debug, Clone)]
pub enum Fixture {
    Html(String),
    Fail(String),
    Hang,
}

#[derive(Debug, Default)]
pub struct Counters {
    opened: AtomicUsize,
    closed: AtomicUsize,
    visits: Mutex<Vec<String>>,
}

impl Counters {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn visits(&self) -> Vec<String> {
        self.visits.lock().unwrap().clone()
    }
}

#[derive(Clone, Default)]
pub struct FixtureBrowser {
    routes: Arc<Vec<(String, Fixture)>>,
    pub counters: Arc<Counters>,
}

impl FixtureBrowser {
    pub fn new(routes: Vec<(&str, Fixture)>) -> Self {
        Self {
            routes: Arc::new(
                routes
                    .into_iter()
                    .map(|(pattern, fixture)| (pattern.to_string(), fixture))
                    .collect(),
            ),
            counters: Arc::default(),
        }
    }

    fn fixture(&self, url: &str) -> Fixture {
        self.routes
            .iter()
            .find(|(pattern, _)| url.contains(pattern.as_str()))
            .map(|(_, fixture)| fixture.clone())
            .unwrap_or_else(|| Fixture::Html(String::new()))
    }
}

#[async_trait]
impl BrowserSession for FixtureBrowser {
    async fn open_page(&self) -> Result<Box<dyn PageHandle>> {
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FixturePage {
            browser: self.clone(),
            html: Mutex::new(String::new()),
        }))
    }
}

struct FixturePage {
    browser: FixtureBrowser,
    html: Mutex<String>,
}

#[async_trait]
impl PageHandle for FixturePage {
    async fn goto(&self, url: &str, _wait: &WaitStrategy) -> Result<()> {
        self.browser
            .counters
            .visits
            .lock()
            .unwrap()
            .push(url.to_string());
        match self.browser.fixture(url) {
            Fixture::Html(html) => {
                *self.html.lock().unwrap() = html;
                Ok(())
            }
            Fixture::Fail(msg) => Err(SearchError::Browser(msg)),
            Fixture::Hang => std::future::pending().await,
        }
    }

    async fn click(&self, _locator: &str) -> Result<bool> {
        Ok(false)
    }

    async fn scroll_to_bottom(&self) -> Result<()> {
        Ok(())
    }

    async fn content(&self) -> Result<String> {
        Ok(self.html.lock().unwrap().clone())
    }

    async fn close(&self) -> Result<()> {
        self.browser.counters.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Short timeouts, two pages per engine, no delays.
pub fn fast_config() -> CoordinatorConfig {
    CoordinatorConfig {
        engine_timeout: Duration::from_millis(500),
        query_timeout: Duration::from_secs(3),
        paging: PagingConfig {
            max_pages: 2,
            page_delay: Duration::ZERO,
            scroll_wait: Duration::ZERO,
            close_grace: Duration::from_millis(200),
        },
    }
}
