//! Scripted browser for unit tests.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::engine::{EngineDescriptor, Pagination};
use crate::page::{BrowserSession, PageHandle, WaitStrategy};
use crate::{Result, SearchError};

/// What a scripted URL does when visited.
#[derive(Debug, Clone)]
pub(crate) enum Script {
    Html(String),
    /// Responds after a delay.
    Slow(Duration, String),
    Fail(String),
    /// Never finishes loading.
    Hang,
}

type Router = dyn Fn(&str, u32) -> Script + Send + Sync;

#[derive(Debug, Default)]
pub(crate) struct Stats {
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub visits: Mutex<Vec<String>>,
    pub clicks: Mutex<Vec<String>>,
}

impl Stats {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn visits(&self) -> Vec<String> {
        self.visits.lock().unwrap().clone()
    }

    pub fn clicks(&self) -> Vec<String> {
        self.clicks.lock().unwrap().clone()
    }
}

/// Routes URLs (by substring) to scripts. Unrouted URLs render an empty page.
pub(crate) struct ScriptedBrowser {
    routes: Arc<Vec<(String, Box<Router>)>>,
    open_delay: Duration,
    close_hangs: bool,
    pub stats: Arc<Stats>,
}

impl ScriptedBrowser {
    pub fn builder() -> ScriptedBrowserBuilder {
        ScriptedBrowserBuilder {
            routes: Vec::new(),
            open_delay: Duration::ZERO,
            close_hangs: false,
        }
    }
}

pub(crate) struct ScriptedBrowserBuilder {
    routes: Vec<(String, Box<Router>)>,
    open_delay: Duration,
    close_hangs: bool,
}

impl ScriptedBrowserBuilder {
    pub fn route(self, pattern: &str, script: Script) -> Self {
        self.route_fn(pattern, move |_, _| script.clone())
    }

    /// Routes with access to the full URL and the scroll count.
    pub fn route_fn<F>(mut self, pattern: &str, f: F) -> Self
    where
        F: Fn(&str, u32) -> Script + Send + Sync + 'static,
    {
        self.routes.push((pattern.to_string(), Box::new(f)));
        self
    }

    /// Pages take this long to open.
    pub fn open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = delay;
        self
    }

    /// `close` never returns, as with a wedged browser connection.
    pub fn close_hangs(mut self) -> Self {
        self.close_hangs = true;
        self
    }

    pub fn build(self) -> ScriptedBrowser {
        ScriptedBrowser {
            routes: Arc::new(self.routes),
            open_delay: self.open_delay,
            close_hangs: self.close_hangs,
            stats: Arc::new(Stats::default()),
        }
    }
}

fn resolve(routes: &[(String, Box<Router>)], url: &str, scrolls: u32) -> Script {
    routes
        .iter()
        .find(|(pattern, _)| url.contains(pattern.as_str()))
        .map(|(_, route)| route(url, scrolls))
        .unwrap_or_else(|| Script::Html("<html><body></body></html>".to_string()))
}

#[async_trait]
impl BrowserSession for ScriptedBrowser {
    async fn open_page(&self) -> Result<Box<dyn PageHandle>> {
        if !self.open_delay.is_zero() {
            tokio::time::sleep(self.open_delay).await;
        }
        self.stats.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedPage {
            routes: Arc::clone(&self.routes),
            close_hangs: self.close_hangs,
            stats: Arc::clone(&self.stats),
            url: Mutex::new(String::new()),
            scrolls: AtomicU32::new(0),
        }))
    }
}

struct ScriptedPage {
    routes: Arc<Vec<(String, Box<Router>)>>,
    close_hangs: bool,
    stats: Arc<Stats>,
    url: Mutex<String>,
    scrolls: AtomicU32,
}

#[async_trait]
impl PageHandle for ScriptedPage {
    async fn goto(&self, url: &str, _wait: &WaitStrategy) -> Result<()> {
        self.stats.visits.lock().unwrap().push(url.to_string());
        self.scrolls.store(0, Ordering::SeqCst);
        match resolve(&self.routes, url, 0) {
            Script::Html(_) => {}
            Script::Slow(delay, _) => tokio::time::sleep(delay).await,
            Script::Fail(msg) => return Err(SearchError::Browser(msg)),
            Script::Hang => std::future::pending::<()>().await,
        }
        *self.url.lock().unwrap() = url.to_string();
        Ok(())
    }

    async fn click(&self, locator: &str) -> Result<bool> {
        self.stats.clicks.lock().unwrap().push(locator.to_string());
        Ok(true)
    }

    async fn scroll_to_bottom(&self) -> Result<()> {
        self.scrolls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn content(&self) -> Result<String> {
        let url = self.url.lock().unwrap().clone();
        match resolve(&self.routes, &url, self.scrolls.load(Ordering::SeqCst)) {
            Script::Html(html) | Script::Slow(_, html) => Ok(html),
            _ => Ok(String::new()),
        }
    }

    async fn close(&self) -> Result<()> {
        if self.close_hangs {
            std::future::pending::<()>().await;
        }
        self.stats.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Descriptor for `https://<name>.test/search?q=...` with simple locators.
pub(crate) fn test_descriptor(name: &str, pagination: Pagination) -> EngineDescriptor {
    EngineDescriptor::new(
        name,
        format!("https://{}.test/search?q={{query}}", name),
        "div.result",
    )
    .with_fields("h3", "a[href]", "p")
    .with_no_results("div.no-results")
    .with_pagination(pagination)
}

/// Renders a results page with one container per URL.
pub(crate) fn results_html(urls: &[String]) -> String {
    let body: String = urls
        .iter()
        .map(|url| {
            format!(
                r#"<div class="result"><h3>Title of {url}</h3><a href="{url}">link</a><p>About {url}</p></div>"#
            )
        })
        .collect();
    format!("<html><body>{}</body></html>", body)
}

/// `count` URLs on `host`, numbered from `first`.
pub(crate) fn urls(host: &str, first: usize, count: usize) -> Vec<String> {
    (first..first + count)
        .map(|i| format!("https://{}/page{}", host, i))
        .collect()
}
