//! Engine runner: drives one engine end-to-end for one query.
//!
//! The runner owns its page for the whole run and always closes it, whether
//! the run finished, failed, hit its deadline or was cancelled. Failures are
//! reported on the returned [`EngineOutcome`]; nothing is raised past `run`.

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{sleep, sleep_until, timeout, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::engine::{EngineDescriptor, Pagination};
use crate::extractor::Extractor;
use crate::page::{BrowserSession, PageHandle, WaitStrategy};
use crate::{EngineFailure, EngineOutcome, RawResult, Result, SearchError};

/// Pagination and page lifecycle limits shared by every runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagingConfig {
    /// Maximum number of pages (or scroll steps) per engine.
    pub max_pages: u32,
    /// Pause between result pages.
    pub page_delay: Duration,
    /// Wait for lazily loaded content after a scroll.
    pub scroll_wait: Duration,
    /// How long closing a page (or finishing an abandoned open) may take
    /// once the run is over.
    pub close_grace: Duration,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            max_pages: 5,
            page_delay: Duration::from_secs(1),
            scroll_wait: Duration::from_millis(1500),
            close_grace: Duration::from_secs(2),
        }
    }
}

/// Per-run inputs.
#[derive(Debug, Clone, Copy)]
pub struct RunContext<'a> {
    pub query: &'a str,
    pub limit: usize,
    pub locale: Option<&'a str>,
    /// The run is abandoned as timed out at this instant.
    pub deadline: Instant,
    pub cancel: &'a CancellationToken,
}

/// Runs one engine descriptor against the shared browser.
#[derive(Debug)]
pub struct EngineRunner {
    descriptor: EngineDescriptor,
    extractor: Extractor,
    paging: PagingConfig,
}

impl EngineRunner {
    /// Creates a runner, compiling the descriptor's locators.
    pub fn new(descriptor: EngineDescriptor, paging: PagingConfig) -> Result<Self> {
        let extractor = Extractor::compile(&descriptor)?;
        Ok(Self {
            descriptor,
            extractor,
            paging,
        })
    }

    /// Returns the engine name.
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn descriptor(&self) -> &EngineDescriptor {
        &self.descriptor
    }

    /// Runs the engine and reports exactly one outcome.
    pub async fn run(&self, browser: &dyn BrowserSession, ctx: &RunContext<'_>) -> EngineOutcome {
        let start = Instant::now();

        let open = browser.open_page();
        tokio::pin!(open);
        let opened = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => Err(EngineFailure::Cancelled),
            _ = sleep_until(ctx.deadline) => Err(EngineFailure::Timeout),
            opened = &mut open => Ok(opened),
        };
        let page = match opened {
            Ok(Ok(page)) => page,
            Ok(Err(e)) => {
                let failure = EngineFailure::NavigationFailure(e.to_string());
                return self.finish(start, Vec::new(), Err(failure));
            }
            Err(failure) => {
                // An open still in flight may yet produce a tab.
                if let Ok(Ok(page)) = timeout(self.paging.close_grace, open).await {
                    self.close_page(page.as_ref()).await;
                }
                return self.finish(start, Vec::new(), Err(failure));
            }
        };

        let mut results = Vec::new();
        let status = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => Err(EngineFailure::Cancelled),
            _ = sleep_until(ctx.deadline) => Err(EngineFailure::Timeout),
            status = self.drive(page.as_ref(), ctx, &mut results) => status,
        };

        self.close_page(page.as_ref()).await;
        self.finish(start, results, status)
    }

    async fn drive(
        &self,
        page: &dyn PageHandle,
        ctx: &RunContext<'_>,
        results: &mut Vec<RawResult>,
    ) -> std::result::Result<(), EngineFailure> {
        let d = &self.descriptor;
        let mut consent_pending = d.consent_locator.is_some();

        if let Some(home) = &d.home_url {
            debug!("Engine {} warming up at {}", d.name, home);
            page.goto(home, &WaitStrategy::Load)
                .await
                .map_err(navigation_failure)?;
            self.dismiss_consent(page, &mut consent_pending).await;
        }

        let ceiling = d.page_ceiling(self.paging.max_pages);
        let mut seen: HashSet<String> = results.iter().map(|r| r.url.clone()).collect();
        let mut empty_pages = 0;
        let mut exhausted = false;

        for page_index in 0..ceiling {
            if page_index == 0 || matches!(d.pagination, Pagination::UrlParam { .. }) {
                let url = d.search_url(ctx.query, page_index, ctx.locale);
                debug!("Engine {} loading page {}: {}", d.name, page_index + 1, url);
                page.goto(&url, &d.wait).await.map_err(navigation_failure)?;
                self.dismiss_consent(page, &mut consent_pending).await;
            } else {
                debug!("Engine {} scrolling for more results", d.name);
                page.scroll_to_bottom().await.map_err(navigation_failure)?;
                sleep(self.paging.scroll_wait).await;
            }

            let html = page.content().await.map_err(navigation_failure)?;
            if d.is_blocked(&html) {
                return Err(EngineFailure::NavigationFailure(format!(
                    "{} served a bot-check page",
                    d.name
                )));
            }

            let extracted = self.extractor.extract(&html);
            let mut fresh = 0;
            for raw in extracted.results {
                if results.len() >= ctx.limit {
                    break;
                }
                if seen.insert(raw.url.clone()) {
                    let position = results.len() as u32 + 1;
                    results.push(RawResult { position, ..raw });
                    fresh += 1;
                }
            }
            debug!(
                "Engine {} page {} yielded {} new results ({} total)",
                d.name,
                page_index + 1,
                fresh,
                results.len()
            );

            if results.len() >= ctx.limit {
                break;
            }
            if fresh == 0 {
                if extracted.no_results {
                    exhausted = true;
                    break;
                }
                empty_pages += 1;
                if empty_pages >= 2 {
                    break;
                }
            } else {
                empty_pages = 0;
            }

            if page_index + 1 < ceiling && !self.paging.page_delay.is_zero() {
                sleep(self.paging.page_delay).await;
            }
        }

        if results.is_empty() && !exhausted {
            return Err(EngineFailure::ExtractionEmpty);
        }
        Ok(())
    }

    /// Closes the page, giving up after `close_grace`.
    async fn close_page(&self, page: &dyn PageHandle) {
        match timeout(self.paging.close_grace, page.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Failed to close page for engine {}: {}", self.name(), e),
            Err(_) => warn!(
                "Page for engine {} did not close within {:?}, abandoning it",
                self.name(),
                self.paging.close_grace
            ),
        }
    }

    /// Best-effort, at most once per run.
    async fn dismiss_consent(&self, page: &dyn PageHandle, pending: &mut bool) {
        if !std::mem::take(pending) {
            return;
        }
        let Some(locator) = &self.descriptor.consent_locator else {
            return;
        };
        match page.click(locator).await {
            Ok(true) => debug!("Engine {} dismissed consent prompt", self.name()),
            Ok(false) => {}
            Err(e) => debug!("Engine {} consent prompt not dismissed: {}", self.name(), e),
        }
    }

    fn finish(
        &self,
        start: Instant,
        results: Vec<RawResult>,
        status: std::result::Result<(), EngineFailure>,
    ) -> EngineOutcome {
        let outcome = EngineOutcome {
            engine: self.descriptor.name.clone(),
            results,
            elapsed: start.elapsed(),
            error: status.err(),
        };
        match &outcome.error {
            None => debug!(
                "Engine {} returned {} results in {:?}",
                outcome.engine,
                outcome.results.len(),
                outcome.elapsed
            ),
            Some(e) => warn!(
                "Engine {} failed after {} results: {}",
                outcome.engine,
                outcome.results.len(),
                e
            ),
        }
        outcome
    }
}

fn navigation_failure(e: SearchError) -> EngineFailure {
    EngineFailure::NavigationFailure(e.to_string())
}
