//! Parallel coordinator: runs the selected engines for one query.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::engine::EngineDescriptor;
use crate::page::BrowserSession;
use crate::runner::{EngineRunner, PagingConfig, RunContext};
use crate::{EngineOutcome, EngineState, Result, SearchQuery};

/// How engines are scheduled for a query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// All engines at once, on separate pages.
    #[default]
    Parallel,
    /// One engine at a time, in request order.
    Sequential,
}

/// Timeouts and pagination limits for a coordinated run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Budget for a single engine.
    pub engine_timeout: Duration,
    /// Budget for the whole query; bounds every engine's deadline.
    pub query_timeout: Duration,
    #[serde(flatten)]
    pub paging: PagingConfig,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            engine_timeout: Duration::from_secs(30),
            query_timeout: Duration::from_secs(60),
            paging: PagingConfig::default(),
        }
    }
}

/// Fans a query out to engine runners over a shared browser.
pub struct Coordinator {
    browser: Arc<dyn BrowserSession>,
    config: CoordinatorConfig,
}

impl Coordinator {
    pub fn new(browser: Arc<dyn BrowserSession>, config: CoordinatorConfig) -> Self {
        Self { browser, config }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Builds a runner per descriptor with this coordinator's paging limits.
    pub fn runners(&self, descriptors: &[&EngineDescriptor]) -> Result<Vec<EngineRunner>> {
        descriptors
            .iter()
            .map(|d| EngineRunner::new((*d).clone(), self.config.paging.clone()))
            .collect()
    }

    /// Runs every runner and returns one outcome per runner, in runner order.
    ///
    /// Never fails as a whole: timeouts, navigation errors and cancellation
    /// are reported on the individual outcomes.
    pub async fn run(
        &self,
        runners: &[EngineRunner],
        query: &SearchQuery,
        cancel: &CancellationToken,
    ) -> Vec<EngineOutcome> {
        let start = Instant::now();
        let query_deadline = start + self.config.query_timeout;

        debug!(
            "Running {} engines ({:?}) for '{}'",
            runners.len(),
            query.mode,
            query.query
        );

        let outcomes = match query.mode {
            ExecutionMode::Parallel => {
                let futures = runners.iter().map(|runner| {
                    let ctx = self.context(query, cancel, start, query_deadline);
                    async move { runner.run(self.browser.as_ref(), &ctx).await }
                });
                join_all(futures).await
            }
            ExecutionMode::Sequential => {
                let mut outcomes = Vec::with_capacity(runners.len());
                for runner in runners {
                    let ctx = self.context(query, cancel, Instant::now(), query_deadline);
                    outcomes.push(runner.run(self.browser.as_ref(), &ctx).await);
                }
                outcomes
            }
        };

        let count = |state: EngineState| outcomes.iter().filter(|o| o.state() == state).count();
        info!(
            "Query '{}' finished in {:?}: {} succeeded, {} partial, {} failed",
            query.query,
            start.elapsed(),
            count(EngineState::Succeeded),
            count(EngineState::Partial),
            count(EngineState::Failed)
        );

        outcomes
    }

    /// The engine deadline is `engine_timeout` from `now`, capped by the
    /// query deadline.
    fn context<'a>(
        &self,
        query: &'a SearchQuery,
        cancel: &'a CancellationToken,
        now: Instant,
        query_deadline: Instant,
    ) -> RunContext<'a> {
        RunContext {
            query: &query.query,
            limit: query.limit,
            locale: query.locale(),
            deadline: (now + self.config.engine_timeout).min(query_deadline),
            cancel,
        }
    }
}
