//! Search orchestration: cache gate, coordinated engine runs, aggregation.

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::{CacheKey, CachePolicy, CacheStore};
use crate::coordinator::{Coordinator, CoordinatorConfig};
use crate::engine::EngineDescriptor;
use crate::engines::EngineRegistry;
use crate::page::BrowserSession;
use crate::{
    Aggregator, EngineStatus, Provenance, Result, SearchError, SearchQuery, SearchReport,
    SearchResponse,
};

/// Meta search pipeline over a shared browser.
pub struct Search {
    browser: Arc<dyn BrowserSession>,
    registry: EngineRegistry,
    config: CoordinatorConfig,
    aggregator: Aggregator,
    cache: Option<Arc<dyn CacheStore>>,
    policy: CachePolicy,
}

impl Search {
    /// Creates a pipeline with the built-in engines and no cache.
    pub fn new(browser: Arc<dyn BrowserSession>) -> Self {
        Self {
            browser,
            registry: EngineRegistry::builtin(),
            config: CoordinatorConfig::default(),
            aggregator: Aggregator::new(),
            cache: None,
            policy: CachePolicy::Default,
        }
    }

    /// Replaces the engine registry.
    pub fn set_registry(&mut self, registry: EngineRegistry) {
        self.registry = registry;
    }

    /// Adds or replaces one engine descriptor.
    pub fn register_engine(&mut self, descriptor: EngineDescriptor) {
        self.registry.register(descriptor);
    }

    /// Sets timeouts and pagination limits.
    pub fn set_config(&mut self, config: CoordinatorConfig) {
        self.config = config;
    }

    pub fn set_aggregator(&mut self, aggregator: Aggregator) {
        self.aggregator = aggregator;
    }

    /// Sets the cache store.
    pub fn set_cache(&mut self, cache: Arc<dyn CacheStore>) {
        self.cache = Some(cache);
    }

    /// Sets how the cache is used.
    pub fn set_cache_policy(&mut self, policy: CachePolicy) {
        self.policy = policy;
    }

    pub fn registry(&self) -> &EngineRegistry {
        &self.registry
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Runs a query.
    ///
    /// Serves a cache hit when the policy allows it; otherwise runs every
    /// selected engine, aggregates, and stores the report. Fails only when the
    /// request is invalid, a read-only lookup misses, or every engine failed.
    pub async fn search(
        &self,
        query: SearchQuery,
        cancel: &CancellationToken,
    ) -> Result<SearchResponse> {
        if query.query.trim().is_empty() {
            return Err(SearchError::InvalidQuery("Query cannot be empty".into()));
        }
        if query.limit == 0 {
            return Err(SearchError::InvalidQuery("Limit must be at least 1".into()));
        }
        if self.registry.is_empty() {
            return Err(SearchError::NoEngines);
        }

        let start = Instant::now();
        let descriptors = self.registry.resolve(&query.engines)?;
        let query = SearchQuery {
            engines: descriptors.iter().map(|d| d.name.clone()).collect(),
            ..query
        };
        let key = CacheKey::derive(&query);

        if let Some(response) = self.lookup(&query, &key, start).await? {
            return Ok(response);
        }
        if self.policy == CachePolicy::ReadOnly {
            return Err(SearchError::CacheMiss(key.to_string()));
        }

        let coordinator = Coordinator::new(Arc::clone(&self.browser), self.config.clone());
        let runners = coordinator.runners(&descriptors)?;
        let outcomes = coordinator.run(&runners, &query, cancel).await;

        let statuses: Vec<EngineStatus> = outcomes.iter().map(|o| o.status()).collect();
        if outcomes.iter().all(|o| o.is_failed()) {
            return Err(SearchError::AllEnginesFailed(statuses));
        }

        let report = SearchReport {
            results: self.aggregator.aggregate(&outcomes, query.limit),
            engines: statuses,
        };
        self.write_back(&key, &report, cancel).await;

        Ok(SearchResponse {
            query: query.query,
            report,
            provenance: Provenance::Fresh,
            cached_at: None,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn lookup(
        &self,
        query: &SearchQuery,
        key: &CacheKey,
        start: Instant,
    ) -> Result<Option<SearchResponse>> {
        let Some(cache) = self.cache.as_ref().filter(|_| self.policy.reads()) else {
            return Ok(None);
        };

        match cache.lookup(key).await {
            Ok(Some(entry)) => {
                info!("Cache hit for '{}' ({})", query.query, key);
                Ok(Some(SearchResponse {
                    query: query.query.clone(),
                    report: entry.payload,
                    provenance: Provenance::Hit,
                    cached_at: Some(entry.written_at),
                    duration_ms: start.elapsed().as_millis() as u64,
                }))
            }
            Ok(None) => {
                debug!("Cache miss for '{}' ({})", query.query, key);
                Ok(None)
            }
            Err(e) if self.policy == CachePolicy::ReadOnly => Err(e),
            Err(e) => {
                warn!("Cache lookup failed, running engines: {}", e);
                Ok(None)
            }
        }
    }

    async fn write_back(&self, key: &CacheKey, report: &SearchReport, cancel: &CancellationToken) {
        let Some(cache) = self.cache.as_ref().filter(|_| self.policy.writes()) else {
            return;
        };
        if cancel.is_cancelled() {
            debug!("Query cancelled, not caching ({})", key);
            return;
        }

        match cache.store(key, report).await {
            Ok(entry) => info!("Cached {} results ({})", entry.payload.results.len(), key),
            Err(e) => warn!("Failed to cache results: {}", e),
        }
    }
}
