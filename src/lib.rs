//! # csearch
//!
//! A browser-driven meta search library. Each query runs against several
//! public web search engines through one shared headless browser, and the
//! results are merged into a single ranked list.
//!
//! - Parallel (or sequential) engine runs with per-engine and per-query
//!   deadlines and cooperative cancellation
//! - Engines described as data: URL template, locators, pagination mode
//! - Deduplication by canonical URL, ranking by engine agreement
//! - Content-addressed result cache
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use csearch::{BrowserPool, BrowserPoolConfig, Search, SearchQuery};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let browser = Arc::new(BrowserPool::new(BrowserPoolConfig::default()));
//!     let search = Search::new(browser);
//!
//!     let query = SearchQuery::new("rust programming").with_engines(["google", "bing"]);
//!     let response = search.search(query, &CancellationToken::new()).await?;
//!
//!     for result in response.items() {
//!         println!("[{}] {}: {}", result.score, result.title, result.url);
//!     }
//!     Ok(())
//! }
//! ```

mod aggregator;
mod cache;
mod coordinator;
mod engine;
mod error;
mod extractor;
mod page;
mod query;
mod result;
mod runner;
mod search;

pub mod engines;

#[cfg(feature = "headless")]
mod browser;
#[cfg(feature = "headless")]
pub mod browser_setup;

#[cfg(test)]
mod testing;

pub use aggregator::{Aggregator, DEFAULT_TRACKING_PARAMS};
pub use cache::{
    CacheEntry, CacheKey, CachePolicy, CacheStore, FileCache, MemoryCache, CACHE_DIR_ENV,
};
pub use coordinator::{Coordinator, CoordinatorConfig, ExecutionMode};
pub use engine::{
    EngineDescriptor, LinkDecoder, LocaleParam, LocalePart, Pagination, QUERY_PLACEHOLDER,
};
pub use error::{EngineFailure, Result, SearchError};
pub use extractor::{Extractor, PageExtract};
pub use page::{BrowserSession, PageHandle, WaitStrategy};
pub use query::{SearchQuery, DEFAULT_LIMIT};
pub use result::{
    AggregatedResult, EngineOutcome, EngineState, EngineStatus, Provenance, RawResult,
    SearchReport, SearchResponse,
};
pub use runner::{EngineRunner, PagingConfig, RunContext};
pub use search::Search;

#[cfg(feature = "headless")]
pub use browser::{BrowserPool, BrowserPoolConfig, ChromiumPage, DEFAULT_USER_AGENT};
