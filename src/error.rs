//! Error types for the search library.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::EngineStatus;

/// Result type alias for search operations.
pub type Result<T> = std::result::Result<T, SearchError>;

/// Errors that can escape the search pipeline.
///
/// Engine-level problems never show up here; they are recorded as an
/// [`EngineFailure`] on the engine's outcome instead.
#[derive(Error, Debug)]
pub enum SearchError {
    /// Browser launch or page operation failed.
    #[error("Browser error: {0}")]
    Browser(String),

    /// A locator could not be compiled.
    #[error("Failed to parse locator: {0}")]
    Parse(String),

    /// No engines requested.
    #[error("No search engines configured")]
    NoEngines,

    /// Invalid query.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Requested engine is not registered.
    #[error("Unknown engine '{0}'")]
    UnknownEngine(String),

    /// Read-only cache mode and nothing stored under the key.
    #[error("Not in cache (key {0})")]
    CacheMiss(String),

    /// Every requested engine failed without producing a single result.
    #[error("All engines failed: {}", summarize(.0))]
    AllEnginesFailed(Vec<EngineStatus>),

    /// Cache store failure.
    #[error("Cache error: {0}")]
    Cache(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn summarize(statuses: &[EngineStatus]) -> String {
    statuses
        .iter()
        .map(|s| match &s.error {
            Some(e) => format!("{} ({})", s.engine, e),
            None => s.engine.clone(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Typed failure recorded on an engine outcome.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum EngineFailure {
    /// Engine unreachable, page failed to load, or the engine blocked us.
    #[error("navigation failed: {0}")]
    NavigationFailure(String),

    /// Per-engine or whole-query deadline exceeded.
    #[error("timed out")]
    Timeout,

    /// Pages loaded but nothing matched the expected result structure.
    #[error("no results matched the expected page structure")]
    ExtractionEmpty,

    /// External cancellation.
    #[error("cancelled")]
    Cancelled,
}
