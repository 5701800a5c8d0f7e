//! Search result types.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::EngineFailure;

/// A single result as extracted from one engine's page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawResult {
    /// Result title.
    pub title: String,
    /// Result URL as served by the engine (after link decoding).
    pub url: String,
    /// Result description/snippet. Empty when the engine renders none.
    pub description: String,
    /// Name of the engine that produced it.
    pub engine: String,
    /// 1-based rank within that engine's output.
    pub position: u32,
}

impl RawResult {
    /// Creates a new raw result.
    pub fn new(
        engine: impl Into<String>,
        position: u32,
        url: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            description: description.into(),
            engine: engine.into(),
            position,
        }
    }
}

/// The always-produced result of running one engine for one query.
#[derive(Debug, Clone)]
pub struct EngineOutcome {
    /// Engine name.
    pub engine: String,
    /// Results in engine order.
    pub results: Vec<RawResult>,
    /// Wall time spent on this engine.
    pub elapsed: Duration,
    /// Failure, if the run did not complete normally.
    pub error: Option<EngineFailure>,
}

impl EngineOutcome {
    /// A failed outcome with no results.
    pub fn failed(engine: impl Into<String>, error: EngineFailure, elapsed: Duration) -> Self {
        Self {
            engine: engine.into(),
            results: Vec::new(),
            elapsed,
            error: Some(error),
        }
    }

    /// Classifies the outcome.
    pub fn state(&self) -> EngineState {
        match (&self.error, self.results.is_empty()) {
            (None, _) => EngineState::Succeeded,
            (Some(_), false) => EngineState::Partial,
            (Some(_), true) => EngineState::Failed,
        }
    }

    /// Returns true if the engine produced nothing usable.
    pub fn is_failed(&self) -> bool {
        self.state() == EngineState::Failed
    }

    /// Summarizes the outcome for display.
    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            engine: self.engine.clone(),
            state: self.state(),
            count: self.results.len(),
            elapsed_ms: self.elapsed.as_millis() as u64,
            error: self.error.clone(),
        }
    }
}

/// How an engine's run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    /// Completed normally (possibly with zero results).
    Succeeded,
    /// Interrupted, but some results were gathered first.
    Partial,
    /// Interrupted with nothing gathered.
    Failed,
}

/// Per-engine status line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStatus {
    pub engine: String,
    pub state: EngineState,
    pub count: usize,
    pub elapsed_ms: u64,
    pub error: Option<EngineFailure>,
}

/// One distinct canonical URL merged across engines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedResult {
    /// Canonical URL (deduplication identity).
    pub url: String,
    /// URL as served by the representative result.
    pub original_url: String,
    /// Title of the representative result.
    pub title: String,
    /// Description of the representative result.
    pub description: String,
    /// Number of distinct engines that surfaced this URL.
    pub score: u32,
    /// Engines that surfaced this URL.
    pub engines: BTreeSet<String>,
    /// Smallest position any contributing engine assigned.
    pub best_position: u32,
    /// Best position per contributing engine.
    pub positions: BTreeMap<String, u32>,
}

/// Ranked results plus per-engine status: the cacheable payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchReport {
    pub results: Vec<AggregatedResult>,
    pub engines: Vec<EngineStatus>,
}

impl SearchReport {
    /// Returns the ranked results.
    pub fn items(&self) -> &[AggregatedResult] {
        &self.results
    }

    /// Returns the status for one engine.
    pub fn engine(&self, name: &str) -> Option<&EngineStatus> {
        self.engines.iter().find(|s| s.engine == name)
    }
}

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Served from the cache.
    Hit,
    /// Computed by running the engines.
    Fresh,
}

/// What the pipeline hands back to its caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub report: SearchReport,
    pub provenance: Provenance,
    /// When the cached entry was written, for cache hits.
    pub cached_at: Option<DateTime<Utc>>,
    pub duration_ms: u64,
}

impl SearchResponse {
    /// Returns the ranked results.
    pub fn items(&self) -> &[AggregatedResult] {
        self.report.items()
    }

    /// Returns true if served from the cache.
    pub fn is_cached(&self) -> bool {
        self.provenance == Provenance::Hit
    }
}
