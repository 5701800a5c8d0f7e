//! Search query representation.

use serde::{Deserialize, Serialize};

use crate::coordinator::ExecutionMode;

/// Default number of results requested.
pub const DEFAULT_LIMIT: usize = 10;

/// A search query with every option that affects its result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// The search terms.
    pub query: String,
    /// Engines to run, by name. Empty means every registered engine.
    pub engines: Vec<String>,
    /// Maximum number of results, per engine and after aggregation.
    pub limit: usize,
    /// Locale for regional results (e.g., "ja-JP").
    pub locale: Option<String>,
    /// Parallel or sequential engine execution.
    pub mode: ExecutionMode,
}

impl SearchQuery {
    /// Creates a new search query with the given terms.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            engines: Vec::new(),
            limit: DEFAULT_LIMIT,
            locale: None,
            mode: ExecutionMode::Parallel,
        }
    }

    /// Sets the engines to use.
    pub fn with_engines<I, S>(mut self, engines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.engines = engines.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the result limit.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Sets the language/locale.
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    /// Sets the execution mode.
    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Returns the locale, ignoring blank values.
    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref().map(str::trim).filter(|l| !l.is_empty())
    }
}
