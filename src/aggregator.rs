//! Result aggregation and ranking.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Write as _;

use url::Url;

use crate::{AggregatedResult, EngineOutcome, RawResult};

/// Query parameters dropped during canonicalization. Any `utm_*` parameter is
/// dropped as well.
pub const DEFAULT_TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "ref",
    "source",
    "campaign",
    "fbclid",
    "gclid",
    "msclkid",
    "mc_cid",
    "mc_eid",
    "dclid",
    "srsltid",
];

/// Merges engine outcomes into one ranked list keyed by canonical URL.
#[derive(Debug, Clone)]
pub struct Aggregator {
    tracking_params: BTreeSet<String>,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self {
            tracking_params: DEFAULT_TRACKING_PARAMS
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }
}

struct Group {
    result: AggregatedResult,
    /// (position, engine) of the result supplying title and description.
    representative: (u32, String),
}

impl Aggregator {
    /// Creates an aggregator with the default tracking parameter list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a query parameter to strip during canonicalization.
    pub fn add_tracking_param(&mut self, param: impl Into<String>) {
        self.tracking_params.insert(param.into().to_ascii_lowercase());
    }

    /// Replaces the tracking parameter list.
    pub fn with_tracking_params<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tracking_params = params
            .into_iter()
            .map(|p| p.into().to_ascii_lowercase())
            .collect();
        self
    }

    fn is_tracking(&self, key: &str) -> bool {
        let key = key.to_ascii_lowercase();
        key.starts_with("utm_") || self.tracking_params.contains(&key)
    }

    /// Returns the deduplication identity of a URL.
    ///
    /// Lowercases scheme and host, drops a leading `www.`, the default port,
    /// user info, the fragment, trailing slashes and tracking parameters, and
    /// sorts the remaining query parameters. Unparseable input is returned
    /// trimmed.
    pub fn canonicalize(&self, raw: &str) -> String {
        let raw = raw.trim();
        let Ok(url) = Url::parse(raw) else {
            return raw.to_string();
        };
        let Some(host) = url.host_str() else {
            return raw.to_string();
        };

        let host = host.strip_prefix("www.").unwrap_or(host);
        let mut canonical = format!("{}://{}", url.scheme(), host);
        if let Some(port) = url.port() {
            let _ = write!(canonical, ":{}", port);
        }
        canonical.push_str(url.path().trim_end_matches('/'));

        let mut params: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| !self.is_tracking(k))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        if !params.is_empty() {
            params.sort();
            let query = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(&params)
                .finish();
            canonical.push('?');
            canonical.push_str(&query);
        }

        canonical
    }

    /// Aggregates every result of every outcome, including partial ones.
    ///
    /// Score is the number of distinct engines that surfaced a canonical URL.
    /// Ordering is score descending, then best position ascending, then
    /// canonical URL, so equal input always yields equal output. Title and
    /// description come from the lowest-positioned contributing result.
    pub fn aggregate(&self, outcomes: &[EngineOutcome], limit: usize) -> Vec<AggregatedResult> {
        let mut groups: HashMap<String, Group> = HashMap::new();

        for raw in outcomes.iter().flat_map(|o| o.results.iter()) {
            let canonical = self.canonicalize(&raw.url);
            match groups.get_mut(&canonical) {
                Some(group) => merge(group, raw),
                None => {
                    groups.insert(canonical.clone(), new_group(canonical, raw));
                }
            }
        }

        let mut results: Vec<AggregatedResult> = groups
            .into_values()
            .map(|mut group| {
                group.result.score = group.result.engines.len() as u32;
                group.result
            })
            .collect();

        results.sort_by(|a, b| {
            (Reverse(a.score), a.best_position, &a.url).cmp(&(
                Reverse(b.score),
                b.best_position,
                &b.url,
            ))
        });
        results.truncate(limit);
        results
    }
}

fn new_group(canonical: String, raw: &RawResult) -> Group {
    Group {
        result: AggregatedResult {
            url: canonical,
            original_url: raw.url.clone(),
            title: raw.title.clone(),
            description: raw.description.clone(),
            score: 0,
            engines: BTreeSet::from([raw.engine.clone()]),
            best_position: raw.position,
            positions: BTreeMap::from([(raw.engine.clone(), raw.position)]),
        },
        representative: (raw.position, raw.engine.clone()),
    }
}

fn merge(group: &mut Group, raw: &RawResult) {
    let result = &mut group.result;
    result.engines.insert(raw.engine.clone());
    result
        .positions
        .entry(raw.engine.clone())
        .and_modify(|p| *p = (*p).min(raw.position))
        .or_insert(raw.position);
    result.best_position = result.best_position.min(raw.position);

    if (raw.position, raw.engine.as_str())
        < (group.representative.0, group.representative.1.as_str())
    {
        result.original_url = raw.url.clone();
        result.title = raw.title.clone();
        result.description = raw.description.clone();
        group.representative = (raw.position, raw.engine.clone());
    }
}
