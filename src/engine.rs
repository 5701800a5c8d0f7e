//! Engine descriptors: everything that differs between search engines.
//!
//! Engines differ only in locators, URL shape and pagination parameters, so
//! each one is plain data consumed by the shared extractor and runner.

use serde::{Deserialize, Serialize};

use crate::page::WaitStrategy;

/// Placeholder substituted with the encoded query in a URL template.
pub const QUERY_PLACEHOLDER: &str = "{query}";

/// How an engine exposes further results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum Pagination {
    /// Results pages addressed by an offset query parameter.
    UrlParam {
        /// Parameter name (e.g. `start`, `first`, `offset`).
        param: String,
        /// Offset of the first page.
        start: u32,
        /// Offset increment per page.
        increment: u32,
    },
    /// More results appear after scrolling the same page.
    Scroll,
    /// A single page of results.
    #[default]
    None,
}

impl Pagination {
    /// Offset-parameter pagination.
    pub fn url_param(param: impl Into<String>, start: u32, increment: u32) -> Self {
        Self::UrlParam {
            param: param.into(),
            start,
            increment,
        }
    }
}

/// Which piece of a locale tag such as `ja-JP` a URL parameter carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocalePart {
    /// Language subtag, `ja`.
    Language,
    /// Region subtag as written, `JP`.
    Region,
    /// Region subtag lowercased, `jp`.
    RegionLower,
    /// The full tag, `ja-JP`.
    Tag,
    /// Bing's `setlang` form: the language, except Chinese which becomes
    /// `zh-cn` (Hans/CN) or `zh-tw` (Hant/TW/HK).
    BingLanguage,
}

/// One locale-dependent URL parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocaleParam {
    pub name: String,
    pub part: LocalePart,
}

impl LocaleParam {
    pub fn new(name: impl Into<String>, part: LocalePart) -> Self {
        Self {
            name: name.into(),
            part,
        }
    }

    fn value(&self, locale: &str) -> Option<String> {
        let mut parts = locale.split(['-', '_']);
        let language = parts.next().filter(|l| !l.is_empty())?;
        let region = parts.next();

        match self.part {
            LocalePart::Language => Some(language.to_string()),
            LocalePart::Region => region.map(str::to_string),
            LocalePart::RegionLower => region.map(str::to_lowercase),
            // Markets only make sense with a region.
            LocalePart::Tag => region.map(|_| locale.to_string()),
            LocalePart::BingLanguage => {
                let lang = match (language, region.map(str::to_lowercase).as_deref()) {
                    ("zh", Some("hans" | "cn")) => "zh-cn".to_string(),
                    ("zh", Some("hant" | "tw" | "hk")) => "zh-tw".to_string(),
                    (lang, _) => lang.to_string(),
                };
                Some(lang)
            }
        }
    }
}

/// How raw `href` values are turned into destination URLs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkDecoder {
    /// Use the href as-is.
    #[default]
    Direct,
    /// Unwrap `/url?q=<target>` redirect links.
    GoogleRedirect,
    /// Decode `bing.com/ck/a?...&u=a1<base64>` tracking links.
    BingTracking,
}

/// Static description of one search engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineDescriptor {
    /// Unique identifier, e.g. `google`.
    pub name: String,
    /// Search URL with a `{query}` placeholder.
    pub url_template: String,
    /// Page visited before the first search to initialize the session.
    #[serde(default)]
    pub home_url: Option<String>,
    /// Result container locators, tried in order; the first one matching
    /// anything on the page wins.
    pub result_locators: Vec<String>,
    /// Title locator, relative to a result container.
    pub title_locator: String,
    /// Link locator, relative to a result container.
    pub link_locator: String,
    /// Description locator, relative to a result container.
    pub description_locator: String,
    /// Pagination strategy.
    #[serde(default)]
    pub pagination: Pagination,
    /// Dismissible consent overlay, clicked once per run.
    #[serde(default)]
    pub consent_locator: Option<String>,
    /// Locator that marks a legitimate "nothing found" page.
    #[serde(default)]
    pub no_results_locator: Option<String>,
    /// Substrings that identify a bot-check page.
    #[serde(default)]
    pub block_markers: Vec<String>,
    /// Locale to URL parameter mapping.
    #[serde(default)]
    pub locale_params: Vec<LocaleParam>,
    #[serde(default)]
    pub link_decoder: LinkDecoder,
    /// Readiness wait after each navigation.
    #[serde(default)]
    pub wait: WaitStrategy,
}

impl EngineDescriptor {
    /// Creates a descriptor with a single result locator and no pagination.
    pub fn new(
        name: impl Into<String>,
        url_template: impl Into<String>,
        result_locator: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            url_template: url_template.into(),
            home_url: None,
            result_locators: vec![result_locator.into()],
            title_locator: "h3".to_string(),
            link_locator: "a[href]".to_string(),
            description_locator: "p".to_string(),
            pagination: Pagination::None,
            consent_locator: None,
            no_results_locator: None,
            block_markers: Vec::new(),
            locale_params: Vec::new(),
            link_decoder: LinkDecoder::Direct,
            wait: WaitStrategy::Load,
        }
    }

    /// Sets the title, link and description locators.
    pub fn with_fields(
        mut self,
        title: impl Into<String>,
        link: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.title_locator = title.into();
        self.link_locator = link.into();
        self.description_locator = description.into();
        self
    }

    /// Adds a fallback result container locator.
    pub fn with_fallback_result_locator(mut self, locator: impl Into<String>) -> Self {
        self.result_locators.push(locator.into());
        self
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self
    }

    pub fn with_home_url(mut self, url: impl Into<String>) -> Self {
        self.home_url = Some(url.into());
        self
    }

    pub fn with_consent(mut self, locator: impl Into<String>) -> Self {
        self.consent_locator = Some(locator.into());
        self
    }

    pub fn with_no_results(mut self, locator: impl Into<String>) -> Self {
        self.no_results_locator = Some(locator.into());
        self
    }

    pub fn with_block_marker(mut self, marker: impl Into<String>) -> Self {
        self.block_markers.push(marker.into());
        self
    }

    pub fn with_locale_param(mut self, name: impl Into<String>, part: LocalePart) -> Self {
        self.locale_params.push(LocaleParam::new(name, part));
        self
    }

    pub fn with_link_decoder(mut self, decoder: LinkDecoder) -> Self {
        self.link_decoder = decoder;
        self
    }

    pub fn with_wait(mut self, wait: WaitStrategy) -> Self {
        self.wait = wait;
        self
    }

    /// Builds the URL for the given zero-based page index.
    ///
    /// Scroll and single-page engines always get the plain first-page URL.
    pub fn search_url(&self, query: &str, page_index: u32, locale: Option<&str>) -> String {
        let mut url = self
            .url_template
            .replace(QUERY_PLACEHOLDER, &urlencoding::encode(query));

        if let Pagination::UrlParam {
            param,
            start,
            increment,
        } = &self.pagination
        {
            let offset = start + page_index * increment;
            push_param(&mut url, param, &offset.to_string());
        }

        if let Some(locale) = locale.map(str::trim).filter(|l| !l.is_empty()) {
            for param in &self.locale_params {
                if let Some(value) = param.value(locale) {
                    push_param(&mut url, &param.name, &urlencoding::encode(&value));
                }
            }
        }

        url
    }

    /// Maximum number of pages a run may visit.
    pub fn page_ceiling(&self, max_pages: u32) -> u32 {
        match self.pagination {
            Pagination::None => 1,
            _ => max_pages.max(1),
        }
    }

    /// Returns true if the HTML looks like a bot-check page.
    pub fn is_blocked(&self, html: &str) -> bool {
        self.block_markers.iter().any(|m| html.contains(m.as_str()))
    }
}

fn push_param(url: &mut String, name: &str, value: &str) {
    url.push(if url.contains('?') { '&' } else { '?' });
    url.push_str(name);
    url.push('=');
    url.push_str(value);
}
