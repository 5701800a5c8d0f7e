//! Shared result extractor.
//!
//! Works on a snapshot of the rendered DOM, so extraction is synchronous and
//! can be repeated on the same page (e.g. after a scroll) without side
//! effects.

use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::engine::{EngineDescriptor, LinkDecoder};
use crate::{RawResult, Result, SearchError};

/// Results read from one page snapshot.
#[derive(Debug, Clone, Default)]
pub struct PageExtract {
    /// Results in DOM order, positions 1-based within this page.
    pub results: Vec<RawResult>,
    /// The page carries the engine's "nothing found" marker.
    pub no_results: bool,
}

/// An engine descriptor with its locators compiled.
#[derive(Debug)]
pub struct Extractor {
    engine: String,
    containers: Vec<Selector>,
    title: Selector,
    link: Selector,
    description: Selector,
    no_results: Option<Selector>,
    decoder: LinkDecoder,
}

impl Extractor {
    /// Compiles every locator of the descriptor.
    pub fn compile(descriptor: &EngineDescriptor) -> Result<Self> {
        if descriptor.result_locators.is_empty() {
            return Err(SearchError::Parse(format!(
                "engine '{}' has no result locator",
                descriptor.name
            )));
        }

        Ok(Self {
            engine: descriptor.name.clone(),
            containers: descriptor
                .result_locators
                .iter()
                .map(|l| parse_selector(l))
                .collect::<Result<_>>()?,
            title: parse_selector(&descriptor.title_locator)?,
            link: parse_selector(&descriptor.link_locator)?,
            description: parse_selector(&descriptor.description_locator)?,
            no_results: descriptor
                .no_results_locator
                .as_deref()
                .map(parse_selector)
                .transpose()?,
            decoder: descriptor.link_decoder,
        })
    }

    /// Returns the engine name results are attributed to.
    pub fn engine(&self) -> &str {
        &self.engine
    }

    /// Extracts results from rendered HTML.
    ///
    /// Containers without a usable http(s) link are skipped; a missing title
    /// or description becomes an empty string.
    pub fn extract(&self, html: &str) -> PageExtract {
        let document = Html::parse_document(html);

        let containers: Vec<ElementRef> = self
            .containers
            .iter()
            .map(|selector| document.select(selector).collect::<Vec<_>>())
            .find(|nodes| !nodes.is_empty())
            .unwrap_or_default();

        let mut results = Vec::new();
        for node in containers {
            let Some(url) = node
                .select(&self.link)
                .filter_map(|a| a.value().attr("href"))
                .find_map(|href| self.decode_link(href))
            else {
                continue;
            };

            let title = node
                .select(&self.title)
                .next()
                .map(text_of)
                .unwrap_or_default();

            let description = node
                .select(&self.description)
                .map(text_of)
                .find(|t| !t.is_empty())
                .unwrap_or_default();

            let position = results.len() as u32 + 1;
            results.push(RawResult::new(
                &self.engine,
                position,
                url,
                title,
                description,
            ));
        }

        let no_results = self
            .no_results
            .as_ref()
            .is_some_and(|s| document.select(s).next().is_some());

        PageExtract {
            results,
            no_results,
        }
    }

    fn decode_link(&self, href: &str) -> Option<String> {
        let href = href.trim();
        let decoded = match self.decoder {
            LinkDecoder::Direct => None,
            LinkDecoder::GoogleRedirect => decode_google_redirect(href),
            LinkDecoder::BingTracking => decode_bing_tracking(href),
        }
        .unwrap_or_else(|| href.to_string());

        let parsed = Url::parse(&decoded).ok()?;
        matches!(parsed.scheme(), "http" | "https").then_some(decoded)
    }
}

fn parse_selector(locator: &str) -> Result<Selector> {
    Selector::parse(locator)
        .map_err(|e| SearchError::Parse(format!("'{}': {:?}", locator, e)))
}

fn text_of(element: ElementRef) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Unwraps `/url?q=<target>&...` redirect links.
fn decode_google_redirect(href: &str) -> Option<String> {
    let query = href
        .strip_prefix("/url?")
        .or_else(|| href.split_once("google.com/url?").map(|(_, q)| q))?;

    url::form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == "q" || k == "url")
        .map(|(_, v)| v.into_owned())
}

/// Decodes `bing.com/ck/a?...&u=a1<base64>` tracking links.
fn decode_bing_tracking(href: &str) -> Option<String> {
    if !href.contains("bing.com/ck/a") {
        return None;
    }

    let parsed = Url::parse(href).ok()?;
    let encoded = parsed
        .query_pairs()
        .find(|(k, _)| k == "u")
        .map(|(_, v)| v.into_owned())?;
    let payload = encoded.strip_prefix("a1")?.trim_end_matches('=');

    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .or_else(|_| STANDARD_NO_PAD.decode(payload))
        .ok()?;
    String::from_utf8(bytes).ok()
}
