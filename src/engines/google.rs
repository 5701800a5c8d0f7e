//! Google descriptor.
//!
//! Google's results page relies on JavaScript rendering and aggressively
//! blocks automated traffic, so it is always driven through the browser.

use crate::engine::{EngineDescriptor, LinkDecoder, LocalePart, Pagination};
use crate::page::WaitStrategy;

/// Builds the Google descriptor.
pub fn google() -> EngineDescriptor {
    EngineDescriptor::new(
        "google",
        "https://www.google.com/search?q={query}",
        "div.MjjYud",
    )
    .with_fallback_result_locator("div.g")
    .with_fallback_result_locator("div.tF2Cxc")
    .with_fields("h3", "a[href]", "div.VwiC3b, div[data-sncf], span.st")
    .with_home_url("https://www.google.com/")
    .with_pagination(Pagination::url_param("start", 0, 10))
    .with_consent("button#L2AGLb, [aria-label='Accept all']")
    .with_no_results("#topstuff .card-section")
    .with_block_marker("/sorry/index")
    .with_block_marker("recaptcha")
    .with_locale_param("hl", LocalePart::Language)
    .with_locale_param("gl", LocalePart::Region)
    .with_link_decoder(LinkDecoder::GoogleRedirect)
    .with_wait(WaitStrategy::Selector {
        css: "div#search".to_string(),
        timeout_ms: 5000,
    })
}
