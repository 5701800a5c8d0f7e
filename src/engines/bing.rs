//! Bing descriptor.

use crate::engine::{EngineDescriptor, LinkDecoder, LocalePart, Pagination};
use crate::page::WaitStrategy;

/// Builds the Bing descriptor.
///
/// `filters=rcrse:"1"` turns off query autocorrection, which otherwise
/// silently swaps the query for a "corrected" one.
pub fn bing() -> EngineDescriptor {
    EngineDescriptor::new(
        "bing",
        "https://www.bing.com/search?q={query}&pq={query}&filters=rcrse%3A%221%22&FORM=PERE&ghc=1&lq=0&qs=n&sp=-1",
        "li.b_algo",
    )
    .with_fields(
        "h2",
        "h2 a[href]",
        "div.b_caption p, p.b_lineclamp2, p.b_algoSlug, div.b_caption",
    )
    .with_home_url("https://www.bing.com/")
    // Bing counts results from 1: first=1, 11, 21, ...
    .with_pagination(Pagination::url_param("first", 1, 10))
    .with_consent("button#bnp_btn_accept, #bnp_container button")
    .with_no_results("li.b_no")
    .with_locale_param("setlang", LocalePart::BingLanguage)
    .with_locale_param("mkt", LocalePart::Tag)
    .with_locale_param("cc", LocalePart::Region)
    .with_link_decoder(LinkDecoder::BingTracking)
    .with_wait(WaitStrategy::Selector {
        css: "li.b_algo".to_string(),
        timeout_ms: 5000,
    })
}
