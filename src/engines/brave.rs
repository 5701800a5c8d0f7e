//! Brave Search descriptor.

use crate::engine::{EngineDescriptor, LocalePart, Pagination};

/// Builds the Brave descriptor.
pub fn brave() -> EngineDescriptor {
    EngineDescriptor::new(
        "brave",
        "https://search.brave.com/search?q={query}&source=web",
        r#"div.snippet[data-type="web"]"#,
    )
    .with_fields(
        ".title, .search-snippet-title, h2",
        r#"a[href^="http"]"#,
        ".snippet-description, .generic-snippet, .snippet-content",
    )
    // `offset` is a page number on Brave, not a result offset.
    .with_pagination(Pagination::url_param("offset", 0, 1))
    .with_consent("[data-action='accept']")
    .with_locale_param("country", LocalePart::RegionLower)
}
