//! End-to-end pipeline tests: built-in engine descriptors against fixture
//! pages, with an on-disk cache in a temporary directory.

mod common;

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use common::{fast_config, Fixture, FixtureBrowser};
use csearch::{
    CachePolicy, CacheStore, EngineFailure, EngineState, FileCache, Provenance, Search,
    SearchError, SearchQuery,
};

fn google_page() -> Fixture {
    Fixture::Html(
        r#"<html><body><div id="search">
            <div class="MjjYud"><div class="g">
                <a href="/url?q=https://www.python.org/&amp;sa=U"><h3>Welcome to Python.org</h3></a>
                <div class="VwiC3b">The official home of the Python Programming Language</div>
            </div></div>
            <div class="MjjYud"><div class="g">
                <a href="https://docs.python.org/3/"><h3>Python 3 documentation</h3></a>
                <div class="VwiC3b">Tutorials and library reference</div>
            </div></div>
        </div></body></html>"#
            .to_string(),
    )
}

fn bing_page() -> Fixture {
    let tracked = format!(
        "https://www.bing.com/ck/a?!&amp;&amp;p=abc&amp;u=a1{}&amp;ntb=1",
        URL_SAFE_NO_PAD.encode("https://www.python.org/?utm_source=bing")
    );
    Fixture::Html(format!(
        r#"<html><body><ol id="b_results">
            <li class="b_algo"><h2><a href="https://wiki.python.org/moin/">PythonWiki</a></h2>
                <div class="b_caption"><p>Community wiki</p></div></li>
            <li class="b_algo"><h2><a href="{tracked}">Python.org</a></h2>
                <div class="b_caption"><p>Official site</p></div></li>
        </ol></body></html>"#
    ))
}

fn brave_page() -> Fixture {
    Fixture::Html(
        r#"<html><body><div id="results">
            <div class="snippet" data-type="web">
                <a href="https://www.python.org"><div class="title">Welcome to Python.org</div></a>
                <div class="snippet-description">Python is a programming language</div>
            </div>
        </div></body></html>"#
            .to_string(),
    )
}

fn all_engines() -> FixtureBrowser {
    FixtureBrowser::new(vec![
        ("google.com/search", google_page()),
        ("bing.com/search", bing_page()),
        ("search.brave.com", brave_page()),
    ])
}

fn search_with(browser: &FixtureBrowser, cache_dir: Option<&TempDir>) -> Search {
    let mut search = Search::new(Arc::new(browser.clone()));
    search.set_config(fast_config());
    if let Some(dir) = cache_dir {
        search.set_cache(Arc::new(FileCache::new(dir.path())));
    }
    search
}

#[tokio::test]
async fn test_python_org_ranks_first_across_three_engines() {
    let browser = all_engines();
    let search = search_with(&browser, None);

    let response = search
        .search(SearchQuery::new("python"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(response.provenance, Provenance::Fresh);
    let urls: Vec<&str> = response.items().iter().map(|r| r.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "https://python.org",
            "https://wiki.python.org/moin",
            "https://docs.python.org/3",
        ]
    );

    let top = &response.items()[0];
    assert_eq!(top.score, 3);
    assert_eq!(top.best_position, 1);
    assert_eq!(top.title, "Welcome to Python.org");
    assert_eq!(top.positions.get("bing"), Some(&2));

    for status in &response.report.engines {
        assert_eq!(status.state, EngineState::Succeeded, "{:?}", status);
    }
    assert_eq!(browser.counters.opened(), browser.counters.closed());
}

fn google_results(links: &[&str]) -> Fixture {
    let body: String = links
        .iter()
        .map(|link| {
            format!(
                r#"<div class="MjjYud"><div class="g"><a href="{link}"><h3>{link}</h3></a><div class="VwiC3b">About {link}</div></div></div>"#
            )
        })
        .collect();
    Fixture::Html(format!(r#"<html><body><div id="search">{body}</div></body></html>"#))
}

fn bing_results(links: &[&str]) -> Fixture {
    let body: String = links
        .iter()
        .map(|link| {
            format!(
                r#"<li class="b_algo"><h2><a href="{link}">{link}</a></h2><div class="b_caption"><p>About {link}</p></div></li>"#
            )
        })
        .collect();
    Fixture::Html(format!(r#"<html><body><ol id="b_results">{body}</ol></body></html>"#))
}

#[tokio::test]
async fn test_python_tutorials_two_engines_one_overlap() {
    let browser = FixtureBrowser::new(vec![
        (
            "google.com/search",
            google_results(&[
                "https://www.python.org/",
                "https://docs.python.org/3/tutorial/",
                "https://realpython.com/",
                "https://www.w3schools.com/python/",
                "https://www.learnpython.org/",
            ]),
        ),
        (
            "bing.com/search",
            bing_results(&[
                "https://www.programiz.com/python-programming",
                "https://www.python.org/",
                "https://www.tutorialspoint.com/python/",
                "https://www.geeksforgeeks.org/python-programming-language/",
                "https://www.coursera.org/articles/how-to-learn-python",
            ]),
        ),
    ]);
    let search = search_with(&browser, None);

    let response = search
        .search(
            SearchQuery::new("python tutorials")
                .with_engines(["google", "bing"])
                .with_limit(5),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let ranked: Vec<(&str, u32, u32)> = response
        .items()
        .iter()
        .map(|r| (r.url.as_str(), r.score, r.best_position))
        .collect();
    assert_eq!(
        ranked,
        vec![
            ("https://python.org", 2, 1),
            ("https://programiz.com/python-programming", 1, 1),
            ("https://docs.python.org/3/tutorial", 1, 2),
            ("https://realpython.com", 1, 3),
            ("https://tutorialspoint.com/python", 1, 3),
        ]
    );
    for status in &response.report.engines {
        assert_eq!(status.count, 5, "{:?}", status);
    }
}

#[tokio::test]
async fn test_repeat_query_is_served_from_disk() {
    let dir = TempDir::new().unwrap();
    let browser = all_engines();
    let search = search_with(&browser, Some(&dir));
    let cancel = CancellationToken::new();

    let fresh = search.search(SearchQuery::new("python"), &cancel).await.unwrap();
    let opened = browser.counters.opened();
    let cached = search.search(SearchQuery::new("python"), &cancel).await.unwrap();

    assert_eq!(cached.provenance, Provenance::Hit);
    assert_eq!(cached.report, fresh.report);
    assert_eq!(browser.counters.opened(), opened);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[tokio::test]
async fn test_read_only_miss_runs_nothing() {
    let dir = TempDir::new().unwrap();
    let browser = all_engines();
    let mut search = search_with(&browser, Some(&dir));
    search.set_cache_policy(CachePolicy::ReadOnly);

    let err = search
        .search(SearchQuery::new("python"), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, SearchError::CacheMiss(_)));
    assert_eq!(browser.counters.opened(), 0);
}

#[tokio::test]
async fn test_force_refresh_replaces_stale_entry() {
    let dir = TempDir::new().unwrap();
    let cancel = CancellationToken::new();
    let query = || SearchQuery::new("python").with_engines(["brave"]);

    let stale = FixtureBrowser::new(vec![(
        "search.brave.com",
        Fixture::Html(
            r#"<div class="snippet" data-type="web"><a href="https://old.example.com/"><div class="title">Old</div></a></div>"#
                .to_string(),
        ),
    )]);
    search_with(&stale, Some(&dir))
        .search(query(), &cancel)
        .await
        .unwrap();

    let current = all_engines();
    let mut refreshing = search_with(&current, Some(&dir));
    refreshing.set_cache_policy(CachePolicy::ForceRefresh);
    let refreshed = refreshing.search(query(), &cancel).await.unwrap();
    assert_eq!(refreshed.provenance, Provenance::Fresh);
    assert_eq!(refreshed.items()[0].url, "https://python.org");

    let reader = search_with(&current, Some(&dir));
    let hit = reader.search(query(), &cancel).await.unwrap();
    assert!(hit.is_cached());
    assert_eq!(hit.items()[0].url, "https://python.org");
}

#[tokio::test]
async fn test_hanging_engine_does_not_block_others() {
    let browser = FixtureBrowser::new(vec![
        ("google.com/search", Fixture::Hang),
        ("bing.com/search", bing_page()),
        ("search.brave.com", brave_page()),
    ]);
    let search = search_with(&browser, None);

    let response = search
        .search(SearchQuery::new("python"), &CancellationToken::new())
        .await
        .unwrap();

    let google = response.report.engine("google").unwrap();
    assert_eq!(google.state, EngineState::Failed);
    assert_eq!(google.error, Some(EngineFailure::Timeout));
    assert_eq!(response.items()[0].score, 2);
    assert_eq!(browser.counters.opened(), browser.counters.closed());
}

#[tokio::test]
async fn test_bot_check_page_is_reported() {
    let browser = FixtureBrowser::new(vec![
        (
            "google.com/search",
            Fixture::Html(r#"<form action="/sorry/index">Unusual traffic</form>"#.to_string()),
        ),
        ("search.brave.com", brave_page()),
    ]);
    let search = search_with(&browser, None);

    let response = search
        .search(
            SearchQuery::new("python").with_engines(["google", "brave"]),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let google = response.report.engine("google").unwrap();
    assert!(matches!(
        &google.error,
        Some(EngineFailure::NavigationFailure(msg)) if msg.contains("bot-check")
    ));
    assert_eq!(response.items().len(), 1);
}

#[tokio::test]
async fn test_every_engine_failing_is_an_error() {
    let browser = FixtureBrowser::new(vec![(
        "search.brave.com",
        Fixture::Fail("net::ERR_INTERNET_DISCONNECTED".into()),
    )]);
    let search = search_with(&browser, None);

    let err = search
        .search(
            SearchQuery::new("python").with_engines(["brave"]),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(err.to_string().contains("ERR_INTERNET_DISCONNECTED"));
}

#[tokio::test]
async fn test_locale_reaches_engine_urls_and_cache_key() {
    let dir = TempDir::new().unwrap();
    let browser = all_engines();
    let search = search_with(&browser, Some(&dir));
    let cancel = CancellationToken::new();

    search
        .search(
            SearchQuery::new("python").with_engines(["google"]),
            &cancel,
        )
        .await
        .unwrap();
    let localized = search
        .search(
            SearchQuery::new("python")
                .with_engines(["google"])
                .with_locale("de-DE"),
            &cancel,
        )
        .await
        .unwrap();

    assert_eq!(localized.provenance, Provenance::Fresh);
    assert!(browser
        .counters
        .visits()
        .iter()
        .any(|url| url.ends_with("&start=0&hl=de&gl=DE")));
}

#[tokio::test]
async fn test_cancelled_search_is_not_cached() {
    let dir = TempDir::new().unwrap();
    let browser = FixtureBrowser::new(vec![
        ("google.com/search", Fixture::Hang),
        ("search.brave.com", brave_page()),
    ]);
    let search = search_with(&browser, Some(&dir));
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let response = search
        .search(
            SearchQuery::new("python").with_engines(["google", "brave"]),
            &cancel,
        )
        .await
        .unwrap();

    assert_eq!(
        response.report.engine("google").unwrap().error,
        Some(EngineFailure::Cancelled)
    );
    let cache = FileCache::new(dir.path());
    assert_eq!(cache.clear().await.unwrap(), 0);
}

#[tokio::test]
async fn test_clear_removes_cached_searches() {
    let dir = TempDir::new().unwrap();
    let browser = all_engines();
    let search = search_with(&browser, Some(&dir));
    let cancel = CancellationToken::new();
    search.search(SearchQuery::new("python"), &cancel).await.unwrap();
    search.search(SearchQuery::new("rust"), &cancel).await.unwrap();

    let cache = FileCache::new(dir.path());
    assert_eq!(cache.clear().await.unwrap(), 2);

    let key = csearch::CacheKey::derive(&SearchQuery::new("python").with_engines([
        "google", "bing", "brave",
    ]));
    assert!(cache.lookup(&key).await.unwrap().is_none());
}
