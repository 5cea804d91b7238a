//! End-to-end crawls over an in-memory site

use crate::support::{chain_site, shared, test_config, StaticSite, BASE};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use threadwalk::crawler::StopReason;
use threadwalk::output::{to_records, JsonFileSink, PageRecord, ResultSink};
use threadwalk::{CrawlError, Crawler};

/// Upper bound for any single crawl in these tests
const CRAWL_DEADLINE: Duration = Duration::from_secs(10);

fn three_page_site() -> StaticSite {
    StaticSite::new()
        .page(BASE, "Home", &["/about", "/products"])
        .page("http://site.test/about", "About", &["/"])
        .page("http://site.test/products", "Products", &["/about", "/"])
}

fn crawler(site: &Arc<StaticSite>, workers: usize) -> Crawler {
    Crawler::with_transport(test_config(workers), site.clone()).unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_three_page_site_any_worker_count() {
    for workers in [1, 5, 20] {
        let site = shared(three_page_site());
        let crawler = crawler(&site, workers);

        let summary = tokio::time::timeout(CRAWL_DEADLINE, crawler.start(BASE, 10))
            .await
            .expect("crawl did not terminate")
            .unwrap();

        assert_eq!(summary.pages_visited, 3, "workers = {}", workers);
        assert_eq!(summary.success_count, 3);
        assert_eq!(summary.error_count, 0);
        assert_eq!(summary.stop_reason, StopReason::Exhausted);

        let urls: Vec<_> = crawler.results().into_iter().map(|p| p.url).collect();
        assert_eq!(
            urls,
            vec![
                "http://site.test/",
                "http://site.test/about",
                "http://site.test/products"
            ]
        );

        for (url, count) in site.fetch_counts() {
            assert_eq!(count, 1, "{} fetched {} times", url, count);
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_results_carry_titles_and_links() {
    let site = shared(three_page_site());
    let crawler = crawler(&site, 2);
    crawler.start(BASE, 10).await.unwrap();

    let results = crawler.results();
    let home = results.iter().find(|p| p.url == BASE).unwrap();
    assert_eq!(home.title, "Home");
    assert_eq!(home.status_code, 200);
    assert!(home.visited);
    assert_eq!(
        home.links,
        vec!["http://site.test/about", "http://site.test/products"]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cyclic_graph_visits_each_page_once() {
    let site = shared(chain_site(60));
    let crawler = crawler(&site, 8);

    let summary = tokio::time::timeout(CRAWL_DEADLINE, crawler.start(BASE, 1000))
        .await
        .expect("crawl did not terminate")
        .unwrap();

    assert_eq!(summary.pages_visited, 61);
    assert_eq!(summary.stop_reason, StopReason::Exhausted);
    assert_eq!(crawler.results().len(), 61);

    let counts = site.fetch_counts();
    assert_eq!(counts.len(), 61);
    assert!(counts.values().all(|&count| count == 1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_max_pages_is_exact() {
    for workers in [1, 4, 16] {
        let site = shared(chain_site(100));
        let crawler = crawler(&site, workers);

        let summary = tokio::time::timeout(CRAWL_DEADLINE, crawler.start(BASE, 10))
            .await
            .expect("crawl did not terminate")
            .unwrap();

        assert_eq!(summary.pages_visited, 10, "workers = {}", workers);
        assert_eq!(summary.stop_reason, StopReason::MaxPages);
        assert_eq!(crawler.results().len(), 10);

        let fetched: usize = site.fetch_counts().values().sum();
        assert_eq!(fetched, 10);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_zero_page_budget_visits_nothing() {
    let site = shared(three_page_site());
    let crawler = crawler(&site, 3);

    let summary = crawler.start(BASE, 0).await.unwrap();

    assert_eq!(summary.pages_visited, 0);
    assert_eq!(summary.stop_reason, StopReason::MaxPages);
    assert!(site.fetch_counts().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_budget_equal_to_site_size() {
    let site = shared(three_page_site());
    let crawler = crawler(&site, 4);

    let summary = crawler.start(BASE, 3).await.unwrap();

    assert_eq!(summary.pages_visited, 3);
    assert_eq!(crawler.results().len(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_failed_pages_do_not_stop_the_crawl() {
    let site = shared(
        StaticSite::new()
            .page(BASE, "Home", &["/missing", "/broken", "/ok"])
            .status("http://site.test/broken", 500)
            .page("http://site.test/ok", "Ok", &[]),
    );
    let crawler = crawler(&site, 3);

    let summary = tokio::time::timeout(CRAWL_DEADLINE, crawler.start(BASE, 50))
        .await
        .expect("crawl did not terminate")
        .unwrap();

    assert_eq!(summary.pages_visited, 4);
    assert_eq!(summary.success_count, 2);
    assert_eq!(summary.error_count, 2);

    let results = crawler.results();
    let missing = results
        .iter()
        .find(|p| p.url == "http://site.test/missing")
        .unwrap();
    assert_eq!(missing.status_code, 404);
    assert_eq!(missing.error.as_deref(), Some("HTTP Error: 404"));
    assert_eq!(site.fetch_count("http://site.test/missing"), 1);

    let broken = results
        .iter()
        .find(|p| p.url == "http://site.test/broken")
        .unwrap();
    assert_eq!(broken.status_code, 500);
    assert_eq!(
        broken.error.as_deref(),
        Some("HTTP Error: 500 (after 3 attempts)")
    );
    assert_eq!(site.fetch_count("http://site.test/broken"), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_out_of_scope_links_are_not_followed() {
    let site = shared(
        StaticSite::new()
            .page(
                "http://site.test/docs/",
                "Docs",
                &[
                    "intro",
                    "/blog",
                    "/docsets",
                    "https://site.test/docs/secure",
                    "http://elsewhere.test/docs/",
                ],
            )
            .page("http://site.test/docs/intro", "Intro", &["/docs/"]),
    );
    let mut config = test_config(2);
    config.crawler.base_url = "http://site.test/docs/".to_string();
    let crawler = Crawler::with_transport(config, site.clone()).unwrap();

    let summary = crawler.start("http://site.test/docs/", 50).await.unwrap();

    assert_eq!(summary.pages_visited, 2);
    let fetched: HashSet<_> = site.fetch_counts().into_keys().collect();
    assert_eq!(
        fetched,
        HashSet::from([
            "http://site.test/docs/".to_string(),
            "http://site.test/docs/intro".to_string()
        ])
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_worker_count_bounds_concurrency() {
    let site = shared(chain_site(40).latency(Duration::from_millis(5)));
    let crawler = crawler(&site, 3);

    crawler.start(BASE, 1000).await.unwrap();

    assert!(site.max_in_flight() <= 3);
    assert!(site.max_in_flight() >= 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cancel_stops_in_flight_crawl() {
    let site = shared(chain_site(500).latency(Duration::from_millis(20)));
    let crawler = Arc::new(crawler(&site, 2));

    let handle = {
        let crawler = crawler.clone();
        tokio::spawn(async move { crawler.start(BASE, 1000).await })
    };

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(crawler.is_running());
    crawler.cancel();

    let summary = tokio::time::timeout(CRAWL_DEADLINE, handle)
        .await
        .expect("crawl did not stop after cancel")
        .unwrap()
        .unwrap();

    assert_eq!(summary.stop_reason, StopReason::Cancelled);
    assert!(summary.pages_visited > 0);
    assert!(summary.pages_visited < 501);
    assert_eq!(crawler.results().len(), summary.pages_visited);
    assert!(!crawler.is_running());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_start_is_rejected() {
    let site = shared(chain_site(500).latency(Duration::from_millis(20)));
    let crawler = Arc::new(crawler(&site, 2));

    let handle = {
        let crawler = crawler.clone();
        tokio::spawn(async move { crawler.start(BASE, 1000).await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    let second = crawler.start(BASE, 10).await;
    assert!(matches!(second, Err(CrawlError::AlreadyRunning)));

    crawler.cancel();
    let first = handle.await.unwrap();
    assert!(first.is_ok());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_restart_resets_state() {
    let site = shared(three_page_site());
    let crawler = crawler(&site, 3);

    let first = crawler.start(BASE, 10).await.unwrap();
    let second = crawler.start(BASE, 10).await.unwrap();

    assert_eq!(first.pages_visited, 3);
    assert_eq!(second.pages_visited, 3);
    assert_eq!(crawler.results().len(), 3);
    assert_eq!(crawler.stats().pages_visited, 3);
    assert_eq!(site.fetch_count(BASE), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_panicking_page_becomes_error_result() {
    let site = shared(
        StaticSite::new()
            .page(BASE, "Home", &["/explode", "/fine"])
            .panics("http://site.test/explode")
            .page("http://site.test/fine", "Fine", &[]),
    );
    let crawler = crawler(&site, 2);

    let summary = tokio::time::timeout(CRAWL_DEADLINE, crawler.start(BASE, 10))
        .await
        .expect("crawl hung after a panic")
        .unwrap();

    assert_eq!(summary.pages_visited, 3);
    assert_eq!(summary.error_count, 1);
    assert_eq!(summary.stop_reason, StopReason::Exhausted);

    let exploded = crawler
        .results()
        .into_iter()
        .find(|p| p.url == "http://site.test/explode")
        .unwrap();
    assert_eq!(exploded.status_code, 0);
    assert!(exploded.error.unwrap().contains("panicked"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_transport_exhaustion_is_fatal() {
    let site = shared(
        StaticSite::new()
            .page(BASE, "Home", &["/drain"])
            .exhausted("http://site.test/drain"),
    );
    let crawler = crawler(&site, 2);

    let result = tokio::time::timeout(CRAWL_DEADLINE, crawler.start(BASE, 10))
        .await
        .expect("crawl hung after exhaustion");

    assert!(matches!(result, Err(CrawlError::ResourceExhausted(_))));
    assert!(!crawler.is_running());
    assert_eq!(site.fetch_count("http://site.test/drain"), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_invalid_seed_is_rejected() {
    let site = shared(three_page_site());
    let crawler = crawler(&site, 1);

    let result = crawler.start("ftp://site.test/", 10).await;
    assert!(matches!(result, Err(CrawlError::InvalidSeed { .. })));

    let result = crawler.start("not a url", 10).await;
    assert!(matches!(result, Err(CrawlError::InvalidSeed { .. })));
    assert!(!crawler.is_running());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_seed_is_normalized() {
    let site = shared(three_page_site());
    let crawler = crawler(&site, 2);

    let summary = crawler
        .start("HTTP://Site.Test/?utm_source=mail#top", 10)
        .await
        .unwrap();

    assert_eq!(summary.pages_visited, 3);
    assert_eq!(site.fetch_count(BASE), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_results_persist_to_json() {
    let site = shared(three_page_site());
    let crawler = crawler(&site, 2);
    crawler.start(BASE, 10).await.unwrap();

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("out").join("results.json");
    JsonFileSink::new(&path)
        .persist(&to_records(&crawler.results()))
        .unwrap();

    let records: Vec<PageRecord> =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(records.len(), 3);

    let home = records.iter().find(|r| r.url == BASE).unwrap();
    assert_eq!(home.title, "Home");
    assert_eq!(home.status_code, 200);
    assert_eq!(home.links_count, 2);
    assert!(home.error.is_none());
}
