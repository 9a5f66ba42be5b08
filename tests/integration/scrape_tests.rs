//! Integration tests for the scraper
//!
//! These tests use wiremock to serve listing and company pages and run
//! the full pagination → listings → companies cycle end-to-end.

use edgar_ripple::config::{Config, FailureMode, PaginationRounding};
use edgar_ripple::output::{JsonLayout, JsonRecordWriter, WriteSummary};
use edgar_ripple::crawler::{build_http_client, FixedDelay, PageFetcher};
use edgar_ripple::{CompanyRecord, EdgarScraper, ScrapeError};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Builds a listing page with pagination info and one row per company
fn listing_html(shown: &str, total: u32, companies: &[&str]) -> String {
    let rows: String = companies
        .iter()
        .map(|id| {
            format!(
                r#"<tr><td><a href="/companies/{id}">{id}</a></td><td>Active</td></tr>"#,
                id = id
            )
        })
        .collect();

    format!(
        r#"<html><body>
        <div class="pagination-page-info">Showing <b>{}</b> of <b>{}</b> companies</div>
        <table class="table"><thead><tr><th>Name</th><th>Status</th></tr></thead>
        <tbody>{}</tbody></table>
        </body></html>"#,
        shown, total, rows
    )
}

/// Builds a company detail page with one attribute row per field
fn company_html(fields: &[(&str, &str)]) -> String {
    let rows: String = fields
        .iter()
        .map(|(id, value)| {
            format!(
                r#"<tr><td>{}</td><td id="{}">{}</td></tr>"#,
                id.replace('_', " "),
                id,
                value
            )
        })
        .collect();

    format!(
        r#"<html><body><table class="table"><tbody>{}</tbody></table></body></html>"#,
        rows
    )
}

fn html_response(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html")
}

async fn mount_listing(server: &MockServer, page: u32, body: String) {
    Mock::given(method("GET"))
        .and(path("/companies/"))
        .and(query_param("page", page.to_string()))
        .respond_with(html_response(body))
        .mount(server)
        .await;
}

async fn mount_company(server: &MockServer, id: &str) {
    let name = format!("{} Inc", id);
    Mock::given(method("GET"))
        .and(path(format!("/companies/{}", id)))
        .respond_with(html_response(company_html(&[
            ("company_name", name.as_str()),
            ("state", "NY"),
        ])))
        .mount(server)
        .await;
}

fn base_url(server: &MockServer) -> String {
    format!("{}/companies/", server.uri())
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.http.request_timeout_secs = 5;
    config
}

/// Drains a company stream, returning records by name and the errors seen
async fn drain(
    scraper: &EdgarScraper,
    ids: Vec<String>,
) -> (HashMap<String, CompanyRecord>, Vec<ScrapeError>) {
    let mut stream = scraper.companies(ids);
    let mut records = HashMap::new();
    let mut errors = Vec::new();

    while let Some(item) = stream.next().await {
        match item {
            Ok(record) => {
                let name = record.get("company_name").unwrap_or_default().to_string();
                records.insert(name, record);
            }
            Err(e) => errors.push(e),
        }
    }

    (records, errors)
}

#[tokio::test]
async fn test_full_scrape_two_pages() {
    let server = MockServer::start().await;

    mount_listing(&server, 1, listing_html("1 - 2", 4, &["acme", "globex"])).await;
    mount_listing(&server, 2, listing_html("3 - 4", 4, &["initech", "umbrella"])).await;
    for id in ["acme", "globex", "initech", "umbrella"] {
        mount_company(&server, id).await;
    }

    let scraper = EdgarScraper::new(&base_url(&server), test_config()).unwrap();
    let mut stream = scraper.all_companies().await.unwrap();

    let mut names = Vec::new();
    while let Some(item) = stream.next().await {
        let record = item.expect("company fetch failed");
        assert_eq!(record.get("state"), Some("NY"));
        names.push(record.get("company_name").unwrap().to_string());
    }

    names.sort();
    assert_eq!(names, vec!["acme Inc", "globex Inc", "initech Inc", "umbrella Inc"]);
}

#[tokio::test]
async fn test_pagination_truncates_partial_page() {
    let server = MockServer::start().await;

    mount_listing(&server, 1, listing_html("1 - 2", 3, &["acme", "globex"])).await;

    // The third listing sits on a page the truncated count never reaches
    Mock::given(method("GET"))
        .and(path("/companies/"))
        .and(query_param("page", "2"))
        .respond_with(html_response(listing_html("3 - 3", 3, &["initech"])))
        .expect(0)
        .mount(&server)
        .await;

    let scraper = EdgarScraper::new(&base_url(&server), test_config()).unwrap();
    assert_eq!(scraper.total_pages().await.unwrap(), 1);
    assert_eq!(
        scraper.all_company_ids().await.unwrap().ids,
        vec!["acme", "globex"]
    );
}

#[tokio::test]
async fn test_pagination_ceil_reaches_partial_page() {
    let server = MockServer::start().await;

    mount_listing(&server, 1, listing_html("1 - 2", 3, &["acme", "globex"])).await;
    mount_listing(&server, 2, listing_html("3 - 3", 3, &["initech"])).await;

    let mut config = test_config();
    config.scraper.pagination_rounding = PaginationRounding::Ceil;

    let scraper = EdgarScraper::new(&base_url(&server), config).unwrap();
    assert_eq!(scraper.total_pages().await.unwrap(), 2);
    assert_eq!(
        scraper.all_company_ids().await.unwrap().ids,
        vec!["acme", "globex", "initech"]
    );
}

#[tokio::test]
async fn test_listing_ids_follow_page_order() {
    let server = MockServer::start().await;

    // Page 1 is the slowest to answer, page 3 the fastest
    for (page, delay, ids) in [
        (1u32, 150u64, ["a1", "a2"]),
        (2, 75, ["b1", "b2"]),
        (3, 0, ["c1", "c2"]),
    ] {
        Mock::given(method("GET"))
            .and(path("/companies/"))
            .and(query_param("page", page.to_string()))
            .respond_with(
                html_response(listing_html(&format!("{} - {}", page * 2 - 1, page * 2), 6, &ids))
                    .set_delay(Duration::from_millis(delay)),
            )
            .mount(&server)
            .await;
    }

    let scraper = EdgarScraper::new(&base_url(&server), test_config()).unwrap();
    let ids = scraper.all_company_ids().await.unwrap().ids;
    assert_eq!(ids, vec!["a1", "a2", "b1", "b2", "c1", "c2"]);
}

#[tokio::test]
async fn test_page_one_fetched_before_other_listings() {
    let server = MockServer::start().await;

    mount_listing(&server, 1, listing_html("1 - 1", 3, &["a"])).await;
    mount_listing(&server, 2, listing_html("2 - 2", 3, &["b"])).await;
    mount_listing(&server, 3, listing_html("3 - 3", 3, &["c"])).await;

    let scraper = EdgarScraper::new(&base_url(&server), test_config()).unwrap();
    let ids = scraper.all_company_ids().await.unwrap().ids;
    assert_eq!(ids, vec!["a", "b", "c"]);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 4);
    assert_eq!(requests[0].url.query(), Some("page=1"));
}

#[tokio::test]
async fn test_duplicate_ids_are_kept() {
    let server = MockServer::start().await;

    mount_listing(&server, 1, listing_html("1 - 2", 4, &["acme", "globex"])).await;
    mount_listing(&server, 2, listing_html("3 - 4", 4, &["acme", "initech"])).await;

    let scraper = EdgarScraper::new(&base_url(&server), test_config()).unwrap();
    let ids = scraper.all_company_ids().await.unwrap().ids;
    assert_eq!(ids, vec!["acme", "globex", "acme", "initech"]);
}

#[tokio::test]
async fn test_company_fanout_yields_every_record() {
    let server = MockServer::start().await;
    for id in ["a", "b", "c"] {
        mount_company(&server, id).await;
    }

    let scraper = EdgarScraper::new(&base_url(&server), test_config()).unwrap();
    let ids = vec!["a".to_string(), "b".to_string(), "c".to_string()];
    let (records, errors) = drain(&scraper, ids).await;

    assert!(errors.is_empty());
    assert_eq!(records.len(), 3);
    for id in ["a", "b", "c"] {
        let expected = scraper.company_record(id).await.unwrap();
        assert_eq!(records[&format!("{} Inc", id)], expected);
    }
}

#[tokio::test]
async fn test_company_failure_is_observable() {
    let server = MockServer::start().await;
    mount_company(&server, "a").await;
    mount_company(&server, "c").await;
    Mock::given(method("GET"))
        .and(path("/companies/b"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let scraper = EdgarScraper::new(&base_url(&server), test_config()).unwrap();
    let ids = vec!["a".to_string(), "b".to_string(), "c".to_string()];
    let (_, errors) = drain(&scraper, ids).await;

    assert_eq!(errors.len(), 1);
    match &errors[0] {
        ScrapeError::Transport { url, .. } => assert!(url.ends_with("/companies/b")),
        other => panic!("expected a transport error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_continue_mode_keeps_other_records() {
    let server = MockServer::start().await;
    mount_company(&server, "a").await;
    mount_company(&server, "c").await;
    Mock::given(method("GET"))
        .and(path("/companies/b"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let mut config = test_config();
    config.scraper.failure_mode = FailureMode::Continue;

    let scraper = EdgarScraper::new(&base_url(&server), config).unwrap();
    let ids = vec!["a".to_string(), "b".to_string(), "c".to_string()];
    let (records, errors) = drain(&scraper, ids).await;

    assert_eq!(records.len(), 2);
    assert!(records.contains_key("a Inc"));
    assert!(records.contains_key("c Inc"));
    assert_eq!(errors.len(), 1);
    assert!(errors[0].is_transport());
}

#[tokio::test]
async fn test_continue_mode_skips_failed_listing_page() {
    let server = MockServer::start().await;

    mount_listing(&server, 1, listing_html("1 - 2", 6, &["a", "b"])).await;
    Mock::given(method("GET"))
        .and(path("/companies/"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    mount_listing(&server, 3, listing_html("5 - 6", 6, &["e", "f"])).await;

    let mut config = test_config();
    config.scraper.failure_mode = FailureMode::Continue;

    let scraper = EdgarScraper::new(&base_url(&server), config).unwrap();
    let collected = scraper.all_company_ids().await.unwrap();
    assert_eq!(collected.ids, vec!["a", "b", "e", "f"]);
    assert_eq!(collected.skipped_pages.len(), 1);
    assert_eq!(collected.skipped_pages[0].0, 2);
    assert!(collected.skipped_pages[0].1.is_transport());
}

#[tokio::test]
async fn test_skipped_listing_page_counts_as_failure() {
    let server = MockServer::start().await;

    mount_listing(&server, 1, listing_html("1 - 2", 4, &["a", "b"])).await;
    Mock::given(method("GET"))
        .and(path("/companies/"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    mount_company(&server, "a").await;
    mount_company(&server, "b").await;

    let mut config = test_config();
    config.scraper.failure_mode = FailureMode::Continue;

    let scraper = EdgarScraper::new(&base_url(&server), config).unwrap();
    let mut stream = scraper.all_companies().await.unwrap();
    let mut writer = JsonRecordWriter::new(Vec::new(), JsonLayout::Lines);
    let summary = writer.write_stream(&mut stream, true).await.unwrap();

    assert_eq!(summary, WriteSummary { written: 2, failed: 1 });
}

#[tokio::test]
async fn test_company_fanout_respects_worker_limit() {
    let server = MockServer::start().await;

    let ids: Vec<String> = (0..8).map(|n| format!("c{}", n)).collect();
    for id in &ids {
        Mock::given(method("GET"))
            .and(path(format!("/companies/{}", id)))
            .respond_with(
                html_response(company_html(&[("company_name", id.as_str())]))
                    .set_delay(Duration::from_millis(300)),
            )
            .mount(&server)
            .await;
    }

    let mut config = test_config();
    config.scraper.max_concurrent_fetches = 2;

    let scraper = EdgarScraper::new(&base_url(&server), config).unwrap();
    let mut stream = scraper.companies(ids);

    // Only the first two requests can be outstanding before anything completes
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(server.received_requests().await.unwrap().len(), 2);

    let mut count = 0;
    while let Some(item) = stream.next().await {
        item.unwrap();
        count += 1;
    }
    assert_eq!(count, 8);
}

#[tokio::test]
async fn test_failed_listing_page_aborts_by_default() {
    let server = MockServer::start().await;

    mount_listing(&server, 1, listing_html("1 - 2", 4, &["a", "b"])).await;
    Mock::given(method("GET"))
        .and(path("/companies/"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let scraper = EdgarScraper::new(&base_url(&server), test_config()).unwrap();
    let result = scraper.all_companies().await;
    assert!(matches!(result, Err(ScrapeError::Transport { .. })));
}

#[tokio::test]
async fn test_missing_pagination_is_parse_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/companies/"))
        .respond_with(html_response(
            "<html><body><p>Maintenance</p></body></html>".to_string(),
        ))
        .mount(&server)
        .await;

    let scraper = EdgarScraper::new(&base_url(&server), test_config()).unwrap();
    let error = scraper.total_pages().await.unwrap_err();
    assert!(error.is_parse());
    assert!(error.to_string().contains("listings page 1"));
}

#[tokio::test]
async fn test_company_page_without_table_is_parse_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/companies/ghost"))
        .respond_with(html_response("<html><body>Gone</body></html>".to_string()))
        .mount(&server)
        .await;

    let scraper = EdgarScraper::new(&base_url(&server), test_config()).unwrap();
    let error = scraper.company_record("ghost").await.unwrap_err();
    assert!(matches!(error, ScrapeError::Parse { ref target, .. } if target == "ghost"));
}

#[tokio::test]
async fn test_no_retry_by_default() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/companies/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let scraper = EdgarScraper::new(&base_url(&server), test_config()).unwrap();
    assert!(scraper.company_record("flaky").await.is_err());
}

#[tokio::test]
async fn test_retry_policy_recovers_transient_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/companies/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    mount_company(&server, "flaky").await;

    let config = test_config();
    let client = build_http_client(&config.http).unwrap();
    let fetcher = PageFetcher::with_retry(
        client,
        Url::parse(&base_url(&server)).unwrap(),
        Arc::new(FixedDelay {
            max_retries: 2,
            delay: Duration::from_millis(10),
        }),
    );

    let scraper = EdgarScraper::with_fetcher(fetcher, config);
    let record = scraper.company_record("flaky").await.unwrap();
    assert_eq!(record.get("company_name"), Some("flaky Inc"));
}

#[tokio::test]
async fn test_cancelled_scrape_stops() {
    let server = MockServer::start().await;
    mount_listing(&server, 1, listing_html("1 - 2", 2, &["a", "b"])).await;

    let scraper = EdgarScraper::new(&base_url(&server), test_config()).unwrap();
    scraper.cancellation_token().cancel();

    assert!(matches!(
        scraper.all_companies().await,
        Err(ScrapeError::Cancelled)
    ));

    let mut stream = scraper.companies(vec!["a".to_string()]);
    assert!(matches!(stream.next().await, Some(Err(ScrapeError::Cancelled))));
}

#[tokio::test]
async fn test_invalid_base_url_is_rejected() {
    assert!(matches!(
        EdgarScraper::new("not a url", Config::default()),
        Err(ScrapeError::Config(_))
    ));
    assert!(matches!(
        EdgarScraper::new("ftp://example.com/companies/", Config::default()),
        Err(ScrapeError::Config(_))
    ));
}
