//! Integration tests for rate limiting across the pipeline
//!
//! Timing-based: the mock server answers instantly, so any elapsed second
//! comes from the rate gate's backoff.

use std::time::{Duration, Instant};

use pubmed_query::{ClientConfig, PubMedClient};
use tracing_test::traced_test;
use wiremock::matchers::{method, path_regex, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn esearch_body(ids: &[String], total: usize, returned: usize) -> String {
    let id_list: Vec<String> = ids.iter().map(|id| format!("\"{id}\"")).collect();
    format!(
        r#"{{"esearchresult": {{"count": "{total}", "retmax": "{returned}", "retstart": "0", "idlist": [{}]}}}}"#,
        id_list.join(",")
    )
}

const SINGLE_ARTICLE_SET: &str = r#"<?xml version="1.0" ?>
<PubmedArticleSet>
    <PubmedArticle>
        <MedlineCitation>
            <PMID Version="1">12345678</PMID>
            <Article><ArticleTitle>Single Test Article</ArticleTitle></Article>
        </MedlineCitation>
    </PubmedArticle>
</PubmedArticleSet>"#;

async fn mount_efetch(mock_server: &MockServer) {
    Mock::given(method("GET"))
        .and(path_regex(r"/efetch\.fcgi.*"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SINGLE_ARTICLE_SET))
        .mount(mock_server)
        .await;
}

fn create_client_with_rate(mock_server: &MockServer, rate_limit: usize) -> PubMedClient {
    let config = ClientConfig::new()
        .with_tool("TestTool")
        .with_email("test@example.com")
        .with_base_url(mock_server.uri())
        .with_rate_limit(rate_limit);

    PubMedClient::with_config(config)
}

#[tokio::test]
#[traced_test]
async fn test_calls_beyond_the_window_back_off() {
    let mock_server = MockServer::start().await;

    // Two search pages fill a ceiling-1 window before the batch fetches
    // start, so both fetches must sit out a full backoff cycle.
    let page1: Vec<String> = (20000..20250).map(|id| id.to_string()).collect();
    let page2: Vec<String> = (20250..20300).map(|id| id.to_string()).collect();

    Mock::given(method("GET"))
        .and(path_regex(r"/esearch\.fcgi.*"))
        .and(query_param_is_missing("retstart"))
        .respond_with(ResponseTemplate::new(200).set_body_string(esearch_body(&page1, 300, 250)))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"/esearch\.fcgi.*"))
        .and(query_param("retstart", "250"))
        .respond_with(ResponseTemplate::new(200).set_body_string(esearch_body(&page2, 300, 50)))
        .mount(&mock_server)
        .await;
    mount_efetch(&mock_server).await;

    let client = create_client_with_rate(&mock_server, 1);

    let start = Instant::now();
    let records = client.query("timed query", 300).await.expect("query failed");
    let elapsed = start.elapsed();

    assert_eq!(records.len(), 2);
    assert!(
        elapsed >= Duration::from_millis(900),
        "fetch batches should have waited out the rate window, took {elapsed:?}"
    );
    assert!(
        elapsed < Duration::from_secs(4),
        "backoff should be bounded, took {elapsed:?}"
    );
}

#[tokio::test]
#[traced_test]
async fn test_calls_within_the_window_are_not_delayed() {
    let mock_server = MockServer::start().await;

    let ids: Vec<String> = (60000..60005).map(|id| id.to_string()).collect();
    Mock::given(method("GET"))
        .and(path_regex(r"/esearch\.fcgi.*"))
        .respond_with(ResponseTemplate::new(200).set_body_string(esearch_body(&ids, 5, 5)))
        .mount(&mock_server)
        .await;
    mount_efetch(&mock_server).await;

    let client = create_client_with_rate(&mock_server, 3);

    let start = Instant::now();
    client.query("quick query", 100).await.expect("query failed");

    assert!(start.elapsed() < Duration::from_millis(900));
}

#[tokio::test]
#[traced_test]
async fn test_concurrent_batches_may_burst_one_past_the_ceiling() {
    let mock_server = MockServer::start().await;

    // One search call on the books, then three concurrent batch fetches all
    // check the gate before any of them records: with a ceiling of 2 the
    // whole burst is admitted. The gate is a soft limiter, not a token
    // bucket.
    let ids: Vec<String> = (10000..10600).map(|id| id.to_string()).collect();
    Mock::given(method("GET"))
        .and(path_regex(r"/esearch\.fcgi.*"))
        .respond_with(ResponseTemplate::new(200).set_body_string(esearch_body(&ids, 600, 600)))
        .mount(&mock_server)
        .await;
    mount_efetch(&mock_server).await;

    let client = create_client_with_rate(&mock_server, 2);

    let start = Instant::now();
    let records = client.query("burst query", 600).await.expect("query failed");

    assert_eq!(records.len(), 3);
    assert!(
        start.elapsed() < Duration::from_millis(900),
        "a same-instant burst is admitted without waiting"
    );
}
