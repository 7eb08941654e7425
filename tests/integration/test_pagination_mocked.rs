//! Integration tests for paginated identifier resolution
//!
//! The mock server reports per-page return counts smaller than the request,
//! forcing the resolver to walk multiple ESearch pages before fetching.

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

fn single_article_set(pmid: &str) -> String {
    format!(
        r#"<?xml version="1.0" ?>
<PubmedArticleSet>
    <PubmedArticle>
        <MedlineCitation>
            <PMID Version="1">{pmid}</PMID>
            <Article><ArticleTitle>Article {pmid}</ArticleTitle></Article>
        </MedlineCitation>
    </PubmedArticle>
</PubmedArticleSet>"#
    )
}

async fn mount_efetch_single(mock_server: &MockServer, pmid: &str) {
    Mock::given(method("GET"))
        .and(path_regex(r"/efetch\.fcgi.*"))
        .respond_with(ResponseTemplate::new(200).set_body_string(single_article_set(pmid)))
        .mount(mock_server)
        .await;
}

fn create_mock_client(mock_server: &MockServer) -> PubMedClient {
    let config = ClientConfig::new()
        .with_tool("TestTool")
        .with_email("test@example.com")
        .with_base_url(mock_server.uri())
        .with_rate_limit(100);

    PubMedClient::with_config(config)
}

#[tokio::test]
#[traced_test]
async fn test_multi_page_resolution_walks_reported_offsets() {
    let mock_server = MockServer::start().await;

    // 600 total matches, 500 requested, served in pages of 250
    let page1: Vec<String> = (20000..20250).map(|id| id.to_string()).collect();
    let page2: Vec<String> = (20250..20500).map(|id| id.to_string()).collect();

    // First call: full requested size, no offset yet
    Mock::given(method("GET"))
        .and(path_regex(r"/esearch\.fcgi.*"))
        .and(query_param("retmax", "500"))
        .and(query_param_is_missing("retstart"))
        .respond_with(ResponseTemplate::new(200).set_body_string(esearch_body(&page1, 600, 250)))
        .mount(&mock_server)
        .await;

    // Second call: offset equals the count retrieved so far, page size shrunk
    // to the remaining request
    Mock::given(method("GET"))
        .and(path_regex(r"/esearch\.fcgi.*"))
        .and(query_param("retmax", "250"))
        .and(query_param("retstart", "250"))
        .respond_with(ResponseTemplate::new(200).set_body_string(esearch_body(&page2, 600, 250)))
        .mount(&mock_server)
        .await;

    mount_efetch_single(&mock_server, "20000").await;

    let client = create_mock_client(&mock_server);
    let records = client.query("diabetes", 500).await.expect("query failed");

    let requests = mock_server.received_requests().await.unwrap();
    let searches = requests
        .iter()
        .filter(|r| r.url.path().contains("esearch"))
        .count();
    let fetches = requests
        .iter()
        .filter(|r| r.url.path().contains("efetch"))
        .count();

    assert_eq!(searches, 2, "500 ids served in pages of 250 take two calls");
    assert_eq!(fetches, 2, "500 resolved ids partition into two batches");
    assert_eq!(records.len(), 2);
}

#[tokio::test]
#[traced_test]
async fn test_query_all_delegates_first_page_size_to_service() {
    let mock_server = MockServer::start().await;

    // max_results of -1 goes out verbatim; the service substitutes its own
    // default and pagination proceeds from the reported counts.
    let ids: Vec<String> = (30000..30030).map(|id| id.to_string()).collect();
    Mock::given(method("GET"))
        .and(path_regex(r"/esearch\.fcgi.*"))
        .and(query_param("retmax", "-1"))
        .and(query_param_is_missing("retstart"))
        .respond_with(ResponseTemplate::new(200).set_body_string(esearch_body(&ids, 30, 30)))
        .mount(&mock_server)
        .await;

    mount_efetch_single(&mock_server, "30000").await;

    let client = create_mock_client(&mock_server);
    let records = client.query("everything", -1).await.expect("query failed");

    // All 30 matches resolved in one page, one batch
    assert_eq!(records.len(), 1);
    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
}

#[tokio::test]
#[traced_test]
async fn test_resolution_stops_at_total_matches() {
    let mock_server = MockServer::start().await;

    // Requesting 100 out of 5 matches stops at 5, with no follow-up page
    let ids: Vec<String> = (40000..40005).map(|id| id.to_string()).collect();
    Mock::given(method("GET"))
        .and(path_regex(r"/esearch\.fcgi.*"))
        .and(query_param("retmax", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_string(esearch_body(&ids, 5, 5)))
        .mount(&mock_server)
        .await;

    mount_efetch_single(&mock_server, "40000").await;

    let client = create_mock_client(&mock_server);
    client.query("small query", 100).await.expect("query failed");

    let searches = mock_server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path().contains("esearch"))
        .count();
    assert_eq!(searches, 1);
}

#[tokio::test]
#[traced_test]
async fn test_over_returning_last_page_is_not_truncated() {
    let mock_server = MockServer::start().await;

    // The service hands back 6 ids for a request of 4; all 6 are kept
    let ids: Vec<String> = (50000..50006).map(|id| id.to_string()).collect();
    Mock::given(method("GET"))
        .and(path_regex(r"/esearch\.fcgi.*"))
        .and(query_param("retmax", "4"))
        .respond_with(ResponseTemplate::new(200).set_body_string(esearch_body(&ids, 10, 6)))
        .mount(&mock_server)
        .await;

    mount_efetch_single(&mock_server, "50000").await;

    let client = create_mock_client(&mock_server);
    client.query("over-return", 4).await.expect("query failed");

    let requests = mock_server.received_requests().await.unwrap();
    let fetch_ids: Vec<String> = requests
        .iter()
        .filter(|r| r.url.path().contains("efetch"))
        .flat_map(|r| {
            r.url
                .query_pairs()
                .find(|(key, _)| key == "id")
                .map(|(_, joined)| joined.split(',').map(str::to_string).collect::<Vec<_>>())
                .unwrap_or_default()
        })
        .collect();

    assert_eq!(fetch_ids.len(), 6, "over-returned page must not be trimmed");
}
