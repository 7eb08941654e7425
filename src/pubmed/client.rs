use std::str::FromStr;

use futures_util::future::try_join_all;
use reqwest::{Client, Response};
use tracing::{debug, info, instrument, warn};

use crate::config::ClientConfig;
use crate::error::{PubMedError, Result};
use crate::pubmed::models::PubMedRecord;
use crate::pubmed::parser::RecordIter;
use crate::pubmed::responses::ESearchResult;
use crate::rate_limit::RateGate;

/// Fixed target database for every outbound call
const DB: &str = "pubmed";
const ESEARCH_PATH: &str = "/esearch.fcgi";
const EFETCH_PATH: &str = "/efetch.fcgi";

/// ESearch's own per-call ceiling on returned identifiers
const ESEARCH_PAGE_LIMIT: i64 = 50_000;
/// Maximum number of identifiers sent to EFetch in one call
const EFETCH_BATCH_SIZE: usize = 250;

/// Output encoding requested from the upstream service
enum RetMode {
    /// Structured JSON (ESearch envelopes)
    Json,
    /// Raw XML text (EFetch documents)
    Xml,
}

impl RetMode {
    fn as_str(&self) -> &'static str {
        match self {
            RetMode::Json => "json",
            RetMode::Xml => "xml",
        }
    }
}

/// One page of ESearch results
struct SearchPage {
    ids: Vec<String>,
    /// Total matches the service reports for the whole query
    total: i64,
    /// Number of results the service returned for this page
    returned: i64,
}

/// Client for querying PubMed
///
/// Turns one logical "search for N results" call into a rate-limited sequence
/// of paginated ESearch calls followed by concurrent batched EFetch calls,
/// and flattens the decoded records back into a single ordered sequence.
#[derive(Clone)]
pub struct PubMedClient {
    client: Client,
    base_url: String,
    rate_gate: RateGate,
    config: ClientConfig,
}

impl PubMedClient {
    /// Create a client identified by a tool name and contact email
    ///
    /// NCBI kindly requests both on every call.
    ///
    /// # Example
    ///
    /// ```
    /// use pubmed_query::PubMedClient;
    ///
    /// let client = PubMedClient::new("MyTool", "my@email.address");
    /// ```
    pub fn new(tool: impl Into<String>, email: impl Into<String>) -> Self {
        Self::with_config(ClientConfig::new().with_tool(tool).with_email(email))
    }

    /// Create a client with custom configuration
    ///
    /// # Example
    ///
    /// ```
    /// use pubmed_query::{ClientConfig, PubMedClient};
    ///
    /// let config = ClientConfig::new()
    ///     .with_tool("MyTool")
    ///     .with_email("researcher@university.edu")
    ///     .with_api_key("your_api_key_here");
    ///
    /// let client = PubMedClient::with_config(config);
    /// ```
    pub fn with_config(config: ClientConfig) -> Self {
        let rate_gate = config.create_rate_gate();
        let base_url = config.effective_base_url().to_string();

        let client = Client::builder()
            .timeout(config.effective_timeout())
            .user_agent(config.effective_user_agent())
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url,
            rate_gate,
            config,
        }
    }

    /// Run a search and return the matching records
    ///
    /// Resolves up to `max_results` identifiers through paginated ESearch
    /// calls (`-1` means every match), fetches them concurrently in batches
    /// of at most 250, and returns the decoded records in search order with
    /// journal articles and book articles interleaved as the service emits
    /// them. The last search page may over-return; results are never
    /// truncated mid-page.
    ///
    /// Any failing call aborts the whole operation: sibling batches are
    /// abandoned and no partial results are surfaced.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use pubmed_query::PubMedClient;
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let client = PubMedClient::new("MyTool", "my@email.address");
    ///     let records = client.query("occupational health[Title]", 500).await?;
    ///
    ///     for record in records {
    ///         println!("{} - {}", record.pmid(), record.title());
    ///     }
    ///     Ok(())
    /// }
    /// ```
    #[instrument(skip(self), fields(query = %query, max_results = max_results))]
    pub async fn query(&self, query: &str, max_results: i64) -> Result<Vec<PubMedRecord>> {
        let ids = self.resolve_article_ids(query, max_results).await?;
        info!(ids = ids.len(), "resolved matching identifiers");

        let fetches = ids
            .chunks(EFETCH_BATCH_SIZE)
            .map(|batch| self.fetch_batch(batch));
        let batches = try_join_all(fetches).await?;

        let mut records = Vec::with_capacity(ids.len());
        for batch in batches {
            for record in batch {
                records.push(record?);
            }
        }

        info!(records = records.len(), "query completed");
        Ok(records)
    }

    /// Ask the service how many records match a query
    ///
    /// A single ESearch probe, independent of the paginated pipeline.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use pubmed_query::PubMedClient;
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let client = PubMedClient::new("MyTool", "my@email.address");
    ///     let total = client.get_total_results_count("crispr").await?;
    ///     println!("{total} matches");
    ///     Ok(())
    /// }
    /// ```
    #[instrument(skip(self), fields(query = %query))]
    pub async fn get_total_results_count(&self, query: &str) -> Result<u64> {
        let params = [("term", query.to_string()), ("retmax", "1".to_string())];
        let response = self.get(ESEARCH_PATH, &params, RetMode::Json).await?;

        let body = response.text().await?;
        let result: ESearchResult = serde_json::from_str(&body)?;
        let data = result.esearchresult;

        if let Some(error) = &data.error {
            return Err(PubMedError::ApiError {
                status: 200,
                message: format!("ESearch reported an error: {error}"),
            });
        }

        parse_count(data.count.as_deref(), "count")
    }

    /// Accumulate matching identifiers across ESearch pages.
    ///
    /// The requested page size starts at `min(max_results, 50000)` and only
    /// ever shrinks to the remaining request; `-1` is passed through to the
    /// first call and then reinterpreted as "everything", leaving page sizing
    /// to the service. Pagination is strictly sequential since every offset
    /// depends on the previous page's reported return count.
    async fn resolve_article_ids(&self, query: &str, max_results: i64) -> Result<Vec<String>> {
        let mut retmax = ESEARCH_PAGE_LIMIT;
        if max_results < retmax {
            retmax = max_results;
        }

        let first = self.esearch(query, retmax, None).await?;
        let total = first.total;
        let mut ids = first.ids;
        let mut retrieved = first.returned;

        let max_results = if max_results == -1 { total } else { max_results };

        while retrieved < total && retrieved < max_results {
            if max_results - retrieved < retmax {
                retmax = max_results - retrieved;
            }

            let page = self.esearch(query, retmax, Some(retrieved)).await?;
            retrieved += page.returned;
            ids.extend(page.ids);
            debug!(retrieved, total, "accumulated search page");
        }

        Ok(ids)
    }

    /// One ESearch call
    async fn esearch(&self, term: &str, retmax: i64, retstart: Option<i64>) -> Result<SearchPage> {
        let mut params = vec![
            ("term", term.to_string()),
            ("retmax", retmax.to_string()),
        ];
        if let Some(retstart) = retstart {
            params.push(("retstart", retstart.to_string()));
        }

        let response = self.get(ESEARCH_PATH, &params, RetMode::Json).await?;
        let body = response.text().await?;
        let result: ESearchResult = serde_json::from_str(&body)?;
        let data = result.esearchresult;

        // NCBI sometimes reports failures inside a 200 response
        if let Some(error) = &data.error {
            return Err(PubMedError::ApiError {
                status: 200,
                message: format!("ESearch reported an error: {error}"),
            });
        }

        let total = parse_count(data.count.as_deref(), "count")?;
        let returned = parse_count(data.retmax.as_deref(), "retmax")?;

        Ok(SearchPage {
            ids: data.idlist,
            total,
            returned,
        })
    }

    /// One EFetch call for a batch of at most [`EFETCH_BATCH_SIZE`] ids,
    /// decoded lazily by the returned iterator.
    async fn fetch_batch(&self, ids: &[String]) -> Result<RecordIter> {
        let params = [("id", ids.join(","))];
        let response = self.get(EFETCH_PATH, &params, RetMode::Xml).await?;
        let xml = response.text().await?;

        debug!(
            batch_size = ids.len(),
            xml_size = xml.len(),
            "fetched record batch"
        );
        Ok(RecordIter::new(xml))
    }

    /// Issue one GET against the service.
    ///
    /// Attaches the target database, identification parameters and requested
    /// output encoding, and funnels the call through the rate gate. The call
    /// is recorded against the rate window only once a successful response is
    /// in hand, so failed calls never count.
    async fn get(
        &self,
        path: &str,
        params: &[(&str, String)],
        retmode: RetMode,
    ) -> Result<Response> {
        let mut url = format!("{}{}?db={}", self.base_url, path, DB);
        for (key, value) in params {
            url.push('&');
            url.push_str(key);
            url.push('=');
            url.push_str(&urlencoding::encode(value));
        }
        for (key, value) in self.config.build_api_params() {
            url.push('&');
            url.push_str(&key);
            url.push('=');
            url.push_str(&urlencoding::encode(&value));
        }
        url.push_str("&retmode=");
        url.push_str(retmode.as_str());

        self.rate_gate.acquire().await;

        debug!(%url, "making API request");
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "API request failed");
            return Err(PubMedError::ApiError {
                status: response.status().as_u16(),
                message: response
                    .status()
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string(),
            });
        }

        self.rate_gate.record().await;
        Ok(response)
    }
}

/// ESearch serializes its numeric fields as JSON strings
fn parse_count<T: FromStr>(value: Option<&str>, field: &str) -> Result<T> {
    value
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| PubMedError::ApiError {
            status: 200,
            message: format!("ESearch response missing or invalid '{field}' field"),
        })
}
