//! Client configuration for the PubMed E-utilities API

use std::time::Duration;

use crate::rate_limit::RateGate;

const DEFAULT_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";
const DEFAULT_TOOL: &str = "pubmed-query";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// NCBI ceiling without an API key (calls per rolling second)
const DEFAULT_RATE_LIMIT: usize = 3;
/// NCBI ceiling with an API key
const API_KEY_RATE_LIMIT: usize = 10;

/// Configuration for [`PubMedClient`](crate::PubMedClient)
///
/// NCBI asks every caller to identify itself with a `tool` name and a contact
/// `email`; both are attached to every outbound request. An API key raises the
/// allowed request rate from 3 to 10 calls per second.
///
/// # Example
///
/// ```
/// use pubmed_query::ClientConfig;
///
/// let config = ClientConfig::new()
///     .with_tool("MyTool")
///     .with_email("researcher@university.edu");
/// ```
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// NCBI API key, if any
    pub api_key: Option<String>,
    /// Contact email sent with every request
    pub email: Option<String>,
    /// Tool name sent with every request
    pub tool: Option<String>,
    /// Override for the E-utilities base URL (used by tests)
    pub base_url: Option<String>,
    /// Override for the calls-per-second ceiling
    pub rate_limit: Option<usize>,
    /// HTTP request timeout
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the NCBI API key
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the contact email attached to every request
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Set the tool name attached to every request
    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tool = Some(tool.into());
        self
    }

    /// Point the client at a different base URL (used by mocked tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Override the calls-per-second ceiling
    pub fn with_rate_limit(mut self, rate_limit: usize) -> Self {
        self.rate_limit = Some(rate_limit);
        self
    }

    /// Override the HTTP request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn effective_base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn effective_tool(&self) -> &str {
        self.tool.as_deref().unwrap_or(DEFAULT_TOOL)
    }

    pub fn effective_timeout(&self) -> Duration {
        self.timeout.unwrap_or(DEFAULT_TIMEOUT)
    }

    pub fn effective_user_agent(&self) -> String {
        format!(
            "{}/{}",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION")
        )
    }

    /// The calls-per-second ceiling: an explicit override wins, otherwise the
    /// NCBI default for the key-less or keyed tier.
    pub fn effective_rate_limit(&self) -> usize {
        self.rate_limit.unwrap_or(if self.api_key.is_some() {
            API_KEY_RATE_LIMIT
        } else {
            DEFAULT_RATE_LIMIT
        })
    }

    /// Identification parameters appended to every request URL
    pub fn build_api_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();

        if let Some(api_key) = &self.api_key {
            params.push(("api_key".to_string(), api_key.clone()));
        }
        if let Some(email) = &self.email {
            params.push(("email".to_string(), email.clone()));
        }
        params.push(("tool".to_string(), self.effective_tool().to_string()));

        params
    }

    /// Create the rate gate this configuration calls for
    pub fn create_rate_gate(&self) -> RateGate {
        RateGate::new(self.effective_rate_limit())
    }
}
