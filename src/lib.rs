//! # pubmed-query
//!
//! A Rust client library for searching PubMed and retrieving structured
//! article metadata through the NCBI E-utilities APIs.
//!
//! ## Features
//!
//! - **Transparent Pagination**: One logical query fans out into as many
//!   ESearch pages as the result set needs
//! - **Batched Fetching**: Matched identifiers are fetched concurrently in
//!   batches within the upstream size limit
//! - **Rate Limiting**: Every call passes through a shared gate honoring the
//!   NCBI requests-per-second ceiling
//! - **Typed Results**: Journal articles and book articles decoded from XML
//!   into strongly typed records
//!
//! ## Quick Start
//!
//! ```no_run
//! use pubmed_query::PubMedClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = PubMedClient::new("MyTool", "my@email.address");
//!
//!     // How many records match?
//!     let total = client.get_total_results_count("occupational health[Title]").await?;
//!     println!("{total} matches");
//!
//!     // Fetch the first 100 as structured records
//!     let records = client.query("occupational health[Title]", 100).await?;
//!     for record in records {
//!         println!("{} - {}", record.pmid(), record.title());
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod pubmed;
pub mod rate_limit;

// Re-export main types for convenience
pub use config::ClientConfig;
pub use error::{PubMedError, Result};
pub use pubmed::{PubMedArticle, PubMedBookArticle, PubMedClient, PubMedRecord, RecordIter};
pub use rate_limit::RateGate;
