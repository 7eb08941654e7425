//! PubMed query pipeline
//!
//! This module turns a search query into an ordered sequence of structured
//! records: paginated ESearch identifier resolution, batched concurrent
//! EFetch calls, and lazy XML decoding.

pub mod client;
pub mod models;
pub mod parser;
pub(crate) mod responses;

// Re-export public types
pub use client::PubMedClient;
pub use models::{PubMedArticle, PubMedBookArticle, PubMedRecord};
pub use parser::RecordIter;
