use serde::{Deserialize, Serialize};

/// A journal article fetched from PubMed
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PubMedArticle {
    /// PubMed ID
    pub pmid: String,
    /// Article title
    pub title: String,
    /// List of author names in citation order
    pub authors: Vec<String>,
    /// Journal name
    pub journal: String,
    /// Publication date as given in the record
    pub pub_date: String,
    /// DOI (Digital Object Identifier)
    pub doi: Option<String>,
    /// Abstract text (if available)
    pub abstract_text: Option<String>,
    /// Author-supplied keywords
    pub keywords: Vec<String>,
}

/// A book article fetched from PubMed (NCBI Bookshelf entries)
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PubMedBookArticle {
    /// PubMed ID
    pub pmid: String,
    /// Book or chapter title
    pub title: String,
    /// List of author names in citation order
    pub authors: Vec<String>,
    /// Publication date as given in the record
    pub pub_date: String,
    /// Publisher name
    pub publisher: Option<String>,
    /// Title of the collection the book belongs to
    pub collection_title: Option<String>,
    /// DOI (Digital Object Identifier)
    pub doi: Option<String>,
    /// Abstract text (if available)
    pub abstract_text: Option<String>,
}

/// One result of a PubMed query
///
/// A fetched result set interleaves journal articles and book articles in
/// document order; callers that do not care about the variant can use the
/// common accessors.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum PubMedRecord {
    Article(PubMedArticle),
    Book(PubMedBookArticle),
}

impl PubMedRecord {
    /// PubMed ID of the underlying record
    pub fn pmid(&self) -> &str {
        match self {
            PubMedRecord::Article(article) => &article.pmid,
            PubMedRecord::Book(book) => &book.pmid,
        }
    }

    /// Title of the underlying record
    pub fn title(&self) -> &str {
        match self {
            PubMedRecord::Article(article) => &article.title,
            PubMedRecord::Book(book) => &book.title,
        }
    }

    /// Authors of the underlying record
    pub fn authors(&self) -> &[String] {
        match self {
            PubMedRecord::Article(article) => &article.authors,
            PubMedRecord::Book(book) => &book.authors,
        }
    }

    /// Abstract of the underlying record, if present
    pub fn abstract_text(&self) -> Option<&str> {
        match self {
            PubMedRecord::Article(article) => article.abstract_text.as_deref(),
            PubMedRecord::Book(book) => book.abstract_text.as_deref(),
        }
    }
}
