//! EFetch XML decoding
//!
//! An EFetch response is one `<PubmedArticleSet>` document holding
//! `<PubmedArticle>` and `<PubmedBookArticle>` elements in document order.
//! [`RecordIter`] walks that document lazily, decoding one record per
//! `next()` call and keeping the two kinds interleaved exactly as they
//! appear.

use std::io::Cursor;

use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::debug;

use crate::error::{PubMedError, Result};
use crate::pubmed::models::{PubMedArticle, PubMedBookArticle, PubMedRecord};

/// Lazy iterator over the records of one EFetch response
///
/// Finite and non-restartable; the document is consumed as records are
/// realized. A malformed document surfaces as an `Err` item and ends the
/// iteration; there is no partial recovery within a response.
pub struct RecordIter {
    reader: Reader<Cursor<Vec<u8>>>,
    buf: Vec<u8>,
    done: bool,
}

impl RecordIter {
    /// Wrap a raw EFetch XML document
    pub fn new(xml: String) -> Self {
        let mut reader = Reader::from_reader(Cursor::new(xml.into_bytes()));
        reader.config_mut().trim_text(true);

        Self {
            reader,
            buf: Vec::new(),
            done: false,
        }
    }
}

impl Iterator for RecordIter {
    type Item = Result<PubMedRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            self.buf.clear();
            match self.reader.read_event_into(&mut self.buf) {
                Ok(Event::Start(ref e)) => match e.name().as_ref() {
                    b"PubmedArticle" => {
                        let parsed = parse_article(&mut self.reader);
                        if parsed.is_err() {
                            self.done = true;
                        }
                        return Some(parsed.map(PubMedRecord::Article));
                    }
                    b"PubmedBookArticle" => {
                        let parsed = parse_book(&mut self.reader);
                        if parsed.is_err() {
                            self.done = true;
                        }
                        return Some(parsed.map(PubMedRecord::Book));
                    }
                    _ => {}
                },
                Ok(Event::Eof) => {
                    self.done = true;
                    return None;
                }
                Ok(_) => {}
                Err(e) => {
                    self.done = true;
                    return Some(Err(PubMedError::XmlError(e.to_string())));
                }
            }
        }
    }
}

/// Decode one `<PubmedArticle>` element; the reader is positioned just past
/// its start tag and is consumed through the matching end tag.
fn parse_article(reader: &mut Reader<Cursor<Vec<u8>>>) -> Result<PubMedArticle> {
    let mut pmid = String::new();
    let mut title = String::new();
    let mut authors: Vec<String> = Vec::new();
    let mut journal = String::new();
    let mut pub_date_parts: Vec<String> = Vec::new();
    let mut doi: Option<String> = None;
    let mut abstract_text = String::new();
    let mut keywords: Vec<String> = Vec::new();

    let mut in_pmid = false;
    let mut in_article_title = false;
    let mut in_journal = false;
    let mut in_journal_title = false;
    let mut in_pub_date = false;
    let mut in_date_part = false;
    let mut in_abstract_text = false;
    let mut in_author_list = false;
    let mut in_author = false;
    let mut in_last_name = false;
    let mut in_fore_name = false;
    let mut in_initials = false;
    let mut in_collective_name = false;
    let mut in_doi_location = false;
    let mut in_doi_article_id = false;
    let mut in_keyword = false;
    let mut current_last = String::new();
    let mut current_fore = String::new();
    let mut current_initials = String::new();
    let mut current_keyword = String::new();

    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"PMID" => in_pmid = true,
                b"ArticleTitle" => in_article_title = true,
                b"Journal" => in_journal = true,
                b"Title" if in_journal => in_journal_title = true,
                b"PubDate" => in_pub_date = true,
                b"Year" | b"Month" | b"Day" | b"MedlineDate" if in_pub_date => {
                    in_date_part = true;
                }
                b"AbstractText" => in_abstract_text = true,
                b"AuthorList" => in_author_list = true,
                b"Author" if in_author_list => {
                    in_author = true;
                    current_last.clear();
                    current_fore.clear();
                    current_initials.clear();
                }
                b"LastName" if in_author => in_last_name = true,
                b"ForeName" if in_author => in_fore_name = true,
                b"Initials" if in_author => in_initials = true,
                b"CollectiveName" if in_author => in_collective_name = true,
                b"ELocationID" => {
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"EIdType" && attr.value.as_ref() == b"doi" {
                            in_doi_location = true;
                        }
                    }
                }
                b"ArticleId" => {
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"IdType" && attr.value.as_ref() == b"doi" {
                            in_doi_article_id = true;
                        }
                    }
                }
                b"Keyword" => {
                    in_keyword = true;
                    current_keyword.clear();
                }
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"PubmedArticle" => break,
                b"PMID" => in_pmid = false,
                b"ArticleTitle" => in_article_title = false,
                b"Journal" => in_journal = false,
                b"Title" => in_journal_title = false,
                b"PubDate" => in_pub_date = false,
                b"Year" | b"Month" | b"Day" | b"MedlineDate" => in_date_part = false,
                b"AbstractText" => in_abstract_text = false,
                b"AuthorList" => in_author_list = false,
                b"Author" => {
                    if in_author {
                        if let Some(name) =
                            format_author(&current_last, &current_fore, &current_initials)
                        {
                            authors.push(name);
                        }
                        in_author = false;
                    }
                }
                b"LastName" => in_last_name = false,
                b"ForeName" => in_fore_name = false,
                b"Initials" => in_initials = false,
                b"CollectiveName" => in_collective_name = false,
                b"ELocationID" => in_doi_location = false,
                b"ArticleId" => in_doi_article_id = false,
                b"Keyword" => {
                    if in_keyword && !current_keyword.is_empty() {
                        keywords.push(current_keyword.clone());
                    }
                    in_keyword = false;
                }
                _ => {}
            },
            Ok(Event::Text(e)) => {
                let text = e
                    .unescape()
                    .map_err(|err| PubMedError::XmlError(err.to_string()))?
                    .into_owned();

                if in_pmid {
                    // References and corrections carry PMIDs too; only the
                    // first one identifies this article.
                    if pmid.is_empty() {
                        pmid = text;
                    }
                } else if in_article_title {
                    title.push_str(&text);
                } else if in_journal_title {
                    journal.push_str(&text);
                } else if in_pub_date && in_date_part {
                    pub_date_parts.push(text);
                } else if in_abstract_text {
                    if !abstract_text.is_empty() {
                        abstract_text.push(' ');
                    }
                    abstract_text.push_str(&text);
                } else if in_last_name {
                    current_last.push_str(&text);
                } else if in_fore_name {
                    current_fore.push_str(&text);
                } else if in_initials {
                    current_initials.push_str(&text);
                } else if in_collective_name {
                    authors.push(text);
                } else if in_doi_location || (in_doi_article_id && doi.is_none()) {
                    doi = Some(text);
                } else if in_keyword {
                    current_keyword.push_str(&text);
                }
            }
            Ok(Event::Eof) => {
                return Err(PubMedError::XmlError(
                    "unexpected end of document inside PubmedArticle".to_string(),
                ));
            }
            Ok(_) => {}
            Err(e) => return Err(PubMedError::XmlError(e.to_string())),
        }
    }

    debug!(pmid = %pmid, authors = authors.len(), "decoded journal article");

    Ok(PubMedArticle {
        pmid,
        title,
        authors,
        journal,
        pub_date: pub_date_parts.join(" "),
        doi,
        abstract_text: none_if_empty(abstract_text),
        keywords,
    })
}

/// Decode one `<PubmedBookArticle>` element, same contract as
/// [`parse_article`].
fn parse_book(reader: &mut Reader<Cursor<Vec<u8>>>) -> Result<PubMedBookArticle> {
    let mut pmid = String::new();
    let mut title = String::new();
    let mut authors: Vec<String> = Vec::new();
    let mut pub_date_parts: Vec<String> = Vec::new();
    let mut publisher = String::new();
    let mut collection_title = String::new();
    let mut doi: Option<String> = None;
    let mut abstract_text = String::new();

    let mut in_pmid = false;
    let mut in_book_title = false;
    let mut in_pub_date = false;
    let mut in_date_part = false;
    let mut in_abstract_text = false;
    let mut in_author_list = false;
    let mut in_author = false;
    let mut in_last_name = false;
    let mut in_fore_name = false;
    let mut in_initials = false;
    let mut in_collective_name = false;
    let mut in_publisher_name = false;
    let mut in_collection_title = false;
    let mut in_doi_location = false;
    let mut in_doi_article_id = false;
    let mut current_last = String::new();
    let mut current_fore = String::new();
    let mut current_initials = String::new();

    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"PMID" => in_pmid = true,
                b"BookTitle" => in_book_title = true,
                b"PubDate" => in_pub_date = true,
                b"Year" | b"Month" | b"Day" | b"MedlineDate" if in_pub_date => {
                    in_date_part = true;
                }
                b"AbstractText" => in_abstract_text = true,
                b"AuthorList" => in_author_list = true,
                b"Author" if in_author_list => {
                    in_author = true;
                    current_last.clear();
                    current_fore.clear();
                    current_initials.clear();
                }
                b"LastName" if in_author => in_last_name = true,
                b"ForeName" if in_author => in_fore_name = true,
                b"Initials" if in_author => in_initials = true,
                b"CollectiveName" if in_author => in_collective_name = true,
                b"PublisherName" => in_publisher_name = true,
                b"CollectionTitle" => in_collection_title = true,
                b"ELocationID" => {
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"EIdType" && attr.value.as_ref() == b"doi" {
                            in_doi_location = true;
                        }
                    }
                }
                b"ArticleId" => {
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"IdType" && attr.value.as_ref() == b"doi" {
                            in_doi_article_id = true;
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"PubmedBookArticle" => break,
                b"PMID" => in_pmid = false,
                b"BookTitle" => in_book_title = false,
                b"PubDate" => in_pub_date = false,
                b"Year" | b"Month" | b"Day" | b"MedlineDate" => in_date_part = false,
                b"AbstractText" => in_abstract_text = false,
                b"AuthorList" => in_author_list = false,
                b"Author" => {
                    if in_author {
                        if let Some(name) =
                            format_author(&current_last, &current_fore, &current_initials)
                        {
                            authors.push(name);
                        }
                        in_author = false;
                    }
                }
                b"LastName" => in_last_name = false,
                b"ForeName" => in_fore_name = false,
                b"Initials" => in_initials = false,
                b"CollectiveName" => in_collective_name = false,
                b"PublisherName" => in_publisher_name = false,
                b"CollectionTitle" => in_collection_title = false,
                b"ELocationID" => in_doi_location = false,
                b"ArticleId" => in_doi_article_id = false,
                _ => {}
            },
            Ok(Event::Text(e)) => {
                let text = e
                    .unescape()
                    .map_err(|err| PubMedError::XmlError(err.to_string()))?
                    .into_owned();

                if in_pmid {
                    if pmid.is_empty() {
                        pmid = text;
                    }
                } else if in_book_title {
                    title.push_str(&text);
                } else if in_pub_date && in_date_part {
                    pub_date_parts.push(text);
                } else if in_abstract_text {
                    if !abstract_text.is_empty() {
                        abstract_text.push(' ');
                    }
                    abstract_text.push_str(&text);
                } else if in_last_name {
                    current_last.push_str(&text);
                } else if in_fore_name {
                    current_fore.push_str(&text);
                } else if in_initials {
                    current_initials.push_str(&text);
                } else if in_collective_name {
                    authors.push(text);
                } else if in_publisher_name {
                    publisher.push_str(&text);
                } else if in_collection_title {
                    collection_title.push_str(&text);
                } else if in_doi_location || (in_doi_article_id && doi.is_none()) {
                    doi = Some(text);
                }
            }
            Ok(Event::Eof) => {
                return Err(PubMedError::XmlError(
                    "unexpected end of document inside PubmedBookArticle".to_string(),
                ));
            }
            Ok(_) => {}
            Err(e) => return Err(PubMedError::XmlError(e.to_string())),
        }
    }

    debug!(pmid = %pmid, authors = authors.len(), "decoded book article");

    Ok(PubMedBookArticle {
        pmid,
        title,
        authors,
        pub_date: pub_date_parts.join(" "),
        publisher: none_if_empty(publisher),
        collection_title: none_if_empty(collection_title),
        doi,
        abstract_text: none_if_empty(abstract_text),
    })
}

fn none_if_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

/// Format an author as "ForeName LastName", falling back to initials and
/// finally to the last name alone. Returns None when nothing was captured.
fn format_author(last: &str, fore: &str, initials: &str) -> Option<String> {
    match (last.is_empty(), fore.is_empty(), initials.is_empty()) {
        (false, false, _) => Some(format!("{fore} {last}")),
        (false, true, false) => Some(format!("{initials} {last}")),
        (false, true, true) => Some(last.to_string()),
        (true, ..) => None,
    }
}
