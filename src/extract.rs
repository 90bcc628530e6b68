//! Schema-driven extraction of publication records from a listing page.
//!
//! A results listing is a sequence of container elements, each holding a
//! title heading, a link anchor, author anchors, and a date label, plus at
//! most one "next page" anchor somewhere in the document. The selectors for
//! all of these live in [`ExtractionSchema`] so the same extractor can be
//! pointed at structurally similar portals.
//!
//! Candidate entries without a single author anchor are dropped: on the
//! target portal these are dataset and patent stubs, not publications.

use crate::models::{Author, Publication, NO_TITLE, NO_URL, NO_YEAR};
use crate::normalize::clean_text;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use tracing::{debug, trace};

/// Extraction failure, distinct from "page had no results".
#[derive(Debug, Error)]
pub enum ParseError {
    /// The fetched body was empty or whitespace; nothing to parse.
    #[error("document body is empty")]
    EmptyDocument,
    /// A selector string in the schema does not parse as a CSS selector.
    #[error("invalid selector `{0}` in extraction schema")]
    BadSelector(String),
}

/// CSS selectors describing where publication fields live in a listing page.
#[derive(Debug, Clone)]
pub struct ExtractionSchema {
    /// One match per candidate record.
    pub container: String,
    /// Title heading, first match within the container.
    pub title: String,
    /// Publication link anchor, first match within the container.
    pub link: String,
    /// Author profile anchors, all matches within the container.
    pub author: String,
    /// Date label, first match within the container.
    pub year: String,
    /// Next-page anchor, first match in the whole document.
    pub next_page: String,
}

impl Default for ExtractionSchema {
    /// Selector set for the research-portal listing markup.
    fn default() -> Self {
        Self {
            container: "div.result-container".to_string(),
            title: "h3.title".to_string(),
            link: "a".to_string(),
            author: "a.link.person".to_string(),
            year: "span.date".to_string(),
            next_page: "a.nextLink".to_string(),
        }
    }
}

/// The schema with its selectors parsed, ready to run against a document.
struct CompiledSchema {
    container: Selector,
    title: Selector,
    link: Selector,
    author: Selector,
    year: Selector,
    next_page: Selector,
}

impl ExtractionSchema {
    fn compile(&self) -> Result<CompiledSchema, ParseError> {
        let parse = |s: &str| {
            Selector::parse(s).map_err(|_| ParseError::BadSelector(s.to_string()))
        };
        Ok(CompiledSchema {
            container: parse(&self.container)?,
            title: parse(&self.title)?,
            link: parse(&self.link)?,
            author: parse(&self.author)?,
            year: parse(&self.year)?,
            next_page: parse(&self.next_page)?,
        })
    }
}

/// Everything extracted from one listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedPage {
    /// Records in document order, author-less candidates already dropped.
    pub publications: Vec<Publication>,
    /// Href of the next-page anchor; `None` means the listing is exhausted.
    pub next_page: Option<String>,
}

/// Parse one listing page into records plus the next-page pointer.
///
/// Missing title/link/year fields degrade to placeholder sentinels; a missing
/// author list drops the whole candidate. An absent next-page anchor yields
/// `next_page = None`, which the crawl controller reads as natural
/// termination — only an unusable document is an error.
pub fn extract(html: &str, schema: &ExtractionSchema) -> Result<ExtractedPage, ParseError> {
    if html.trim().is_empty() {
        return Err(ParseError::EmptyDocument);
    }

    let compiled = schema.compile()?;
    let document = Html::parse_document(html);

    let mut publications = Vec::new();
    for container in document.select(&compiled.container) {
        let title = first_text(&container, &compiled.title)
            .unwrap_or_else(|| NO_TITLE.to_string());
        let link = container
            .select(&compiled.link)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(str::to_string)
            .unwrap_or_else(|| NO_URL.to_string());

        let authors: Vec<Author> = container
            .select(&compiled.author)
            .map(|a| Author {
                name: element_text(&a),
                profile_link: a.value().attr("href").unwrap_or_default().to_string(),
            })
            .collect();
        if authors.is_empty() {
            trace!(%title, "Dropping author-less listing entry");
            continue;
        }

        let year = first_text(&container, &compiled.year)
            .unwrap_or_else(|| NO_YEAR.to_string());

        publications.push(Publication {
            title,
            link,
            authors,
            year,
        });
    }

    let next_page = document
        .select(&compiled.next_page)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(str::to_string);

    debug!(
        records = publications.len(),
        has_next = next_page.is_some(),
        "Extracted listing page"
    );

    Ok(ExtractedPage {
        publications,
        next_page,
    })
}

/// Text of the first element matching `selector` inside `scope`, normalized;
/// `None` when nothing matches or the text is empty.
fn first_text(scope: &ElementRef<'_>, selector: &Selector) -> Option<String> {
    scope
        .select(selector)
        .next()
        .map(|el| element_text(&el))
        .filter(|t| !t.is_empty())
}

fn element_text(el: &ElementRef<'_>) -> String {
    clean_text(&el.text().collect::<Vec<_>>().join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing_entry(title: &str, authors: &[(&str, &str)]) -> String {
        let author_links: String = authors
            .iter()
            .map(|(name, href)| {
                format!(r#"<a class="link person" href="{href}"><span>{name}</span></a>"#)
            })
            .collect();
        format!(
            r#"<div class="result-container">
                 <h3 class="title"><a href="https://example.edu/pub/{slug}">{title}</a></h3>
                 {author_links}
                 <span class="date">2024</span>
               </div>"#,
            slug = title.to_lowercase().replace(' ', "-"),
        )
    }

    fn page(entries: &[String], next: Option<&str>) -> String {
        let next_link = next
            .map(|href| format!(r#"<a class="nextLink" href="{href}">Next</a>"#))
            .unwrap_or_default();
        format!(
            "<html><body>{}{}</body></html>",
            entries.concat(),
            next_link
        )
    }

    #[test]
    fn test_extract_single_record() {
        let html = page(
            &[listing_entry(
                "Machine Learning for Finance",
                &[("A. Researcher", "https://example.edu/persons/a")],
            )],
            None,
        );

        let extracted = extract(&html, &ExtractionSchema::default()).unwrap();
        assert_eq!(extracted.publications.len(), 1);

        let publication = &extracted.publications[0];
        assert_eq!(publication.title, "Machine Learning for Finance");
        assert_eq!(
            publication.link,
            "https://example.edu/pub/machine-learning-for-finance"
        );
        assert_eq!(publication.authors.len(), 1);
        assert_eq!(publication.authors[0].name, "A. Researcher");
        assert_eq!(
            publication.authors[0].profile_link,
            "https://example.edu/persons/a"
        );
        assert_eq!(publication.year, "2024");
        assert_eq!(extracted.next_page, None);
    }

    #[test]
    fn test_extract_drops_author_less_entries() {
        let html = page(
            &[
                listing_entry("Kept Entry", &[("A. Researcher", "/persons/a")]),
                listing_entry("Dropped Dataset Stub", &[]),
            ],
            None,
        );

        let extracted = extract(&html, &ExtractionSchema::default()).unwrap();
        assert_eq!(extracted.publications.len(), 1);
        assert_eq!(extracted.publications[0].title, "Kept Entry");
    }

    #[test]
    fn test_extract_missing_fields_become_sentinels() {
        let html = r#"<html><body>
            <div class="result-container">
                <a class="link person">Unlinked Author</a>
            </div>
        </body></html>"#;

        let extracted = extract(html, &ExtractionSchema::default()).unwrap();
        assert_eq!(extracted.publications.len(), 1);

        let publication = &extracted.publications[0];
        assert_eq!(publication.title, NO_TITLE);
        // The author anchor is also the first <a> in the container, so the
        // record link falls back to that anchor only when it has an href.
        assert_eq!(publication.link, NO_URL);
        assert_eq!(publication.year, NO_YEAR);
        assert_eq!(publication.authors[0].name, "Unlinked Author");
        assert_eq!(publication.authors[0].profile_link, "");
    }

    #[test]
    fn test_extract_finds_next_page() {
        let html = page(
            &[listing_entry("Entry", &[("A", "/persons/a")])],
            Some("?page=1"),
        );

        let extracted = extract(&html, &ExtractionSchema::default()).unwrap();
        assert_eq!(extracted.next_page.as_deref(), Some("?page=1"));
    }

    #[test]
    fn test_extract_preserves_document_order() {
        let html = page(
            &[
                listing_entry("First", &[("A", "/a")]),
                listing_entry("Second", &[("B", "/b")]),
                listing_entry("Third", &[("C", "/c")]),
            ],
            None,
        );

        let extracted = extract(&html, &ExtractionSchema::default()).unwrap();
        let titles: Vec<&str> = extracted
            .publications
            .iter()
            .map(|p| p.title.as_str())
            .collect();
        assert_eq!(titles, ["First", "Second", "Third"]);
    }

    #[test]
    fn test_extract_empty_document_is_an_error() {
        let err = extract("   ", &ExtractionSchema::default()).unwrap_err();
        assert!(matches!(err, ParseError::EmptyDocument));
    }

    #[test]
    fn test_extract_page_without_results_is_exhausted_not_an_error() {
        let extracted = extract(
            "<html><body><p>Nothing here</p></body></html>",
            &ExtractionSchema::default(),
        )
        .unwrap();
        assert!(extracted.publications.is_empty());
        assert_eq!(extracted.next_page, None);
    }

    #[test]
    fn test_extract_rejects_bad_selector() {
        let schema = ExtractionSchema {
            container: ":::".to_string(),
            ..ExtractionSchema::default()
        };
        let err = extract("<html></html>", &schema).unwrap_err();
        assert!(matches!(err, ParseError::BadSelector(_)));
    }
}
