//! Data models for publications, labeled training samples, and API payloads.
//!
//! This module defines the core data structures used throughout the application:
//! - [`Publication`]: A scraped publication listing entry
//! - [`Author`]: One author credit on a publication
//! - [`LabeledSample`]: A category-labeled text sample used for classifier training
//! - [`SearchHit`]: A ranked full-text search result
//! - [`Prediction`]: A classifier verdict with calibrated confidence
//!
//! `Author.profile_link` serializes as `profileLink` to keep the JSON payloads
//! consistent with the portal's own author-link naming.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Placeholder used when a listing entry has no recognizable title.
pub const NO_TITLE: &str = "No Title";
/// Placeholder used when a listing entry has no link.
pub const NO_URL: &str = "No URL";
/// Placeholder used when a listing entry has no date label.
pub const NO_YEAR: &str = "No Year";

/// One author credit on a publication.
///
/// `profile_link` is the href of the author's profile anchor, or an empty
/// string when the anchor carries no href.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Author {
    /// The author's display name, trimmed.
    pub name: String,
    /// Link to the author's profile page, possibly empty.
    #[serde(rename = "profileLink", default)]
    pub profile_link: String,
}

/// A publication entry scraped from a paginated results listing.
///
/// The extractor guarantees `authors` is non-empty: author-less entries are
/// treated as listing noise and discarded before they reach storage.
/// `year` is free-form text taken from the listing's date label.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Publication {
    /// The publication title, or [`NO_TITLE`].
    pub title: String,
    /// Link to the publication page, or [`NO_URL`].
    pub link: String,
    /// Ordered author credits, never empty.
    pub authors: Vec<Author>,
    /// The listing's date label text, or [`NO_YEAR`].
    pub year: String,
}

/// A category-labeled text sample.
///
/// Source-agnostic: samples arrive either from RSS article ingestion or from
/// CSV bulk upload, and both paths land in the same table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LabeledSample {
    /// The sample text, display-normalized at ingestion time.
    pub content: String,
    /// The category label, e.g. "Politics", "Business", "Health".
    pub category: String,
}

/// A ranked result from the full-text search engine.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    /// The matched publication.
    #[serde(flatten)]
    pub publication: Publication,
    /// Relevance score, strictly positive for any match.
    pub rank: f64,
}

/// A classifier verdict for one input text.
#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    /// The arg-max class label.
    pub label: String,
    /// Probability of `label`, as a percentage rounded to two decimals.
    pub confidence_percent: f64,
    /// Full calibrated per-class probability distribution.
    pub probabilities: BTreeMap<String, f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publication_round_trip() {
        let publication = Publication {
            title: "Machine Learning for Finance".to_string(),
            link: "https://example.edu/publications/ml-finance".to_string(),
            authors: vec![Author {
                name: "A. Researcher".to_string(),
                profile_link: "https://example.edu/persons/a-researcher".to_string(),
            }],
            year: "2024".to_string(),
        };

        let json = serde_json::to_string(&publication).unwrap();
        assert!(json.contains("profileLink"));

        let back: Publication = serde_json::from_str(&json).unwrap();
        assert_eq!(back, publication);
    }

    #[test]
    fn test_author_profile_link_defaults_empty() {
        let author: Author = serde_json::from_str(r#"{"name": "B. Writer"}"#).unwrap();
        assert_eq!(author.name, "B. Writer");
        assert_eq!(author.profile_link, "");
    }

    #[test]
    fn test_labeled_sample_round_trip() {
        let sample = LabeledSample {
            content: "parliament votes on the budget".to_string(),
            category: "Politics".to_string(),
        };

        let json = serde_json::to_string(&sample).unwrap();
        let back: LabeledSample = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sample);
    }

    #[test]
    fn test_search_hit_flattens_publication() {
        let hit = SearchHit {
            publication: Publication {
                title: "Test".to_string(),
                link: NO_URL.to_string(),
                authors: vec![Author {
                    name: "C. Author".to_string(),
                    profile_link: String::new(),
                }],
                year: NO_YEAR.to_string(),
            },
            rank: 1.25,
        };

        let json = serde_json::to_value(&hit).unwrap();
        assert_eq!(json["title"], "Test");
        assert_eq!(json["rank"], 1.25);
    }
}
