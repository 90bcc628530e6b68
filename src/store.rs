//! SQLite persistence: schema bootstrap, the full-replace repository writer,
//! and the ranked full-text search engine.
//!
//! Two entity tables (`publications`, `samples`) plus an FTS5 virtual table
//! over publication titles (`publications_fts`, porter-stemmed external
//! content). The writer's contract is full-replace: delete everything,
//! bulk-insert the new batch, rebuild the search index — all inside one
//! transaction, so readers see either the old corpus or the new one.
//!
//! Search goes through FTS5 `MATCH` with `bm25()` ranking; bm25 scores are
//! negative-is-better, so they are negated into a positive descending rank.

use crate::models::{Author, LabeledSample, Publication, SearchHit};
use rusqlite::{params, Connection};
use thiserror::Error;
use tracing::{debug, info};

/// Storage failure: the engine itself, or (de)serializing a JSON column.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),
    #[error("record field serialization: {0}")]
    Json(#[from] serde_json::Error),
}

/// An entity the full-replace writer knows how to persist.
///
/// Implementors provide their table identity, their insert statement, and
/// how to bind one record to it. `REBUILD_INDEX` is the statement that
/// recomputes the entity's derived search index, for entities that carry one.
pub trait Replaceable {
    const TABLE: &'static str;
    const INSERT: &'static str;
    /// Statement recomputing the derived search index after a replace.
    const REBUILD_INDEX: Option<&'static str> = None;

    fn insert(&self, stmt: &mut rusqlite::Statement<'_>) -> Result<(), StoreError>;
}

impl Replaceable for Publication {
    const TABLE: &'static str = "publications";
    const INSERT: &'static str =
        "INSERT INTO publications (title, link, authors, year) VALUES (?1, ?2, ?3, ?4)";
    const REBUILD_INDEX: Option<&'static str> =
        Some("INSERT INTO publications_fts(publications_fts) VALUES('rebuild')");

    fn insert(&self, stmt: &mut rusqlite::Statement<'_>) -> Result<(), StoreError> {
        let authors = serde_json::to_string(&self.authors)?;
        stmt.execute(params![self.title, self.link, authors, self.year])?;
        Ok(())
    }
}

impl Replaceable for LabeledSample {
    const TABLE: &'static str = "samples";
    const INSERT: &'static str = "INSERT INTO samples (content, category) VALUES (?1, ?2)";

    fn insert(&self, stmt: &mut rusqlite::Statement<'_>) -> Result<(), StoreError> {
        stmt.execute(params![self.content, self.category])?;
        Ok(())
    }
}

/// Handle to the backing database. Callers share it behind a mutex; every
/// write path below runs in its own transaction.
pub struct Db {
    conn: Connection,
}

impl Db {
    /// Open (or create) the database file and apply the session pragmas.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// In-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Create all tables and the title search index if they do not exist.
    pub fn init_schema(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS publications (
                id      INTEGER PRIMARY KEY,
                title   TEXT NOT NULL,
                link    TEXT NOT NULL,
                authors TEXT NOT NULL,
                year    TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS samples (
                id       INTEGER PRIMARY KEY,
                content  TEXT NOT NULL,
                category TEXT NOT NULL
            );

            CREATE VIRTUAL TABLE IF NOT EXISTS publications_fts USING fts5(
                title,
                content='publications',
                content_rowid='id',
                tokenize='porter unicode61'
            );
            ",
        )?;
        debug!("Database schema ready");
        Ok(())
    }

    /// Atomically replace the entity's table with `records`.
    ///
    /// Delete-all, bulk-insert, and search-index rebuild run in a single
    /// transaction: a failure anywhere rolls the table back to its pre-call
    /// state. Returns the number of records written.
    pub fn replace_all<T: Replaceable>(&self, records: &[T]) -> Result<usize, StoreError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(&format!("DELETE FROM {}", T::TABLE), [])?;
        {
            let mut stmt = tx.prepare(T::INSERT)?;
            for record in records {
                record.insert(&mut stmt)?;
            }
        }
        if let Some(rebuild) = T::REBUILD_INDEX {
            tx.execute_batch(rebuild)?;
        }
        tx.commit()?;

        info!(table = T::TABLE, count = records.len(), "Replaced table contents");
        Ok(records.len())
    }

    /// Append labeled samples without touching existing rows (CSV upload path).
    pub fn append_samples(&self, samples: &[LabeledSample]) -> Result<usize, StoreError> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(LabeledSample::INSERT)?;
            for sample in samples {
                sample.insert(&mut stmt)?;
            }
        }
        tx.commit()?;

        info!(count = samples.len(), "Appended labeled samples");
        Ok(samples.len())
    }

    /// Every stored labeled sample, in insertion order.
    pub fn all_samples(&self) -> Result<Vec<LabeledSample>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT content, category FROM samples ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(LabeledSample {
                content: row.get(0)?,
                category: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn publication_count(&self) -> Result<usize, StoreError> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM publications", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn sample_count(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM samples", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Ranked full-text lookup over publication titles.
    ///
    /// The query is whitespace-tokenized and terms are OR-combined, so any
    /// matching term qualifies a row. Each term is double-quoted before
    /// assembly — FTS5 operator characters in user input must not reach the
    /// query parser. An empty or whitespace-only query matches nothing.
    pub fn search(&self, query: &str) -> Result<Vec<SearchHit>, StoreError> {
        let terms: Vec<String> = query
            .split_whitespace()
            .map(|term| format!("\"{}\"", term.replace('"', "")))
            .filter(|term| term.len() > 2)
            .collect();
        if terms.is_empty() {
            return Ok(Vec::new());
        }
        let match_expr = terms.join(" OR ");

        let mut stmt = self.conn.prepare(
            "SELECT publications.title, publications.link, publications.authors,
                    publications.year, -bm25(publications_fts) AS relevance
             FROM publications_fts
             JOIN publications ON publications.id = publications_fts.rowid
             WHERE publications_fts MATCH ?1
             ORDER BY relevance DESC",
        )?;
        let rows = stmt.query_map([&match_expr], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, f64>(4)?,
            ))
        })?;

        let mut hits = Vec::new();
        for row in rows {
            let (title, link, authors_json, year, rank) = row?;
            let authors: Vec<Author> = serde_json::from_str(&authors_json)?;
            hits.push(SearchHit {
                publication: Publication {
                    title,
                    link,
                    authors,
                    year,
                },
                rank,
            });
        }

        debug!(query, results = hits.len(), "Search completed");
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn publication(title: &str) -> Publication {
        Publication {
            title: title.to_string(),
            link: format!(
                "https://example.edu/pub/{}",
                title.to_lowercase().replace(' ', "-")
            ),
            authors: vec![Author {
                name: "A. Researcher".to_string(),
                profile_link: "https://example.edu/persons/a".to_string(),
            }],
            year: "2024".to_string(),
        }
    }

    fn sample(content: &str, category: &str) -> LabeledSample {
        LabeledSample {
            content: content.to_string(),
            category: category.to_string(),
        }
    }

    fn test_db() -> Db {
        let db = Db::open_in_memory().unwrap();
        db.init_schema().unwrap();
        db
    }

    #[test]
    fn test_replace_all_swaps_table_contents() {
        let db = test_db();

        db.replace_all(&[publication("Old Entry")]).unwrap();
        let count = db
            .replace_all(&[publication("New One"), publication("New Two")])
            .unwrap();

        assert_eq!(count, 2);
        assert_eq!(db.publication_count().unwrap(), 2);
        assert!(db.search("old").unwrap().is_empty());
    }

    #[test]
    fn test_replace_all_is_idempotent() {
        let db = test_db();
        let batch = vec![publication("Entry One"), publication("Entry Two")];

        let first = db.replace_all(&batch).unwrap();
        let second = db.replace_all(&batch).unwrap();

        assert_eq!(first, second);
        assert_eq!(db.publication_count().unwrap(), 2);
        assert_eq!(db.search("entry").unwrap().len(), 2);
    }

    #[test]
    fn test_replace_all_rolls_back_on_mid_batch_failure() {
        struct Poisoned {
            boom: bool,
        }

        impl Replaceable for Poisoned {
            const TABLE: &'static str = "samples";
            const INSERT: &'static str = LabeledSample::INSERT;

            fn insert(&self, stmt: &mut rusqlite::Statement<'_>) -> Result<(), StoreError> {
                if self.boom {
                    // Same failure class as a JSON-column serialization error.
                    return Err(StoreError::Json(
                        serde_json::from_str::<i32>("boom").unwrap_err(),
                    ));
                }
                stmt.execute(params!["ok", "Politics"])?;
                Ok(())
            }
        }

        let db = test_db();
        db.append_samples(&[sample("survivor", "Health")]).unwrap();

        let result = db.replace_all(&[
            Poisoned { boom: false },
            Poisoned { boom: true },
        ]);

        assert!(result.is_err());
        // The delete and the first insert must have been rolled back.
        let samples = db.all_samples().unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].content, "survivor");
    }

    #[test]
    fn test_search_ranks_matching_title_only() {
        let db = test_db();
        db.replace_all(&[
            publication("Machine Learning for Finance"),
            publication("Unrelated Topic"),
        ])
        .unwrap();

        let hits = db.search("machine learning").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].publication.title, "Machine Learning for Finance");
        assert!(hits[0].rank > 0.0);
    }

    #[test]
    fn test_search_or_semantics_and_ordering() {
        let db = test_db();
        db.replace_all(&[
            publication("Deep Learning Methods for Deep Learning Research"),
            publication("Learning Outcomes in Primary Schools"),
            publication("Composite Materials"),
        ])
        .unwrap();

        let hits = db.search("deep learning").unwrap();
        assert_eq!(hits.len(), 2);
        // Both query terms hit the first title repeatedly, so it outranks
        // the single-term match.
        assert_eq!(
            hits[0].publication.title,
            "Deep Learning Methods for Deep Learning Research"
        );
        assert!(hits[0].rank >= hits[1].rank);
    }

    #[test]
    fn test_search_stems_query_terms() {
        let db = test_db();
        db.replace_all(&[publication("Machine Learning for Finance")])
            .unwrap();

        // Porter stemming folds "learn" and "learning" together.
        let hits = db.search("learn").unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_empty_and_whitespace_queries_match_nothing() {
        let db = test_db();
        db.replace_all(&[publication("Machine Learning for Finance")])
            .unwrap();

        assert!(db.search("").unwrap().is_empty());
        assert!(db.search("   \t ").unwrap().is_empty());
        assert!(db.search("\"\"").unwrap().is_empty());
    }

    #[test]
    fn test_search_survives_operator_characters() {
        let db = test_db();
        db.replace_all(&[publication("Machine Learning for Finance")])
            .unwrap();

        // Raw FTS5 operators in user input must not cause query errors.
        let hits = db.search("machine AND (learning*").unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_append_and_read_samples() {
        let db = test_db();

        db.append_samples(&[sample("budget vote", "Politics")]).unwrap();
        db.append_samples(&[sample("market rally", "Business")]).unwrap();

        let samples = db.all_samples().unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].category, "Politics");
        assert_eq!(samples[1].category, "Business");
        assert_eq!(db.sample_count().unwrap(), 2);
    }

    #[test]
    fn test_replace_samples_clears_previous_rows() {
        let db = test_db();
        db.append_samples(&[sample("stale", "Politics")]).unwrap();

        db.replace_all(&[sample("fresh", "Health")]).unwrap();

        let samples = db.all_samples().unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].content, "fresh");
    }
}
