//! Relational transcript store.
//!
//! SQLite-backed storage for transcripts and their structured metadata
//! (recording dates, keyword frequencies, annotations). The vector side of
//! the system lives in `vector_store`; this store answers the date-filtered
//! and keyword-frequency half of hybrid queries.

use crate::error::{MinneError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, instrument};

/// Data for a transcript about to be inserted.
#[derive(Debug, Clone)]
pub struct NewTranscript {
    /// Original audio file name.
    pub filename: String,
    /// Calendar date of the recording.
    pub recorded_on: NaiveDate,
    /// Full transcript text.
    pub text: String,
    /// Extracted keywords (may contain repeats; frequencies are counted on insert).
    pub keywords: Vec<String>,
    /// Entities mentioned in the recording.
    pub entities: Vec<String>,
    /// Overall sentiment label.
    pub sentiment: Option<String>,
    /// Audio duration in seconds, if known.
    pub duration_seconds: Option<f64>,
    /// Path to the saved transcript text file.
    pub file_path: Option<String>,
}

/// A stored transcript with its keywords.
#[derive(Debug, Clone)]
pub struct TranscriptRecord {
    pub id: i64,
    pub filename: String,
    pub recorded_on: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub duration_seconds: Option<f64>,
    pub file_path: Option<String>,
    pub text: String,
    pub word_count: i64,
    pub keywords: Vec<String>,
}

/// Summary row for listing stored recordings.
#[derive(Debug, Clone)]
pub struct TranscriptSummary {
    pub id: i64,
    pub filename: String,
    pub recorded_on: NaiveDate,
    pub duration_seconds: Option<f64>,
    pub word_count: i64,
    pub keywords: Vec<String>,
}

/// SQLite-backed transcript store.
pub struct TranscriptStore {
    conn: Mutex<Connection>,
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS transcripts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    filename TEXT NOT NULL,
    recorded_on TEXT NOT NULL,
    created_at TEXT NOT NULL,
    duration_seconds REAL,
    file_path TEXT,
    transcript_text TEXT NOT NULL,
    word_count INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS keywords (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    transcript_id INTEGER NOT NULL REFERENCES transcripts(id) ON DELETE CASCADE,
    keyword TEXT NOT NULL,
    frequency INTEGER NOT NULL,
    UNIQUE(transcript_id, keyword)
);

CREATE TABLE IF NOT EXISTS annotations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    transcript_id INTEGER NOT NULL REFERENCES transcripts(id) ON DELETE CASCADE,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    UNIQUE(transcript_id, key)
);

CREATE INDEX IF NOT EXISTS idx_transcripts_recorded_on ON transcripts(recorded_on);
CREATE INDEX IF NOT EXISTS idx_keywords_keyword ON keywords(keyword);
CREATE INDEX IF NOT EXISTS idx_annotations_key ON annotations(key, value);
"#;

impl TranscriptStore {
    /// Open (or create) a transcript store at the given path.
    #[instrument(skip_all)]
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // WAL for better concurrent read behavior; foreign keys for cascade deletes
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized transcript store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory transcript store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| MinneError::Store(format!("Failed to acquire lock: {}", e)))
    }

    /// Insert a transcript with its keywords and annotations.
    ///
    /// Keyword frequencies are counted from the (lowercased) keyword list.
    /// Returns the id of the inserted transcript.
    #[instrument(skip(self, transcript), fields(filename = %transcript.filename))]
    pub fn insert(&self, transcript: &NewTranscript) -> Result<i64> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        let word_count = transcript.text.split_whitespace().count() as i64;

        tx.execute(
            r#"
            INSERT INTO transcripts
            (filename, recorded_on, created_at, duration_seconds, file_path, transcript_text, word_count)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                transcript.filename,
                transcript.recorded_on.format("%Y-%m-%d").to_string(),
                Utc::now().to_rfc3339(),
                transcript.duration_seconds,
                transcript.file_path,
                transcript.text,
                word_count,
            ],
        )?;

        let transcript_id = tx.last_insert_rowid();

        // Count frequency of each keyword, case-insensitively
        let mut counts: std::collections::HashMap<String, i64> = std::collections::HashMap::new();
        for keyword in &transcript.keywords {
            *counts.entry(keyword.to_lowercase()).or_insert(0) += 1;
        }

        for (keyword, frequency) in counts {
            tx.execute(
                "INSERT INTO keywords (transcript_id, keyword, frequency) VALUES (?1, ?2, ?3)",
                params![transcript_id, keyword, frequency],
            )?;
        }

        if !transcript.entities.is_empty() {
            tx.execute(
                "INSERT INTO annotations (transcript_id, key, value) VALUES (?1, 'entities', ?2)",
                params![transcript_id, serde_json::to_string(&transcript.entities)?],
            )?;
        }

        if let Some(sentiment) = &transcript.sentiment {
            tx.execute(
                "INSERT INTO annotations (transcript_id, key, value) VALUES (?1, 'sentiment', ?2)",
                params![transcript_id, sentiment],
            )?;
        }

        tx.commit()?;

        info!("Inserted transcript {} with id {}", transcript.filename, transcript_id);
        Ok(transcript_id)
    }

    /// Fetch a single transcript by id.
    pub fn get(&self, id: i64) -> Result<Option<TranscriptRecord>> {
        let conn = self.lock()?;

        let record = conn
            .query_row(
                &format!("{} WHERE t.id = ?1 GROUP BY t.id", RECORD_QUERY),
                params![id],
                row_to_record,
            )
            .optional()?;

        Ok(record)
    }

    /// Find a transcript id by its original audio filename.
    ///
    /// Used to skip recordings that were already ingested.
    pub fn find_by_filename(&self, filename: &str) -> Result<Option<i64>> {
        let conn = self.lock()?;

        let id = conn
            .query_row(
                "SELECT id FROM transcripts WHERE filename = ?1 ORDER BY id LIMIT 1",
                params![filename],
                |row| row.get(0),
            )
            .optional()?;

        Ok(id)
    }

    /// Fetch all transcripts recorded within an inclusive date range.
    #[instrument(skip(self))]
    pub fn records_in_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<TranscriptRecord>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(&format!(
            "{} WHERE t.recorded_on >= ?1 AND t.recorded_on <= ?2 GROUP BY t.id ORDER BY t.recorded_on",
            RECORD_QUERY
        ))?;

        let rows = stmt.query_map(
            params![
                start.format("%Y-%m-%d").to_string(),
                end.format("%Y-%m-%d").to_string()
            ],
            row_to_record,
        )?;

        let records: Vec<TranscriptRecord> = rows.filter_map(|r| r.ok()).collect();
        debug!("Found {} transcripts in range {}..={}", records.len(), start, end);
        Ok(records)
    }

    /// Fetch all transcripts, ordered by recording date.
    pub fn all_records(&self) -> Result<Vec<TranscriptRecord>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(&format!(
            "{} GROUP BY t.id ORDER BY t.recorded_on",
            RECORD_QUERY
        ))?;

        let rows = stmt.query_map([], row_to_record)?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Transcript ids recorded within an inclusive date range.
    pub fn ids_in_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<i64>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            "SELECT id FROM transcripts WHERE recorded_on >= ?1 AND recorded_on <= ?2",
        )?;

        let rows = stmt.query_map(
            params![
                start.format("%Y-%m-%d").to_string(),
                end.format("%Y-%m-%d").to_string()
            ],
            |row| row.get(0),
        )?;

        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Fetch transcripts recorded on a specific date.
    pub fn on_date(&self, date: NaiveDate) -> Result<Vec<TranscriptRecord>> {
        self.records_in_range(date, date)
    }

    /// Search transcripts by text content or keyword (LIKE match).
    #[instrument(skip(self))]
    pub fn search(&self, term: &str) -> Result<Vec<TranscriptRecord>> {
        let conn = self.lock()?;
        let pattern = format!("%{}%", term);

        let mut stmt = conn.prepare(&format!(
            r#"{}
            WHERE t.transcript_text LIKE ?1
               OR EXISTS (SELECT 1 FROM keywords WHERE transcript_id = t.id AND keyword LIKE ?1)
            GROUP BY t.id
            ORDER BY t.recorded_on DESC
            "#,
            RECORD_QUERY
        ))?;

        let rows = stmt.query_map(params![pattern], row_to_record)?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// List summaries of all stored recordings, newest first.
    pub fn list(&self) -> Result<Vec<TranscriptSummary>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT t.id, t.filename, t.recorded_on, t.duration_seconds, t.word_count,
                   GROUP_CONCAT(k.keyword) as keywords
            FROM transcripts t
            LEFT JOIN keywords k ON t.id = k.transcript_id
            GROUP BY t.id
            ORDER BY t.recorded_on DESC, t.id DESC
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            let recorded_on: String = row.get(2)?;
            let keywords: Option<String> = row.get(5)?;
            Ok(TranscriptSummary {
                id: row.get(0)?,
                filename: row.get(1)?,
                recorded_on: parse_date(&recorded_on),
                duration_seconds: row.get(3)?,
                word_count: row.get(4)?,
                keywords: split_keywords(keywords),
            })
        })?;

        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Annotations (entities, sentiment) for a transcript.
    pub fn annotations(&self, id: i64) -> Result<Vec<(String, String)>> {
        let conn = self.lock()?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM annotations WHERE transcript_id = ?1")?;
        let rows = stmt.query_map(params![id], |row| Ok((row.get(0)?, row.get(1)?)))?;

        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Delete a transcript (keywords and annotations cascade).
    pub fn delete(&self, id: i64) -> Result<usize> {
        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM transcripts WHERE id = ?1", params![id])?;
        info!("Deleted transcript {}", id);
        Ok(deleted)
    }

    /// Total number of stored transcripts.
    pub fn transcript_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM transcripts", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

/// Shared SELECT for full transcript records with aggregated keywords.
const RECORD_QUERY: &str = r#"
SELECT t.id, t.filename, t.recorded_on, t.created_at, t.duration_seconds,
       t.file_path, t.transcript_text, t.word_count,
       GROUP_CONCAT(k.keyword) as keywords
FROM transcripts t
LEFT JOIN keywords k ON t.id = k.transcript_id
"#;

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<TranscriptRecord> {
    let recorded_on: String = row.get(2)?;
    let created_at: String = row.get(3)?;
    let keywords: Option<String> = row.get(8)?;

    Ok(TranscriptRecord {
        id: row.get(0)?,
        filename: row.get(1)?,
        recorded_on: parse_date(&recorded_on),
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
        duration_seconds: row.get(4)?,
        file_path: row.get(5)?,
        text: row.get(6)?,
        word_count: row.get(7)?,
        keywords: split_keywords(keywords),
    })
}

fn parse_date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .unwrap_or_else(|_| NaiveDate::from_ymd_opt(1970, 1, 1).expect("valid date"))
}

fn split_keywords(joined: Option<String>) -> Vec<String> {
    joined
        .map(|s| s.split(',').map(|k| k.to_string()).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample(filename: &str, date: NaiveDate, text: &str, keywords: &[&str]) -> NewTranscript {
        NewTranscript {
            filename: filename.to_string(),
            recorded_on: date,
            text: text.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            entities: vec![],
            sentiment: None,
            duration_seconds: Some(42.0),
            file_path: None,
        }
    }

    #[test]
    fn test_insert_and_get_roundtrip() {
        let store = TranscriptStore::in_memory().unwrap();

        let id = store
            .insert(&sample(
                "2024-10-05_note.mp3",
                day(2024, 10, 5),
                "Planted tomatoes in the garden today",
                &["garden", "tomatoes"],
            ))
            .unwrap();

        let record = store.get(id).unwrap().unwrap();
        assert_eq!(record.filename, "2024-10-05_note.mp3");
        assert_eq!(record.recorded_on, day(2024, 10, 5));
        assert_eq!(record.text, "Planted tomatoes in the garden today");
        assert_eq!(record.word_count, 6);
        assert_eq!(record.duration_seconds, Some(42.0));

        let mut keywords = record.keywords.clone();
        keywords.sort();
        assert_eq!(keywords, vec!["garden", "tomatoes"]);
    }

    #[test]
    fn test_keyword_frequencies_counted() {
        let store = TranscriptStore::in_memory().unwrap();

        // Repeated keyword should be stored once with frequency 2
        let id = store
            .insert(&sample(
                "note.mp3",
                day(2024, 1, 1),
                "text",
                &["garden", "Garden", "rain"],
            ))
            .unwrap();

        let record = store.get(id).unwrap().unwrap();
        assert_eq!(record.keywords.len(), 2);
    }

    #[test]
    fn test_date_range_query() {
        let store = TranscriptStore::in_memory().unwrap();

        store
            .insert(&sample("a.mp3", day(2024, 10, 1), "first", &[]))
            .unwrap();
        store
            .insert(&sample("b.mp3", day(2024, 10, 15), "second", &[]))
            .unwrap();
        store
            .insert(&sample("c.mp3", day(2024, 11, 2), "third", &[]))
            .unwrap();

        let october = store
            .records_in_range(day(2024, 10, 1), day(2024, 10, 31))
            .unwrap();
        assert_eq!(october.len(), 2);

        let ids = store.ids_in_range(day(2024, 11, 1), day(2024, 11, 30)).unwrap();
        assert_eq!(ids.len(), 1);

        let none = store
            .records_in_range(day(2023, 1, 1), day(2023, 12, 31))
            .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_on_date() {
        let store = TranscriptStore::in_memory().unwrap();
        store
            .insert(&sample("a.mp3", day(2024, 10, 5), "note", &["dentist"]))
            .unwrap();

        let records = store.on_date(day(2024, 10, 5)).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].keywords, vec!["dentist"]);

        assert!(store.on_date(day(2024, 10, 6)).unwrap().is_empty());
    }

    #[test]
    fn test_search_by_text_and_keyword() {
        let store = TranscriptStore::in_memory().unwrap();
        store
            .insert(&sample(
                "a.mp3",
                day(2024, 10, 5),
                "Dentist appointment went fine",
                &["dentist"],
            ))
            .unwrap();
        store
            .insert(&sample("b.mp3", day(2024, 10, 6), "Watered the plants", &["garden"]))
            .unwrap();

        assert_eq!(store.search("dentist").unwrap().len(), 1);
        assert_eq!(store.search("garden").unwrap().len(), 1); // keyword-only match
        assert!(store.search("skiing").unwrap().is_empty());
    }

    #[test]
    fn test_find_by_filename_and_delete() {
        let store = TranscriptStore::in_memory().unwrap();
        let id = store
            .insert(&sample("a.mp3", day(2024, 10, 5), "note", &["x"]))
            .unwrap();

        assert_eq!(store.find_by_filename("a.mp3").unwrap(), Some(id));
        assert_eq!(store.find_by_filename("missing.mp3").unwrap(), None);

        assert_eq!(store.delete(id).unwrap(), 1);
        assert_eq!(store.transcript_count().unwrap(), 0);
        assert!(store.get(id).unwrap().is_none());
    }

    #[test]
    fn test_annotations_roundtrip() {
        let store = TranscriptStore::in_memory().unwrap();

        let mut transcript = sample("a.mp3", day(2024, 10, 5), "met with Sam", &[]);
        transcript.entities = vec!["Sam".to_string()];
        transcript.sentiment = Some("positive".to_string());

        let id = store.insert(&transcript).unwrap();
        let annotations = store.annotations(id).unwrap();

        assert!(annotations
            .iter()
            .any(|(k, v)| k == "sentiment" && v == "positive"));
        assert!(annotations.iter().any(|(k, v)| k == "entities" && v.contains("Sam")));
    }

    #[test]
    fn test_list_ordering() {
        let store = TranscriptStore::in_memory().unwrap();
        store
            .insert(&sample("old.mp3", day(2024, 1, 1), "old", &[]))
            .unwrap();
        store
            .insert(&sample("new.mp3", day(2024, 6, 1), "new", &[]))
            .unwrap();

        let summaries = store.list().unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].filename, "new.mp3");
    }
}
