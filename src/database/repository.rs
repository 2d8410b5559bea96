/*!
 * Repository layer for the translation store.
 *
 * Every operation the engine runs against SQLite lives here: the
 * overwrite-on-reinsert cache, progress counters per chapter scope, the
 * chapter listing used for scheduling, free-text search and the CSV backup.
 */

use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};

use super::connection::DatabaseConnection;
use super::models::{
    CachedTranslation, ChapterStats, LookupPolicy, RecordPosition, StoreStats, TranslationRecord,
};
use crate::errors::StoreError;

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Columns selected whenever a full record is read back
const RECORD_COLUMNS: &str = "edition, chapter, paragraph_index, source_lang, source_text, \
     target_lang, translated_text, elapsed_ms, quality_score, model, created_at";

/// Columns a backup file must carry
pub const BACKUP_COLUMNS: [&str; 11] = [
    "edition",
    "chapter",
    "paragraph_index",
    "source_lang",
    "source_text",
    "target_lang",
    "translated_text",
    "elapsed_ms",
    "quality_score",
    "model",
    "created_at",
];

/// Repository for translation store operations
#[derive(Clone)]
pub struct Repository {
    db: DatabaseConnection,
}

impl Repository {
    /// Create a new repository with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Open a repository at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        Ok(Self::new(DatabaseConnection::new(path)?))
    }

    /// Create a repository with the default database location
    pub fn new_default() -> StoreResult<Self> {
        Ok(Self::new(DatabaseConnection::new_default()?))
    }

    /// Create a repository with an in-memory database (for testing)
    pub fn new_in_memory() -> StoreResult<Self> {
        Ok(Self::new(DatabaseConnection::new_in_memory()?))
    }

    /// Underlying connection
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    fn record_from_row(row: &Row<'_>) -> rusqlite::Result<TranslationRecord> {
        Ok(TranslationRecord {
            edition: row.get(0)?,
            chapter: row.get(1)?,
            paragraph_index: row.get(2)?,
            source_lang: row.get(3)?,
            source_text: row.get(4)?,
            target_lang: row.get(5)?,
            translated_text: row.get(6)?,
            elapsed_ms: row.get(7)?,
            quality_score: row.get(8)?,
            model: row.get(9)?,
            created_at: row.get(10)?,
        })
    }

    fn upsert_sync(conn: &Connection, record: &TranslationRecord) -> rusqlite::Result<usize> {
        conn.execute(
            r#"
            INSERT INTO translations (
                edition, chapter, paragraph_index, source_lang, source_text,
                target_lang, translated_text, elapsed_ms, quality_score, model, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT(source_lang, target_lang, source_text, model) DO UPDATE SET
                edition = excluded.edition,
                chapter = excluded.chapter,
                paragraph_index = excluded.paragraph_index,
                translated_text = excluded.translated_text,
                elapsed_ms = excluded.elapsed_ms,
                quality_score = excluded.quality_score,
                created_at = excluded.created_at
            "#,
            params![
                record.edition,
                record.chapter,
                record.paragraph_index,
                record.source_lang,
                record.source_text,
                record.target_lang,
                record.translated_text,
                record.elapsed_ms,
                record.quality_score,
                record.model,
                record.created_at,
            ],
        )
    }

    // =========================================================================
    // Cache Operations
    // =========================================================================

    /// Insert a record, replacing any record with the same
    /// (source_lang, target_lang, source_text, model) key
    pub async fn insert(&self, record: &TranslationRecord) -> StoreResult<()> {
        let record = record.clone();

        self.db
            .execute_async(move |conn| {
                Self::upsert_sync(conn, &record)?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Look up a stored translation by exact source text, any edition
    pub async fn lookup(
        &self,
        source_text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> StoreResult<Option<CachedTranslation>> {
        self.lookup_with_policy(source_text, source_lang, target_lang, LookupPolicy::AnyEdition, 0)
            .await
    }

    /// Look up a stored translation, optionally restricted to one edition
    ///
    /// When several models translated the same text, the best scored record
    /// wins, then the most recent one.
    pub async fn lookup_with_policy(
        &self,
        source_text: &str,
        source_lang: &str,
        target_lang: &str,
        policy: LookupPolicy,
        edition: i64,
    ) -> StoreResult<Option<CachedTranslation>> {
        let source_text = source_text.to_string();
        let source_lang = source_lang.to_string();
        let target_lang = target_lang.to_string();
        let edition_filter = match policy {
            LookupPolicy::AnyEdition => None,
            LookupPolicy::SameEdition => Some(edition),
        };

        let found = self
            .db
            .execute_async(move |conn| {
                let result = conn
                    .query_row(
                        r#"
                        SELECT translated_text, elapsed_ms, quality_score, model,
                               edition, chapter, paragraph_index
                        FROM translations
                        WHERE source_text = ?1
                          AND source_lang = ?2
                          AND target_lang = ?3
                          AND translated_text != ''
                          AND (?4 IS NULL OR edition = ?4)
                        ORDER BY quality_score DESC, id DESC
                        LIMIT 1
                        "#,
                        params![source_text, source_lang, target_lang, edition_filter],
                        |row| {
                            Ok(CachedTranslation {
                                translated_text: row.get(0)?,
                                elapsed_ms: row.get(1)?,
                                quality_score: row.get(2)?,
                                model: row.get(3)?,
                                position: RecordPosition {
                                    edition: row.get(4)?,
                                    chapter: row.get(5)?,
                                    paragraph_index: row.get(6)?,
                                },
                            })
                        },
                    )
                    .optional()?;
                Ok(result)
            })
            .await?;

        if let Some(hit) = &found {
            debug!("Store hit (model {}, score {})", hit.model, hit.quality_score);
        }
        Ok(found)
    }

    /// Move an existing record to a new position without touching its content
    pub async fn restamp(
        &self,
        source_text: &str,
        source_lang: &str,
        target_lang: &str,
        model: &str,
        position: RecordPosition,
    ) -> StoreResult<bool> {
        let source_text = source_text.to_string();
        let source_lang = source_lang.to_string();
        let target_lang = target_lang.to_string();
        let model = model.to_string();

        let updated = self
            .db
            .execute_async(move |conn| {
                let updated = conn.execute(
                    r#"
                    UPDATE translations
                    SET edition = ?1, chapter = ?2, paragraph_index = ?3
                    WHERE source_text = ?4 AND source_lang = ?5 AND target_lang = ?6 AND model = ?7
                    "#,
                    params![
                        position.edition,
                        position.chapter,
                        position.paragraph_index,
                        source_text,
                        source_lang,
                        target_lang,
                        model,
                    ],
                )?;
                Ok(updated)
            })
            .await?;
        Ok(updated > 0)
    }

    /// Most recent records of an edition, newest first, usable as context
    pub async fn recent_records(
        &self,
        source_lang: &str,
        target_lang: &str,
        edition: i64,
        limit: usize,
    ) -> StoreResult<Vec<TranslationRecord>> {
        let source_lang = source_lang.to_string();
        let target_lang = target_lang.to_string();

        let records = self
            .db
            .execute_async(move |conn| {
                let sql = format!(
                    r#"
                    SELECT {RECORD_COLUMNS}
                    FROM translations
                    WHERE source_lang = ?1
                      AND target_lang = ?2
                      AND edition = ?3
                      AND translated_text != ''
                      AND translated_text != source_text
                    ORDER BY id DESC
                    LIMIT ?4
                    "#
                );
                let mut stmt = conn.prepare(&sql)?;
                let records = stmt
                    .query_map(
                        params![source_lang, target_lang, edition, limit as i64],
                        Self::record_from_row,
                    )?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(records)
            })
            .await?;
        Ok(records)
    }

    // =========================================================================
    // Progress Operations
    // =========================================================================

    /// Record the expected paragraph count of a chapter
    pub async fn set_expected_paragraphs(
        &self,
        edition: i64,
        chapter: i64,
        source_lang: &str,
        target_lang: &str,
        expected: i64,
    ) -> StoreResult<()> {
        let source_lang = source_lang.to_string();
        let target_lang = target_lang.to_string();
        let now = chrono::Utc::now().to_rfc3339();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO chapter_sizes (edition, chapter, source_lang, target_lang, expected, updated_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                    ON CONFLICT(edition, chapter, source_lang, target_lang)
                    DO UPDATE SET expected = excluded.expected, updated_at = excluded.updated_at
                    "#,
                    params![edition, chapter, source_lang, target_lang, expected, now],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Expected paragraph count of a chapter, if it was scanned
    pub async fn expected_paragraphs(
        &self,
        edition: i64,
        chapter: i64,
        source_lang: &str,
        target_lang: &str,
    ) -> StoreResult<Option<i64>> {
        let source_lang = source_lang.to_string();
        let target_lang = target_lang.to_string();

        let expected = self
            .db
            .execute_async(move |conn| {
                Ok(Self::expected_sync(conn, edition, chapter, &source_lang, &target_lang)?)
            })
            .await?;
        Ok(expected)
    }

    fn expected_sync(
        conn: &Connection,
        edition: i64,
        chapter: i64,
        source_lang: &str,
        target_lang: &str,
    ) -> rusqlite::Result<Option<i64>> {
        conn.query_row(
            r#"
            SELECT expected FROM chapter_sizes
            WHERE edition = ?1 AND chapter = ?2 AND source_lang = ?3 AND target_lang = ?4
            "#,
            params![edition, chapter, source_lang, target_lang],
            |row| row.get(0),
        )
        .optional()
    }

    fn count_total_sync(
        conn: &Connection,
        edition: i64,
        chapter: i64,
        source_lang: &str,
        target_lang: &str,
    ) -> rusqlite::Result<i64> {
        conn.query_row(
            r#"
            SELECT COUNT(*) FROM translations
            WHERE edition = ?1 AND chapter = ?2 AND source_lang = ?3 AND target_lang = ?4
            "#,
            params![edition, chapter, source_lang, target_lang],
            |row| row.get(0),
        )
    }

    fn count_untranslated_sync(
        conn: &Connection,
        edition: i64,
        chapter: i64,
        source_lang: &str,
        target_lang: &str,
    ) -> rusqlite::Result<i64> {
        let expected =
            Self::expected_sync(conn, edition, chapter, source_lang, target_lang)?.unwrap_or(0);
        let total = Self::count_total_sync(conn, edition, chapter, source_lang, target_lang)?;
        Ok((expected - total).max(0))
    }

    /// Number of records persisted for a chapter scope
    pub async fn count_total(
        &self,
        edition: i64,
        chapter: i64,
        source_lang: &str,
        target_lang: &str,
    ) -> StoreResult<i64> {
        let source_lang = source_lang.to_string();
        let target_lang = target_lang.to_string();

        let total = self
            .db
            .execute_async(move |conn| {
                Ok(Self::count_total_sync(conn, edition, chapter, &source_lang, &target_lang)?)
            })
            .await?;
        Ok(total)
    }

    /// Expected paragraphs minus persisted records, never negative
    pub async fn count_untranslated(
        &self,
        edition: i64,
        chapter: i64,
        source_lang: &str,
        target_lang: &str,
    ) -> StoreResult<i64> {
        let source_lang = source_lang.to_string();
        let target_lang = target_lang.to_string();

        let remaining = self
            .db
            .execute_async(move |conn| {
                Ok(Self::count_untranslated_sync(
                    conn,
                    edition,
                    chapter,
                    &source_lang,
                    &target_lang,
                )?)
            })
            .await?;
        Ok(remaining)
    }

    /// Timing statistics and remaining-time estimate for a chapter scope
    pub async fn chapter_stats(
        &self,
        edition: i64,
        chapter: i64,
        source_lang: &str,
        target_lang: &str,
    ) -> StoreResult<ChapterStats> {
        let source_lang = source_lang.to_string();
        let target_lang = target_lang.to_string();

        let stats = self
            .db
            .execute_async(move |conn| {
                let (avg, total): (Option<f64>, i64) = conn.query_row(
                    r#"
                    SELECT AVG(elapsed_ms), COALESCE(SUM(elapsed_ms), 0)
                    FROM translations
                    WHERE edition = ?1 AND chapter = ?2 AND source_lang = ?3 AND target_lang = ?4
                      AND elapsed_ms > 0
                    "#,
                    params![edition, chapter, source_lang, target_lang],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )?;
                let remaining = Self::count_untranslated_sync(
                    conn,
                    edition,
                    chapter,
                    &source_lang,
                    &target_lang,
                )?;
                let avg = avg.unwrap_or(0.0);

                Ok(ChapterStats {
                    avg_elapsed_ms: avg,
                    total_elapsed_ms: total as f64,
                    estimated_remaining_ms: avg * remaining as f64,
                })
            })
            .await?;
        Ok(stats)
    }

    /// Highest edition among the records of a language pair, 0 if none
    pub async fn latest_edition(&self, source_lang: &str, target_lang: &str) -> StoreResult<i64> {
        let source_lang = source_lang.to_string();
        let target_lang = target_lang.to_string();

        let edition = self
            .db
            .execute_async(move |conn| {
                let edition: i64 = conn.query_row(
                    r#"
                    SELECT COALESCE(MAX(edition), 0) FROM translations
                    WHERE source_lang = ?1 AND target_lang = ?2
                    "#,
                    params![source_lang, target_lang],
                    |row| row.get(0),
                )?;
                Ok(edition)
            })
            .await?;
        Ok(edition)
    }

    /// Highest edition with scanned chapters for a language pair, 0 if none
    pub async fn latest_scanned_edition(
        &self,
        source_lang: &str,
        target_lang: &str,
    ) -> StoreResult<i64> {
        let source_lang = source_lang.to_string();
        let target_lang = target_lang.to_string();

        let edition = self
            .db
            .execute_async(move |conn| {
                let edition: i64 = conn.query_row(
                    r#"
                    SELECT COALESCE(MAX(edition), 0) FROM chapter_sizes
                    WHERE source_lang = ?1 AND target_lang = ?2
                    "#,
                    params![source_lang, target_lang],
                    |row| row.get(0),
                )?;
                Ok(edition)
            })
            .await?;
        Ok(edition)
    }

    /// Distinct chapters with records in an edition
    ///
    /// Ascending by chapter number, or by record count (chapter number
    /// breaking ties) when `order_by_length` is set.
    pub async fn chapters_list(
        &self,
        source_lang: &str,
        target_lang: &str,
        edition: i64,
        order_by_length: bool,
    ) -> StoreResult<Vec<i64>> {
        let source_lang = source_lang.to_string();
        let target_lang = target_lang.to_string();
        let order = if order_by_length {
            "COUNT(*) ASC, chapter ASC"
        } else {
            "chapter ASC"
        };

        let chapters = self
            .db
            .execute_async(move |conn| {
                let sql = format!(
                    r#"
                    SELECT chapter FROM translations
                    WHERE source_lang = ?1 AND target_lang = ?2 AND edition = ?3
                    GROUP BY chapter
                    ORDER BY {order}
                    "#
                );
                let mut stmt = conn.prepare(&sql)?;
                let chapters = stmt
                    .query_map(params![source_lang, target_lang, edition], |row| row.get(0))?
                    .collect::<rusqlite::Result<Vec<i64>>>()?;
                Ok(chapters)
            })
            .await?;
        Ok(chapters)
    }

    // =========================================================================
    // Search Operations
    // =========================================================================

    /// Records whose source text contains `query`, ignoring case
    pub async fn search(
        &self,
        query: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> StoreResult<Vec<TranslationRecord>> {
        let needle = query.to_lowercase();
        let source_lang = source_lang.to_string();
        let target_lang = target_lang.to_string();

        // SQLite's LOWER only folds ASCII, so the match runs here
        let records = self
            .db
            .execute_async(move |conn| {
                let sql = format!(
                    "SELECT {RECORD_COLUMNS} FROM translations WHERE source_lang = ?1 AND target_lang = ?2"
                );
                let mut stmt = conn.prepare(&sql)?;
                let records = stmt
                    .query_map(params![source_lang, target_lang], Self::record_from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(records)
            })
            .await?;

        Ok(records
            .into_iter()
            .filter(|r| r.source_text.to_lowercase().contains(&needle))
            .collect())
    }

    /// All records, in insertion order
    pub async fn all_records(&self) -> StoreResult<Vec<TranslationRecord>> {
        let records = self
            .db
            .execute_async(|conn| {
                let sql = format!("SELECT {RECORD_COLUMNS} FROM translations ORDER BY id ASC");
                let mut stmt = conn.prepare(&sql)?;
                let records = stmt
                    .query_map([], Self::record_from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(records)
            })
            .await?;
        Ok(records)
    }

    // =========================================================================
    // Backup Operations
    // =========================================================================

    /// Write every record to a CSV file with a header row
    ///
    /// The file is written next to its destination and renamed into place.
    pub async fn export_all(&self, path: &Path) -> StoreResult<usize> {
        let records = self.all_records().await?;
        let path = path.to_path_buf();

        let count = tokio::task::spawn_blocking(move || write_backup(&path, &records))
            .await
            .map_err(|e| StoreError::Backup(format!("Export task panicked: {}", e)))??;

        info!("Exported {} translation records", count);
        Ok(count)
    }

    /// Restore records from a CSV backup
    ///
    /// The whole file is validated first; a single bad row fails the import
    /// before anything is written. Valid files are applied in one transaction
    /// with the same overwrite-on-reinsert semantics as `insert`.
    ///
    /// Chapter sizes are not part of the backup. Until the book is scanned
    /// again, untranslated counts and time estimates of a restored store read
    /// as zero.
    pub async fn import_all(&self, path: &Path) -> StoreResult<usize> {
        let path = path.to_path_buf();

        let records = tokio::task::spawn_blocking(move || read_backup(&path))
            .await
            .map_err(|e| StoreError::Backup(format!("Import task panicked: {}", e)))??;

        let count = records.len();
        self.db
            .transaction_async(move |tx| {
                for record in &records {
                    Self::upsert_sync(tx, record)?;
                }
                Ok(())
            })
            .await?;

        info!("Imported {} translation records", count);
        Ok(count)
    }

    /// Delete every record and chapter size
    pub async fn reset(&self) -> StoreResult<usize> {
        let deleted = self
            .db
            .transaction_async(|tx| {
                let deleted = tx.execute("DELETE FROM translations", [])?;
                tx.execute("DELETE FROM chapter_sizes", [])?;
                Ok(deleted)
            })
            .await?;
        info!("Translation store reset, {} records deleted", deleted);
        Ok(deleted)
    }

    /// Store statistics
    pub async fn stats(&self) -> StoreResult<StoreStats> {
        let db = self.db.clone();
        let stats = tokio::task::spawn_blocking(move || db.stats())
            .await
            .map_err(|e| StoreError::Unavailable(format!("Stats task panicked: {}", e)))??;
        Ok(stats)
    }
}

fn backup_error(path: &Path, error: impl std::fmt::Display) -> StoreError {
    StoreError::Backup(format!("{}: {}", path.display(), error))
}

fn write_backup(path: &Path, records: &[TranslationRecord]) -> StoreResult<usize> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| backup_error(path, e))?;
    {
        let mut writer = csv::Writer::from_writer(tmp.as_file());
        // serde only writes the header together with the first row
        if records.is_empty() {
            writer
                .write_record(BACKUP_COLUMNS)
                .map_err(|e| backup_error(path, e))?;
        }
        for record in records {
            writer.serialize(record).map_err(|e| backup_error(path, e))?;
        }
        writer.flush().map_err(|e| backup_error(path, e))?;
    }
    tmp.persist(path).map_err(|e| backup_error(path, e))?;
    Ok(records.len())
}

fn read_backup(path: &Path) -> StoreResult<Vec<TranslationRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| backup_error(path, e))?;

    let headers = reader.headers().map_err(|e| StoreError::ImportFormat {
        row: 0,
        message: e.to_string(),
    })?;
    let missing: Vec<&str> = BACKUP_COLUMNS
        .iter()
        .copied()
        .filter(|column| !headers.iter().any(|h| h == *column))
        .collect();
    if !missing.is_empty() {
        return Err(StoreError::ImportFormat {
            row: 0,
            message: format!("missing columns: {}", missing.join(", ")),
        });
    }

    let mut records = Vec::new();
    for (index, row) in reader.deserialize::<TranslationRecord>().enumerate() {
        let row_number = index + 1;
        let record = row.map_err(|e| StoreError::ImportFormat {
            row: row_number,
            message: e.to_string(),
        })?;
        record.validate().map_err(|message| StoreError::ImportFormat {
            row: row_number,
            message,
        })?;
        records.push(record);
    }
    Ok(records)
}
