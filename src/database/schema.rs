/*!
 * Translation store schema and migrations.
 *
 * Two tables hold everything the engine needs to resume a run:
 * - `translations`: one row per translated unit, unique per
 *   (source_lang, target_lang, source_text, model)
 * - `chapter_sizes`: the expected paragraph count of each chapter, recorded
 *   when the chapter is first scanned, so progress can be computed without
 *   re-reading the source document
 */

use anyhow::{Context, Result};
use log::{debug, info};
use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 2;

/// Initialize the database schema
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        info!("Initializing translation store schema v{}", SCHEMA_VERSION);
        create_all_tables(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if current_version < SCHEMA_VERSION {
        info!(
            "Migrating translation store from v{} to v{}",
            current_version, SCHEMA_VERSION
        );
        migrate_schema(conn, current_version)?;
    } else {
        debug!("Translation store schema is up to date (v{})", current_version);
    }

    Ok(())
}

/// Get the current schema version, 0 for a fresh database
fn get_schema_version(conn: &Connection) -> Result<i32> {
    let table_exists: bool = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='schema_version'",
            [],
            |row| row.get(0),
        )
        .context("Failed to check schema_version table existence")?;

    if !table_exists {
        return Ok(0);
    }

    let version: i32 = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .unwrap_or(0);

    Ok(version)
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_version (id, version, updated_at) VALUES (1, ?1, datetime('now'))",
        [version],
    )?;
    Ok(())
}

fn create_all_tables(conn: &Connection) -> Result<()> {
    // WAL is ignored by in-memory databases, which report "memory"
    conn.query_row("PRAGMA journal_mode=WAL", [], |_| Ok(()))?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            version INTEGER NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS translations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            edition INTEGER NOT NULL DEFAULT 1,
            chapter INTEGER NOT NULL,
            paragraph_index INTEGER NOT NULL,
            source_lang TEXT NOT NULL,
            source_text TEXT NOT NULL,
            target_lang TEXT NOT NULL,
            translated_text TEXT NOT NULL,
            elapsed_ms INTEGER NOT NULL DEFAULT 0,
            quality_score INTEGER NOT NULL DEFAULT -1,
            model TEXT NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE(source_lang, target_lang, source_text, model)
        );

        CREATE INDEX IF NOT EXISTS idx_translations_scope
            ON translations(source_lang, target_lang, edition, chapter);
        CREATE INDEX IF NOT EXISTS idx_translations_lookup
            ON translations(source_lang, target_lang, source_text);
        "#,
    )?;

    create_chapter_sizes(conn)?;

    info!("Translation store schema created successfully");
    Ok(())
}

fn create_chapter_sizes(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS chapter_sizes (
            edition INTEGER NOT NULL,
            chapter INTEGER NOT NULL,
            source_lang TEXT NOT NULL,
            target_lang TEXT NOT NULL,
            expected INTEGER NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (edition, chapter, source_lang, target_lang)
        );
        "#,
    )?;
    Ok(())
}

/// Migrate the schema from one version to another
fn migrate_schema(conn: &Connection, from_version: i32) -> Result<()> {
    let mut current = from_version;

    while current < SCHEMA_VERSION {
        match current {
            // v1 stores only carried the translations table
            1 => {
                create_chapter_sizes(conn)?;
                current = 2;
            }
            _ => {
                return Err(anyhow::anyhow!(
                    "Unknown schema version: {}. Cannot migrate.",
                    current
                ));
            }
        }
    }

    set_schema_version(conn, SCHEMA_VERSION)?;
    info!("Schema migration completed to v{}", SCHEMA_VERSION);
    Ok(())
}
