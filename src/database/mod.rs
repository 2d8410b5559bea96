/*!
 * Persistent translation store.
 *
 * SQLite-backed storage for:
 * - Translated paragraphs, doubling as the cache consulted before every
 *   generation call
 * - Expected chapter sizes used for progress and remaining-time estimates
 * - CSV backup and restore of the whole record set
 */

pub mod connection;
pub mod models;
pub mod repository;
pub mod schema;

pub use connection::DatabaseConnection;
pub use models::{
    CachedTranslation, ChapterStats, LookupPolicy, RecordPosition, StoreStats, TranslationRecord,
    UNSCORED,
};
pub use repository::{Repository, StoreResult};
