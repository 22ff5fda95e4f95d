//! SQLite Storage Implementation
//!
//! Persists cards, per-learner mastery state and the review log. All
//! scheduling arithmetic is delegated to `crate::sm2`; this layer only
//! fetches, stores, and serializes access.

use chrono::{DateTime, SubsecRound, Utc};
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use uuid::Uuid;

use crate::card::{
    Card, CardInput, DueCard, DueQuery, MasteryStats, ReviewEvent, ReviewReceipt,
};
use crate::sm2::{preview, step_at, MasteryState, PreviewResults, Quality};

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "MASTERY_DATA_DIR";

/// Database file name inside the data directory
pub const DB_FILE_NAME: &str = "mastery.db";

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Storage error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// Card not found
    #[error("Card not found: {0}")]
    NotFound(String),
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Initialization error
    #[error("Initialization error: {0}")]
    Init(String),
    /// Rejected input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl StorageError {
    /// Whether the learner can simply submit the same request again
    pub fn is_retryable(&self) -> bool {
        matches!(self, StorageError::Database(_) | StorageError::Io(_))
    }
}

/// Storage result type
pub type Result<T> = std::result::Result<T, StorageError>;

/// Resolve the database path: `MASTERY_DATA_DIR`, else the platform data dir
pub fn default_db_path() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir).join(DB_FILE_NAME));
        }
    }

    let proj_dirs = ProjectDirs::from("com", "mastery", "mastery").ok_or_else(|| {
        StorageError::Init("Could not determine project directories".to_string())
    })?;
    Ok(proj_dirs.data_dir().join(DB_FILE_NAME))
}

// ============================================================================
// STORAGE
// ============================================================================

/// Card and mastery store
///
/// Uses separate reader/writer connections. All methods take `&self`, so the
/// store is `Send + Sync` and can be shared as `Arc<Storage>`. Every review is
/// a read-modify-write under the writer lock inside a `BEGIN IMMEDIATE`
/// transaction, which also serializes writers in other processes.
pub struct Storage {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
    path: PathBuf,
}

impl Storage {
    /// Apply PRAGMAs and optional encryption to a connection
    fn configure_connection(conn: &Connection) -> Result<()> {
        #[cfg(feature = "encryption")]
        {
            if let Ok(key) = std::env::var("MASTERY_ENCRYPTION_KEY") {
                if !key.is_empty() {
                    conn.pragma_update(None, "key", &key)?;
                }
            }
        }

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA temp_store = MEMORY;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;

        Ok(())
    }

    /// Open (or create) the store at `db_path`, or the default location
    pub fn new(db_path: Option<PathBuf>) -> Result<Self> {
        let path = match db_path {
            Some(p) => p,
            None => default_db_path()?,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
                // Restrict directory permissions to owner-only on Unix
                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    let perms = std::fs::Permissions::from_mode(0o700);
                    let _ = std::fs::set_permissions(parent, perms);
                }
            }
        }

        let writer_conn = Connection::open(&path)?;

        #[cfg(unix)]
        if path.exists() {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            let _ = std::fs::set_permissions(&path, perms);
        }

        Self::configure_connection(&writer_conn)?;

        // Apply migrations on writer only
        let applied = super::migrations::apply_migrations(&writer_conn)?;

        let reader_conn = Connection::open(&path)?;
        Self::configure_connection(&reader_conn)?;

        tracing::info!(path = %path.display(), migrations = applied, "Mastery store opened");

        Ok(Self {
            writer: Mutex::new(writer_conn),
            reader: Mutex::new(reader_conn),
            path,
        })
    }

    /// Open the store inside a data directory
    pub fn in_dir(dir: &Path) -> Result<Self> {
        Self::new(Some(dir.join(DB_FILE_NAME)))
    }

    /// Path of the database file
    pub fn path(&self) -> &Path {
        &self.path
    }

    // ========================================================================
    // TIMESTAMP HELPERS
    // ========================================================================

    /// Drop sub-millisecond digits so timestamps survive the `due_at_ms` column
    fn to_stored_precision(now: DateTime<Utc>) -> DateTime<Utc> {
        now.trunc_subsecs(3)
    }

    /// Parse RFC3339 timestamp
    fn parse_timestamp(value: &str, field_name: &str) -> rusqlite::Result<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    0,
                    rusqlite::types::Type::Text,
                    Box::new(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        format!("Invalid {} timestamp '{}': {}", field_name, value, e),
                    )),
                )
            })
    }

    /// Convert stored Unix milliseconds back to a timestamp
    fn parse_millis(value: i64, field_name: &str) -> rusqlite::Result<DateTime<Utc>> {
        DateTime::from_timestamp_millis(value).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Integer,
                Box::new(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("Invalid {} millis '{}'", field_name, value),
                )),
            )
        })
    }

    // ========================================================================
    // ROW MAPPING
    // ========================================================================

    /// Convert a row to Card
    fn row_to_card(row: &rusqlite::Row) -> rusqlite::Result<Card> {
        let created_at: String = row.get("created_at")?;
        Ok(Card {
            id: row.get("id")?,
            owner_id: row.get("owner_id")?,
            deck_id: row.get("deck_id")?,
            front: row.get("front")?,
            back: row.get("back")?,
            created_at: Self::parse_timestamp(&created_at, "created_at")?,
        })
    }

    /// Convert a row to MasteryState
    fn row_to_mastery(row: &rusqlite::Row) -> rusqlite::Result<MasteryState> {
        let due_at_ms: i64 = row.get("due_at_ms")?;
        Ok(MasteryState {
            interval_days: row.get("interval_days")?,
            ease: row.get("ease")?,
            reps: row.get("reps")?,
            lapses: row.get("lapses")?,
            due_at: Self::parse_millis(due_at_ms, "due_at")?,
        })
    }

    /// Mastery columns from a LEFT JOIN; all NULL when the learner has no state
    fn row_to_optional_mastery(row: &rusqlite::Row) -> rusqlite::Result<Option<MasteryState>> {
        let due_at_ms: Option<i64> = row.get("due_at_ms")?;
        match due_at_ms {
            None => Ok(None),
            Some(_) => Self::row_to_mastery(row).map(Some),
        }
    }

    fn row_to_event(row: &rusqlite::Row) -> rusqlite::Result<ReviewEvent> {
        let quality: u8 = row.get("quality")?;
        let reviewed_at: String = row.get("reviewed_at")?;
        Ok(ReviewEvent {
            user_id: row.get("user_id")?,
            card_id: row.get("card_id")?,
            quality: Quality::saturating(f64::from(quality)),
            reviewed_at: Self::parse_timestamp(&reviewed_at, "reviewed_at")?,
        })
    }

    // ========================================================================
    // SHARED STATEMENTS
    // ========================================================================

    fn load_mastery(conn: &Connection, user_id: &str, card_id: &str) -> Result<Option<MasteryState>> {
        let state = conn
            .query_row(
                "SELECT interval_days, ease, reps, lapses, due_at_ms
                 FROM mastery_state WHERE user_id = ?1 AND card_id = ?2",
                params![user_id, card_id],
                |row| Self::row_to_mastery(row),
            )
            .optional()?;
        Ok(state)
    }

    fn upsert_mastery(
        conn: &Connection,
        user_id: &str,
        card_id: &str,
        state: &MasteryState,
        now: DateTime<Utc>,
    ) -> Result<()> {
        conn.execute(
            "INSERT INTO mastery_state (
                user_id, card_id, interval_days, ease, reps, lapses, due_at_ms, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(user_id, card_id) DO UPDATE SET
                interval_days = excluded.interval_days,
                ease = excluded.ease,
                reps = excluded.reps,
                lapses = excluded.lapses,
                due_at_ms = excluded.due_at_ms,
                updated_at = excluded.updated_at",
            params![
                user_id,
                card_id,
                state.interval_days,
                state.ease,
                state.reps,
                state.lapses,
                state.due_at.timestamp_millis(),
                now.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn card_exists(conn: &Connection, card_id: &str) -> Result<bool> {
        let found = conn
            .query_row("SELECT 1 FROM cards WHERE id = ?1", params![card_id], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    fn require_id(value: &str, field: &str) -> Result<()> {
        if value.trim().is_empty() {
            return Err(StorageError::InvalidInput(format!("{} must not be empty", field)));
        }
        Ok(())
    }

    // ========================================================================
    // CARDS
    // ========================================================================

    /// Create a card and schedule it for its owner
    pub fn create_card(&self, input: CardInput) -> Result<Card> {
        self.create_card_at(input, Utc::now())
    }

    /// [`Storage::create_card`] with an explicit creation time
    pub fn create_card_at(&self, input: CardInput, now: DateTime<Utc>) -> Result<Card> {
        let now = Self::to_stored_precision(now);
        Self::require_id(&input.owner_id, "ownerId")?;
        Self::require_id(&input.deck_id, "deckId")?;
        if input.front.trim().is_empty() {
            return Err(StorageError::InvalidInput("front must not be empty".to_string()));
        }

        let card = Card {
            id: Uuid::new_v4().to_string(),
            owner_id: input.owner_id,
            deck_id: input.deck_id,
            front: input.front,
            back: input.back,
            created_at: now,
        };

        {
            let mut writer = self.writer.lock()
                .map_err(|_| StorageError::Init("Writer lock poisoned".into()))?;
            let tx = writer.transaction_with_behavior(TransactionBehavior::Immediate)?;
            tx.execute(
                "INSERT INTO cards (id, owner_id, deck_id, front, back, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    card.id,
                    card.owner_id,
                    card.deck_id,
                    card.front,
                    card.back,
                    now.to_rfc3339(),
                ],
            )?;
            Self::upsert_mastery(&tx, &card.owner_id, &card.id, &MasteryState::new_at(now), now)?;
            tx.commit()?;
        }

        tracing::debug!(card_id = %card.id, deck_id = %card.deck_id, "Card created");
        Ok(card)
    }

    /// Get a card by ID
    pub fn get_card(&self, id: &str) -> Result<Option<Card>> {
        let reader = self.reader.lock()
            .map_err(|_| StorageError::Init("Reader lock poisoned".into()))?;
        let card = reader
            .query_row("SELECT * FROM cards WHERE id = ?1", params![id], |row| {
                Self::row_to_card(row)
            })
            .optional()?;
        Ok(card)
    }

    /// All cards in a deck, oldest first
    pub fn list_cards(&self, deck_id: &str) -> Result<Vec<Card>> {
        let reader = self.reader.lock()
            .map_err(|_| StorageError::Init("Reader lock poisoned".into()))?;
        let mut stmt = reader.prepare(
            "SELECT * FROM cards WHERE deck_id = ?1 ORDER BY created_at ASC, rowid ASC",
        )?;

        let cards = stmt.query_map(params![deck_id], |row| Self::row_to_card(row))?;

        let mut result = Vec::new();
        for card in cards {
            result.push(card?);
        }
        Ok(result)
    }

    /// Delete a card; mastery state and review log go with it
    pub fn delete_card(&self, id: &str) -> Result<bool> {
        let writer = self.writer.lock()
            .map_err(|_| StorageError::Init("Writer lock poisoned".into()))?;
        let rows = writer.execute("DELETE FROM cards WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    /// Drop every mastery row and review event for a learner
    ///
    /// Returns the number of mastery rows removed.
    pub fn delete_user_progress(&self, user_id: &str) -> Result<usize> {
        let mut writer = self.writer.lock()
            .map_err(|_| StorageError::Init("Writer lock poisoned".into()))?;
        let tx = writer.transaction()?;
        let removed = tx.execute("DELETE FROM mastery_state WHERE user_id = ?1", params![user_id])?;
        tx.execute("DELETE FROM review_events WHERE user_id = ?1", params![user_id])?;
        tx.commit()?;
        Ok(removed)
    }

    // ========================================================================
    // MASTERY
    // ========================================================================

    /// Current mastery state for (user, card), if the learner has one
    pub fn get_mastery(&self, user_id: &str, card_id: &str) -> Result<Option<MasteryState>> {
        let reader = self.reader.lock()
            .map_err(|_| StorageError::Init("Reader lock poisoned".into()))?;
        Self::load_mastery(&reader, user_id, card_id)
    }

    /// Score a review now
    pub fn submit_review(&self, user_id: &str, card_id: &str, quality: Quality) -> Result<ReviewReceipt> {
        self.submit_review_at(user_id, card_id, quality, Utc::now())
    }

    /// Score a review at `now`
    ///
    /// Fetch (or default), step, upsert, and log all happen in one
    /// transaction. A failed upsert leaves nothing behind. A failed log write
    /// is rolled back to a savepoint and reported through
    /// `ReviewReceipt::event_logged` without undoing the state change.
    pub fn submit_review_at(
        &self,
        user_id: &str,
        card_id: &str,
        quality: Quality,
        now: DateTime<Utc>,
    ) -> Result<ReviewReceipt> {
        Self::require_id(user_id, "userId")?;
        Self::require_id(card_id, "cardId")?;
        let now = Self::to_stored_precision(now);

        let mut writer = self.writer.lock()
            .map_err(|_| StorageError::Init("Writer lock poisoned".into()))?;
        let mut tx = writer.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if !Self::card_exists(&tx, card_id)? {
            return Err(StorageError::NotFound(card_id.to_string()));
        }

        let current = Self::load_mastery(&tx, user_id, card_id)?
            .unwrap_or_else(|| MasteryState::new_at(now));
        let mut outcome = step_at(&current, quality, now);
        // A saturated due date still carries nanoseconds
        outcome.next.due_at = Self::to_stored_precision(outcome.next.due_at);

        Self::upsert_mastery(&tx, user_id, card_id, &outcome.next, now)?;

        let event_logged = {
            let sp = tx.savepoint()?;
            let logged = sp
                .execute(
                    "INSERT INTO review_events (user_id, card_id, quality, reviewed_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![user_id, card_id, quality.value(), now.to_rfc3339()],
                )
                .and_then(|_| sp.commit());
            match logged {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(
                        user_id, card_id, error = %e,
                        "Review log write failed; mastery state kept"
                    );
                    false
                }
            }
        };

        tx.commit()?;

        tracing::debug!(
            user_id,
            card_id,
            quality = quality.value(),
            interval = outcome.new_interval,
            ease = outcome.next.ease,
            lapse = outcome.was_lapse,
            "Review scored"
        );

        Ok(ReviewReceipt {
            card_id: card_id.to_string(),
            next_review: outcome.next.due_at,
            new_interval: outcome.new_interval,
            was_lapse: outcome.was_lapse,
            ease: outcome.next.ease,
            reps: outcome.next.reps,
            lapses: outcome.next.lapses,
            event_logged,
        })
    }

    /// What each quality score would do, without saving anything
    pub fn preview_review(&self, user_id: &str, card_id: &str) -> Result<PreviewResults> {
        let reader = self.reader.lock()
            .map_err(|_| StorageError::Init("Reader lock poisoned".into()))?;
        if !Self::card_exists(&reader, card_id)? {
            return Err(StorageError::NotFound(card_id.to_string()));
        }
        let current = Self::load_mastery(&reader, user_id, card_id)?
            .unwrap_or_else(|| MasteryState::new_at(Utc::now()));
        Ok(preview(&current))
    }

    /// Review log for (user, card), newest first
    pub fn review_history(&self, user_id: &str, card_id: &str, limit: usize) -> Result<Vec<ReviewEvent>> {
        let reader = self.reader.lock()
            .map_err(|_| StorageError::Init("Reader lock poisoned".into()))?;
        let mut stmt = reader.prepare(
            "SELECT user_id, card_id, quality, reviewed_at FROM review_events
             WHERE user_id = ?1 AND card_id = ?2
             ORDER BY id DESC
             LIMIT ?3",
        )?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let events = stmt.query_map(params![user_id, card_id, limit], |row| Self::row_to_event(row))?;

        let mut result = Vec::new();
        for event in events {
            result.push(event?);
        }
        Ok(result)
    }

    // ========================================================================
    // DUE QUEUE
    // ========================================================================

    /// Cards in scope that are due for the learner, soonest first
    ///
    /// Cards without mastery state come first. Read-only.
    pub fn due_cards(&self, query: &DueQuery) -> Result<Vec<DueCard>> {
        let reader = self.reader.lock()
            .map_err(|_| StorageError::Init("Reader lock poisoned".into()))?;
        let mut stmt = reader.prepare(
            "SELECT c.id AS id, c.owner_id AS owner_id, c.deck_id AS deck_id,
                    c.front AS front, c.back AS back, c.created_at AS created_at,
                    m.interval_days AS interval_days, m.ease AS ease, m.reps AS reps,
                    m.lapses AS lapses, m.due_at_ms AS due_at_ms
             FROM cards c
             LEFT JOIN mastery_state m ON m.card_id = c.id AND m.user_id = ?1
             WHERE c.deck_id = ?2
               AND (m.due_at_ms IS NULL OR m.due_at_ms <= ?3)
             ORDER BY m.due_at_ms IS NOT NULL, m.due_at_ms ASC, c.rowid ASC
             LIMIT ?4",
        )?;

        let limit = i64::try_from(query.limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(
            params![query.user_id, query.scope_id, query.now.timestamp_millis(), limit],
            |row| {
                Ok(DueCard {
                    card: Self::row_to_card(row)?,
                    mastery: Self::row_to_optional_mastery(row)?,
                })
            },
        )?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    // ========================================================================
    // STATS
    // ========================================================================

    /// Summary of a learner's progress as of `now`
    pub fn get_stats(&self, user_id: &str, now: DateTime<Utc>) -> Result<MasteryStats> {
        let reader = self.reader.lock()
            .map_err(|_| StorageError::Init("Reader lock poisoned".into()))?;

        let (scheduled_cards, cards_due, cards_reviewed, total_lapses, average_ease) = reader.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(CASE WHEN due_at_ms <= ?2 THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN reps > 0 OR lapses > 0 THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(lapses), 0),
                    COALESCE(AVG(ease), 0.0)
             FROM mastery_state WHERE user_id = ?1",
            params![user_id, now.timestamp_millis()],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, f64>(4)?,
                ))
            },
        )?;

        let total_reviews: i64 = reader.query_row(
            "SELECT COUNT(*) FROM review_events WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;

        Ok(MasteryStats {
            scheduled_cards,
            cards_due,
            cards_reviewed,
            total_reviews,
            total_lapses,
            average_ease,
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================
