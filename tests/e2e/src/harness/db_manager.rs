//! Test Database Manager
//!
//! Provides isolated database instances for testing:
//! - Temporary databases that are automatically cleaned up
//! - A fixed clock so due dates are reproducible
//! - Re-opening the same file to check persistence

use chrono::{DateTime, Duration, TimeZone, Utc};
use mastery_core::{Card, CardInput, Quality, ReviewReceipt, Storage};
use std::path::PathBuf;
use tempfile::TempDir;

/// Manager for test databases
///
/// Creates isolated database instances for each test to prevent interference.
/// Automatically cleans up temporary databases when dropped.
///
/// # Example
///
/// ```rust,ignore
/// let mut db = TestDatabaseManager::new_temp();
/// let card = db.add_card("alice", "cardio", "Cause of S3 gallop?");
/// db.review("alice", &card.id, 4);
/// db.advance_days(3);
/// ```
pub struct TestDatabaseManager {
    /// The storage instance
    pub storage: Storage,
    /// Temporary directory (kept alive to prevent premature deletion)
    _temp_dir: Option<TempDir>,
    /// Path to the database file
    db_path: PathBuf,
    /// Simulated current time
    now: DateTime<Utc>,
}

impl TestDatabaseManager {
    /// Create a new test database in a temporary directory
    ///
    /// The database is automatically deleted when the manager is dropped.
    pub fn new_temp() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test_mastery.db");

        let storage = Storage::new(Some(db_path.clone())).expect("Failed to create test storage");

        Self {
            storage,
            _temp_dir: Some(temp_dir),
            db_path,
            now: Self::epoch(),
        }
    }

    /// Fixed starting instant for every test database
    pub fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 5, 8, 0, 0).unwrap()
    }

    /// Get the database path
    pub fn path(&self) -> &PathBuf {
        &self.db_path
    }

    /// Current simulated time
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Move the simulated clock forward
    pub fn advance_days(&mut self, days: i64) {
        self.now += Duration::days(days);
    }

    /// Close and re-open the store on the same file
    pub fn reopen(&mut self) {
        self.storage = Storage::new(Some(self.db_path.clone())).expect("Failed to reopen storage");
    }

    /// Add a card at the simulated time
    pub fn add_card(&self, owner: &str, deck: &str, front: &str) -> Card {
        self.storage
            .create_card_at(
                CardInput {
                    owner_id: owner.to_string(),
                    deck_id: deck.to_string(),
                    front: front.to_string(),
                    back: format!("answer to {}", front),
                },
                self.now,
            )
            .expect("Failed to create card")
    }

    /// Score a review at the simulated time
    pub fn review(&self, user: &str, card_id: &str, quality: u8) -> ReviewReceipt {
        let quality = Quality::new(quality).expect("Invalid quality in test");
        self.storage
            .submit_review_at(user, card_id, quality, self.now)
            .expect("Failed to submit review")
    }

    /// Number of scheduled cards for a learner
    pub fn scheduled_count(&self, user: &str) -> i64 {
        self.storage
            .get_stats(user, self.now)
            .map(|s| s.scheduled_cards)
            .unwrap_or(0)
    }
}
