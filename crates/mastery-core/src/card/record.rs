//! Card records - what the store reads and writes
//!
//! Each study card has:
//! - Front/back content and the deck (collection scope) it belongs to
//! - One mastery state per learner who has studied it
//! - An append-only review log

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::sm2::{MasteryState, Quality, QualityError};

// ============================================================================
// CARD
// ============================================================================

/// A study card
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    /// Unique identifier (UUID v4)
    pub id: String,
    /// User who created the card
    pub owner_id: String,
    /// Deck the card belongs to (lecture deck, vignette set, ...)
    pub deck_id: String,
    /// Prompt side
    pub front: String,
    /// Answer side
    pub back: String,
    /// When the card was created
    pub created_at: DateTime<Utc>,
}

/// Input for creating a new card
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardInput {
    pub owner_id: String,
    pub deck_id: String,
    pub front: String,
    pub back: String,
}

// ============================================================================
// REVIEW LOG
// ============================================================================

/// One scored review, as written to the log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewEvent {
    pub user_id: String,
    pub card_id: String,
    pub quality: Quality,
    pub reviewed_at: DateTime<Utc>,
}

/// Review submission as it arrives from a client
///
/// `quality` stays untyped until [`ReviewRequest::quality`] validates it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    pub card_id: String,
    #[serde(default)]
    pub quality: Option<Value>,
}

impl ReviewRequest {
    /// Validate the raw quality: must be present, a JSON number, and round into 0..=5
    pub fn quality(&self) -> Result<Quality, QualityError> {
        match &self.quality {
            None | Some(Value::Null) => Err(QualityError::Missing),
            Some(Value::Number(n)) => {
                let score = n
                    .as_f64()
                    .ok_or_else(|| QualityError::NotNumeric(n.to_string()))?;
                Quality::from_score(score)
            }
            Some(other) => Err(QualityError::NotNumeric(other.to_string())),
        }
    }
}

/// What a learner sees after submitting a review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewReceipt {
    pub card_id: String,
    /// When the card is next due
    pub next_review: DateTime<Utc>,
    pub new_interval: u32,
    pub was_lapse: bool,
    pub ease: f64,
    pub reps: u32,
    pub lapses: u32,
    /// False when the state was saved but the review log write failed
    pub event_logged: bool,
}

// ============================================================================
// DUE QUERY
// ============================================================================

/// Due-card query parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DueQuery {
    pub user_id: String,
    /// Deck to draw from
    pub scope_id: String,
    /// Cutoff instant; cards due at or before this are returned
    pub now: DateTime<Utc>,
    pub limit: usize,
}

impl DueQuery {
    /// Query as of the current time
    pub fn new(user_id: impl Into<String>, scope_id: impl Into<String>, limit: usize) -> Self {
        Self {
            user_id: user_id.into(),
            scope_id: scope_id.into(),
            now: Utc::now(),
            limit,
        }
    }

    /// Override the cutoff instant
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }
}

/// A due card with the learner's state, if any
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DueCard {
    pub card: Card,
    /// None when the learner has never been scheduled on this card
    pub mastery: Option<MasteryState>,
}

// ============================================================================
// STATS
// ============================================================================

/// Per-learner summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasteryStats {
    /// Cards the learner has state for (never-reviewed cards from other owners are not counted)
    pub scheduled_cards: i64,
    /// Of those, how many are due now
    pub cards_due: i64,
    /// Cards reviewed at least once
    pub cards_reviewed: i64,
    pub total_reviews: i64,
    pub total_lapses: i64,
    /// Mean ease over all scheduled cards (0 when there are none)
    pub average_ease: f64,
}
