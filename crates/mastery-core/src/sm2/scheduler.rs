//! SM-2 Scheduler
//!
//! Mastery state model and the transition function that advances it.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::algorithm::{
    next_ease_on_lapse, next_ease_on_success, next_interval_on_success, DEFAULT_EASE,
    INITIAL_INTERVAL_DAYS, MAX_EASE, MAX_QUALITY, MIN_EASE, PASSING_QUALITY,
};

// ============================================================================
// QUALITY
// ============================================================================

/// Why a raw quality score was rejected
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QualityError {
    /// No score supplied
    #[error("quality is required")]
    Missing,
    /// Score is not a finite number
    #[error("quality must be numeric, got '{0}'")]
    NotNumeric(String),
    /// Score rounds to something outside 0..=5
    #[error("quality must be between 0 and 5, got {0}")]
    OutOfRange(f64),
}

/// Self-assessed recall quality, 0 (blackout) to 5 (effortless)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "u8")]
pub struct Quality(u8);

impl Quality {
    /// All quality scores, lowest first
    pub const ALL: [Quality; 6] = [
        Quality(0),
        Quality(1),
        Quality(2),
        Quality(3),
        Quality(4),
        Quality(5),
    ];

    /// Strict constructor for integer scores
    pub fn new(value: u8) -> Result<Self, QualityError> {
        if value > MAX_QUALITY {
            return Err(QualityError::OutOfRange(f64::from(value)));
        }
        Ok(Self(value))
    }

    /// Boundary validation for scores arriving from clients
    ///
    /// Rounds to the nearest integer (half away from zero), then rejects
    /// anything outside 0..=5.
    pub fn from_score(score: f64) -> Result<Self, QualityError> {
        if !score.is_finite() {
            return Err(QualityError::NotNumeric(score.to_string()));
        }
        let rounded = score.round();
        if !(0.0..=f64::from(MAX_QUALITY)).contains(&rounded) {
            return Err(QualityError::OutOfRange(score));
        }
        Ok(Self(rounded as u8))
    }

    /// Total conversion: round, then clamp into 0..=5
    ///
    /// NaN maps to 0.
    pub fn saturating(score: f64) -> Self {
        if score.is_nan() {
            return Self(0);
        }
        Self(score.round().clamp(0.0, f64::from(MAX_QUALITY)) as u8)
    }

    /// Numeric value
    pub fn value(self) -> u8 {
        self.0
    }

    /// Scores below 3 are failed recalls
    pub fn is_lapse(self) -> bool {
        self.0 < PASSING_QUALITY
    }
}

impl TryFrom<f64> for Quality {
    type Error = QualityError;

    fn try_from(score: f64) -> Result<Self, Self::Error> {
        Self::from_score(score)
    }
}

impl From<Quality> for u8 {
    fn from(q: Quality) -> Self {
        q.0
    }
}

impl std::str::FromStr for Quality {
    type Err = QualityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(QualityError::Missing);
        }
        let score: f64 = trimmed
            .parse()
            .map_err(|_| QualityError::NotNumeric(trimmed.to_string()))?;
        Self::from_score(score)
    }
}

impl std::fmt::Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// MASTERY STATE
// ============================================================================

/// Scheduling state for one (user, card) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasteryState {
    /// Days until the next review after a successful recall (>= 1)
    pub interval_days: u32,
    /// Interval growth factor, always within [1.3, 2.8]
    pub ease: f64,
    /// Consecutive successful reviews since the last lapse
    pub reps: u32,
    /// Lifetime failed reviews
    pub lapses: u32,
    /// Earliest instant the card is eligible for review
    pub due_at: DateTime<Utc>,
}

impl MasteryState {
    /// The single default-state factory
    ///
    /// Card creation and first review both go through here so the two paths
    /// cannot drift apart.
    pub fn new_at(now: DateTime<Utc>) -> Self {
        Self {
            interval_days: INITIAL_INTERVAL_DAYS,
            ease: DEFAULT_EASE,
            reps: 0,
            lapses: 0,
            due_at: now,
        }
    }

    /// Whether the card may be shown at `now`
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.due_at <= now
    }

    /// Whether the stored values respect the scheduling invariants
    pub fn is_valid(&self) -> bool {
        self.interval_days >= INITIAL_INTERVAL_DAYS
            && self.ease.is_finite()
            && (MIN_EASE..=MAX_EASE).contains(&self.ease)
    }
}

// ============================================================================
// TRANSITION
// ============================================================================

/// Result of scoring one review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepOutcome {
    /// Updated state
    pub next: MasteryState,
    /// Same as `next.interval_days`
    pub new_interval: u32,
    /// True when this review counted as a failure
    pub was_lapse: bool,
}

/// Advance `state` by one review of the given quality
///
/// Pure and total. `next.due_at` is carried over from `state`; callers derive
/// the new due date from `new_interval`, or use [`step_at`].
pub fn step(state: &MasteryState, quality: Quality) -> StepOutcome {
    debug_assert!(state.is_valid(), "step called with invalid state: {state:?}");

    let q = quality.value();
    let next = if quality.is_lapse() {
        MasteryState {
            interval_days: INITIAL_INTERVAL_DAYS,
            ease: next_ease_on_lapse(state.ease),
            reps: 0,
            lapses: state.lapses.saturating_add(1),
            due_at: state.due_at,
        }
    } else {
        MasteryState {
            interval_days: next_interval_on_success(state.reps, state.interval_days, state.ease),
            ease: next_ease_on_success(state.ease, q),
            reps: state.reps.saturating_add(1),
            lapses: state.lapses,
            due_at: state.due_at,
        }
    };

    StepOutcome {
        new_interval: next.interval_days,
        was_lapse: quality.is_lapse(),
        next,
    }
}

/// [`step`], then stamp `due_at = now + new_interval days`
pub fn step_at(state: &MasteryState, quality: Quality, now: DateTime<Utc>) -> StepOutcome {
    let mut outcome = step(state, quality);
    outcome.next.due_at = due_after(now, outcome.new_interval);
    outcome
}

/// `now` plus a whole number of days
pub fn due_after(now: DateTime<Utc>, interval_days: u32) -> DateTime<Utc> {
    now.checked_add_signed(Duration::days(i64::from(interval_days)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

// ============================================================================
// PREVIEW
// ============================================================================

/// What a single quality score would do to the current state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewEntry {
    pub quality: Quality,
    pub new_interval: u32,
    pub ease: f64,
    pub was_lapse: bool,
}

/// Outcomes for every quality score, lowest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResults {
    pub entries: Vec<PreviewEntry>,
}

impl PreviewResults {
    /// Entry for one quality score
    pub fn get(&self, quality: Quality) -> Option<&PreviewEntry> {
        self.entries.iter().find(|e| e.quality == quality)
    }
}

/// Preview all six possible outcomes without committing any
pub fn preview(state: &MasteryState) -> PreviewResults {
    let entries = Quality::ALL
        .iter()
        .map(|&quality| {
            let outcome = step(state, quality);
            PreviewEntry {
                quality,
                new_interval: outcome.new_interval,
                ease: outcome.next.ease,
                was_lapse: outcome.was_lapse,
            }
        })
        .collect();
    PreviewResults { entries }
}

// ============================================================================
// TESTS
// ============================================================================
