//! SM-2 Mastery Scheduler
//!
//! SuperMemo-2 derived scheduling for study cards. Each (user, card) pair
//! carries a [`MasteryState`]; every review feeds a 0-5 [`Quality`] score
//! through [`step`] to produce the next state.
//!
//! ## Core Rules:
//! - Lapse (q < 3): reps reset, interval back to 1 day, ease - 0.2 (floor 1.3)
//! - Success: interval 1, then 3, then round(interval * ease)
//! - Ease update: EF' = EF + (0.1 - (5-q) * (0.08 + (5-q) * 0.02)), clamped to [1.3, 2.8]

mod algorithm;
mod due;
mod scheduler;

pub use algorithm::{
    clamp_ease,
    ease_delta,
    next_ease_on_lapse,
    next_ease_on_success,
    next_interval_on_success,
    // Constants
    DEFAULT_EASE,
    INITIAL_INTERVAL_DAYS,
    LAPSE_EASE_PENALTY,
    MAX_EASE,
    MAX_QUALITY,
    MIN_EASE,
    PASSING_QUALITY,
    SECOND_INTERVAL_DAYS,
};

pub use due::{is_due, select_due};

pub use scheduler::{
    due_after, preview, step, step_at, MasteryState, PreviewEntry, PreviewResults, Quality,
    QualityError, StepOutcome,
};
