//! SM-2 Core Formulas
//!
//! Pure arithmetic for the mastery update. Everything here is a function of
//! its arguments; state handling lives in `scheduler`.

// ============================================================================
// CONSTANTS
// ============================================================================

/// Ease assigned to a card that has never been reviewed
pub const DEFAULT_EASE: f64 = 2.5;

/// Lower bound for ease
pub const MIN_EASE: f64 = 1.3;

/// Upper bound for ease
pub const MAX_EASE: f64 = 2.8;

/// Ease penalty applied on a lapse
pub const LAPSE_EASE_PENALTY: f64 = 0.2;

/// Interval (days) for a new card, after a lapse, and after the first success
pub const INITIAL_INTERVAL_DAYS: u32 = 1;

/// Fixed interval (days) for the second consecutive success
pub const SECOND_INTERVAL_DAYS: u32 = 3;

/// Highest quality score
pub const MAX_QUALITY: u8 = 5;

/// Scores below this count as a lapse
pub const PASSING_QUALITY: u8 = 3;

// ============================================================================
// FORMULAS
// ============================================================================

/// Clamp an ease value into `[MIN_EASE, MAX_EASE]`
#[inline]
pub fn clamp_ease(ease: f64) -> f64 {
    ease.clamp(MIN_EASE, MAX_EASE)
}

/// Canonical SM-2 ease delta: `0.1 - (5 - q) * (0.08 + (5 - q) * 0.02)`
///
/// q=5 gives +0.10, q=4 gives 0.00, q=3 gives -0.14.
#[inline]
pub fn ease_delta(quality: u8) -> f64 {
    let miss = f64::from(MAX_QUALITY.saturating_sub(quality));
    0.1 - miss * (0.08 + miss * 0.02)
}

/// Ease after a successful recall
#[inline]
pub fn next_ease_on_success(ease: f64, quality: u8) -> f64 {
    clamp_ease(ease + ease_delta(quality))
}

/// Ease after a lapse: `max(1.3, ease - 0.2)`
#[inline]
pub fn next_ease_on_lapse(ease: f64) -> f64 {
    (ease - LAPSE_EASE_PENALTY).max(MIN_EASE)
}

/// Interval after a successful recall, given the streak *before* this review
///
/// `ease` is the pre-review ease; growth uses the factor the learner earned
/// up to now, not the one this review is about to produce.
pub fn next_interval_on_success(reps: u32, interval_days: u32, ease: f64) -> u32 {
    match reps {
        0 => INITIAL_INTERVAL_DAYS,
        1 => SECOND_INTERVAL_DAYS,
        _ => {
            // f64 -> u32 casts saturate, so absurd inputs cannot wrap
            let grown = (f64::from(interval_days) * ease).round() as u32;
            grown.max(INITIAL_INTERVAL_DAYS)
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
