//! # Mastery Core
//!
//! Spaced-repetition scheduling for medical study decks.
//!
//! - **SM-2 Scheduler**: pure `(state, quality) -> next state` transition
//! - **Mastery State**: interval, ease, streak and lapse count per (user, card)
//! - **Due Queue**: never-seen and overdue cards, soonest first
//! - **Review Log**: append-only record of every scored review
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use mastery_core::{CardInput, DueQuery, Quality, Storage};
//!
//! // Create storage (uses default platform-specific location)
//! let storage = Storage::new(None)?;
//!
//! // Add a card; its owner is scheduled immediately
//! let card = storage.create_card(CardInput {
//!     owner_id: "u-42".to_string(),
//!     deck_id: "cardiology-lecture-3".to_string(),
//!     front: "First-line therapy for stable angina?".to_string(),
//!     back: "Beta blocker".to_string(),
//! })?;
//!
//! // Score a review
//! let receipt = storage.submit_review("u-42", &card.id, Quality::new(4)?)?;
//!
//! // What's due next
//! let due = storage.due_cards(&DueQuery::new("u-42", "cardiology-lecture-3", 20))?;
//! ```
//!
//! ## Feature Flags
//!
//! - `bundled-sqlite` (default): Compile SQLite in
//! - `encryption`: SQLCipher, keyed from `MASTERY_ENCRYPTION_KEY`

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULES
// ============================================================================

pub mod card;
pub mod sm2;
pub mod storage;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================

// Card records
pub use card::{
    Card, CardInput, DueCard, DueQuery, MasteryStats, ReviewEvent, ReviewReceipt, ReviewRequest,
};

// SM-2 algorithm
pub use sm2::{
    is_due, preview, select_due, step, step_at, MasteryState, PreviewEntry, PreviewResults,
    Quality, QualityError, StepOutcome,
};

// Storage layer
pub use storage::{default_db_path, Result, Storage, StorageError};

// ============================================================================
// VERSION INFO
// ============================================================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// PRELUDE
// ============================================================================

/// Convenient imports for common usage
pub mod prelude {
    pub use crate::{
        Card, CardInput, DueCard, DueQuery, MasteryState, Quality, Result, ReviewReceipt, Storage,
        StorageError,
    };
}
