//! Card module - records exchanged with the store
//!
//! Cards, review log entries, due-card queries and learner stats.

mod record;

pub use record::{
    Card, CardInput, DueCard, DueQuery, MasteryStats, ReviewEvent, ReviewReceipt, ReviewRequest,
};
