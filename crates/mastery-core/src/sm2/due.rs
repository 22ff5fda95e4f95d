//! Due-set selection
//!
//! In-memory form of the due-card query. `Storage::due_cards` runs the same
//! rule in SQL; the two must agree.

use chrono::{DateTime, Utc};

use super::scheduler::MasteryState;

/// A card is due when it has never been scheduled or its due date has passed
#[inline]
pub fn is_due(state: Option<&MasteryState>, now: DateTime<Utc>) -> bool {
    state.is_none_or(|s| s.is_due(now))
}

/// Select due entries, soonest first, at most `limit`
///
/// Entries without state sort ahead of everything else. Ties keep their input
/// order.
pub fn select_due<'a, K>(
    entries: impl IntoIterator<Item = (K, Option<&'a MasteryState>)>,
    now: DateTime<Utc>,
    limit: usize,
) -> Vec<K> {
    let mut due: Vec<(K, Option<DateTime<Utc>>)> = entries
        .into_iter()
        .filter(|(_, state)| is_due(*state, now))
        .map(|(key, state)| (key, state.map(|s| s.due_at)))
        .collect();

    // None < Some(_), so unscheduled cards lead
    due.sort_by_key(|(_, due_at)| *due_at);
    due.truncate(limit);
    due.into_iter().map(|(key, _)| key).collect()
}
