//! Journey: scheduling invariants hold through the store over long runs

use mastery_core::{step, MasteryState, Quality};
use mastery_e2e_tests::{TestDataFactory, TestDatabaseManager};

const MIN_EASE: f64 = 1.3;
const MAX_EASE: f64 = 2.8;

#[test]
fn test_fifty_perfect_reviews_cap_ease() {
    let mut db = TestDatabaseManager::new_temp();
    let deck = TestDataFactory::numbered_deck(&db, "alice", "derm", 1);
    let id = &deck.cards[0].id;

    for _ in 0..50 {
        let r = db.review("alice", id, 5);
        assert!((MIN_EASE..=MAX_EASE).contains(&r.ease));
        assert!(r.new_interval >= 1);
        // Stay realistic: review on the due date
        db.advance_days(i64::from(r.new_interval.min(3650)));
    }

    let state = db.storage.get_mastery("alice", id).unwrap().unwrap();
    assert!((state.ease - MAX_EASE).abs() < 1e-9);
    assert_eq!(state.reps, 50);
    assert_eq!(state.lapses, 0);
}

#[test]
fn test_fifty_blackouts_floor_ease() {
    let mut db = TestDatabaseManager::new_temp();
    let deck = TestDataFactory::numbered_deck(&db, "alice", "derm", 1);
    let id = &deck.cards[0].id;

    for n in 1..=50u32 {
        let r = db.review("alice", id, 0);
        assert!(r.was_lapse);
        assert_eq!(r.lapses, n);
        assert_eq!(r.reps, 0);
        assert_eq!(r.new_interval, 1);
        assert!((MIN_EASE..=MAX_EASE).contains(&r.ease));
        db.advance_days(1);
    }

    let state = db.storage.get_mastery("alice", id).unwrap().unwrap();
    assert!((state.ease - MIN_EASE).abs() < 1e-9);
}

#[test]
fn test_lapses_never_decrease_over_mixed_history() {
    let mut db = TestDatabaseManager::new_temp();
    let deck = TestDataFactory::numbered_deck(&db, "alice", "heme", 1);
    let id = &deck.cards[0].id;
    let pattern = [5u8, 4, 2, 3, 3, 0, 5, 1, 4, 4, 4, 2];

    let mut last_lapses = 0;
    let mut streak = 0;
    for &q in pattern.iter().cycle().take(60) {
        let r = db.review("alice", id, q);
        assert!(r.lapses >= last_lapses);
        if q < 3 {
            assert_eq!(r.lapses, last_lapses + 1);
            streak = 0;
        } else {
            streak += 1;
        }
        assert_eq!(r.reps, streak);
        last_lapses = r.lapses;
        db.advance_days(1);
    }

    let history = db.storage.review_history("alice", id, 100).unwrap();
    assert_eq!(history.len(), 60);
}

#[test]
fn test_store_matches_pure_step() {
    let mut db = TestDatabaseManager::new_temp();
    let deck = TestDataFactory::numbered_deck(&db, "alice", "micro", 1);
    let id = &deck.cards[0].id;
    let mut expected = MasteryState::new_at(db.now());

    for &q in &[4u8, 5, 3, 1, 4, 4, 5] {
        let outcome = step(&expected, Quality::new(q).unwrap());
        let r = db.review("alice", id, q);
        assert_eq!(r.new_interval, outcome.new_interval);
        assert_eq!(r.was_lapse, outcome.was_lapse);
        assert_eq!(r.reps, outcome.next.reps);
        assert_eq!(r.lapses, outcome.next.lapses);
        assert!((r.ease - outcome.next.ease).abs() < 1e-9);
        expected = outcome.next;
        db.advance_days(2);
    }
}
