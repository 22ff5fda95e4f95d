//! Journey: the due queue as seen by several learners sharing a deck

use std::collections::HashMap;

use chrono::Duration;
use mastery_core::{select_due, DueQuery, MasteryState};
use mastery_e2e_tests::{TestDataFactory, TestDatabaseManager};

#[test]
fn test_new_and_overdue_included_future_excluded() {
    let mut db = TestDatabaseManager::new_temp();
    // Owned by an instructor, so the learner has no state on any of them yet
    let deck = TestDataFactory::numbered_deck(&db, "instructor", "renal-vignettes", 3);
    let (a, b, c) = (&deck.cards[0], &deck.cards[1], &deck.cards[2]);

    // B: reviewed two days ago -> due yesterday
    db.review("learner", &b.id, 4);
    db.advance_days(1);
    // C: reviewed today -> due tomorrow
    db.advance_days(1);
    db.review("learner", &c.id, 4);

    let due = db
        .storage
        .due_cards(&DueQuery::new("learner", &deck.deck_id, 10).at(db.now()))
        .unwrap();
    let ids: Vec<&str> = due.iter().map(|d| d.card.id.as_str()).collect();
    assert_eq!(ids, vec![a.id.as_str(), b.id.as_str()]);
    assert!(due[0].mastery.is_none());
    assert_eq!(
        due[1].mastery.as_ref().unwrap().due_at,
        db.now() - Duration::days(1)
    );
}

#[test]
fn test_store_agrees_with_pure_selector() {
    let mut db = TestDatabaseManager::new_temp();
    let deck = TestDataFactory::numbered_deck(&db, "instructor", "pharm", 8);

    // Stagger the learner's history across the deck
    for (i, card) in deck.cards.iter().enumerate() {
        match i % 4 {
            0 => {}
            1 => {
                db.review("learner", &card.id, 5);
            }
            2 => {
                db.review("learner", &card.id, 1);
            }
            _ => {
                db.review("learner", &card.id, 4);
                db.review("learner", &card.id, 4);
            }
        }
        db.advance_days(1);
    }

    let now = db.now();
    let states: HashMap<String, MasteryState> = deck
        .cards
        .iter()
        .filter_map(|c| {
            db.storage
                .get_mastery("learner", &c.id)
                .unwrap()
                .map(|s| (c.id.clone(), s))
        })
        .collect();

    for limit in [1, 3, 20] {
        let expected = select_due(
            deck.cards.iter().map(|c| (c.id.clone(), states.get(&c.id))),
            now,
            limit,
        );
        let actual: Vec<String> = db
            .storage
            .due_cards(&DueQuery::new("learner", &deck.deck_id, limit).at(now))
            .unwrap()
            .into_iter()
            .map(|d| d.card.id)
            .collect();
        assert_eq!(actual, expected, "limit {limit}");
    }
}

#[test]
fn test_learners_are_independent() {
    let db = TestDatabaseManager::new_temp();
    let deck = TestDataFactory::cardiology_deck(&db, "alice");
    TestDataFactory::review_all(&db, "alice", &deck, 5);

    let alice_due = db
        .storage
        .due_cards(&DueQuery::new("alice", &deck.deck_id, 50).at(db.now()))
        .unwrap();
    let bob_due = db
        .storage
        .due_cards(&DueQuery::new("bob", &deck.deck_id, 50).at(db.now()))
        .unwrap();

    assert!(alice_due.is_empty());
    assert_eq!(bob_due.len(), deck.cards.len());
    assert!(bob_due.iter().all(|d| d.mastery.is_none()));
    assert_eq!(db.scheduled_count("bob"), 0);
    assert_eq!(db.scheduled_count("alice"), deck.cards.len() as i64);
}

#[test]
fn test_limit_prefers_most_overdue() {
    let mut db = TestDatabaseManager::new_temp();
    let deck = TestDataFactory::numbered_deck(&db, "learner", "neuro", 4);
    let ids = deck.ids();

    // Reverse order so the last card ends up the most overdue
    for id in ids.iter().rev() {
        db.review("learner", id, 3);
        db.advance_days(1);
    }
    db.advance_days(5);

    let due = db
        .storage
        .due_cards(&DueQuery::new("learner", &deck.deck_id, 2).at(db.now()))
        .unwrap();
    let got: Vec<&str> = due.iter().map(|d| d.card.id.as_str()).collect();
    assert_eq!(got, vec![ids[3].as_str(), ids[2].as_str()]);
}
