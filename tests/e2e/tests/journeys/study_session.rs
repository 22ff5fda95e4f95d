//! Journey: a learner works through a lecture deck over several weeks

use chrono::Duration;
use mastery_core::{DueQuery, ReviewRequest};
use mastery_e2e_tests::{TestDataFactory, TestDatabaseManager};

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn test_perfect_first_review() {
    let db = TestDatabaseManager::new_temp();
    let deck = TestDataFactory::cardiology_deck(&db, "alice");
    let card = &deck.cards[0];

    let receipt = db.review("alice", &card.id, 5);
    assert_eq!(receipt.new_interval, 1);
    assert!(approx_eq(receipt.ease, 2.6));
    assert_eq!(receipt.reps, 1);
    assert_eq!(receipt.lapses, 0);
    assert!(!receipt.was_lapse);
    assert_eq!(receipt.next_review, db.now() + Duration::days(1));
}

#[test]
fn test_failed_first_review() {
    let db = TestDatabaseManager::new_temp();
    let deck = TestDataFactory::cardiology_deck(&db, "alice");

    let receipt = db.review("alice", &deck.cards[0].id, 2);
    assert_eq!(receipt.new_interval, 1);
    assert!(approx_eq(receipt.ease, 2.3));
    assert_eq!(receipt.reps, 0);
    assert_eq!(receipt.lapses, 1);
    assert!(receipt.was_lapse);
}

#[test]
fn test_multi_week_schedule() {
    let mut db = TestDatabaseManager::new_temp();
    let deck = TestDataFactory::cardiology_deck(&db, "alice");
    let card_id = deck.cards[1].id.clone();

    // Day 0: 1 day, day 1: 3 days, day 4: round(3 * 2.5) = 8 days
    assert_eq!(db.review("alice", &card_id, 4).new_interval, 1);
    db.advance_days(1);
    assert_eq!(db.review("alice", &card_id, 4).new_interval, 3);
    db.advance_days(3);
    let third = db.review("alice", &card_id, 4);
    assert_eq!(third.new_interval, 8);
    assert_eq!(third.next_review, db.now() + Duration::days(8));

    // Forgot it on day 12: back to the start
    db.advance_days(8);
    let lapse = db.review("alice", &card_id, 0);
    assert!(lapse.was_lapse);
    assert_eq!(lapse.new_interval, 1);
    assert_eq!(lapse.reps, 0);
    assert_eq!(lapse.lapses, 1);

    // Relearning restarts the 1, 3 ladder
    db.advance_days(1);
    assert_eq!(db.review("alice", &card_id, 3).new_interval, 1);
    db.advance_days(1);
    assert_eq!(db.review("alice", &card_id, 3).new_interval, 3);

    let history = db.storage.review_history("alice", &card_id, 50).unwrap();
    assert_eq!(history.len(), 6);
    assert_eq!(history[0].reviewed_at, db.now());
}

#[test]
fn test_state_survives_reopen() {
    let mut db = TestDatabaseManager::new_temp();
    let deck = TestDataFactory::cardiology_deck(&db, "alice");
    let card_id = deck.cards[2].id.clone();
    db.review("alice", &card_id, 5);
    db.advance_days(1);
    db.review("alice", &card_id, 5);

    let before = db.storage.get_mastery("alice", &card_id).unwrap();
    db.reopen();
    let after = db.storage.get_mastery("alice", &card_id).unwrap();
    assert_eq!(before, after);
    assert_eq!(after.unwrap().interval_days, 3);
}

#[test]
fn test_session_clears_the_due_queue() {
    let mut db = TestDatabaseManager::new_temp();
    let deck = TestDataFactory::cardiology_deck(&db, "alice");
    let due_now = |db: &TestDatabaseManager| {
        db.storage
            .due_cards(&DueQuery::new("alice", &deck.deck_id, 50).at(db.now()))
            .unwrap()
            .len()
    };

    assert_eq!(due_now(&db), deck.cards.len());

    TestDataFactory::review_all(&db, "alice", &deck, 4);
    assert_eq!(due_now(&db), 0);

    db.advance_days(1);
    assert_eq!(due_now(&db), deck.cards.len());
}

#[test]
fn test_wire_request_validation() {
    let db = TestDatabaseManager::new_temp();
    let deck = TestDataFactory::cardiology_deck(&db, "alice");
    let card_id = &deck.cards[0].id;

    let ok: ReviewRequest =
        serde_json::from_value(serde_json::json!({ "cardId": card_id, "quality": 3.6 })).unwrap();
    let quality = ok.quality().unwrap();
    assert_eq!(quality.value(), 4);
    let receipt = db.storage.submit_review_at("alice", &ok.card_id, quality, db.now()).unwrap();

    let wire = serde_json::to_value(&receipt).unwrap();
    assert_eq!(wire["newInterval"], 1);
    assert_eq!(wire["wasLapse"], false);
    assert!(wire["nextReview"].is_string());
    assert!(wire["ease"].is_number());

    for bad in [
        serde_json::json!({ "cardId": card_id }),
        serde_json::json!({ "cardId": card_id, "quality": "four" }),
        serde_json::json!({ "cardId": card_id, "quality": 11 }),
    ] {
        let req: ReviewRequest = serde_json::from_value(bad).unwrap();
        assert!(req.quality().is_err());
    }
}
