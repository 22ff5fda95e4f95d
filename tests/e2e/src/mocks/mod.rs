//! Test fixtures


pub use fixtures::{DeckFixture, TestDataFactory};
