//! End-to-end test support for the mastery store
//!
//! - `harness`: isolated temporary databases
//! - `mocks`: deck and learner fixtures

pub mod harness;
pub mod mocks;

pub use harness::TestDatabaseManager;
pub use mocks::{DeckFixture, TestDataFactory};
