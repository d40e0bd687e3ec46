#![doc(test(attr(deny(warnings))))]

//! Shared Finance keeps an offline household ledger of incomes, expenses,
//! shared expenses and transfers, and applies recurring transaction rules to it.

pub mod config;
pub mod errors;
pub mod ledger;
pub mod scheduler;
pub mod state;
pub mod storage;
pub mod time;
pub mod utils;

pub use errors::{FinanceError, Result};
pub use scheduler::{AppliedOccurrence, RecurrenceScheduler, SweepTimer};
pub use state::AppState;

/// Initializes global tracing with the default directive.
pub fn init() {
    utils::init_tracing();
}

/// Initializes global tracing with `directive` (usually `Config::log_filter`).
/// Only the first call in a process installs a subscriber.
pub fn init_with(directive: &str) {
    utils::init_tracing_with(directive);
}
