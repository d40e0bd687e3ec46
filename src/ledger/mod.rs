//! Ledger domain models, persistence-friendly types, and helpers.

pub mod frequency;
#[allow(clippy::module_inception)]
pub mod ledger;
pub mod person;
pub mod recurring;
pub mod summary;
pub mod transaction;

pub use frequency::Frequency;
pub use ledger::{Ledger, PersonLedger};
pub use person::{Person, PersonId};
pub use recurring::{compute_next_occurrence, RecurringRule, RuleDraft, RuleId, RuleKind};
pub use summary::{summarize, PersonSummary};
pub use transaction::{CommonExpense, ExpenseRecord, GeneratedTransaction, IncomeRecord, Transfer};
