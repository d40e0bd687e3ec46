use std::fmt;

use thiserror::Error;
use uuid::Uuid;

use crate::ledger::PersonId;

/// Unified error type for the ledger, storage and configuration layers.
#[derive(Debug, Error)]
pub enum FinanceError {
    #[error("Persistence error: {0}")]
    StorageError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    UnresolvedPayer(#[from] UnresolvedPayer),
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

pub type Result<T> = std::result::Result<T, FinanceError>;

impl From<std::io::Error> for FinanceError {
    fn from(err: std::io::Error) -> Self {
        FinanceError::StorageError(err.to_string())
    }
}

impl From<serde_json::Error> for FinanceError {
    fn from(err: serde_json::Error) -> Self {
        FinanceError::StorageError(err.to_string())
    }
}

/// Recurring rule fields that can fail validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleField {
    Description,
    Amount,
    PayerId,
    Category,
    Frequency,
    AnchorDate,
}

impl fmt::Display for RuleField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RuleField::Description => "description",
            RuleField::Amount => "amount",
            RuleField::PayerId => "payerId",
            RuleField::Category => "category",
            RuleField::Frequency => "frequency",
            RuleField::AnchorDate => "anchorDate",
        };
        f.write_str(label)
    }
}

/// A rejected rule draft, naming the first field that failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {field}: {reason}")]
pub struct ValidationError {
    pub field: RuleField,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: RuleField, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// The ledger has no person with the referenced id.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("payer `{0}` does not exist")]
pub struct UnresolvedPayer(pub PersonId);

/// A loaded catalog lists the same rule id more than once.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("recurring rule id {0} appears more than once")]
pub struct DuplicateRuleId(pub Uuid);

/// Failures reported by recurrence scheduler operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    #[error("Recurring rule not found: {0}")]
    NotFound(Uuid),
    #[error("Recurring rule is inactive: {0}")]
    Inactive(Uuid),
    #[error(transparent)]
    UnresolvedPayer(#[from] UnresolvedPayer),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}
