use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{
    errors::DuplicateRuleId,
    ledger::{Ledger, RecurringRule, RuleId},
};

/// Whole application state: the household ledger plus the recurring rule
/// catalog. Owned by the application root and shared with collaborators.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "StateRecord")]
pub struct AppState {
    #[serde(default)]
    pub ledger: Ledger,
    #[serde(default)]
    pub recurring: Vec<RecurringRule>,
}

impl AppState {
    pub fn new(ledger: Ledger) -> Self {
        Self {
            ledger,
            recurring: Vec::new(),
        }
    }

    pub fn rule(&self, id: RuleId) -> Option<&RecurringRule> {
        self.recurring.iter().find(|rule| rule.id() == id)
    }

    pub(crate) fn rule_index(&self, id: RuleId) -> Option<usize> {
        self.recurring.iter().position(|rule| rule.id() == id)
    }

    /// Describes rules whose payer no longer exists in the ledger.
    pub fn warnings(&self) -> Vec<String> {
        self.recurring
            .iter()
            .filter(|rule| !rule.payer_id().is_common() && !self.ledger.has_person(rule.payer_id()))
            .map(|rule| {
                format!(
                    "recurring rule {} references unknown payer {}",
                    rule.id(),
                    rule.payer_id()
                )
            })
            .collect()
    }
}

/// Persisted shape of [`AppState`]; rule ids are checked for uniqueness on load.
#[derive(Deserialize)]
struct StateRecord {
    #[serde(default)]
    ledger: Ledger,
    #[serde(default)]
    recurring: Vec<RecurringRule>,
}

impl TryFrom<StateRecord> for AppState {
    type Error = DuplicateRuleId;

    fn try_from(record: StateRecord) -> Result<Self, Self::Error> {
        let mut seen = HashSet::with_capacity(record.recurring.len());
        if let Some(rule) = record.recurring.iter().find(|rule| !seen.insert(rule.id())) {
            return Err(DuplicateRuleId(rule.id()));
        }
        Ok(Self {
            ledger: record.ledger,
            recurring: record.recurring,
        })
    }
}
