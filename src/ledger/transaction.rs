use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::PersonId;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IncomeRecord {
    pub id: Uuid,
    pub description: String,
    pub amount: f64,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring_rule_id: Option<Uuid>,
}

impl IncomeRecord {
    pub fn new(description: impl Into<String>, amount: f64, date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            description: description.into(),
            amount,
            date,
            recurring_rule_id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExpenseRecord {
    pub id: Uuid,
    pub description: String,
    pub amount: f64,
    pub category: String,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring_rule_id: Option<Uuid>,
}

impl ExpenseRecord {
    pub fn new(
        description: impl Into<String>,
        amount: f64,
        category: impl Into<String>,
        date: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            description: description.into(),
            amount,
            category: category.into(),
            date,
            recurring_rule_id: None,
        }
    }
}

/// An expense shared by several people. An empty participant list splits it
/// across everyone in the ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommonExpense {
    pub id: Uuid,
    pub description: String,
    pub amount: f64,
    pub category: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub participants: Vec<PersonId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring_rule_id: Option<Uuid>,
}

impl From<ExpenseRecord> for CommonExpense {
    fn from(record: ExpenseRecord) -> Self {
        Self {
            id: record.id,
            description: record.description,
            amount: record.amount,
            category: record.category,
            date: record.date,
            participants: Vec::new(),
            recurring_rule_id: record.recurring_rule_id,
        }
    }
}

/// Money moved from one person to another.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transfer {
    pub id: Uuid,
    pub from: PersonId,
    pub to: PersonId,
    pub amount: f64,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// A ledger record produced by applying a recurring rule.
#[derive(Debug, Clone, PartialEq)]
pub enum GeneratedTransaction {
    Income(IncomeRecord),
    Expense(ExpenseRecord),
}

impl GeneratedTransaction {
    pub fn amount(&self) -> f64 {
        match self {
            GeneratedTransaction::Income(record) => record.amount,
            GeneratedTransaction::Expense(record) => record.amount,
        }
    }
}
