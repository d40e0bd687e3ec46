//! Recurring transaction rules and their occurrence arithmetic.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ExpenseRecord, Frequency, GeneratedTransaction, IncomeRecord, PersonId};
use crate::errors::{RuleField, ValidationError};

pub type RuleId = Uuid;

/// Whether a rule produces income or expenses. Only expenses carry a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleKind {
    Expense { category: String },
    Income,
}

impl RuleKind {
    pub fn expense(category: impl Into<String>) -> Self {
        RuleKind::Expense {
            category: category.into(),
        }
    }
}

/// User input for a new recurring rule, validated by [`RuleDraft::validate`].
#[derive(Debug, Clone, PartialEq)]
pub struct RuleDraft {
    pub kind: RuleKind,
    pub payer_id: PersonId,
    pub description: String,
    pub amount: f64,
    pub frequency: Frequency,
    pub anchor_date: NaiveDate,
    pub auto_apply: bool,
}

impl RuleDraft {
    pub fn expense(
        payer_id: impl Into<PersonId>,
        description: impl Into<String>,
        amount: f64,
        category: impl Into<String>,
        frequency: Frequency,
        anchor_date: NaiveDate,
    ) -> Self {
        Self {
            kind: RuleKind::expense(category),
            payer_id: payer_id.into(),
            description: description.into(),
            amount,
            frequency,
            anchor_date,
            auto_apply: true,
        }
    }

    pub fn income(
        payer_id: impl Into<PersonId>,
        description: impl Into<String>,
        amount: f64,
        frequency: Frequency,
        anchor_date: NaiveDate,
    ) -> Self {
        Self {
            kind: RuleKind::Income,
            payer_id: payer_id.into(),
            description: description.into(),
            amount,
            frequency,
            anchor_date,
            auto_apply: true,
        }
    }

    /// Marks the draft as manual-only: the sweep will never apply it.
    pub fn manual(mut self) -> Self {
        self.auto_apply = false;
        self
    }

    /// Parses a `YYYY-MM-DD` anchor date as entered in a form.
    pub fn parse_anchor_date(value: &str) -> Result<NaiveDate, ValidationError> {
        NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|err| {
            ValidationError::new(
                RuleField::AnchorDate,
                format!("`{}` is not a calendar date: {}", value, err),
            )
        })
    }

    /// Checks every field, reporting the first one that fails.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_fields(&self.description, self.amount, &self.payer_id, &self.kind)
    }

    pub(crate) fn into_rule(self, id: RuleId) -> Result<RecurringRule, ValidationError> {
        self.validate()?;
        Ok(RecurringRule {
            id,
            kind: self.kind,
            payer_id: self.payer_id,
            description: self.description.trim().to_string(),
            amount: self.amount,
            frequency: self.frequency,
            anchor_date: self.anchor_date,
            last_applied_at: None,
            auto_apply: self.auto_apply,
            active: true,
        })
    }
}

fn validate_fields(
    description: &str,
    amount: f64,
    payer_id: &PersonId,
    kind: &RuleKind,
) -> Result<(), ValidationError> {
    if description.trim().is_empty() {
        return Err(ValidationError::new(RuleField::Description, "is required"));
    }
    if !amount.is_finite() || amount <= 0.0 {
        return Err(ValidationError::new(
            RuleField::Amount,
            format!("must be a positive number, got {}", amount),
        ));
    }
    if payer_id.is_blank() {
        return Err(ValidationError::new(RuleField::PayerId, "is required"));
    }
    if let RuleKind::Expense { category } = kind {
        if category.trim().is_empty() {
            return Err(ValidationError::new(
                RuleField::Category,
                "is required for expenses",
            ));
        }
    }
    Ok(())
}

/// A validated recurring transaction template.
///
/// Fields are read through accessors so that `last_applied_at` can only move
/// forward and `id` never changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RuleRecord", into = "RuleRecord")]
pub struct RecurringRule {
    id: RuleId,
    kind: RuleKind,
    payer_id: PersonId,
    description: String,
    amount: f64,
    frequency: Frequency,
    anchor_date: NaiveDate,
    last_applied_at: Option<DateTime<Utc>>,
    auto_apply: bool,
    active: bool,
}

impl RecurringRule {
    pub fn id(&self) -> RuleId {
        self.id
    }

    pub fn kind(&self) -> &RuleKind {
        &self.kind
    }

    pub fn category(&self) -> Option<&str> {
        match &self.kind {
            RuleKind::Expense { category } => Some(category),
            RuleKind::Income => None,
        }
    }

    pub fn payer_id(&self) -> &PersonId {
        &self.payer_id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    pub fn anchor_date(&self) -> NaiveDate {
        self.anchor_date
    }

    pub fn last_applied_at(&self) -> Option<DateTime<Utc>> {
        self.last_applied_at
    }

    pub fn auto_apply(&self) -> bool {
        self.auto_apply
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Next occurrence date: one frequency step after the last application,
    /// or after the anchor date when the rule has never been applied.
    pub fn next_occurrence(&self) -> NaiveDate {
        let base = self
            .last_applied_at
            .map(|at| at.date_naive())
            .unwrap_or(self.anchor_date);
        self.frequency.next_date(base)
    }

    /// Calendar-date comparison; the time of day of `as_of` is ignored.
    pub fn is_due(&self, as_of: NaiveDate) -> bool {
        self.next_occurrence() <= as_of
    }

    /// Flips the active flag and returns the new value.
    pub fn toggle_active(&mut self) -> bool {
        self.active = !self.active;
        self.active
    }

    pub fn set_auto_apply(&mut self, auto_apply: bool) {
        self.auto_apply = auto_apply;
    }

    /// Records an application. An older timestamp never rewinds the rule.
    pub fn mark_applied(&mut self, at: DateTime<Utc>) {
        self.last_applied_at = Some(match self.last_applied_at {
            Some(previous) if previous > at => previous,
            _ => at,
        });
    }

    /// Builds the ledger record for one occurrence dated `on`.
    pub fn materialize(&self, on: NaiveDate) -> GeneratedTransaction {
        match &self.kind {
            RuleKind::Expense { category } => {
                let mut record =
                    ExpenseRecord::new(self.description.clone(), self.amount, category.clone(), on);
                record.recurring_rule_id = Some(self.id);
                GeneratedTransaction::Expense(record)
            }
            RuleKind::Income => {
                let mut record = IncomeRecord::new(self.description.clone(), self.amount, on);
                record.recurring_rule_id = Some(self.id);
                GeneratedTransaction::Income(record)
            }
        }
    }
}

/// Pure next-occurrence computation; never mutates the rule.
pub fn compute_next_occurrence(rule: &RecurringRule) -> NaiveDate {
    rule.next_occurrence()
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum RuleKindTag {
    Expense,
    Income,
}

/// Persisted shape of a rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RuleRecord {
    id: RuleId,
    kind: RuleKindTag,
    payer_id: PersonId,
    description: String,
    amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    category: Option<String>,
    frequency: Frequency,
    anchor_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_applied_at: Option<DateTime<Utc>>,
    auto_apply: bool,
    active: bool,
}

impl TryFrom<RuleRecord> for RecurringRule {
    type Error = ValidationError;

    fn try_from(record: RuleRecord) -> Result<Self, Self::Error> {
        let kind = match record.kind {
            RuleKindTag::Expense => RuleKind::Expense {
                category: record.category.unwrap_or_default(),
            },
            RuleKindTag::Income => RuleKind::Income,
        };
        validate_fields(&record.description, record.amount, &record.payer_id, &kind)?;
        Ok(Self {
            id: record.id,
            kind,
            payer_id: record.payer_id,
            description: record.description,
            amount: record.amount,
            frequency: record.frequency,
            anchor_date: record.anchor_date,
            last_applied_at: record.last_applied_at,
            auto_apply: record.auto_apply,
            active: record.active,
        })
    }
}

impl From<RecurringRule> for RuleRecord {
    fn from(rule: RecurringRule) -> Self {
        let (kind, category) = match rule.kind {
            RuleKind::Expense { category } => (RuleKindTag::Expense, Some(category)),
            RuleKind::Income => (RuleKindTag::Income, None),
        };
        Self {
            id: rule.id,
            kind,
            payer_id: rule.payer_id,
            description: rule.description,
            amount: rule.amount,
            category,
            frequency: rule.frequency,
            anchor_date: rule.anchor_date,
            last_applied_at: rule.last_applied_at,
            auto_apply: rule.auto_apply,
            active: rule.active,
        }
    }
}
