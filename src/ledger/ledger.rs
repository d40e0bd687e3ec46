use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{CommonExpense, ExpenseRecord, IncomeRecord, Person, PersonId, Transfer};
use crate::errors::{FinanceError, Result, UnresolvedPayer};

const CURRENT_SCHEMA_VERSION: u8 = 1;

/// Incomes and expenses recorded for one person.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersonLedger {
    pub person: Person,
    #[serde(default)]
    pub incomes: Vec<IncomeRecord>,
    #[serde(default)]
    pub expenses: Vec<ExpenseRecord>,
}

impl PersonLedger {
    fn new(person: Person) -> Self {
        Self {
            person,
            incomes: Vec::new(),
            expenses: Vec::new(),
        }
    }
}

/// Household ledger: per-person incomes and expenses, shared expenses and
/// transfers. Records are only ever appended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ledger {
    #[serde(default)]
    pub people: Vec<PersonLedger>,
    #[serde(default)]
    pub common_expenses: Vec<CommonExpense>,
    #[serde(default)]
    pub transfers: Vec<Transfer>,
    pub updated_at: DateTime<Utc>,
    #[serde(default = "Ledger::schema_version_default")]
    pub schema_version: u8,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    pub fn new() -> Self {
        Self {
            people: Vec::new(),
            common_expenses: Vec::new(),
            transfers: Vec::new(),
            updated_at: Utc::now(),
            schema_version: CURRENT_SCHEMA_VERSION,
        }
    }

    pub fn add_person(&mut self, person: Person) -> PersonId {
        let id = person.id.clone();
        self.people.push(PersonLedger::new(person));
        self.touch();
        id
    }

    /// Removes a person together with their own records. Shared expenses and
    /// transfers that mention them are kept.
    pub fn remove_person(&mut self, id: &PersonId) -> Option<PersonLedger> {
        let index = self.people.iter().position(|entry| &entry.person.id == id)?;
        let removed = self.people.remove(index);
        self.touch();
        Some(removed)
    }

    pub fn person(&self, id: &PersonId) -> Option<&Person> {
        self.entry(id).map(|entry| &entry.person)
    }

    pub fn has_person(&self, id: &PersonId) -> bool {
        self.entry(id).is_some()
    }

    pub fn person_ids(&self) -> Vec<PersonId> {
        self.people
            .iter()
            .map(|entry| entry.person.id.clone())
            .collect()
    }

    pub fn incomes_of(&self, id: &PersonId) -> &[IncomeRecord] {
        self.entry(id)
            .map(|entry| entry.incomes.as_slice())
            .unwrap_or(&[])
    }

    pub fn expenses_of(&self, id: &PersonId) -> &[ExpenseRecord] {
        self.entry(id)
            .map(|entry| entry.expenses.as_slice())
            .unwrap_or(&[])
    }

    /// Appends an expense to a person's list, or to the shared list when the
    /// payer is the common pseudo-person.
    pub fn append_expense(
        &mut self,
        person_id: &PersonId,
        record: ExpenseRecord,
    ) -> std::result::Result<(), UnresolvedPayer> {
        if person_id.is_common() {
            self.common_expenses.push(CommonExpense::from(record));
        } else {
            let entry = self
                .entry_mut(person_id)
                .ok_or_else(|| UnresolvedPayer(person_id.clone()))?;
            entry.expenses.push(record);
        }
        self.touch();
        Ok(())
    }

    /// Appends an income to a person's list. The common pseudo-person has no
    /// income list.
    pub fn append_income(
        &mut self,
        person_id: &PersonId,
        record: IncomeRecord,
    ) -> std::result::Result<(), UnresolvedPayer> {
        let entry = self
            .entry_mut(person_id)
            .ok_or_else(|| UnresolvedPayer(person_id.clone()))?;
        entry.incomes.push(record);
        self.touch();
        Ok(())
    }

    pub fn record_income(
        &mut self,
        person_id: &PersonId,
        description: impl Into<String>,
        amount: f64,
        date: NaiveDate,
    ) -> Result<Uuid> {
        ensure_positive(amount)?;
        let record = IncomeRecord::new(description, amount, date);
        let id = record.id;
        self.append_income(person_id, record)?;
        Ok(id)
    }

    pub fn record_expense(
        &mut self,
        person_id: &PersonId,
        description: impl Into<String>,
        amount: f64,
        category: impl Into<String>,
        date: NaiveDate,
    ) -> Result<Uuid> {
        ensure_positive(amount)?;
        let record = ExpenseRecord::new(description, amount, category, date);
        let id = record.id;
        self.append_expense(person_id, record)?;
        Ok(id)
    }

    /// Records an expense shared by `participants`; an empty slice shares it
    /// with everyone.
    pub fn record_common_expense(
        &mut self,
        description: impl Into<String>,
        amount: f64,
        category: impl Into<String>,
        date: NaiveDate,
        participants: &[PersonId],
    ) -> Result<Uuid> {
        ensure_positive(amount)?;
        if let Some(missing) = participants.iter().find(|id| !self.has_person(id)) {
            return Err(UnresolvedPayer(missing.clone()).into());
        }
        let mut expense = CommonExpense::from(ExpenseRecord::new(description, amount, category, date));
        expense.participants = participants.to_vec();
        let id = expense.id;
        self.common_expenses.push(expense);
        self.touch();
        Ok(id)
    }

    pub fn record_transfer(
        &mut self,
        from: &PersonId,
        to: &PersonId,
        amount: f64,
        date: NaiveDate,
        note: Option<String>,
    ) -> Result<Uuid> {
        ensure_positive(amount)?;
        if from == to {
            return Err(FinanceError::InvalidInput(
                "a transfer needs two different people".into(),
            ));
        }
        for id in [from, to] {
            if !self.has_person(id) {
                return Err(UnresolvedPayer(id.clone()).into());
            }
        }
        let transfer = Transfer {
            id: Uuid::new_v4(),
            from: from.clone(),
            to: to.clone(),
            amount,
            date,
            note,
        };
        let id = transfer.id;
        self.transfers.push(transfer);
        self.touch();
        Ok(id)
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn schema_version_default() -> u8 {
        CURRENT_SCHEMA_VERSION
    }

    fn entry(&self, id: &PersonId) -> Option<&PersonLedger> {
        self.people.iter().find(|entry| &entry.person.id == id)
    }

    fn entry_mut(&mut self, id: &PersonId) -> Option<&mut PersonLedger> {
        self.people.iter_mut().find(|entry| &entry.person.id == id)
    }
}

fn ensure_positive(amount: f64) -> Result<()> {
    if amount.is_finite() && amount > 0.0 {
        Ok(())
    } else {
        Err(FinanceError::InvalidInput(format!(
            "amount must be a positive number, got {}",
            amount
        )))
    }
}
