//! Per-person totals across own records, shared expenses and transfers.

use super::{Ledger, PersonId};

#[derive(Debug, Clone, PartialEq)]
pub struct PersonSummary {
    pub person_id: PersonId,
    pub name: String,
    pub income: f64,
    pub expenses: f64,
    pub common_share: f64,
    pub transfers_in: f64,
    pub transfers_out: f64,
}

impl PersonSummary {
    pub fn balance(&self) -> f64 {
        self.income - self.expenses - self.common_share + self.transfers_in - self.transfers_out
    }
}

/// Summarizes every person in ledger order. Shared expenses are split evenly
/// among their participants, or among everyone when no participant is listed.
pub fn summarize(ledger: &Ledger) -> Vec<PersonSummary> {
    let everyone = ledger.person_ids();
    ledger
        .people
        .iter()
        .map(|entry| {
            let id = &entry.person.id;
            let common_share = ledger
                .common_expenses
                .iter()
                .map(|expense| {
                    let sharers = if expense.participants.is_empty() {
                        &everyone
                    } else {
                        &expense.participants
                    };
                    if sharers.contains(id) {
                        expense.amount / sharers.len() as f64
                    } else {
                        0.0
                    }
                })
                .sum();
            PersonSummary {
                person_id: id.clone(),
                name: entry.person.name.clone(),
                income: entry.incomes.iter().map(|record| record.amount).sum(),
                expenses: entry.expenses.iter().map(|record| record.amount).sum(),
                common_share,
                transfers_in: ledger
                    .transfers
                    .iter()
                    .filter(|transfer| &transfer.to == id)
                    .map(|transfer| transfer.amount)
                    .sum(),
                transfers_out: ledger
                    .transfers
                    .iter()
                    .filter(|transfer| &transfer.from == id)
                    .map(|transfer| transfer.amount)
                    .sum(),
            }
        })
        .collect()
}
