//! Recurring transaction scheduler: owns rule lifecycle and applies due
//! occurrences to the ledger exactly once per elapsed period.

pub mod timer;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    errors::{SchedulerError, UnresolvedPayer, ValidationError},
    ledger::{GeneratedTransaction, PersonId, RecurringRule, RuleDraft, RuleId},
    state::AppState,
    storage::StateStore,
    time::{Clock, SystemClock},
};

pub use timer::{SweepTimer, TimerSettings};

/// Re-renders whatever displays the ledger and rule catalog.
pub trait Presentation: Send + Sync {
    fn refresh(&self, state: &AppState);
}

/// Presentation that ignores refresh requests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPresentation;

impl Presentation for NoopPresentation {
    fn refresh(&self, _state: &AppState) {}
}

/// One applied occurrence of a recurring rule.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedOccurrence {
    pub rule_id: RuleId,
    pub payer_id: PersonId,
    /// The occurrence date the rule was due on when it was applied.
    pub scheduled_for: NaiveDate,
    pub applied_at: DateTime<Utc>,
    pub transaction: GeneratedTransaction,
}

/// An active rule and the date it will next fall due.
#[derive(Debug, Clone, PartialEq)]
pub struct UpcomingOccurrence {
    pub rule_id: RuleId,
    pub description: String,
    pub next_date: NaiveDate,
    pub auto_apply: bool,
}

/// Applies recurring rules to the shared application state.
///
/// Every operation holds the state lock for its whole duration, so a timer
/// sweep and a manual apply never interleave on the same rule.
pub struct RecurrenceScheduler {
    state: Arc<Mutex<AppState>>,
    store: Arc<dyn StateStore>,
    presentation: Arc<dyn Presentation>,
    clock: Arc<dyn Clock>,
}

impl RecurrenceScheduler {
    pub fn new(state: Arc<Mutex<AppState>>, store: Arc<dyn StateStore>) -> Self {
        Self {
            state,
            store,
            presentation: Arc::new(NoopPresentation),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_presentation(mut self, presentation: Arc<dyn Presentation>) -> Self {
        self.presentation = presentation;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Shared handle to the state this scheduler mutates.
    pub fn state(&self) -> Arc<Mutex<AppState>> {
        Arc::clone(&self.state)
    }

    /// Validates and appends a new active rule. Nothing is mutated on failure.
    pub fn create(&self, draft: RuleDraft) -> Result<RuleId, ValidationError> {
        let mut state = self.lock();
        let mut id = Uuid::new_v4();
        while state.rule(id).is_some() {
            id = Uuid::new_v4();
        }
        let rule = draft.into_rule(id)?;
        info!(rule_id = %id, payer = %rule.payer_id(), frequency = %rule.frequency(), "recurring rule created");
        state.recurring.push(rule);
        self.commit(&state);
        Ok(id)
    }

    pub fn compute_next_occurrence(rule: &RecurringRule) -> NaiveDate {
        rule.next_occurrence()
    }

    /// Sweeps using the scheduler's clock.
    pub fn sweep_now(&self) -> Vec<AppliedOccurrence> {
        self.sweep(self.clock.now())
    }

    /// Applies at most one occurrence of every active auto-apply rule whose
    /// next occurrence falls on or before `as_of`, in catalog order.
    ///
    /// Rules whose payer no longer exists are skipped. One save and one refresh
    /// follow the batch when anything was applied.
    pub fn sweep(&self, as_of: DateTime<Utc>) -> Vec<AppliedOccurrence> {
        let mut state = self.lock();
        let today = as_of.date_naive();
        let mut applied = Vec::new();

        for index in 0..state.recurring.len() {
            let rule = &state.recurring[index];
            if !rule.is_active() || !rule.auto_apply() {
                continue;
            }
            if !rule.is_due(today) {
                debug!(rule_id = %rule.id(), next = %rule.next_occurrence(), "recurring rule not due");
                continue;
            }
            match apply_occurrence(&mut state, index, as_of) {
                Ok(occurrence) => {
                    info!(
                        rule_id = %occurrence.rule_id,
                        payer = %occurrence.payer_id,
                        scheduled_for = %occurrence.scheduled_for,
                        "recurring occurrence applied"
                    );
                    applied.push(occurrence);
                }
                Err(UnresolvedPayer(payer)) => {
                    warn!(rule_id = %state.recurring[index].id(), payer = %payer, "skipping recurring rule with unknown payer");
                }
            }
        }

        if !applied.is_empty() {
            self.commit(&state);
        }
        applied
    }

    /// Applies one occurrence right away, regardless of the due date and of
    /// `auto_apply`. The rule must be active.
    pub fn apply_now(&self, rule_id: RuleId) -> Result<AppliedOccurrence, SchedulerError> {
        let mut state = self.lock();
        let index = state
            .rule_index(rule_id)
            .ok_or(SchedulerError::NotFound(rule_id))?;
        if !state.recurring[index].is_active() {
            return Err(SchedulerError::Inactive(rule_id));
        }
        let occurrence = apply_occurrence(&mut state, index, self.clock.now()).map_err(|err| {
            warn!(rule_id = %rule_id, payer = %err.0, "manual apply skipped: unknown payer");
            SchedulerError::UnresolvedPayer(err)
        })?;
        info!(rule_id = %rule_id, "recurring occurrence applied manually");
        self.commit(&state);
        Ok(occurrence)
    }

    /// Pauses or resumes a rule and returns the new `active` value.
    pub fn toggle_active(&self, rule_id: RuleId) -> Result<bool, SchedulerError> {
        let mut state = self.lock();
        let index = state
            .rule_index(rule_id)
            .ok_or(SchedulerError::NotFound(rule_id))?;
        let active = state.recurring[index].toggle_active();
        info!(rule_id = %rule_id, active, "recurring rule toggled");
        self.commit(&state);
        Ok(active)
    }

    /// Switches a rule between automatic and manual application.
    pub fn set_auto_apply(&self, rule_id: RuleId, auto_apply: bool) -> Result<(), SchedulerError> {
        let mut state = self.lock();
        let index = state
            .rule_index(rule_id)
            .ok_or(SchedulerError::NotFound(rule_id))?;
        state.recurring[index].set_auto_apply(auto_apply);
        self.commit(&state);
        Ok(())
    }

    /// Removes a rule from the catalog. Transactions it already generated stay
    /// in the ledger.
    pub fn delete(&self, rule_id: RuleId) -> Result<RecurringRule, SchedulerError> {
        let mut state = self.lock();
        let index = state
            .rule_index(rule_id)
            .ok_or(SchedulerError::NotFound(rule_id))?;
        let removed = state.recurring.remove(index);
        info!(rule_id = %rule_id, "recurring rule deleted");
        self.commit(&state);
        Ok(removed)
    }

    pub fn rules(&self) -> Vec<RecurringRule> {
        self.lock().recurring.clone()
    }

    pub fn rule(&self, rule_id: RuleId) -> Option<RecurringRule> {
        self.lock().rule(rule_id).cloned()
    }

    /// Active rules ordered by their next occurrence date.
    pub fn upcoming(&self) -> Vec<UpcomingOccurrence> {
        let state = self.lock();
        let mut upcoming: Vec<_> = state
            .recurring
            .iter()
            .filter(|rule| rule.is_active())
            .map(|rule| UpcomingOccurrence {
                rule_id: rule.id(),
                description: rule.description().to_string(),
                next_date: rule.next_occurrence(),
                auto_apply: rule.auto_apply(),
            })
            .collect();
        upcoming.sort_by_key(|item| item.next_date);
        upcoming
    }

    fn lock(&self) -> MutexGuard<'_, AppState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Saves and refreshes. Failures are logged and not retried.
    fn commit(&self, state: &AppState) {
        if let Err(err) = self.store.save(state) {
            warn!(error = %err, "failed to persist application state");
        }
        self.presentation.refresh(state);
    }
}

fn apply_occurrence(
    state: &mut AppState,
    index: usize,
    at: DateTime<Utc>,
) -> Result<AppliedOccurrence, UnresolvedPayer> {
    let AppState { ledger, recurring } = state;
    let rule = &mut recurring[index];
    let scheduled_for = rule.next_occurrence();
    let transaction = rule.materialize(at.date_naive());
    match &transaction {
        GeneratedTransaction::Expense(record) => {
            ledger.append_expense(rule.payer_id(), record.clone())?
        }
        GeneratedTransaction::Income(record) => {
            ledger.append_income(rule.payer_id(), record.clone())?
        }
    }
    rule.mark_applied(at);
    Ok(AppliedOccurrence {
        rule_id: rule.id(),
        payer_id: rule.payer_id().clone(),
        scheduled_for,
        applied_at: at,
        transaction,
    })
}
