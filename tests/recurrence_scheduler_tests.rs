mod common;

use std::{
    sync::{Arc, Barrier},
    thread,
};

use chrono::Duration;
use common::{alice, at, bob, date, harness};
use shared_finance::{
    errors::{RuleField, SchedulerError, UnresolvedPayer},
    ledger::{compute_next_occurrence, Frequency, GeneratedTransaction, PersonId, RuleDraft},
    RecurrenceScheduler,
};

fn monthly_rent(anchor: chrono::NaiveDate) -> RuleDraft {
    RuleDraft::expense(alice(), "Rent", 950.0, "Housing", Frequency::Monthly, anchor)
}

#[test]
fn monthly_rule_is_applied_once_due() {
    let h = harness(at(2024, 2, 20));
    let id = h.scheduler.create(monthly_rent(date(2024, 1, 15))).unwrap();

    let applied = h.scheduler.sweep(at(2024, 2, 20));
    assert_eq!(applied.len(), 1);
    assert_eq!(applied[0].rule_id, id);
    assert_eq!(applied[0].scheduled_for, date(2024, 2, 15));

    let rule = h.scheduler.rule(id).unwrap();
    assert_eq!(rule.last_applied_at(), Some(at(2024, 2, 20)));
    h.with_state(|state| {
        let expenses = state.ledger.expenses_of(&alice());
        assert_eq!(expenses.len(), 1);
        assert_eq!(expenses[0].recurring_rule_id, Some(id));
        assert_eq!(expenses[0].category, "Housing");
        assert_eq!(expenses[0].date, date(2024, 2, 20));
    });
}

#[test]
fn rule_before_next_occurrence_is_left_untouched() {
    let h = harness(at(2024, 2, 10));
    let id = h.scheduler.create(monthly_rent(date(2024, 1, 15))).unwrap();
    let saves_before = h.store.save_count();
    let refreshes_before = h.presentation.count();

    let applied = h.scheduler.sweep(at(2024, 2, 10));

    assert!(applied.is_empty());
    assert_eq!(h.scheduler.rule(id).unwrap().last_applied_at(), None);
    assert_eq!(h.store.save_count(), saves_before);
    assert_eq!(h.presentation.count(), refreshes_before);
    h.with_state(|state| assert!(state.ledger.expenses_of(&alice()).is_empty()));
}

#[test]
fn month_end_anchor_clamps_in_leap_february() {
    let h = harness(at(2024, 1, 31));
    let id = h
        .scheduler
        .create(monthly_rent(date(2023, 12, 31)))
        .unwrap();
    let applied = h.scheduler.sweep(at(2024, 1, 31));
    assert_eq!(applied.len(), 1);

    let rule = h.scheduler.rule(id).unwrap();
    assert_eq!(rule.last_applied_at().map(|ts| ts.date_naive()), Some(date(2024, 1, 31)));
    assert_eq!(compute_next_occurrence(&rule), date(2024, 2, 29));
}

#[test]
fn long_overdue_rule_applies_a_single_occurrence_per_sweep() {
    let now = at(2025, 3, 1);
    let h = harness(now);
    let id = h.scheduler.create(monthly_rent(date(2023, 1, 1))).unwrap();
    h.with_state(|state| {
        state.recurring[0].mark_applied(now - Duration::days(400));
    });

    let applied = h.scheduler.sweep(now);
    assert_eq!(applied.len(), 1);
    assert_eq!(h.scheduler.sweep(now).len(), 0);
    h.with_state(|state| assert_eq!(state.ledger.expenses_of(&alice()).len(), 1));
    assert_eq!(h.scheduler.rule(id).unwrap().last_applied_at(), Some(now));
}

#[test]
fn unresolved_payer_is_skipped_and_other_rules_still_apply() {
    let h = harness(at(2024, 2, 20));
    let orphan = h
        .scheduler
        .create(RuleDraft::expense("carol", "Gym", 30.0, "Health", Frequency::Monthly, date(2024, 1, 1)))
        .unwrap();
    let salary = h
        .scheduler
        .create(RuleDraft::income(bob(), "Salary", 2500.0, Frequency::Monthly, date(2024, 1, 1)))
        .unwrap();

    let applied = h.scheduler.sweep(at(2024, 2, 20));

    assert_eq!(applied.len(), 1);
    assert_eq!(applied[0].rule_id, salary);
    assert_eq!(h.scheduler.rule(orphan).unwrap().last_applied_at(), None);
    h.with_state(|state| assert_eq!(state.ledger.incomes_of(&bob()).len(), 1));
}

#[test]
fn deleted_person_leaves_rule_dangling_but_harmless() {
    let h = harness(at(2024, 6, 1));
    let id = h
        .scheduler
        .create(RuleDraft::income(bob(), "Pocket money", 20.0, Frequency::Weekly, date(2024, 5, 1)))
        .unwrap();
    h.with_state(|state| {
        state.ledger.remove_person(&bob());
        assert_eq!(state.warnings().len(), 1);
    });

    assert!(h.scheduler.sweep(at(2024, 6, 1)).is_empty());
    assert_eq!(
        h.scheduler.apply_now(id),
        Err(SchedulerError::UnresolvedPayer(UnresolvedPayer(bob())))
    );
}

#[test]
fn common_payer_appends_to_shared_expenses() {
    let h = harness(at(2024, 2, 2));
    h.scheduler
        .create(RuleDraft::expense(
            PersonId::common(),
            "Internet",
            45.0,
            "Utilities",
            Frequency::Monthly,
            date(2024, 1, 1),
        ))
        .unwrap();
    assert_eq!(h.scheduler.sweep(at(2024, 2, 2)).len(), 1);
    h.with_state(|state| {
        assert_eq!(state.ledger.common_expenses.len(), 1);
        assert_eq!(state.ledger.common_expenses[0].description, "Internet");
    });
}

#[test]
fn sweep_batches_persistence_and_refresh() {
    let h = harness(at(2024, 2, 20));
    h.scheduler.create(monthly_rent(date(2024, 1, 15))).unwrap();
    h.scheduler
        .create(RuleDraft::income(bob(), "Salary", 2500.0, Frequency::Monthly, date(2024, 1, 1)))
        .unwrap();
    let saves_before = h.store.save_count();
    let refreshes_before = h.presentation.count();

    assert_eq!(h.scheduler.sweep(at(2024, 2, 20)).len(), 2);

    assert_eq!(h.store.save_count(), saves_before + 1);
    assert_eq!(h.presentation.count(), refreshes_before + 1);
}

#[test]
fn sweep_follows_catalog_order() {
    let h = harness(at(2024, 3, 1));
    let first = h
        .scheduler
        .create(RuleDraft::income(bob(), "Salary", 2500.0, Frequency::Monthly, date(2024, 1, 1)))
        .unwrap();
    let second = h.scheduler.create(monthly_rent(date(2024, 1, 1))).unwrap();
    let applied = h.scheduler.sweep(at(2024, 3, 1));
    let order: Vec<_> = applied.iter().map(|occurrence| occurrence.rule_id).collect();
    assert_eq!(order, vec![first, second]);
}

#[test]
fn manual_and_inactive_rules_are_not_swept() {
    let h = harness(at(2024, 3, 1));
    let manual = h
        .scheduler
        .create(monthly_rent(date(2024, 1, 1)).manual())
        .unwrap();
    let paused = h
        .scheduler
        .create(RuleDraft::income(bob(), "Salary", 2500.0, Frequency::Monthly, date(2024, 1, 1)))
        .unwrap();
    assert!(!h.scheduler.toggle_active(paused).unwrap());

    assert!(h.scheduler.sweep(at(2024, 3, 1)).is_empty());

    let applied = h.scheduler.apply_now(manual).expect("manual apply");
    assert!(matches!(applied.transaction, GeneratedTransaction::Expense(_)));
    assert_eq!(h.scheduler.apply_now(paused), Err(SchedulerError::Inactive(paused)));
}

#[test]
fn apply_now_ignores_due_date_and_records_now() {
    let h = harness(at(2024, 1, 16));
    let id = h.scheduler.create(monthly_rent(date(2024, 1, 15))).unwrap();
    let saves_before = h.store.save_count();

    let applied = h.scheduler.apply_now(id).expect("applied");

    assert_eq!(applied.applied_at, at(2024, 1, 16));
    assert_eq!(h.scheduler.rule(id).unwrap().last_applied_at(), Some(at(2024, 1, 16)));
    assert_eq!(h.store.save_count(), saves_before + 1);
    let missing = uuid::Uuid::new_v4();
    assert_eq!(h.scheduler.apply_now(missing), Err(SchedulerError::NotFound(missing)));
}

#[test]
fn last_applied_never_moves_backwards() {
    let h = harness(at(2024, 5, 1));
    let id = h
        .scheduler
        .create(RuleDraft::income(alice(), "Interest", 3.0, Frequency::Daily, date(2024, 4, 1)))
        .unwrap();
    h.scheduler.apply_now(id).unwrap();
    let first = h.scheduler.rule(id).unwrap().last_applied_at();

    h.clock.set(at(2024, 4, 20));
    h.scheduler.apply_now(id).unwrap();
    let second = h.scheduler.rule(id).unwrap().last_applied_at();

    assert!(second >= first);
    assert_eq!(second, Some(at(2024, 5, 1)));
}

#[test]
fn next_occurrence_is_deterministic() {
    let h = harness(at(2024, 1, 1));
    let id = h.scheduler.create(monthly_rent(date(2024, 1, 15))).unwrap();
    let rule = h.scheduler.rule(id).unwrap();
    assert_eq!(
        RecurrenceScheduler::compute_next_occurrence(&rule),
        RecurrenceScheduler::compute_next_occurrence(&rule)
    );
    assert_eq!(h.scheduler.rule(id).unwrap(), rule);
}

#[test]
fn toggling_twice_restores_active_flag() {
    let h = harness(at(2024, 1, 1));
    let id = h.scheduler.create(monthly_rent(date(2024, 1, 15))).unwrap();
    assert!(!h.scheduler.toggle_active(id).unwrap());
    assert!(h.scheduler.toggle_active(id).unwrap());
    assert!(h.scheduler.rule(id).unwrap().is_active());
}

#[test]
fn invalid_draft_is_rejected_without_touching_the_catalog() {
    let h = harness(at(2024, 1, 1));
    h.scheduler.create(monthly_rent(date(2024, 1, 15))).unwrap();
    let saves_before = h.store.save_count();

    let mut draft = monthly_rent(date(2024, 1, 15));
    draft.amount = -5.0;
    let err = h.scheduler.create(draft).unwrap_err();

    assert_eq!(err.field, RuleField::Amount);
    assert_eq!(h.scheduler.rules().len(), 1);
    assert_eq!(h.store.save_count(), saves_before);
}

#[test]
fn delete_and_toggle_of_unknown_rules_report_not_found() {
    let h = harness(at(2024, 1, 1));
    let missing = uuid::Uuid::new_v4();
    assert_eq!(h.scheduler.toggle_active(missing), Err(SchedulerError::NotFound(missing)));
    assert_eq!(
        h.scheduler.delete(missing).unwrap_err(),
        SchedulerError::NotFound(missing)
    );
}

#[test]
fn deleting_a_rule_keeps_generated_transactions() {
    let h = harness(at(2024, 2, 20));
    let id = h.scheduler.create(monthly_rent(date(2024, 1, 15))).unwrap();
    h.scheduler.sweep(at(2024, 2, 20));

    let removed = h.scheduler.delete(id).expect("deleted");

    assert_eq!(removed.id(), id);
    assert!(h.scheduler.rule(id).is_none());
    h.with_state(|state| assert_eq!(state.ledger.expenses_of(&alice()).len(), 1));
}

#[test]
fn switching_to_manual_stops_automatic_application() {
    let h = harness(at(2024, 2, 20));
    let id = h.scheduler.create(monthly_rent(date(2024, 1, 15))).unwrap();
    h.scheduler.set_auto_apply(id, false).unwrap();
    assert!(h.scheduler.sweep(at(2024, 2, 20)).is_empty());
    assert!(!h.scheduler.upcoming()[0].auto_apply);
}

#[test]
fn upcoming_lists_active_rules_by_date() {
    let h = harness(at(2024, 1, 1));
    let later = h.scheduler.create(monthly_rent(date(2024, 1, 20))).unwrap();
    let sooner = h
        .scheduler
        .create(RuleDraft::income(bob(), "Salary", 10.0, Frequency::Weekly, date(2024, 1, 1)))
        .unwrap();
    let paused = h
        .scheduler
        .create(RuleDraft::income(bob(), "Bonus", 10.0, Frequency::Yearly, date(2024, 1, 1)))
        .unwrap();
    h.scheduler.toggle_active(paused).unwrap();

    let upcoming = h.scheduler.upcoming();
    let ids: Vec<_> = upcoming.iter().map(|item| item.rule_id).collect();
    assert_eq!(ids, vec![sooner, later]);
    assert_eq!(upcoming[0].next_date, date(2024, 1, 8));
}

#[test]
fn concurrent_sweeps_apply_each_rule_once() {
    let h = harness(at(2024, 2, 20));
    h.scheduler.create(monthly_rent(date(2024, 1, 15))).unwrap();
    let scheduler = Arc::new(h.scheduler);
    let barrier = Arc::new(Barrier::new(4));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let scheduler = Arc::clone(&scheduler);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                scheduler.sweep(at(2024, 2, 20)).len()
            })
        })
        .collect();
    let total: usize = handles
        .into_iter()
        .map(|handle| handle.join().expect("sweep thread"))
        .sum();

    assert_eq!(total, 1);
    let shared = scheduler.state();
    let state = shared.lock().unwrap();
    assert_eq!(state.ledger.expenses_of(&alice()).len(), 1);
}
