#![allow(dead_code)]

use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use once_cell::sync::Lazy;
use shared_finance::{
    ledger::{Ledger, Person, PersonId},
    scheduler::Presentation,
    storage::MemoryStorage,
    time::ManualClock,
    AppState, RecurrenceScheduler,
};
use tempfile::TempDir;

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

pub fn temp_dir() -> PathBuf {
    let temp = TempDir::new().expect("create temp dir");
    let path = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);
    path
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
}

pub fn alice() -> PersonId {
    PersonId::new("alice")
}

pub fn bob() -> PersonId {
    PersonId::new("bob")
}

/// Counts refresh requests.
#[derive(Debug, Default)]
pub struct CountingPresentation {
    refreshes: AtomicUsize,
}

impl CountingPresentation {
    pub fn count(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

impl Presentation for CountingPresentation {
    fn refresh(&self, _state: &AppState) {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct Harness {
    pub scheduler: RecurrenceScheduler,
    pub store: Arc<MemoryStorage>,
    pub presentation: Arc<CountingPresentation>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    pub fn with_state<T>(&self, f: impl FnOnce(&mut AppState) -> T) -> T {
        let shared = self.scheduler.state();
        let mut guard = shared.lock().expect("state lock");
        f(&mut guard)
    }
}

/// Scheduler over a ledger with Alice and Bob, clock fixed at `now`.
pub fn harness(now: DateTime<Utc>) -> Harness {
    let mut ledger = Ledger::new();
    ledger.add_person(Person::with_id("alice", "Alice"));
    ledger.add_person(Person::with_id("bob", "Bob"));
    let store = Arc::new(MemoryStorage::new());
    let presentation = Arc::new(CountingPresentation::default());
    let clock = Arc::new(ManualClock::new(now));
    let scheduler = RecurrenceScheduler::new(Arc::new(Mutex::new(AppState::new(ledger))), store.clone())
        .with_presentation(presentation.clone())
        .with_clock(clock.clone());
    Harness {
        scheduler,
        store,
        presentation,
        clock,
    }
}
