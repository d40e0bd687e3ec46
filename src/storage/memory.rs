use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex,
};

use crate::{
    errors::{FinanceError, Result},
    state::AppState,
};

use super::StateStore;

/// In-memory store that keeps the last saved snapshot. Useful for tests and
/// for hosts that handle durability themselves.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    snapshot: Mutex<Option<AppState>>,
    saves: AtomicUsize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: AppState) -> Self {
        Self {
            snapshot: Mutex::new(Some(state)),
            saves: AtomicUsize::new(0),
        }
    }

    /// Number of successful `save` calls so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl StateStore for MemoryStorage {
    fn save(&self, state: &AppState) -> Result<()> {
        let mut guard = self
            .snapshot
            .lock()
            .map_err(|_| FinanceError::StorageError("memory store poisoned".into()))?;
        *guard = Some(state.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn load(&self) -> Result<Option<AppState>> {
        let guard = self
            .snapshot
            .lock()
            .map_err(|_| FinanceError::StorageError("memory store poisoned".into()))?;
        Ok(guard.clone())
    }
}
