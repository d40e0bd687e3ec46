pub mod json_backend;
pub mod memory;

use crate::{errors::Result, state::AppState};

/// Abstraction over persistence backends capable of storing the application state.
///
/// Implementations must make `save` atomic from the caller's point of view.
pub trait StateStore: Send + Sync {
    fn save(&self, state: &AppState) -> Result<()>;

    /// Returns `None` when nothing has been persisted yet.
    fn load(&self) -> Result<Option<AppState>>;
}

pub use json_backend::JsonStorage;
pub use memory::MemoryStorage;
