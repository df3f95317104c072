//! Item-store collaborator.
//!
//! The engine never owns persisted items; it reads and writes them through
//! [`ItemStore`]. [`MemoryItemStore`] is the in-process implementation used
//! by the CLI and the tests.

pub mod memory;

pub use memory::MemoryItemStore;

use crate::error::CoreResult;
use crate::model::{Item, ItemFilter, ItemInput, ItemUpdate};

/// Catalogue persistence. Implementations must be safe to share across the
/// icon sync worker pool.
///
/// Errors: `NotFound` for unknown IDs/paths, `InvalidInput` for blank or
/// malformed input.
pub trait ItemStore: Send + Sync {
    fn list(&self, filter: &ItemFilter) -> CoreResult<Vec<Item>>;
    fn get(&self, id: &str) -> CoreResult<Item>;
    /// Case-insensitive lookup by path.
    fn get_by_path(&self, path: &str) -> CoreResult<Item>;
    fn create(&self, input: ItemInput) -> CoreResult<Item>;
    fn update(&self, update: ItemUpdate) -> CoreResult<Item>;
    fn set_icon_path(&self, id: &str, icon_path: &str) -> CoreResult<()>;
    fn delete(&self, id: &str) -> CoreResult<()>;
}
