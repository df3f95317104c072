//! Data model: catalogue item records and the transient entries a scan
//! produces before they reach the catalogue.

pub mod entry;
pub mod item;

pub use entry::DiscoveredEntry;
pub use item::{Item, ItemFilter, ItemInput, ItemType, ItemUpdate, ScanResult};
