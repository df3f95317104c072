//! Entries produced by a scan, before deduplication decides which survive.

use crate::model::item::{ItemInput, ItemType};
use chrono::{DateTime, Utc};
use compact_str::CompactString;
use serde::Serialize;

/// One qualifying file found while walking a root.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscoveredEntry {
    /// Display name (extension stripped, or the shell's display name).
    pub name: CompactString,
    /// The file that was found on disk.
    pub source_path: String,
    /// Resolved shortcut target, when resolution succeeded.
    pub target_path: Option<String>,
    /// Lower-cased base name of the ultimate target.
    pub target_name: Option<CompactString>,
    pub item_type: ItemType,
    /// Newer of creation and modification time.
    pub timestamp: DateTime<Utc>,
}

impl DiscoveredEntry {
    pub fn to_item_input(&self) -> ItemInput {
        let mut input = ItemInput::new(self.name.as_str(), &self.source_path, self.item_type);
        input.target_name = self.target_name.as_ref().map(|n| n.to_string());
        input
    }
}
