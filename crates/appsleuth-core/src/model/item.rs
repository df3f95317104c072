//! Catalogue item records exchanged with the item store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Semantic type of a launchable item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemType {
    #[serde(rename = "app")]
    Application,
    #[serde(rename = "url")]
    Url,
    #[serde(rename = "doc")]
    Document,
    #[serde(rename = "folder")]
    Folder,
    #[serde(rename = "system")]
    System,
}

impl ItemType {
    pub const ALL: [ItemType; 5] = [
        ItemType::Application,
        ItemType::Url,
        ItemType::Document,
        ItemType::Folder,
        ItemType::System,
    ];

    /// Short wire name, as stored in the catalogue.
    pub fn as_str(self) -> &'static str {
        match self {
            ItemType::Application => "app",
            ItemType::Url => "url",
            ItemType::Document => "doc",
            ItemType::Folder => "folder",
            ItemType::System => "system",
        }
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            ItemType::Application => "Application",
            ItemType::Url => "URL",
            ItemType::Document => "Document",
            ItemType::Folder => "Folder",
            ItemType::System => "System",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(raw))
    }
}

impl std::fmt::Display for ItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted catalogue item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub target_name: Option<String>,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    #[serde(default)]
    pub icon_path: Option<String>,
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub launch_count: u64,
    #[serde(default)]
    pub last_used_at: Option<DateTime<Utc>>,
}

impl Item {
    pub fn has_icon(&self) -> bool {
        self.icon_path
            .as_deref()
            .is_some_and(|p| !p.trim().is_empty())
    }
}

/// Fields accepted when creating an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemInput {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub target_name: Option<String>,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    #[serde(default)]
    pub icon_path: Option<String>,
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default)]
    pub hidden: bool,
}

impl ItemInput {
    pub fn new(name: impl Into<String>, path: impl Into<String>, item_type: ItemType) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            target_name: None,
            item_type,
            icon_path: None,
            group_id: None,
            tags: Vec::new(),
            favorite: false,
            hidden: false,
        }
    }
}

/// Partial update; `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemUpdate {
    pub id: String,
    pub name: Option<String>,
    pub path: Option<String>,
    pub item_type: Option<ItemType>,
    pub icon_path: Option<String>,
    pub group_id: Option<String>,
    pub tags: Option<Vec<String>>,
    pub favorite: Option<bool>,
    pub hidden: Option<bool>,
}

impl ItemUpdate {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemFilter {
    pub group_id: Option<String>,
    /// Case-insensitive substring match against name and path.
    pub query: Option<String>,
}

/// Outcome of ingesting one scan into the catalogue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    pub total: usize,
    pub inserted: usize,
    pub skipped: usize,
}
