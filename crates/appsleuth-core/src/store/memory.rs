use super::ItemStore;
use crate::error::{CoreError, CoreResult};
use crate::model::{Item, ItemFilter, ItemInput, ItemUpdate};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Thread-safe in-memory catalogue. Lists are sorted by case-insensitive
/// name.
#[derive(Default)]
pub struct MemoryItemStore {
    items: RwLock<HashMap<String, Item>>,
}

impl MemoryItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }
}

fn required(field: &str, value: &str) -> CoreResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CoreError::InvalidInput(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

fn clean_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
            out.push(tag.to_string());
        }
    }
    out
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn matches(item: &Item, filter: &ItemFilter) -> bool {
    if let Some(group) = filter.group_id.as_deref() {
        if item.group_id.as_deref() != Some(group) {
            return false;
        }
    }
    match filter.query.as_deref().map(str::trim) {
        Some(q) if !q.is_empty() => {
            let q = q.to_lowercase();
            item.name.to_lowercase().contains(&q) || item.path.to_lowercase().contains(&q)
        }
        _ => true,
    }
}

impl ItemStore for MemoryItemStore {
    fn list(&self, filter: &ItemFilter) -> CoreResult<Vec<Item>> {
        let mut items: Vec<Item> = self
            .items
            .read()
            .values()
            .filter(|item| matches(item, filter))
            .cloned()
            .collect();
        items.sort_by_cached_key(|item| (item.name.to_lowercase(), item.id.clone()));
        Ok(items)
    }

    fn get(&self, id: &str) -> CoreResult<Item> {
        self.items
            .read()
            .get(id.trim())
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("item {id}")))
    }

    fn get_by_path(&self, path: &str) -> CoreResult<Item> {
        let wanted = path.trim();
        if wanted.is_empty() {
            return Err(CoreError::InvalidInput("path is required".into()));
        }
        self.items
            .read()
            .values()
            .find(|item| item.path.to_lowercase() == wanted.to_lowercase())
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("item with path {wanted}")))
    }

    fn create(&self, input: ItemInput) -> CoreResult<Item> {
        let item = Item {
            id: uuid::Uuid::new_v4().to_string(),
            name: required("name", &input.name)?,
            path: required("path", &input.path)?,
            target_name: non_blank(input.target_name),
            item_type: input.item_type,
            icon_path: non_blank(input.icon_path),
            group_id: non_blank(input.group_id),
            tags: clean_tags(input.tags),
            favorite: input.favorite,
            hidden: input.hidden,
            launch_count: 0,
            last_used_at: None,
        };
        self.items.write().insert(item.id.clone(), item.clone());
        Ok(item)
    }

    fn update(&self, update: ItemUpdate) -> CoreResult<Item> {
        let id = required("id", &update.id)?;
        let name = update.name.as_deref().map(|n| required("name", n)).transpose()?;
        let path = update.path.as_deref().map(|p| required("path", p)).transpose()?;

        let mut items = self.items.write();
        let item = items
            .get_mut(&id)
            .ok_or_else(|| CoreError::NotFound(format!("item {id}")))?;
        if let Some(name) = name {
            item.name = name;
        }
        if let Some(path) = path {
            item.path = path;
        }
        if let Some(item_type) = update.item_type {
            item.item_type = item_type;
        }
        if let Some(icon) = update.icon_path {
            item.icon_path = non_blank(Some(icon));
        }
        if let Some(group) = update.group_id {
            item.group_id = non_blank(Some(group));
        }
        if let Some(tags) = update.tags {
            item.tags = clean_tags(tags);
        }
        if let Some(favorite) = update.favorite {
            item.favorite = favorite;
        }
        if let Some(hidden) = update.hidden {
            item.hidden = hidden;
        }
        Ok(item.clone())
    }

    fn set_icon_path(&self, id: &str, icon_path: &str) -> CoreResult<()> {
        let mut items = self.items.write();
        let item = items
            .get_mut(id.trim())
            .ok_or_else(|| CoreError::NotFound(format!("item {id}")))?;
        item.icon_path = non_blank(Some(icon_path.to_string()));
        Ok(())
    }

    fn delete(&self, id: &str) -> CoreResult<()> {
        self.items
            .write()
            .remove(id.trim())
            .map(|_| ())
            .ok_or_else(|| CoreError::NotFound(format!("item {id}")))
    }
}
