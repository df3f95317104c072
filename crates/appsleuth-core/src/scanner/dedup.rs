//! Deduplication of discovered entries.
//!
//! Keys are derived in two phases: a provisional key from the source path,
//! then a final key that switches to the resolved target when resolution
//! produced one. Only the final key ever reaches the [`DedupMap`].

use crate::model::DiscoveredEntry;
use crate::paths::match_key;
use crate::resolver::Resolution;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey(String);

impl DedupKey {
    /// Key for an entry whose identity is its own file.
    pub fn provisional(source: &str) -> Self {
        Self(match_key(source))
    }

    /// Switch to the target+arguments identity when `resolution` has a
    /// usable target; otherwise keep the provisional key.
    pub fn finalize(self, resolution: Option<&Resolution>) -> Self {
        match resolution.and_then(target_key) {
            Some(key) => Self(key),
            None => self,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Final key for a shortcut, from its source path and optional resolution.
pub fn derive_key(source: &str, resolution: Option<&Resolution>) -> DedupKey {
    DedupKey::provisional(source).finalize(resolution)
}

fn target_key(resolution: &Resolution) -> Option<String> {
    let target = match_key(&resolution.target);
    if target.is_empty() {
        return None;
    }
    Some(format!("{target}\0{}", resolution.arguments.trim().to_lowercase()))
}

/// What [`DedupMap::offer`] did with an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Inserted,
    /// The new entry was strictly newer and took the existing slot.
    Replaced,
    /// An entry at least as new already held the key.
    Kept,
}

/// Keyed survivors in first-seen key order.
#[derive(Debug, Default)]
pub struct DedupMap {
    slots: HashMap<DedupKey, usize>,
    entries: Vec<DiscoveredEntry>,
}

impl DedupMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offer(&mut self, key: DedupKey, entry: DiscoveredEntry) -> Admission {
        match self.slots.get(&key) {
            Some(&slot) => {
                if entry.timestamp > self.entries[slot].timestamp {
                    self.entries[slot] = entry;
                    Admission::Replaced
                } else {
                    Admission::Kept
                }
            }
            None => {
                self.slots.insert(key, self.entries.len());
                self.entries.push(entry);
                Admission::Inserted
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<DiscoveredEntry> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ItemType;
    use chrono::{DateTime, TimeZone, Utc};

    fn entry(name: &str, ts: DateTime<Utc>) -> DiscoveredEntry {
        DiscoveredEntry {
            name: name.into(),
            source_path: format!("/d/{name}.lnk"),
            target_path: None,
            target_name: None,
            item_type: ItemType::Application,
            timestamp: ts,
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn app_exe() -> Resolution {
        Resolution {
            target: r"C:\Apps\App.exe".into(),
            arguments: String::new(),
        }
    }

    #[test]
    fn resolved_keys_ignore_source_and_case() {
        let a = derive_key("/d/App.lnk", Some(&app_exe()));
        let b = derive_key(
            "/d/App (copy).lnk",
            Some(&Resolution {
                target: r"c:\apps\.\APP.exe".into(),
                arguments: "  ".into(),
            }),
        );
        assert_eq!(a, b);
    }

    #[test]
    fn arguments_split_keys() {
        let plain = derive_key("/d/a.lnk", Some(&app_exe()));
        let with_args = derive_key(
            "/d/b.lnk",
            Some(&Resolution {
                target: r"C:\Apps\App.exe".into(),
                arguments: "--profile work".into(),
            }),
        );
        assert_ne!(plain, with_args);
    }

    #[test]
    fn empty_resolution_keeps_provisional_key() {
        let key = derive_key("/D/App.LNK", Some(&Resolution::default()));
        assert_eq!(key, DedupKey::provisional("/d/app.lnk"));
        assert_eq!(derive_key("/d/x.lnk", None).as_str(), "/d/x.lnk");
    }

    #[test]
    fn newest_wins_and_ties_keep_first() {
        let key = derive_key("/d/a.lnk", Some(&app_exe()));
        let mut map = DedupMap::new();
        assert_eq!(map.offer(key.clone(), entry("first", at(10))), Admission::Inserted);
        assert_eq!(map.offer(key.clone(), entry("tie", at(10))), Admission::Kept);
        assert_eq!(map.offer(key.clone(), entry("older", at(5))), Admission::Kept);
        assert_eq!(map.offer(key, entry("newer", at(20))), Admission::Replaced);
        let out = map.into_entries();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "newer");
    }

    #[test]
    fn output_follows_first_seen_key_order() {
        let mut map = DedupMap::new();
        map.offer(DedupKey::provisional("/b"), entry("b", at(1)));
        map.offer(DedupKey::provisional("/a"), entry("a", at(1)));
        map.offer(DedupKey::provisional("/b"), entry("b2", at(2)));
        let names: Vec<_> = map.into_entries().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["b2", "a"]);
    }
}
