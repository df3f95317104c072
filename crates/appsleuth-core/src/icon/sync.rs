//! Catalogue-wide icon synchronisation.
//!
//! A sync pass lists every item, keeps the eligible ones, groups them by
//! source path into [`SyncTask`]s, and hands the tasks to a fixed pool of
//! workers over a rendezvous channel. Each task costs one
//! [`IconCache::ensure`] no matter how many items share its source.
//!
//! # Failure policy
//!
//! - `Unsupported` from the cache aborts the pass: the first worker to see
//!   it records it in a set-once slot and cancels the batch token, so no
//!   new task starts.
//! - Any other extraction failure skips that task.
//! - A store write failure skips that item; `NotFound` (item deleted
//!   meanwhile) is expected and only logged at debug level.

use super::cache::IconCache;
use crate::cancel::CancelToken;
use crate::config::DEFAULT_SYNC_WORKERS;
use crate::error::{CoreError, CoreResult};
use crate::model::{Item, ItemFilter, ItemType};
use crate::paths::is_absolute_path;
use crate::store::ItemStore;
use crossbeam_channel::Receiver;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread;
use thiserror::Error;
use tracing::{debug, info, warn};

/// A sync pass stopped early. `updated` items were written before it did.
#[derive(Debug, Error)]
#[error("icon sync stopped after {updated} update(s): {source}")]
pub struct SyncAborted {
    pub updated: usize,
    #[source]
    pub source: CoreError,
}

/// One extraction and the items that share its result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncTask {
    pub source: String,
    pub item_ids: Vec<String>,
}

/// Whether `item` has a path an icon can be extracted from.
pub fn is_icon_candidate(item: &Item) -> bool {
    let path = item.path.trim();
    !path.is_empty()
        && item.item_type != ItemType::Url
        && !path.to_ascii_lowercase().starts_with("http")
        && is_absolute_path(path)
}

/// Group eligible items by case-insensitive source path, in list order.
pub fn build_tasks(items: &[Item], force: bool) -> Vec<SyncTask> {
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut tasks: Vec<SyncTask> = Vec::new();
    for item in items {
        if !is_icon_candidate(item) || (!force && item.has_icon()) {
            continue;
        }
        let source = item.path.trim();
        let key = source.to_lowercase();
        match slots.get(&key) {
            Some(&slot) => tasks[slot].item_ids.push(item.id.clone()),
            None => {
                slots.insert(key, tasks.len());
                tasks.push(SyncTask {
                    source: source.to_string(),
                    item_ids: vec![item.id.clone()],
                });
            }
        }
    }
    tasks
}

/// Icon operations over the catalogue.
pub struct IconService {
    cache: Arc<IconCache>,
    items: Arc<dyn ItemStore>,
    workers: usize,
    busy: Arc<AtomicBool>,
}

impl IconService {
    pub fn new(cache: Arc<IconCache>, items: Arc<dyn ItemStore>) -> Self {
        Self {
            cache,
            items,
            workers: DEFAULT_SYNC_WORKERS,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn cache(&self) -> &IconCache {
        &self.cache
    }

    /// Fill in icons for items that have none.
    pub fn sync_missing(&self, cancel: &CancelToken) -> Result<usize, SyncAborted> {
        self.sync(false, cancel)
    }

    /// Re-extract icons for every eligible item.
    pub fn refresh_all(&self, cancel: &CancelToken) -> Result<usize, SyncAborted> {
        self.sync(true, cancel)
    }

    /// One sync pass. Returns how many items received a newly written icon
    /// path.
    pub fn sync(&self, force: bool, cancel: &CancelToken) -> Result<usize, SyncAborted> {
        let items = self
            .items
            .list(&ItemFilter::default())
            .map_err(|source| SyncAborted { updated: 0, source })?;
        let tasks = build_tasks(&items, force);
        if tasks.is_empty() {
            debug!(force, "icon sync: nothing to do");
            return Ok(0);
        }

        let task_count = tasks.len();
        let workers = self.workers.min(task_count);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("appsleuth-icons-{i}"))
            .build()
            .map_err(|e| SyncAborted {
                updated: 0,
                source: CoreError::Failed(format!("building icon worker pool: {e}")),
            })?;

        let batch = cancel.child();
        let updated = AtomicUsize::new(0);
        let fatal: OnceLock<CoreError> = OnceLock::new();
        let (tx, rx) = crossbeam_channel::bounded::<SyncTask>(0);

        pool.in_place_scope(|scope| {
            for _ in 0..workers {
                let rx = rx.clone();
                let (batch, updated, fatal) = (&batch, &updated, &fatal);
                scope.spawn(move |_| self.run_worker(rx, force, batch, updated, fatal));
            }
            drop(rx);
            for task in tasks {
                if batch.is_cancelled() || tx.send(task).is_err() {
                    break;
                }
            }
            drop(tx);
        });

        let updated = updated.into_inner();
        if let Some(source) = fatal.into_inner() {
            warn!(updated, error = %source, "icon sync aborted");
            return Err(SyncAborted { updated, source });
        }
        if cancel.is_cancelled() {
            info!(updated, "icon sync cancelled");
            return Err(SyncAborted {
                updated,
                source: CoreError::Cancelled,
            });
        }
        info!(updated, tasks = task_count, force, "icon sync finished");
        Ok(updated)
    }

    fn run_worker(
        &self,
        rx: Receiver<SyncTask>,
        force: bool,
        batch: &CancelToken,
        updated: &AtomicUsize,
        fatal: &OnceLock<CoreError>,
    ) {
        loop {
            if batch.is_cancelled() {
                return;
            }
            let Ok(task) = rx.recv() else {
                return;
            };
            if batch.is_cancelled() {
                return;
            }

            let icon = match self.cache.ensure(&task.source, force) {
                Ok(Some(path)) => path.to_string_lossy().into_owned(),
                Ok(None) => continue,
                Err(e) if e.is_unsupported() => {
                    let _ = fatal.set(e);
                    batch.cancel();
                    return;
                }
                Err(e) => {
                    debug!(source = %task.source, error = %e, "icon task skipped");
                    continue;
                }
            };

            for id in &task.item_ids {
                match self.items.set_icon_path(id, &icon) {
                    Ok(()) => {
                        updated.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e) if e.is_not_found() => {
                        debug!(id = %id, "item vanished before its icon was stored");
                    }
                    Err(e) => {
                        warn!(id = %id, error = %e, "failed to store icon path");
                    }
                }
            }
        }
    }

    /// Give `item` an icon if it lacks one. Returns the item's icon path,
    /// or `None` when the item has no extractable source.
    pub fn ensure_for_item(&self, item: &Item) -> CoreResult<Option<String>> {
        if item.has_icon() {
            return Ok(item.icon_path.clone());
        }
        if !is_icon_candidate(item) {
            return Ok(None);
        }
        self.assign(&item.id, &item.path, false).map(Some)
    }

    /// Force re-extraction for one item.
    pub fn refresh_item(&self, id: &str) -> CoreResult<Item> {
        let id = id.trim();
        if id.is_empty() {
            return Err(CoreError::InvalidInput("item id is required".into()));
        }
        let item = self.items.get(id)?;
        if !is_icon_candidate(&item) {
            return Err(CoreError::InvalidInput(format!(
                "item {id} has no extractable icon source"
            )));
        }
        self.assign(id, &item.path, true)?;
        self.items.get(id)
    }

    /// Extract from an arbitrary `source` and assign the result to `id`.
    pub fn update_from_source(&self, id: &str, source: &str) -> CoreResult<Item> {
        let id = id.trim();
        if id.is_empty() {
            return Err(CoreError::InvalidInput("item id is required".into()));
        }
        if source.trim().is_empty() {
            return Err(CoreError::InvalidInput("icon source is required".into()));
        }
        self.items.get(id)?;
        self.assign(id, source, true)?;
        self.items.get(id)
    }

    /// Extract from `source` without touching any item.
    pub fn preview_from_source(&self, source: &str) -> CoreResult<PathBuf> {
        self.cache
            .ensure(source, true)?
            .ok_or_else(|| CoreError::InvalidInput("icon source is required".into()))
    }

    fn assign(&self, id: &str, source: &str, force: bool) -> CoreResult<String> {
        let path = self
            .cache
            .ensure(source, force)?
            .ok_or_else(|| CoreError::InvalidInput("icon source is required".into()))?;
        let path = path.to_string_lossy().into_owned();
        self.items.set_icon_path(id, &path)?;
        Ok(path)
    }

    pub fn is_syncing(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Run [`sync_missing`](Self::sync_missing) on a background thread and
    /// hand the outcome to `on_done`. Returns `false` without doing anything
    /// if a background pass is already running.
    pub fn spawn_sync_missing<F>(self: &Arc<Self>, cancel: CancelToken, on_done: F) -> bool
    where
        F: FnOnce(Result<usize, SyncAborted>) + Send + 'static,
    {
        if self.busy.swap(true, Ordering::AcqRel) {
            debug!("icon sync already running");
            return false;
        }
        let service = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name("appsleuth-icon-sync".into())
            .spawn(move || {
                let busy = BusyFlag(Arc::clone(&service.busy));
                let outcome = service.sync_missing(&cancel);
                drop(busy);
                on_done(outcome);
            });
        if let Err(e) = spawned {
            warn!(error = %e, "failed to spawn icon sync thread");
            self.busy.store(false, Ordering::Release);
            return false;
        }
        true
    }
}

/// Clears the busy flag even if the sync panics.
struct BusyFlag(Arc<AtomicBool>);

impl Drop for BusyFlag {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, path: &str, item_type: ItemType, icon: Option<&str>) -> Item {
        Item {
            id: id.into(),
            name: id.into(),
            path: path.into(),
            target_name: None,
            item_type,
            icon_path: icon.map(str::to_string),
            group_id: None,
            tags: Vec::new(),
            favorite: false,
            hidden: false,
            launch_count: 0,
            last_used_at: None,
        }
    }

    #[test]
    fn eligibility() {
        assert!(is_icon_candidate(&item("a", r"C:\Apps\App.exe", ItemType::Application, None)));
        assert!(!is_icon_candidate(&item("b", r"C:\x\site.url", ItemType::Url, None)));
        assert!(!is_icon_candidate(&item("c", "relative\\app.exe", ItemType::Application, None)));
        assert!(!is_icon_candidate(&item("d", "https://x.y", ItemType::Application, None)));
        assert!(!is_icon_candidate(&item("e", "  ", ItemType::Application, None)));
    }

    #[test]
    fn tasks_group_by_case_insensitive_path() {
        let items = vec![
            item("1", r"C:\Apps\App.exe", ItemType::Application, None),
            item("2", r"C:\Tools\tool.exe", ItemType::Application, None),
            item("3", r"c:\apps\app.EXE ", ItemType::System, None),
            item("4", r"C:\Apps\Iconed.exe", ItemType::Application, Some("/i/x.png")),
        ];
        let tasks = build_tasks(&items, false);
        assert_eq!(
            tasks,
            vec![
                SyncTask {
                    source: r"C:\Apps\App.exe".into(),
                    item_ids: vec!["1".into(), "3".into()],
                },
                SyncTask {
                    source: r"C:\Tools\tool.exe".into(),
                    item_ids: vec!["2".into()],
                },
            ]
        );
        assert_eq!(build_tasks(&items, true).len(), 3);
    }
}
