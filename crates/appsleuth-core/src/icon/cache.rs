//! Content-addressed icon cache.
//!
//! Each source path maps to `<root>/<fingerprint>.png`. Extraction for a
//! given fingerprint is serialised through a per-hash lock so overlapping
//! callers (a refresh-all and a single-item refresh, say) never render the
//! same file twice at once. Extractors write to a `.part` staging file that
//! is renamed into place only after a successful, flushed write.

use super::IconExtractor;
use crate::error::{CoreError, CoreResult};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use tracing::debug;

/// Dead lock slots are pruned once the table grows past this size.
const LOCK_TABLE_PRUNE_THRESHOLD: usize = 256;

/// Cache key for `source`: blake3 of the trimmed, lower-cased path.
pub fn fingerprint(source: &str) -> String {
    blake3::hash(source.trim().to_lowercase().as_bytes())
        .to_hex()
        .to_string()
}

pub struct IconCache {
    root: PathBuf,
    extractor: Arc<dyn IconExtractor>,
    locks: HashLocks,
}

impl IconCache {
    pub fn new(root: impl Into<PathBuf>, extractor: Arc<dyn IconExtractor>) -> Self {
        Self {
            root: root.into(),
            extractor,
            locks: HashLocks::default(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the icon for `source` lives (or would live).
    pub fn path_for(&self, source: &str) -> PathBuf {
        self.root.join(format!("{}.png", fingerprint(source)))
    }

    /// Make sure an icon for `source` exists and return its path.
    ///
    /// A blank source returns `Ok(None)`. Without `force` an existing file
    /// is returned untouched; with `force` it is deleted and re-rendered.
    pub fn ensure(&self, source: &str, force: bool) -> CoreResult<Option<PathBuf>> {
        let source = source.trim();
        if source.is_empty() {
            return Ok(None);
        }
        fs::create_dir_all(&self.root)
            .map_err(|e| CoreError::io("creating icon cache", &self.root, e))?;

        let key = fingerprint(source);
        let dest = self.root.join(format!("{key}.png"));

        let slot = self.locks.slot(&key);
        let _held = slot.lock();

        if !force && dest.is_file() {
            debug!(source, "icon cache hit");
            return Ok(Some(dest));
        }
        if force {
            remove_if_present(&dest)?;
        }

        let staging = self.root.join(format!("{key}.png.part"));
        remove_if_present(&staging)?;
        if let Err(e) = self.extractor.extract(Path::new(source), &staging) {
            let _ = fs::remove_file(&staging);
            debug!(source, extractor = self.extractor.name(), error = %e, "icon extraction failed");
            return Err(e);
        }
        if !staging.is_file() {
            return Err(CoreError::Failed(format!(
                "{} extractor produced no image for {source}",
                self.extractor.name()
            )));
        }
        fs::rename(&staging, &dest).map_err(|e| CoreError::io("publishing icon", &dest, e))?;
        debug!(source, path = %dest.display(), "icon extracted");
        Ok(Some(dest))
    }
}

fn remove_if_present(path: &Path) -> CoreResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(CoreError::io("removing stale icon", path, e)),
    }
}

/// One mutex per fingerprint currently in use.
#[derive(Default)]
struct HashLocks {
    table: Mutex<HashMap<String, Weak<Mutex<()>>>>,
}

impl HashLocks {
    fn slot(&self, key: &str) -> Arc<Mutex<()>> {
        let mut table = self.table.lock();
        if let Some(live) = table.get(key).and_then(Weak::upgrade) {
            return live;
        }
        if table.len() >= LOCK_TABLE_PRUNE_THRESHOLD {
            table.retain(|_, slot| slot.strong_count() > 0);
        }
        let slot = Arc::new(Mutex::new(()));
        table.insert(key.to_string(), Arc::downgrade(&slot));
        slot
    }
}
