//! Turning scan results into catalogue items.
//!
//! Paths already in the catalogue are never duplicated. If a re-scan
//! classifies a known path differently, the stored type is corrected.

use crate::cancel::CancelToken;
use crate::classify::ClassifierContext;
use crate::error::{CoreError, CoreResult, ErrorKind};
use crate::icon::IconService;
use crate::model::{DiscoveredEntry, Item, ItemInput, ItemUpdate, ScanResult};
use crate::scanner::progress::ProgressSink;
use crate::scanner::Scanner;
use crate::store::ItemStore;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Ingestion stopped early; `result` holds the counts reached.
#[derive(Debug, Error)]
#[error(
    "catalogue update stopped after {} inserted, {} skipped: {source}",
    result.inserted,
    result.skipped
)]
pub struct IngestAborted {
    pub result: ScanResult,
    #[source]
    pub source: CoreError,
}

pub struct Catalog {
    items: Arc<dyn ItemStore>,
    icons: Option<Arc<IconService>>,
}

impl Catalog {
    pub fn new(items: Arc<dyn ItemStore>) -> Self {
        Self { items, icons: None }
    }

    /// Run a missing-icon pass after every scan.
    pub fn with_icons(mut self, icons: Arc<IconService>) -> Self {
        self.icons = Some(icons);
        self
    }

    pub fn items(&self) -> &Arc<dyn ItemStore> {
        &self.items
    }

    /// Scan, ingest, then fill in missing icons. Icon failures are logged
    /// and never fail the scan.
    pub fn scan(
        &self,
        scanner: &Scanner,
        cancel: &CancelToken,
        sink: &dyn ProgressSink,
    ) -> Result<ScanResult, IngestAborted> {
        let entries = scanner.scan(cancel, sink).map_err(|source| IngestAborted {
            result: ScanResult::default(),
            source,
        })?;
        let result = self.ingest(&entries)?;
        info!(
            total = result.total,
            inserted = result.inserted,
            skipped = result.skipped,
            "catalogue updated from scan"
        );

        if let Some(icons) = &self.icons {
            match icons.sync_missing(cancel) {
                Ok(updated) => debug!(updated, "post-scan icon sync done"),
                Err(e) => warn!(error = %e, "post-scan icon sync failed"),
            }
        }
        Ok(result)
    }

    /// Insert new entries and re-classify known ones.
    pub fn ingest(&self, entries: &[DiscoveredEntry]) -> Result<ScanResult, IngestAborted> {
        let mut result = ScanResult {
            total: entries.len(),
            ..ScanResult::default()
        };
        for entry in entries {
            if let Err(source) = self.ingest_one(entry, &mut result) {
                return Err(IngestAborted { result, source });
            }
        }
        Ok(result)
    }

    fn ingest_one(&self, entry: &DiscoveredEntry, result: &mut ScanResult) -> CoreResult<()> {
        if entry.name.trim().is_empty() || entry.source_path.trim().is_empty() {
            result.skipped += 1;
            return Ok(());
        }

        match self.items.get_by_path(&entry.source_path) {
            Ok(existing) => {
                if existing.item_type != entry.item_type {
                    self.reclassify(&existing, entry)?;
                }
                result.skipped += 1;
                Ok(())
            }
            Err(e) if e.is_not_found() => match self.items.create(entry.to_item_input()) {
                Ok(_) => {
                    result.inserted += 1;
                    Ok(())
                }
                Err(e) if e.kind() == ErrorKind::InvalidInput => {
                    debug!(path = %entry.source_path, error = %e, "entry rejected by store");
                    result.skipped += 1;
                    Ok(())
                }
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        }
    }

    fn reclassify(&self, existing: &Item, entry: &DiscoveredEntry) -> CoreResult<()> {
        let mut update = ItemUpdate::new(&existing.id);
        update.item_type = Some(entry.item_type);
        match self.items.update(update) {
            Ok(_) => {
                debug!(
                    path = %existing.path,
                    from = %existing.item_type,
                    to = %entry.item_type,
                    "item re-classified"
                );
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::InvalidInput => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Add a user-chosen path, classified from the path alone, and give it
    /// an icon when one can be extracted.
    pub fn add_path(
        &self,
        name: &str,
        path: &str,
        classifier: &ClassifierContext,
    ) -> CoreResult<Item> {
        let input = ItemInput::new(name, path, classifier.classify_path(path));
        let item = self.items.create(input)?;
        if let Some(icons) = &self.icons {
            if let Err(e) = icons.ensure_for_item(&item) {
                debug!(id = %item.id, error = %e, "no icon for new item");
            }
        }
        self.items.get(&item.id)
    }
}
