//! Icon materialisation.
//!
//! - **Cache:** [`IconCache`] owns a content-addressed directory of PNG
//!   files, one per blake3 fingerprint of the source path.
//! - **Extraction:** the pixel work is handed to an [`IconExtractor`]. On
//!   Windows [`default_extractor`] pairs in-process GDI rendering with a
//!   PowerShell fallback; elsewhere it reports `Unsupported`. Callers never
//!   branch on platform.
//! - **Sync:** [`IconService`] drives the cache across the whole catalogue.

pub mod cache;
pub mod hybrid;
#[cfg(windows)]
pub mod native;
pub mod raster;
pub mod shell;
pub mod shortcut;
pub mod sync;

pub use cache::{fingerprint, IconCache};
pub use hybrid::{default_extractor, HybridExtractor};
pub use sync::{IconService, SyncAborted, SyncTask};

use crate::error::{CoreError, CoreResult};
use crate::paths::extension_lower;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Renders the icon of `source` into a PNG at `dest`.
pub trait IconExtractor: Send + Sync {
    fn extract(&self, source: &Path, dest: &Path) -> CoreResult<()>;

    /// Short name for log lines.
    fn name(&self) -> &'static str;
}

/// Extractor for platforms with no icon capability.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedExtractor;

impl IconExtractor for UnsupportedExtractor {
    fn extract(&self, _source: &Path, _dest: &Path) -> CoreResult<()> {
        Err(CoreError::Unsupported("icon extraction"))
    }

    fn name(&self) -> &'static str {
        "unsupported"
    }
}

/// Precondition for every extractor: the source must exist and be
/// stat-able.
pub fn validate_source(source: &Path) -> CoreResult<fs::Metadata> {
    if source.as_os_str().is_empty() {
        return Err(CoreError::InvalidInput("icon source is empty".into()));
    }
    fs::metadata(source).map_err(|e| CoreError::io("inspecting icon source", source, e))
}

pub fn is_png(source: &Path) -> bool {
    extension_lower(&source.to_string_lossy()) == ".png"
}

/// Copy `source` to `dest` and flush it to disk.
pub fn copy_file(source: &Path, dest: &Path) -> CoreResult<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| CoreError::io("creating icon directory", parent, e))?;
    }
    let bytes = fs::read(source).map_err(|e| CoreError::io("reading icon source", source, e))?;
    let mut file = fs::File::create(dest).map_err(|e| CoreError::io("creating icon", dest, e))?;
    file.write_all(&bytes)
        .and_then(|_| file.sync_all())
        .map_err(|e| CoreError::io("writing icon", dest, e))
}
