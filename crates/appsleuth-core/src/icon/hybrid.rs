//! Ordered extractor strategies with first-success semantics.

use super::IconExtractor;
use crate::error::{CoreError, CoreResult};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Tries `primary`, then `fallback`; the first success wins.
///
/// When every strategy fails the first error (the primary's, if there is a
/// primary) is returned. With no strategies at all the result is
/// `Unsupported`.
pub struct HybridExtractor {
    primary: Option<Arc<dyn IconExtractor>>,
    fallback: Option<Arc<dyn IconExtractor>>,
}

impl HybridExtractor {
    pub fn new(
        primary: Option<Arc<dyn IconExtractor>>,
        fallback: Option<Arc<dyn IconExtractor>>,
    ) -> Self {
        Self { primary, fallback }
    }
}

impl IconExtractor for HybridExtractor {
    fn extract(&self, source: &Path, dest: &Path) -> CoreResult<()> {
        let mut failure: Option<CoreError> = None;
        for strategy in [&self.primary, &self.fallback].into_iter().flatten() {
            match strategy.extract(source, dest) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    debug!(
                        strategy = strategy.name(),
                        source = %source.display(),
                        error = %e,
                        "icon strategy failed"
                    );
                    let _ = std::fs::remove_file(dest);
                    if failure.is_none() {
                        failure = Some(e);
                    }
                }
            }
        }
        Err(failure.unwrap_or(CoreError::Unsupported("icon extraction")))
    }

    fn name(&self) -> &'static str {
        "hybrid"
    }
}

/// The extractor for the running platform: native rendering with a
/// PowerShell fallback on Windows, unsupported elsewhere.
pub fn default_extractor() -> Arc<dyn IconExtractor> {
    #[cfg(windows)]
    {
        Arc::new(HybridExtractor::new(
            Some(Arc::new(super::native::NativeExtractor)),
            Some(Arc::new(super::shell::ShellExtractor::new())),
        ))
    }
    #[cfg(not(windows))]
    {
        Arc::new(super::UnsupportedExtractor)
    }
}
