//! Per-root traversal and per-file examination.
//!
//! The walk is serial and sorted so dedup tie-breaking is deterministic.
//! Directories are never candidates. Walk errors (unreadable directories,
//! vanished files) are skipped; only cancellation stops a walk.

use super::dedup::{derive_key, DedupKey, DedupMap};
use super::progress::{root_percent, ProgressSink, ProgressThrottle, ScanProgress};
use crate::cancel::CancelToken;
use crate::classify::{ClassifierContext, WEB_EXTENSIONS};
use crate::error::{CoreError, CoreResult};
use crate::filter::is_uninstaller;
use crate::model::{DiscoveredEntry, ItemType};
use crate::paths::{base_name, extension_lower, trim_quotes};
use crate::platform::shell_display_name;
use crate::resolver::{Resolution, ResolverProvider, ShortcutResolver};
use chrono::{DateTime, Utc};
use compact_str::CompactString;
use std::path::Path;
use std::time::{Instant, SystemTime};
use tracing::{debug, warn};

/// File extensions the scanner considers at all.
pub const CANDIDATE_EXTENSIONS: &[&str] =
    &[".lnk", ".exe", ".url", ".htm", ".html", ".mht", ".mhtml"];

/// Shortcut targets that are icon resources rather than programs.
const ICON_RESOURCE_EXTENSIONS: &[&str] = &[".ico", ".icl", ".dll", ".mun"];

/// Lazily-opened resolver session; at most one open attempt per scan.
///
/// Dropping the session releases the underlying resolver.
pub(crate) struct ResolverSession<'a> {
    provider: &'a dyn ResolverProvider,
    state: SessionState,
}

enum SessionState {
    Unopened,
    Open(Box<dyn ShortcutResolver>),
    Unavailable,
}

impl<'a> ResolverSession<'a> {
    pub(crate) fn new(provider: &'a dyn ResolverProvider) -> Self {
        Self {
            provider,
            state: SessionState::Unopened,
        }
    }

    /// `None` means "resolution skipped": no session, or this shortcut
    /// could not be read.
    pub(crate) fn resolve(&mut self, shortcut: &Path) -> Option<Resolution> {
        if let SessionState::Unopened = self.state {
            self.state = match self.provider.open() {
                Ok(resolver) => SessionState::Open(resolver),
                Err(e) => {
                    if e.is_unsupported() {
                        debug!(error = %e, "shortcut resolution unavailable");
                    } else {
                        warn!(error = %e, "failed to open shortcut resolver");
                    }
                    SessionState::Unavailable
                }
            };
        }
        let SessionState::Open(resolver) = &mut self.state else {
            return None;
        };
        match resolver.resolve(shortcut) {
            Ok(resolution) => Some(resolution),
            Err(e) => {
                debug!(shortcut = %shortcut.display(), error = %e, "shortcut resolution failed");
                None
            }
        }
    }
}

/// Mutable state for one scan invocation.
pub(crate) struct ScanPass<'a> {
    pub(crate) classifier: &'a ClassifierContext,
    pub(crate) session: ResolverSession<'a>,
    pub(crate) dedup: DedupMap,
    pub(crate) sink: &'a dyn ProgressSink,
    pub(crate) cancel: &'a CancelToken,
    pub(crate) throttle: ProgressThrottle,
    pub(crate) scanned: u64,
    pub(crate) dropped_uninstallers: u64,
}

impl ScanPass<'_> {
    /// Walk one root. Returns `Err(Cancelled)` as soon as cancellation is
    /// observed.
    pub(crate) fn walk_root(&mut self, root: &str, index: usize, total: usize) -> CoreResult<()> {
        match std::fs::metadata(root) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                debug!(root, "scan root is not a directory, skipping");
                return Ok(());
            }
            Err(e) => {
                debug!(root, error = %e, "scan root unavailable, skipping");
                return Ok(());
            }
        }

        self.emit_boundary(root, index, total, index);

        let walker = jwalk::WalkDir::new(root)
            .skip_hidden(false)
            .follow_links(false)
            .sort(true)
            .parallelism(jwalk::Parallelism::Serial);

        for entry_result in walker {
            if self.cancel.is_cancelled() {
                return Err(CoreError::Cancelled);
            }
            let entry = match entry_result {
                Ok(e) => e,
                Err(err) => {
                    debug!(root, error = %err, "walk error skipped");
                    continue;
                }
            };
            if entry.file_type().is_dir() {
                continue;
            }

            let path = entry.path();
            self.scanned += 1;
            if self.throttle.ready(Instant::now()) {
                self.sink.progress(ScanProgress {
                    root: root.to_string(),
                    path: path.to_string_lossy().into_owned(),
                    root_index: index + 1,
                    root_total: total,
                    scanned: self.scanned,
                    percent: None,
                });
            }

            let ext = extension_lower(&entry.file_name().to_string_lossy());
            if !CANDIDATE_EXTENSIONS.contains(&ext.as_str()) {
                continue;
            }

            let walk_modified = entry.metadata().ok().and_then(|m| m.modified().ok());
            if let Some((key, discovered)) = self.examine(&path, &ext, walk_modified) {
                self.dedup.offer(key, discovered);
            }
        }

        self.emit_boundary(root, index, total, index + 1);
        Ok(())
    }

    /// Turn one candidate file into a keyed entry, or `None` if it is
    /// filtered out.
    pub(crate) fn examine(
        &mut self,
        path: &Path,
        ext: &str,
        walk_modified: Option<SystemTime>,
    ) -> Option<(DedupKey, DiscoveredEntry)> {
        let source = path.to_string_lossy().into_owned();
        let name = entry_name(path, ext);
        let timestamp = best_timestamp(path, walk_modified);

        let mut item_type = if WEB_EXTENSIONS.contains(&ext) {
            ItemType::Url
        } else {
            ItemType::Application
        };
        let mut target_path = None;
        let target_name;

        let key = match ext {
            ".lnk" => {
                // Unresolved shortcuts skip the uninstaller filter and keep
                // their coarse type and path key.
                let resolution = self.session.resolve(path);
                let mut target = "";
                if let Some(resolution) = &resolution {
                    target = resolution.target.as_str();
                    let args = resolution.arguments.as_str();
                    if is_uninstaller(&name, &source, target, args) {
                        self.dropped_uninstallers += 1;
                        debug!(path = %source, "uninstaller shortcut dropped");
                        return None;
                    }
                    item_type = self
                        .classifier
                        .classify(&source, target, args, item_type);
                    if !resolution.is_empty() {
                        target_path = Some(resolution.target.clone());
                    }
                }
                target_name = Some(shortcut_target_name(&source, target));
                derive_key(&source, resolution.as_ref())
            }
            ".exe" => {
                if is_uninstaller(&name, &source, &source, "") {
                    self.dropped_uninstallers += 1;
                    debug!(path = %source, "uninstaller executable dropped");
                    return None;
                }
                if self.classifier.is_system_binary_path(&source) {
                    item_type = ItemType::System;
                }
                target_name = Some(lower_base_name(&source));
                DedupKey::provisional(&source)
            }
            _ => {
                target_name = None;
                DedupKey::provisional(&source)
            }
        };

        Some((
            key,
            DiscoveredEntry {
                name,
                source_path: source,
                target_path,
                target_name,
                item_type,
                timestamp,
            },
        ))
    }

    fn emit_boundary(&self, root: &str, index: usize, total: usize, finished: usize) {
        self.sink.progress(ScanProgress {
            root: root.to_string(),
            path: root.to_string(),
            root_index: index + 1,
            root_total: total,
            scanned: self.scanned,
            percent: Some(root_percent(finished, total)),
        });
    }
}

/// Stem of the file name; for shortcuts the shell display name wins when
/// available. Falls back to the full file name if the stem is blank.
fn entry_name(path: &Path, ext: &str) -> CompactString {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    if ext == ".lnk" {
        if let Some(display) = shell_display_name(path) {
            return CompactString::new(display);
        }
    }

    let stem = file_name
        .get(..file_name.len().saturating_sub(ext.len()))
        .unwrap_or("")
        .trim();
    if stem.is_empty() {
        CompactString::new(file_name)
    } else {
        CompactString::new(stem)
    }
}

/// Newer of creation and modification time from a fresh `stat`, else the
/// modification time the walk saw, else the epoch.
fn best_timestamp(path: &Path, walk_modified: Option<SystemTime>) -> DateTime<Utc> {
    let from_stat = std::fs::metadata(path).ok().and_then(|meta| {
        [meta.created().ok(), meta.modified().ok()]
            .into_iter()
            .flatten()
            .max()
    });
    from_stat
        .or(walk_modified)
        .map(DateTime::<Utc>::from)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

fn lower_base_name(path: &str) -> CompactString {
    CompactString::new(base_name(trim_quotes(path)).to_lowercase())
}

/// The target's base name, unless the target is missing or only an icon
/// resource; then the shortcut's own name without its extension.
fn shortcut_target_name(source: &str, target: &str) -> CompactString {
    let target = trim_quotes(target);
    if !target.is_empty() && !ICON_RESOURCE_EXTENSIONS.contains(&extension_lower(target).as_str())
    {
        return lower_base_name(target);
    }
    let own = base_name(source).to_lowercase();
    let stripped = own
        .strip_suffix(".lnk")
        .or_else(|| own.strip_suffix(".url"))
        .unwrap_or(&own);
    CompactString::new(stripped)
}
