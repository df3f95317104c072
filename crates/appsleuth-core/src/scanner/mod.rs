//! Scanner: walks configured roots for launchable entries.
//!
//! Each root is walked serially, in sorted order:
//! - **Examine:** every candidate file gets a display name and the newer of
//!   its creation and modification times.
//! - **Resolve:** `.lnk` files go through one lazily-opened resolver
//!   session. Only resolved shortcuts face the uninstaller filter and full
//!   classification; unresolved ones keep their coarse type.
//! - **Deduplicate:** entries are keyed by resolved target plus arguments
//!   (or by source path) and the newest per key survives.
//!
//! The result is **all-or-nothing**: a cancelled scan returns
//! [`CoreError::Cancelled`] and discards everything collected so far.
//!
//! [`Scanner::scan`] runs synchronously on the calling thread and reports
//! every [`ScanState`] transition to its sink; [`start_scan`] runs it on a
//! background thread and reports through a crossbeam channel.

pub mod dedup;
pub mod progress;
pub mod walk;

use crate::cancel::CancelToken;
use crate::classify::ClassifierContext;
use crate::config::EngineConfig;
use crate::error::{CoreError, CoreResult};
use crate::model::DiscoveredEntry;
use crate::paths::normalize_roots;
use crate::resolver::{default_resolver_provider, ResolverProvider};
use dedup::DedupMap;
use progress::{
    ProgressSink, ProgressThrottle, ScanMessage, ScanProgress, ScanState,
    DEFAULT_PROGRESS_INTERVAL,
};
use walk::{ResolverSession, ScanPass};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::info;

/// Well-known launcher locations: the user's desktop and both Start Menus.
pub fn default_roots() -> Vec<String> {
    let mut roots: Vec<PathBuf> = Vec::new();
    if let Some(desktop) = dirs::desktop_dir().or_else(|| dirs::home_dir().map(|h| h.join("Desktop")))
    {
        roots.push(desktop);
    }
    for var in ["APPDATA", "PROGRAMDATA"] {
        if let Some(base) = std::env::var_os(var).filter(|v| !v.is_empty()) {
            roots.push(
                PathBuf::from(base)
                    .join("Microsoft")
                    .join("Windows")
                    .join("Start Menu"),
            );
        }
    }
    normalize_roots(roots.iter().map(|p| p.to_string_lossy()))
}

/// A configured scan.
pub struct Scanner {
    roots: Vec<String>,
    classifier: ClassifierContext,
    resolvers: Arc<dyn ResolverProvider>,
    progress_interval: Duration,
}

impl Scanner {
    /// Scanner over `roots` (normalized). An empty list scans
    /// [`default_roots`].
    pub fn new<I, S>(roots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            roots: normalize_roots(roots),
            classifier: ClassifierContext::from_env(),
            resolvers: default_resolver_provider(),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(&config.scan_roots).with_progress_interval(config.progress_interval())
    }

    pub fn with_classifier(mut self, classifier: ClassifierContext) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_resolver_provider(mut self, provider: Arc<dyn ResolverProvider>) -> Self {
        self.resolvers = provider;
        self
    }

    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    /// The roots this scan will walk.
    pub fn roots(&self) -> Vec<String> {
        if self.roots.is_empty() {
            default_roots()
        } else {
            self.roots.clone()
        }
    }

    /// Walk every root and return the deduplicated entries in first-seen
    /// key order.
    pub fn scan(
        &self,
        cancel: &CancelToken,
        sink: &dyn ProgressSink,
    ) -> CoreResult<Vec<DiscoveredEntry>> {
        let start = Instant::now();
        let roots = self.roots();
        let total = roots.len();
        info!(roots = total, "scan started");

        let mut pass = ScanPass {
            classifier: &self.classifier,
            session: ResolverSession::new(self.resolvers.as_ref()),
            dedup: DedupMap::new(),
            sink,
            cancel,
            throttle: ProgressThrottle::new(self.progress_interval),
            scanned: 0,
            dropped_uninstallers: 0,
        };

        for (index, root) in roots.iter().enumerate() {
            sink.state_changed(ScanState::Walking {
                root_index: index + 1,
                root_total: total,
            });
            if let Err(e) = pass.walk_root(root, index, total) {
                info!(root = %root, scanned = pass.scanned, "scan stopped: {e}");
                sink.state_changed(match e {
                    CoreError::Cancelled => ScanState::Cancelled,
                    _ => ScanState::Failed,
                });
                return Err(e);
            }
        }

        sink.state_changed(ScanState::Emitting);
        let scanned = pass.scanned;
        let dropped = pass.dropped_uninstallers;
        let entries = pass.dedup.into_entries();
        info!(
            scanned,
            dropped_uninstallers = dropped,
            entries = entries.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "scan finished"
        );
        sink.state_changed(ScanState::Done);
        Ok(entries)
    }
}

/// Capacity of the background-scan message channel. Progress messages are
/// dropped rather than blocking the walk when it is full.
pub const PROGRESS_CHANNEL_CAPACITY: usize = 4_096;

/// Handle to a scan running on a background thread.
pub struct ScanHandle {
    /// Progress followed by exactly one terminal message.
    pub progress_rx: Receiver<ScanMessage>,
    cancel: CancelToken,
    state: Arc<Mutex<ScanState>>,
    _thread: Option<thread::JoinHandle<()>>,
}

impl ScanHandle {
    /// Request the scan to stop at the next file boundary.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn state(&self) -> ScanState {
        *self.state.lock()
    }
}

/// Forwards progress into the channel and mirrors state into the handle.
struct ChannelSink {
    tx: Sender<ScanMessage>,
    state: Arc<Mutex<ScanState>>,
}

impl ProgressSink for ChannelSink {
    fn progress(&self, event: ScanProgress) {
        let _ = self.tx.try_send(ScanMessage::Progress(event));
    }

    fn state_changed(&self, state: ScanState) {
        *self.state.lock() = state;
    }
}

/// Run `scanner` on a new thread.
pub fn start_scan(scanner: Scanner) -> ScanHandle {
    let (tx, progress_rx) = crossbeam_channel::bounded::<ScanMessage>(PROGRESS_CHANNEL_CAPACITY);
    let cancel = CancelToken::new();
    let state = Arc::new(Mutex::new(ScanState::Idle));

    let thread_cancel = cancel.clone();
    let sink = ChannelSink {
        tx: tx.clone(),
        state: state.clone(),
    };

    let thread = thread::Builder::new()
        .name("appsleuth-scanner".into())
        .spawn(move || {
            let start = Instant::now();
            // `scan` records the terminal state before returning.
            let message = match scanner.scan(&thread_cancel, &sink) {
                Ok(entries) => ScanMessage::Complete {
                    entries,
                    duration: start.elapsed(),
                },
                Err(CoreError::Cancelled) => ScanMessage::Cancelled,
                Err(e) => ScanMessage::Failed {
                    message: e.to_string(),
                },
            };
            let _ = tx.send(message);
        })
        .expect("failed to spawn scanner thread");

    ScanHandle {
        progress_rx,
        cancel,
        state,
        _thread: Some(thread),
    }
}
