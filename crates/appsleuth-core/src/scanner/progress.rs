//! Scan progress reporting.
//!
//! The scanner pushes [`ScanProgress`] events into a [`ProgressSink`]. Sinks
//! are fire-and-forget; the scanner rate-limits itself with a
//! [`ProgressThrottle`] so a hot walk loop never floods the consumer.

use crate::model::DiscoveredEntry;
use std::time::{Duration, Instant};

/// Default minimum spacing between mid-root progress events.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(200);

/// One progress notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanProgress {
    /// Root currently being walked.
    pub root: String,
    /// Most recently visited file (the root itself at boundaries).
    pub path: String,
    /// 1-based position of `root` in the scan's root list.
    pub root_index: usize,
    pub root_total: usize,
    /// Files visited so far across all roots, candidates or not.
    pub scanned: u64,
    /// Coarse completion, only set at root boundaries.
    pub percent: Option<u8>,
}

/// Lifecycle of one scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Walking { root_index: usize, root_total: usize },
    Emitting,
    Done,
    Cancelled,
    Failed,
}

impl ScanState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ScanState::Done | ScanState::Cancelled | ScanState::Failed)
    }
}

/// Messages sent from a background scan thread.
#[derive(Debug)]
pub enum ScanMessage {
    Progress(ScanProgress),
    Complete {
        entries: Vec<DiscoveredEntry>,
        duration: Duration,
    },
    Cancelled,
    Failed {
        message: String,
    },
}

/// Receives progress from a running scan.
pub trait ProgressSink {
    fn progress(&self, event: ScanProgress);

    fn state_changed(&self, _state: ScanState) {}
}

impl<F> ProgressSink for F
where
    F: Fn(ScanProgress),
{
    fn progress(&self, event: ScanProgress) {
        self(event)
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn progress(&self, _event: ScanProgress) {}
}

/// Last-emitted-timestamp gate for mid-walk progress.
#[derive(Debug, Clone)]
pub struct ProgressThrottle {
    interval: Duration,
    last: Option<Instant>,
}

impl ProgressThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Returns true (and records `now`) if an event may be emitted.
    pub fn ready(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.saturating_duration_since(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

/// Percentage of roots finished, clamped to 0..=100.
pub fn root_percent(finished: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    (finished.saturating_mul(100) / total).min(100) as u8
}
