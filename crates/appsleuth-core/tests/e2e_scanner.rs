//! End-to-end scanner tests against real temporary directory trees.
//!
//! Shortcuts are plain text files (`target` on the first line, arguments on
//! the second) read by a fake resolver, so the dedup, filtering and
//! classification paths run identically on every host. Timestamps are
//! pinned with `set_modified` into the future so they dominate creation
//! time.
use appsleuth_core::classify::ClassifierContext;
use appsleuth_core::error::{CoreError, CoreResult};
use appsleuth_core::model::ItemType;
use appsleuth_core::resolver::{
    Resolution, ResolverProvider, ShortcutResolver, UnsupportedResolverProvider,
};
use appsleuth_core::scanner::progress::{
    NullProgress, ProgressSink, ScanMessage, ScanProgress, ScanState,
};
use appsleuth_core::scanner::{start_scan, ScanHandle, Scanner};
use appsleuth_core::CancelToken;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Counts sessions opened and released.
#[derive(Default)]
struct TextShortcuts {
    opens: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

struct TextSession {
    closes: Arc<AtomicUsize>,
}

impl Drop for TextSession {
    fn drop(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

impl ShortcutResolver for TextSession {
    fn resolve(&mut self, shortcut: &Path) -> CoreResult<Resolution> {
        let text = fs::read_to_string(shortcut)
            .map_err(|e| CoreError::io("reading test shortcut", shortcut, e))?;
        if text.starts_with('!') {
            return Err(CoreError::Failed("corrupt shortcut".into()));
        }
        let mut lines = text.lines();
        let target = lines.next().unwrap_or("");
        let args = lines.next().unwrap_or("");
        Ok(Resolution::from_raw(shortcut, target, args))
    }
}

impl ResolverProvider for TextShortcuts {
    fn open(&self) -> CoreResult<Box<dyn ShortcutResolver>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(TextSession {
            closes: self.closes.clone(),
        }))
    }
}

fn shortcut(path: &Path, target: &str, args: &str) {
    fs::write(path, format!("{target}\n{args}\n")).unwrap();
}

/// Pin the modification time `offset_secs` into the future.
fn age(path: &Path, offset_secs: u64) {
    let when = SystemTime::now() + Duration::from_secs(offset_secs);
    fs::File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(when)
        .unwrap();
}

fn scanner(root: &Path, provider: Arc<TextShortcuts>) -> Scanner {
    Scanner::new([root.to_string_lossy()])
        .with_resolver_provider(provider)
        .with_classifier(ClassifierContext::default())
}

fn names(entries: &[appsleuth_core::model::DiscoveredEntry]) -> Vec<String> {
    let mut names: Vec<String> = entries.iter().map(|e| e.name.to_string()).collect();
    names.sort();
    names
}

/// Drain messages until the terminal one, failing after 30 seconds.
fn drain_to_completion(handle: &ScanHandle) -> ScanMessage {
    let deadline = std::time::Instant::now() + Duration::from_secs(30);
    loop {
        assert!(
            std::time::Instant::now() < deadline,
            "scanner did not finish within 30 seconds"
        );
        match handle.progress_rx.try_recv() {
            Ok(ScanMessage::Progress(_)) => continue,
            Ok(terminal) => return terminal,
            Err(crossbeam_channel::TryRecvError::Empty) => {
                std::thread::sleep(Duration::from_millis(10));
            }
            Err(crossbeam_channel::TryRecvError::Disconnected) => {
                panic!("scanner channel disconnected before a terminal message");
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

/// Two shortcuts to the same target collapse to the newer one.
#[test]
fn newest_duplicate_shortcut_wins() {
    let tmp = TempDir::new().unwrap();
    let app = tmp.path().join("App.lnk");
    let copy = tmp.path().join("App (copy).lnk");
    shortcut(&app, r"C:\Apps\App.exe", "");
    shortcut(&copy, r"C:\Apps\App.exe", "");
    age(&app, 3_600);
    age(&copy, 7_200);

    let provider = Arc::new(TextShortcuts::default());
    let entries = scanner(tmp.path(), provider)
        .scan(&CancelToken::new(), &NullProgress)
        .unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, "App (copy)");
    assert_eq!(entries[0].target_path.as_deref(), Some(r"C:\Apps\App.exe"));
    assert_eq!(entries[0].target_name.as_deref(), Some("app.exe"));
    assert_eq!(entries[0].item_type, ItemType::Application);
}

/// Reversing the timestamps flips the survivor.
#[test]
fn older_copy_loses_even_when_seen_first() {
    let tmp = TempDir::new().unwrap();
    let app = tmp.path().join("App.lnk");
    let copy = tmp.path().join("App (copy).lnk");
    shortcut(&app, r"C:\Apps\App.exe", "");
    shortcut(&copy, r"C:\Apps\App.exe", "");
    age(&app, 7_200);
    age(&copy, 3_600);

    let entries = scanner(tmp.path(), Arc::new(TextShortcuts::default()))
        .scan(&CancelToken::new(), &NullProgress)
        .unwrap();
    assert_eq!(names(&entries), vec!["App"]);
}

/// Different arguments mean different items.
#[test]
fn arguments_keep_shortcuts_apart() {
    let tmp = TempDir::new().unwrap();
    shortcut(&tmp.path().join("Work.lnk"), r"C:\Apps\Browser.exe", "--profile work");
    shortcut(&tmp.path().join("Home.lnk"), r"C:\Apps\Browser.exe", "--profile home");

    let entries = scanner(tmp.path(), Arc::new(TextShortcuts::default()))
        .scan(&CancelToken::new(), &NullProgress)
        .unwrap();
    assert_eq!(names(&entries), vec!["Home", "Work"]);
}

/// Resolved uninstallers are dropped; non-candidates are never looked at;
/// a shortcut that cannot be resolved is kept whatever its name.
#[test]
fn uninstallers_never_surface() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    shortcut(&root.join("Uninstall Foo.lnk"), r"C:\Apps\Foo\foo.exe", "");
    shortcut(&root.join("Remove Tool.lnk"), r"C:\Apps\Tool\unins000.exe", "");
    shortcut(&root.join("Remove Other.lnk"), r"'C:\Apps\Other\unins001.exe'", "");
    fs::write(root.join("Uninstall Bar.lnk"), b"!garbage").unwrap();
    shortcut(&root.join("Foo.lnk"), r"C:\Apps\Foo\foo.exe", "");
    fs::create_dir_all(root.join("Tool")).unwrap();
    fs::write(root.join("Tool").join("unins000.exe"), b"MZ").unwrap();
    fs::write(root.join("Tool").join("Uninstall.exe"), b"MZ").unwrap();
    fs::write(root.join("Tool").join("tool.exe"), b"MZ").unwrap();
    fs::write(root.join("MyApp_Uninstaller_Notes.txt"), b"notes").unwrap();
    fs::write(root.join("Uninstall Guide.url"), b"[InternetShortcut]").unwrap();

    let entries = scanner(root, Arc::new(TextShortcuts::default()))
        .scan(&CancelToken::new(), &NullProgress)
        .unwrap();
    assert_eq!(names(&entries), vec!["Foo", "Uninstall Bar", "Uninstall Guide", "tool"]);
}

/// Without shortcut resolution an "Uninstall" shortcut surfaces under its
/// own path.
#[test]
fn unresolved_uninstall_shortcut_is_kept() {
    let tmp = TempDir::new().unwrap();
    shortcut(&tmp.path().join("Uninstall Foo.lnk"), r"C:\Apps\Foo\unins000.exe", "");

    let entries = Scanner::new([tmp.path().to_string_lossy()])
        .with_resolver_provider(Arc::new(UnsupportedResolverProvider))
        .with_classifier(ClassifierContext::default())
        .scan(&CancelToken::new(), &NullProgress)
        .unwrap();
    assert_eq!(names(&entries), vec!["Uninstall Foo"]);
    assert_eq!(entries[0].item_type, ItemType::Application);
    assert!(entries[0].target_path.is_none());
}

/// Single-quoted targets and arguments key exactly like bare ones.
#[test]
fn quoted_targets_share_a_key() {
    let tmp = TempDir::new().unwrap();
    let bare = tmp.path().join("App.lnk");
    let quoted = tmp.path().join("App Quoted.lnk");
    shortcut(&bare, r"C:\Apps\App.exe", "");
    shortcut(&quoted, r"'C:\Apps\App.exe'", "'--fast'");
    shortcut(&tmp.path().join("Fast.lnk"), r"C:\Apps\App.exe", "--fast");
    age(&bare, 3_600);
    age(&quoted, 7_200);

    let entries = scanner(tmp.path(), Arc::new(TextShortcuts::default()))
        .scan(&CancelToken::new(), &NullProgress)
        .unwrap();
    assert_eq!(names(&entries), vec!["App", "App Quoted"]);
}

/// Web documents and executables need no resolver; the session stays closed.
#[test]
fn resolver_is_opened_lazily_and_released_once() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("Portal.url"), b"[InternetShortcut]").unwrap();
    fs::write(tmp.path().join("tool.exe"), b"MZ").unwrap();

    let provider = Arc::new(TextShortcuts::default());
    scanner(tmp.path(), provider.clone())
        .scan(&CancelToken::new(), &NullProgress)
        .unwrap();
    assert_eq!(provider.opens.load(Ordering::SeqCst), 0);

    for i in 0..5 {
        shortcut(&tmp.path().join(format!("s{i}.lnk")), &format!(r"C:\Apps\s{i}.exe"), "");
    }
    scanner(tmp.path(), provider.clone())
        .scan(&CancelToken::new(), &NullProgress)
        .unwrap();
    assert_eq!(provider.opens.load(Ordering::SeqCst), 1);
    assert_eq!(provider.closes.load(Ordering::SeqCst), 1);
}

/// Cancelling mid-walk discards everything and still releases the session.
#[test]
fn cancellation_is_all_or_nothing() {
    let tmp = TempDir::new().unwrap();
    for i in 0..10 {
        shortcut(&tmp.path().join(format!("s{i}.lnk")), &format!(r"C:\Apps\s{i}.exe"), "");
    }
    let provider = Arc::new(TextShortcuts::default());
    let cancel = CancelToken::new();
    let trigger = cancel.clone();
    let sink = move |event: ScanProgress| {
        if event.percent.is_none() {
            trigger.cancel();
        }
    };

    let result = scanner(tmp.path(), provider.clone()).scan(&cancel, &sink);
    assert!(matches!(result, Err(CoreError::Cancelled)));
    assert_eq!(provider.opens.load(Ordering::SeqCst), 1);
    assert_eq!(provider.closes.load(Ordering::SeqCst), 1);
}

/// Resolution failures fall back to path identity and coarse typing.
#[test]
fn unresolvable_shortcuts_degrade_gracefully() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("Broken A.lnk"), b"!garbage").unwrap();
    fs::write(tmp.path().join("Broken B.lnk"), b"!garbage").unwrap();

    let entries = scanner(tmp.path(), Arc::new(TextShortcuts::default()))
        .scan(&CancelToken::new(), &NullProgress)
        .unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.item_type == ItemType::Application));
    assert!(entries.iter().all(|e| e.target_path.is_none()));
    assert_eq!(entries[0].target_name.as_deref(), Some("broken a"));
}

/// With no resolver at all, shortcuts still surface by path.
#[test]
fn scans_work_without_shortcut_resolution() {
    let tmp = TempDir::new().unwrap();
    shortcut(&tmp.path().join("A.lnk"), r"C:\Apps\App.exe", "");
    shortcut(&tmp.path().join("B.lnk"), r"C:\Apps\App.exe", "");

    let entries = Scanner::new([tmp.path().to_string_lossy()])
        .with_resolver_provider(Arc::new(UnsupportedResolverProvider))
        .with_classifier(ClassifierContext::default())
        .scan(&CancelToken::new(), &NullProgress)
        .unwrap();
    assert_eq!(names(&entries), vec!["A", "B"]);
}

/// Start-Menu tool folders, system binaries, folders and web targets.
#[test]
fn entries_are_classified_end_to_end() {
    let tmp = TempDir::new().unwrap();
    let programs = tmp.path().join("Start Menu").join("Programs");
    let tools = programs.join("System Tools");
    let windows = tmp.path().join("Windows");
    let system32 = windows.join("System32");
    let projects = tmp.path().join("Projects");
    for dir in [&tools, &system32, &projects] {
        fs::create_dir_all(dir).unwrap();
    }
    fs::write(system32.join("cmd.exe"), b"MZ").unwrap();
    shortcut(&tools.join("Disk Cleanup.lnk"), r"C:\Tools\cleanmgr.exe", "");
    fs::write(tools.join("Help Portal.url"), b"[InternetShortcut]").unwrap();
    shortcut(&tools.join("Manual.lnk"), r"C:\Docs\manual.pdf", "");
    shortcut(&programs.join("Projects.lnk"), &projects.to_string_lossy(), "");
    shortcut(&programs.join("Mail.lnk"), r"C:\Apps\browser.exe", "--app=https://mail.example.com");
    shortcut(&programs.join("Calculator.lnk"), r"C:\Apps\launcher.exe", "shell:AppsFolder\\Calc");

    let ctx = ClassifierContext::new(
        [system32.to_string_lossy()],
        [programs.to_string_lossy()],
    );
    let entries = Scanner::new([tmp.path().to_string_lossy()])
        .with_resolver_provider(Arc::new(TextShortcuts::default()))
        .with_classifier(ctx)
        .scan(&CancelToken::new(), &NullProgress)
        .unwrap();

    let type_of = |name: &str| {
        entries
            .iter()
            .find(|e| e.name == name)
            .unwrap_or_else(|| panic!("{name} missing"))
            .item_type
    };
    assert_eq!(type_of("Disk Cleanup"), ItemType::System);
    assert_eq!(type_of("Help Portal"), ItemType::Url);
    assert_eq!(type_of("Manual"), ItemType::Document);
    assert_eq!(type_of("Projects"), ItemType::Folder);
    assert_eq!(type_of("Mail"), ItemType::Url);
    assert_eq!(type_of("Calculator"), ItemType::System);
    assert_eq!(type_of("cmd"), ItemType::System);
}

/// Missing roots are skipped; boundary progress carries coarse percents.
#[test]
fn progress_reports_root_boundaries() {
    let tmp = TempDir::new().unwrap();
    let a = tmp.path().join("a");
    let b = tmp.path().join("b");
    fs::create_dir_all(&a).unwrap();
    fs::create_dir_all(&b).unwrap();
    fs::write(a.join("one.exe"), b"MZ").unwrap();
    fs::write(a.join("notes.txt"), b"not a candidate").unwrap();
    fs::write(b.join("two.exe"), b"MZ").unwrap();
    let missing = tmp.path().join("missing");

    let events = Mutex::new(Vec::new());
    let sink = |event: ScanProgress| events.lock().unwrap().push(event);
    let entries = Scanner::new([a.to_string_lossy(), missing.to_string_lossy(), b.to_string_lossy()])
        .with_resolver_provider(Arc::new(TextShortcuts::default()))
        .with_classifier(ClassifierContext::default())
        .scan(&CancelToken::new(), &sink)
        .unwrap();
    assert_eq!(names(&entries), vec!["one", "two"]);

    let events = events.into_inner().unwrap();
    let percents: Vec<u8> = events.iter().filter_map(|e| e.percent).collect();
    assert_eq!(percents, vec![0, 33, 66, 100]);
    assert!(events.iter().all(|e| e.root_total == 3));
    // Every file visited counts, not only candidates.
    assert_eq!(events.last().unwrap().scanned, 3);
}

/// A root listed twice (differing only in case or trailing slash) is walked once.
#[test]
fn duplicate_roots_are_walked_once() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("tool.exe"), b"MZ").unwrap();
    let root = tmp.path().to_string_lossy().to_string();
    let scanner = Scanner::new([root.clone(), format!("{root}/"), format!("  {root}  ")]);
    assert_eq!(scanner.roots().len(), 1);
}

/// The background handle delivers entries and ends in `Done`.
#[test]
fn background_scan_completes() {
    let tmp = TempDir::new().unwrap();
    shortcut(&tmp.path().join("App.lnk"), r"C:\Apps\App.exe", "");
    fs::write(tmp.path().join("tool.exe"), b"MZ").unwrap();

    let handle = start_scan(scanner(tmp.path(), Arc::new(TextShortcuts::default())));
    match drain_to_completion(&handle) {
        ScanMessage::Complete { entries, .. } => assert_eq!(names(&entries), vec!["App", "tool"]),
        other => panic!("unexpected terminal message: {other:?}"),
    }
    assert_eq!(handle.state(), ScanState::Done);
}

/// Cancelling a background scan yields `Cancelled`.
#[test]
fn background_scan_can_be_cancelled() {
    let tmp = TempDir::new().unwrap();
    for i in 0..50 {
        fs::write(tmp.path().join(format!("t{i}.exe")), b"MZ").unwrap();
    }
    let handle = start_scan(scanner(tmp.path(), Arc::new(TextShortcuts::default())));
    handle.cancel();
    assert!(handle.is_cancelled());
    match drain_to_completion(&handle) {
        ScanMessage::Cancelled => assert_eq!(handle.state(), ScanState::Cancelled),
        // The walk may finish before the flag is observed.
        ScanMessage::Complete { .. } => assert_eq!(handle.state(), ScanState::Done),
        other => panic!("unexpected terminal message: {other:?}"),
    }
}

/// Records every state transition a scan reports.
#[derive(Default)]
struct StateLog(Mutex<Vec<ScanState>>);

impl ProgressSink for StateLog {
    fn progress(&self, _event: ScanProgress) {}

    fn state_changed(&self, state: ScanState) {
        self.0.lock().unwrap().push(state);
    }
}

/// A synchronous scan walks the state machine through to `Done`.
#[test]
fn synchronous_scan_reports_terminal_state() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("tool.exe"), b"MZ").unwrap();
    let log = StateLog::default();
    scanner(tmp.path(), Arc::new(TextShortcuts::default()))
        .scan(&CancelToken::new(), &log)
        .unwrap();
    assert_eq!(
        log.0.into_inner().unwrap(),
        vec![
            ScanState::Walking {
                root_index: 1,
                root_total: 1
            },
            ScanState::Emitting,
            ScanState::Done,
        ]
    );
}

/// A cancelled synchronous scan ends in `Cancelled`.
#[test]
fn synchronous_scan_reports_cancellation() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("tool.exe"), b"MZ").unwrap();
    let cancel = CancelToken::new();
    cancel.cancel();
    let log = StateLog::default();
    let result = scanner(tmp.path(), Arc::new(TextShortcuts::default())).scan(&cancel, &log);
    assert!(matches!(result, Err(CoreError::Cancelled)));
    assert_eq!(log.0.lock().unwrap().last(), Some(&ScanState::Cancelled));
}
