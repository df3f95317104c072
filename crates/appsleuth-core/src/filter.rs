//! Uninstaller detection.
//!
//! Shortcuts and executables that only remove software are not worth
//! cataloguing. The check is purely lexical.

use crate::paths::{base_name, trim_quotes};

const UNINSTALL_KEYWORDS: &[&str] = &["uninstall", "卸载"];

const UNINSTALLER_FILE_NAMES: &[&str] = &["uninstall.exe", "uninstaller.exe"];

/// True when any of the four strings identifies an uninstaller.
pub fn is_uninstaller(name: &str, source: &str, target: &str, args: &str) -> bool {
    let fields = [name, source, target, args];
    if fields.iter().any(|f| has_uninstall_keyword(f)) {
        return true;
    }
    [source, target].iter().any(|p| is_uninstaller_file_name(p))
}

fn has_uninstall_keyword(raw: &str) -> bool {
    let lower = raw.to_lowercase();
    UNINSTALL_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// `unins*.exe`, `uninstall.exe` or `uninstaller.exe` as the base name.
fn is_uninstaller_file_name(path: &str) -> bool {
    let base = base_name(trim_quotes(path)).to_lowercase();
    UNINSTALLER_FILE_NAMES.contains(&base.as_str())
        || (base.starts_with("unins") && base.ends_with(".exe"))
}
