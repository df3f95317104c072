//! Locating the real icon source behind a shortcut.
//!
//! A shortcut's explicit icon location wins over its target, except when
//! the location is itself another shortcut. Candidates that do not exist
//! verbatim are retried truncated after the first executable-like
//! extension, which recovers paths carrying trailing arguments or `,index`
//! suffixes.

use crate::paths::{expand_percent_env, extension_lower, resolve_relative_to, trim_quotes};
use std::path::{Path, PathBuf};

const ICON_BEARING_EXTENSIONS: &[&str] = &[".exe", ".dll", ".cpl", ".msc", ".ico"];

/// Where to pull a shortcut's icon from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconSource {
    pub path: PathBuf,
    pub index: i32,
}

/// Choose the icon source for `shortcut` from its icon location and target.
pub fn shortcut_icon_source(
    shortcut: &Path,
    icon_location: Option<(&str, i32)>,
    target: &str,
) -> Option<IconSource> {
    if let Some((location, index)) = icon_location {
        if extension_lower(trim_quotes(location)) != ".lnk" {
            if let Some(path) = resolve_icon_candidate(shortcut, location) {
                return Some(IconSource { path, index });
            }
        }
    }
    resolve_icon_candidate(shortcut, target).map(|path| IconSource { path, index: 0 })
}

/// Unquote, expand, anchor and clean `raw`; return it if something exists
/// there (directly or after truncation).
pub fn resolve_icon_candidate(shortcut: &Path, raw: &str) -> Option<PathBuf> {
    let unquoted = trim_quotes(raw);
    if unquoted.is_empty() {
        return None;
    }
    let expanded = expand_percent_env(unquoted);
    let candidate = resolve_relative_to(shortcut, &expanded);
    if candidate.exists() {
        return Some(candidate);
    }
    let truncated = truncate_after_icon_extension(&expanded)?;
    let candidate = resolve_relative_to(shortcut, truncated);
    candidate.exists().then_some(candidate)
}

fn truncate_after_icon_extension(raw: &str) -> Option<&str> {
    let lower = raw.to_ascii_lowercase();
    ICON_BEARING_EXTENSIONS
        .iter()
        .filter_map(|ext| lower.find(ext).map(|idx| idx + ext.len()))
        .min()
        .filter(|&end| end < raw.len())
        .map(|end| &raw[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn truncation_drops_trailing_noise() {
        assert_eq!(truncate_after_icon_extension(r"C:\x\app.exe,0"), Some(r"C:\x\app.exe"));
        assert_eq!(
            truncate_after_icon_extension(r"C:\x\tool.DLL -foo"),
            Some(r"C:\x\tool.DLL")
        );
        assert_eq!(truncate_after_icon_extension(r"C:\x\app.exe"), None);
        assert_eq!(truncate_after_icon_extension(r"C:\x\readme.txt"), None);
    }

    #[test]
    fn explicit_icon_location_wins() {
        let dir = tempfile::TempDir::new().unwrap();
        let icon = dir.path().join("brand.ico");
        let target = dir.path().join("app.exe");
        fs::write(&icon, b"ico").unwrap();
        fs::write(&target, b"exe").unwrap();
        let shortcut = dir.path().join("App.lnk");

        let chosen = shortcut_icon_source(
            &shortcut,
            Some((icon.to_str().unwrap(), 3)),
            target.to_str().unwrap(),
        )
        .unwrap();
        assert_eq!(chosen.path, icon);
        assert_eq!(chosen.index, 3);
    }

    #[test]
    fn shortcut_icon_locations_and_missing_files_fall_back_to_target() {
        let dir = tempfile::TempDir::new().unwrap();
        let target = dir.path().join("app.exe");
        fs::write(&target, b"exe").unwrap();
        let shortcut = dir.path().join("App.lnk");
        let other_lnk = dir.path().join("Other.lnk");
        fs::write(&other_lnk, b"lnk").unwrap();

        let via_lnk = shortcut_icon_source(
            &shortcut,
            Some((other_lnk.to_str().unwrap(), 1)),
            target.to_str().unwrap(),
        )
        .unwrap();
        assert_eq!(via_lnk, IconSource { path: target.clone(), index: 0 });

        let via_missing =
            shortcut_icon_source(&shortcut, Some(("/nowhere/x.ico", 0)), "app.exe").unwrap();
        assert_eq!(via_missing.path, target);
    }

    #[test]
    fn nothing_resolvable_is_none() {
        let dir = tempfile::TempDir::new().unwrap();
        let shortcut = dir.path().join("App.lnk");
        assert_eq!(shortcut_icon_source(&shortcut, None, ""), None);
        assert_eq!(shortcut_icon_source(&shortcut, None, "missing.exe"), None);
    }
}
