//! Shortcut resolution capability.
//!
//! A [`ResolverProvider`] opens a [`ShortcutResolver`] session. Sessions are
//! expensive (on Windows each one owns a COM apartment and a shell-link
//! object), so the scanner opens at most one per scan, reuses it for every
//! `.lnk` it meets, and releases it by dropping it when the scan ends on any
//! path. Sessions are single-threaded and deliberately not `Send`.

use crate::error::{CoreError, CoreResult};
use crate::paths::{expand_percent_env, resolve_relative_to, trim_quotes};
use std::path::Path;
use std::sync::Arc;

/// What a shortcut points at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Absolute, cleaned target path. Empty when the shortcut has no file
    /// target (e.g. a shell namespace item).
    pub target: String,
    pub arguments: String,
}

impl Resolution {
    /// Build a resolution from raw shell-link fields, applying the standard
    /// target post-processing.
    pub fn from_raw(shortcut: &Path, raw_target: &str, raw_arguments: &str) -> Self {
        Self {
            target: finish_target(shortcut, raw_target),
            arguments: trim_quotes(raw_arguments).to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.target.is_empty()
    }
}

/// A live resolution session. Dropping it releases its resources.
pub trait ShortcutResolver {
    fn resolve(&mut self, shortcut: &Path) -> CoreResult<Resolution>;
}

/// Opens resolver sessions. Shared across threads; sessions are not.
pub trait ResolverProvider: Send + Sync {
    fn open(&self) -> CoreResult<Box<dyn ShortcutResolver>>;
}

/// Provider for platforms without a shell-link implementation.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedResolverProvider;

impl ResolverProvider for UnsupportedResolverProvider {
    fn open(&self) -> CoreResult<Box<dyn ShortcutResolver>> {
        Err(CoreError::Unsupported("shortcut resolution"))
    }
}

/// The resolver for the running platform.
pub fn default_resolver_provider() -> Arc<dyn ResolverProvider> {
    #[cfg(windows)]
    {
        Arc::new(crate::platform::windows::ShellLinkProvider)
    }
    #[cfg(not(windows))]
    {
        Arc::new(UnsupportedResolverProvider)
    }
}

/// Unquote, expand `%VAR%`, anchor relative targets at the shortcut's
/// directory and clean. Blank targets stay blank.
pub fn finish_target(shortcut: &Path, raw: &str) -> String {
    let unquoted = trim_quotes(raw);
    if unquoted.is_empty() {
        return String::new();
    }
    let expanded = expand_percent_env(unquoted);
    resolve_relative_to(shortcut, &expanded)
        .to_string_lossy()
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_provider_reports_unsupported() {
        let err = UnsupportedResolverProvider.open().err().unwrap();
        assert!(err.is_unsupported());
    }

    #[test]
    fn blank_targets_stay_blank() {
        let r = Resolution::from_raw(Path::new("/x/a.lnk"), " \"\" ", "  ");
        assert!(r.is_empty());
        assert_eq!(r.arguments, "");
    }

    #[cfg(unix)]
    #[test]
    fn targets_are_unquoted_and_anchored() {
        let r = Resolution::from_raw(
            Path::new("/home/u/Desktop/Tool.lnk"),
            "\"./bin/../tool\"",
            " --flag ",
        );
        assert_eq!(r.target, "/home/u/Desktop/tool");
        assert_eq!(r.arguments, "--flag");
    }

    #[test]
    fn single_quotes_key_like_bare_targets() {
        let shortcut = Path::new("/d/App.lnk");
        let quoted = Resolution::from_raw(shortcut, r"'C:\Apps\App.exe'", " '--fast' ");
        let bare = Resolution::from_raw(shortcut, r"C:\Apps\App.exe", "--fast");
        assert_eq!(quoted, bare);
        assert_eq!(quoted.arguments, "--fast");
    }

    #[cfg(unix)]
    #[test]
    fn unknown_variables_survive_expansion() {
        let r = Resolution::from_raw(
            Path::new("/d/a.lnk"),
            "/opt/%APPSLEUTH_TEST_SURELY_UNSET%/app",
            "",
        );
        assert_eq!(r.target, "/opt/%APPSLEUTH_TEST_SURELY_UNSET%/app");
    }
}
