//! Platform glue. Windows gets shell-link resolution, shell display names
//! and native icon rendering; other hosts fall back to portable defaults.

#[cfg(windows)]
pub mod windows;

use std::path::Path;

/// The name the shell shows for `path`, if the platform provides one.
pub fn shell_display_name(path: &Path) -> Option<String> {
    #[cfg(windows)]
    {
        windows::display_name(path)
    }
    #[cfg(not(windows))]
    {
        let _ = path;
        None
    }
}
