//! Windows shell integration: COM apartments, `IShellLinkW` sessions and
//! `SHGetFileInfoW` display names.

mod com;
mod display_name;
pub mod shell_link;

pub use com::ComApartment;
pub use display_name::display_name;
pub use shell_link::{ShellLinkProvider, ShellLinkSession};

/// Decode a NUL-terminated UTF-16 buffer.
pub(crate) fn from_wide(buf: &[u16]) -> String {
    let len = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
    String::from_utf16_lossy(&buf[..len])
}
