use super::from_wide;
use std::path::Path;
use windows::core::HSTRING;
use windows::Win32::Storage::FileSystem::FILE_FLAGS_AND_ATTRIBUTES;
use windows::Win32::UI::Shell::{SHGetFileInfoW, SHFILEINFOW, SHGFI_DISPLAYNAME};

/// Shell display name of `path` (for shortcuts, usually the name without
/// `.lnk`). `None` when the shell has nothing to offer.
pub fn display_name(path: &Path) -> Option<String> {
    let mut info = SHFILEINFOW::default();
    let result = unsafe {
        SHGetFileInfoW(
            &HSTRING::from(path),
            FILE_FLAGS_AND_ATTRIBUTES(0),
            Some(&mut info),
            std::mem::size_of::<SHFILEINFOW>() as u32,
            SHGFI_DISPLAYNAME,
        )
    };
    if result == 0 {
        return None;
    }
    let name = from_wide(&info.szDisplayName).trim().to_string();
    (!name.is_empty()).then_some(name)
}
