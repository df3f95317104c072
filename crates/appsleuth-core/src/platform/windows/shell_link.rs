//! `IShellLinkW`-backed shortcut reading.

use super::{from_wide, ComApartment};
use crate::error::{CoreError, CoreResult};
use crate::resolver::{Resolution, ResolverProvider, ShortcutResolver};
use std::path::Path;
use tracing::debug;
use windows::core::{Interface, HSTRING};
use windows::Win32::Storage::FileSystem::WIN32_FIND_DATAW;
use windows::Win32::System::Com::{
    CoCreateInstance, IPersistFile, CLSCTX_INPROC_SERVER, STGM_READ,
};
use windows::Win32::UI::Shell::{IShellLinkW, ShellLink, SLGP_RAWPATH};

const PATH_CAPACITY: usize = 1024;

/// One apartment plus one shell-link object, reused for many shortcuts.
///
/// Field order matters: the COM interfaces must be released before the
/// apartment is torn down.
pub struct ShellLinkSession {
    link: IShellLinkW,
    persist: IPersistFile,
    _apartment: ComApartment,
}

impl ShellLinkSession {
    pub fn open() -> CoreResult<Self> {
        let apartment = ComApartment::enter()?;
        let link: IShellLinkW = unsafe { CoCreateInstance(&ShellLink, None, CLSCTX_INPROC_SERVER) }
            .map_err(|e| CoreError::Failed(format!("creating ShellLink: {e}")))?;
        let persist: IPersistFile = link
            .cast()
            .map_err(|e| CoreError::Failed(format!("querying IPersistFile: {e}")))?;
        Ok(Self {
            link,
            persist,
            _apartment: apartment,
        })
    }

    /// Load `shortcut` into the session's link object.
    pub fn load(&mut self, shortcut: &Path) -> CoreResult<()> {
        unsafe { self.persist.Load(&HSTRING::from(shortcut), STGM_READ) }
            .map_err(|e| CoreError::Failed(format!("loading {}: {e}", shortcut.display())))
    }

    /// Raw (unexpanded) target path of the loaded shortcut.
    pub fn raw_target(&self) -> CoreResult<String> {
        let mut buf = [0u16; PATH_CAPACITY];
        let mut find_data = WIN32_FIND_DATAW::default();
        unsafe {
            self.link
                .GetPath(&mut buf, &mut find_data, SLGP_RAWPATH.0 as u32)
        }
        .map_err(|e| CoreError::Failed(format!("reading shortcut target: {e}")))?;
        Ok(from_wide(&buf))
    }

    pub fn arguments(&self) -> CoreResult<String> {
        let mut buf = [0u16; PATH_CAPACITY];
        unsafe { self.link.GetArguments(&mut buf) }
            .map_err(|e| CoreError::Failed(format!("reading shortcut arguments: {e}")))?;
        Ok(from_wide(&buf))
    }

    /// `(path, index)` of the shortcut's explicit icon, if it has one.
    pub fn icon_location(&self) -> Option<(String, i32)> {
        let mut buf = [0u16; PATH_CAPACITY];
        let mut index = 0i32;
        unsafe { self.link.GetIconLocation(&mut buf, &mut index) }.ok()?;
        let path = from_wide(&buf);
        (!path.trim().is_empty()).then_some((path, index))
    }
}

impl ShortcutResolver for ShellLinkSession {
    fn resolve(&mut self, shortcut: &Path) -> CoreResult<Resolution> {
        self.load(shortcut)?;
        let target = self.raw_target()?;
        let arguments = self.arguments().unwrap_or_else(|e| {
            debug!(shortcut = %shortcut.display(), error = %e, "shortcut arguments unreadable");
            String::new()
        });
        Ok(Resolution::from_raw(shortcut, &target, &arguments))
    }
}

/// Opens [`ShellLinkSession`]s on the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellLinkProvider;

impl ResolverProvider for ShellLinkProvider {
    fn open(&self) -> CoreResult<Box<dyn ShortcutResolver>> {
        Ok(Box::new(ShellLinkSession::open()?))
    }
}
