//! In-process icon rendering through the Windows shell and GDI.
//!
//! The largest available size wins. Every handle (icons, device contexts,
//! bitmaps, selections) is owned by a guard that releases it on drop, so
//! early returns cannot leak GDI objects.

use super::raster::{apply_mask_alpha, bgra_to_rgba, make_opaque, mask_stride, write_png};
use super::shortcut::{shortcut_icon_source, IconSource};
use super::{copy_file, is_png, validate_source, IconExtractor};
use crate::error::{CoreError, CoreResult};
use crate::paths::extension_lower;
use crate::platform::windows::ShellLinkSession;
use std::ffi::c_void;
use std::path::Path;
use tracing::debug;
use windows::core::HSTRING;
use windows::Win32::Foundation::{HANDLE, S_OK};
use windows::Win32::Graphics::Gdi::{
    CreateCompatibleDC, CreateDIBSection, DeleteDC, DeleteObject, GetDIBits, SelectObject,
    BITMAPINFO, BITMAPINFOHEADER, BI_RGB, DIB_RGB_COLORS, HBITMAP, HBRUSH, HDC, HGDIOBJ, RGBQUAD,
};
use windows::Win32::UI::Shell::SHDefExtractIconW;
use windows::Win32::UI::WindowsAndMessaging::{
    DestroyIcon, DrawIconEx, GetIconInfo, PrivateExtractIconsW, DI_NORMAL, HICON, ICONINFO,
};

/// Sizes tried in order; the first that yields an icon is used.
const PREFERRED_SIZES: [u32; 6] = [256, 128, 96, 64, 48, 32];

const MAX_PATH: usize = 260;

#[derive(Debug, Default, Clone, Copy)]
pub struct NativeExtractor;

impl IconExtractor for NativeExtractor {
    fn extract(&self, source: &Path, dest: &Path) -> CoreResult<()> {
        validate_source(source)?;
        if is_png(source) {
            return copy_file(source, dest);
        }

        let IconSource { path, index } = icon_source(source);
        let mut last_error = None;
        for size in PREFERRED_SIZES {
            let Some(icon) = load_icon(&path, index, size) else {
                continue;
            };
            match render_icon(&icon, size, dest) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    debug!(source = %path.display(), size, error = %e, "icon render failed");
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| {
            CoreError::Failed(format!("no icon could be extracted from {}", path.display()))
        }))
    }

    fn name(&self) -> &'static str {
        "native"
    }
}

/// For shortcuts, the icon location or target; otherwise the file itself.
fn icon_source(source: &Path) -> IconSource {
    let own = IconSource {
        path: source.to_path_buf(),
        index: 0,
    };
    if extension_lower(&source.to_string_lossy()) != ".lnk" {
        return own;
    }
    let mut session = match ShellLinkSession::open() {
        Ok(s) => s,
        Err(e) => {
            debug!(error = %e, "shell link session unavailable for icon lookup");
            return own;
        }
    };
    if session.load(source).is_err() {
        return own;
    }
    let location = session.icon_location();
    let target = session.raw_target().unwrap_or_default();
    shortcut_icon_source(
        source,
        location.as_ref().map(|(p, i)| (p.as_str(), *i)),
        &target,
    )
    .unwrap_or(own)
}

struct OwnedIcon(HICON);

impl Drop for OwnedIcon {
    fn drop(&mut self) {
        unsafe {
            let _ = DestroyIcon(self.0);
        }
    }
}

struct MemoryDc(HDC);

impl Drop for MemoryDc {
    fn drop(&mut self) {
        unsafe {
            let _ = DeleteDC(self.0);
        }
    }
}

struct GdiObject(HGDIOBJ);

impl Drop for GdiObject {
    fn drop(&mut self) {
        if !self.0.is_invalid() {
            unsafe {
                let _ = DeleteObject(self.0);
            }
        }
    }
}

/// Restores the previously selected object before the DC is released.
struct Selection {
    dc: HDC,
    previous: HGDIOBJ,
}

impl Drop for Selection {
    fn drop(&mut self) {
        unsafe {
            SelectObject(self.dc, self.previous);
        }
    }
}

/// `BITMAPINFO` with room for the two-entry palette of a 1-bpp bitmap.
#[repr(C)]
struct MonoBitmapInfo {
    header: BITMAPINFOHEADER,
    palette: [RGBQUAD; 2],
}

fn load_icon(path: &Path, index: i32, size: u32) -> Option<OwnedIcon> {
    let wide = HSTRING::from(path);
    let mut large = HICON::default();
    let hr = unsafe { SHDefExtractIconW(&wide, index, 0, Some(&mut large), None, size) };
    if hr == S_OK && !large.is_invalid() {
        return Some(OwnedIcon(large));
    }

    let mut name = [0u16; MAX_PATH];
    let encoded: Vec<u16> = path.as_os_str().to_string_lossy().encode_utf16().collect();
    if encoded.len() >= MAX_PATH {
        return None;
    }
    name[..encoded.len()].copy_from_slice(&encoded);
    let mut icons = [HICON::default()];
    let count = unsafe {
        PrivateExtractIconsW(&name, index, size as i32, size as i32, Some(&mut icons), None, 0)
    };
    if count == 0 || count == u32::MAX || icons[0].is_invalid() {
        return None;
    }
    Some(OwnedIcon(icons[0]))
}

fn dib_header(size: u32, bit_count: u16) -> BITMAPINFOHEADER {
    BITMAPINFOHEADER {
        biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
        biWidth: size as i32,
        // Negative height: top-down rows.
        biHeight: -(size as i32),
        biPlanes: 1,
        biBitCount: bit_count,
        biCompression: BI_RGB.0,
        ..Default::default()
    }
}

/// Draw `icon` into a 32-bpp DIB and write it as PNG.
fn render_icon(icon: &OwnedIcon, size: u32, dest: &Path) -> CoreResult<()> {
    let pixel_bytes = size as usize * size as usize * 4;
    let bgra = unsafe {
        let dc = MemoryDc(CreateCompatibleDC(HDC::default()));
        if dc.0.is_invalid() {
            return Err(CoreError::Failed("CreateCompatibleDC failed".into()));
        }
        let info = BITMAPINFO {
            bmiHeader: dib_header(size, 32),
            ..Default::default()
        };
        let mut bits: *mut c_void = std::ptr::null_mut();
        let bitmap = CreateDIBSection(dc.0, &info, DIB_RGB_COLORS, &mut bits, HANDLE::default(), 0)
            .map_err(|e| CoreError::Failed(format!("CreateDIBSection failed: {e}")))?;
        let bitmap = GdiObject(HGDIOBJ(bitmap.0));
        if bits.is_null() {
            return Err(CoreError::Failed("DIB section has no pixel buffer".into()));
        }
        let _selection = Selection {
            dc: dc.0,
            previous: SelectObject(dc.0, bitmap.0),
        };
        DrawIconEx(dc.0, 0, 0, icon.0, size as i32, size as i32, 0, HBRUSH::default(), DI_NORMAL)
            .map_err(|e| CoreError::Failed(format!("DrawIconEx failed: {e}")))?;
        std::slice::from_raw_parts(bits as *const u8, pixel_bytes).to_vec()
    };

    let (mut rgba, has_alpha) = bgra_to_rgba(&bgra);
    if !has_alpha {
        match icon_mask(icon, size) {
            Some(mask) => apply_mask_alpha(&mut rgba, size, size, &mask),
            None => make_opaque(&mut rgba),
        }
    }
    write_png(dest, size, size, &rgba)
}

/// The icon's AND mask as top-down 1-bpp rows, if it can be read.
fn icon_mask(icon: &OwnedIcon, size: u32) -> Option<Vec<u8>> {
    unsafe {
        let mut info = ICONINFO::default();
        GetIconInfo(icon.0, &mut info).ok()?;
        let mask_bitmap = GdiObject(HGDIOBJ(info.hbmMask.0));
        let _color_bitmap = GdiObject(HGDIOBJ(info.hbmColor.0));
        if mask_bitmap.0.is_invalid() {
            return None;
        }

        let dc = MemoryDc(CreateCompatibleDC(HDC::default()));
        if dc.0.is_invalid() {
            return None;
        }
        let mut mono = MonoBitmapInfo {
            header: dib_header(size, 1),
            palette: [RGBQUAD::default(); 2],
        };
        let mut mask = vec![0u8; mask_stride(size) * size as usize];
        let lines = GetDIBits(
            dc.0,
            HBITMAP(mask_bitmap.0 .0),
            0,
            size,
            Some(mask.as_mut_ptr() as *mut c_void),
            &mut mono as *mut MonoBitmapInfo as *mut BITMAPINFO,
            DIB_RGB_COLORS,
        );
        (lines > 0).then_some(mask)
    }
}
