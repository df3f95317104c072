//! Out-of-process fallback extractor.
//!
//! Runs Windows PowerShell with System.Drawing's `ExtractAssociatedIcon`.
//! Paths travel through environment variables, never through the script
//! text, so no quoting is involved.

use super::{copy_file, is_png, validate_source, IconExtractor};
use crate::error::{CoreError, CoreResult};
use std::path::Path;
use std::process::Command;
use tracing::debug;

const SOURCE_ENV: &str = "APPSLEUTH_ICON_SOURCE";
const DEST_ENV: &str = "APPSLEUTH_ICON_DEST";

const EXTRACT_SCRIPT: &str = r#"
$ErrorActionPreference = 'Stop'
Add-Type -AssemblyName System.Drawing
$source = $env:APPSLEUTH_ICON_SOURCE
$dest = $env:APPSLEUTH_ICON_DEST
if ($source.ToLowerInvariant().EndsWith('.lnk')) {
    $link = (New-Object -ComObject WScript.Shell).CreateShortcut($source)
    $candidate = ''
    if ($link.IconLocation) { $candidate = ($link.IconLocation -split ',')[0].Trim('"', ' ') }
    if (-not $candidate -or $candidate.ToLowerInvariant().EndsWith('.lnk') -or -not (Test-Path -LiteralPath $candidate)) {
        $candidate = $link.TargetPath
    }
    if ($candidate -and (Test-Path -LiteralPath $candidate)) { $source = $candidate }
}
$icon = [System.Drawing.Icon]::ExtractAssociatedIcon($source)
if ($null -eq $icon) { throw "no associated icon for $source" }
$bitmap = $icon.ToBitmap()
try {
    $bitmap.Save($dest, [System.Drawing.Imaging.ImageFormat]::Png)
} finally {
    $bitmap.Dispose()
    $icon.Dispose()
}
"#;

#[derive(Debug, Clone)]
pub struct ShellExtractor {
    program: String,
}

impl Default for ShellExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ShellExtractor {
    pub fn new() -> Self {
        Self::with_program("powershell")
    }

    /// Use a different PowerShell executable (e.g. `pwsh`).
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command(&self, source: &Path, dest: &Path) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args([
                "-NoProfile",
                "-NonInteractive",
                "-ExecutionPolicy",
                "Bypass",
                "-Command",
                EXTRACT_SCRIPT,
            ])
            .env(SOURCE_ENV, source)
            .env(DEST_ENV, dest);
        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            const CREATE_NO_WINDOW: u32 = 0x0800_0000;
            command.creation_flags(CREATE_NO_WINDOW);
        }
        command
    }
}

impl IconExtractor for ShellExtractor {
    fn extract(&self, source: &Path, dest: &Path) -> CoreResult<()> {
        validate_source(source)?;
        if is_png(source) {
            return copy_file(source, dest);
        }

        let output = match self.command(source, dest).output() {
            Ok(output) => output,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(program = %self.program, "icon shell not installed");
                return Err(CoreError::Unsupported("icon extraction shell"));
            }
            Err(e) => return Err(CoreError::io("running icon shell", source, e)),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!(
                source = %source.display(),
                status = ?output.status.code(),
                stderr = %stderr.trim(),
                "shell icon extraction failed"
            );
            return Err(CoreError::Failed(format!(
                "icon shell exited with {:?} for {}",
                output.status.code(),
                source.display()
            )));
        }
        if !dest.is_file() {
            return Err(CoreError::Failed(format!(
                "icon shell wrote no image for {}",
                source.display()
            )));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "shell"
    }
}
