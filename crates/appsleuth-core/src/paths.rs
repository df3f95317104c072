//! Path string utilities: lexical cleaning, case-folded comparison keys,
//! root normalization and `%VAR%` expansion.
//!
//! Everything here works on strings and never touches the filesystem, so
//! Windows-shaped paths (`C:\Apps\App.exe`) are handled identically on every
//! host. Comparison keys always use `/` and lower case.

use std::path::{Path, PathBuf};

#[cfg(windows)]
const NATIVE_SEPARATORS: &[char] = &['\\', '/'];
#[cfg(windows)]
const NATIVE_SEPARATOR: char = '\\';
#[cfg(not(windows))]
const NATIVE_SEPARATORS: &[char] = &['/'];
#[cfg(not(windows))]
const NATIVE_SEPARATOR: char = '/';

const ANY_SEPARATOR: &[char] = &['\\', '/'];

/// Lexically clean `raw` using the host's separator conventions.
///
/// Collapses repeated separators, removes `.` segments and resolves `..`
/// against preceding segments. An empty input cleans to `"."`.
pub fn clean_path(raw: &str) -> String {
    lexical_clean(raw, NATIVE_SEPARATORS, NATIVE_SEPARATOR)
}

/// Case-insensitive, separator-insensitive comparison key for a path.
///
/// Returns an empty string for blank input so callers can test for "no path".
pub fn match_key(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    lexical_clean(trimmed, ANY_SEPARATOR, '/').to_lowercase()
}

/// Whether `key` equals `prefix` or lies beneath it. Both must be
/// [`match_key`] outputs.
pub fn has_path_prefix(key: &str, prefix: &str) -> bool {
    if key.is_empty() || prefix.is_empty() {
        return false;
    }
    if key == prefix {
        return true;
    }
    let prefix = prefix.trim_end_matches('/');
    key.len() > prefix.len() && key.starts_with(prefix) && key.as_bytes()[prefix.len()] == b'/'
}

/// Canonicalize a list of roots.
///
/// Trims, drops blank and `.` entries, cleans each path and removes
/// case-insensitive duplicates, keeping the first spelling seen.
pub fn normalize_roots<I, S>(roots: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for root in roots {
        let trimmed = root.as_ref().trim();
        if trimmed.is_empty() {
            continue;
        }
        let cleaned = clean_path(trimmed);
        if cleaned == "." {
            continue;
        }
        if seen.insert(match_key(&cleaned)) {
            out.push(cleaned);
        }
    }
    out
}

const QUOTES: &[char] = &['"', '\''];

/// Strip surrounding whitespace and quote characters (`"` and `'`).
pub fn trim_quotes(raw: &str) -> &str {
    raw.trim().trim_matches(QUOTES).trim()
}

/// Expand `%NAME%` placeholders from the process environment.
pub fn expand_percent_env(raw: &str) -> String {
    expand_percent_with(raw, |name| std::env::var(name).ok())
}

/// Expand `%NAME%` placeholders using `lookup`.
///
/// Unknown variables are left in place verbatim, `%%` becomes `%`, and an
/// unterminated `%` is copied through.
pub fn expand_percent_with<F>(raw: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    if !raw.contains('%') {
        return raw.to_string();
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(start) = rest.find('%') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let Some(end) = after.find('%') else {
            out.push_str(&rest[start..]);
            return out;
        };
        let name = &after[..end];
        if name.is_empty() {
            out.push('%');
        } else if let Some(value) = lookup(name) {
            out.push_str(&value);
        } else {
            out.push('%');
            out.push_str(name);
            out.push('%');
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    out
}

/// Absolute on the host, or a drive/UNC path in Windows form.
pub fn is_absolute_path(raw: &str) -> bool {
    let raw = raw.trim();
    if raw.is_empty() {
        return false;
    }
    if Path::new(raw).is_absolute() || raw.starts_with("\\\\") {
        return true;
    }
    let bytes = raw.as_bytes();
    bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes[2] == b'\\' || bytes[2] == b'/')
}

/// Final path segment, splitting on either separator.
pub fn base_name(raw: &str) -> &str {
    let trimmed = raw.trim_end_matches(ANY_SEPARATOR);
    match trimmed.rfind(ANY_SEPARATOR) {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}

/// Lower-cased extension including the leading dot, or `""`.
pub fn extension_lower(raw: &str) -> String {
    let base = base_name(raw);
    match base.rfind('.') {
        Some(idx) if idx + 1 < base.len() => base[idx..].to_ascii_lowercase(),
        _ => String::new(),
    }
}

/// Join a relative target onto the directory holding `anchor` and clean it.
/// Absolute targets are cleaned and returned unchanged otherwise.
pub fn resolve_relative_to(anchor: &Path, target: &str) -> PathBuf {
    if is_absolute_path(target) {
        return PathBuf::from(clean_path(target));
    }
    let dir = anchor.parent().unwrap_or_else(|| Path::new(""));
    PathBuf::from(clean_path(&dir.join(target).to_string_lossy()))
}

fn lexical_clean(raw: &str, separators: &[char], out_sep: char) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return ".".to_string();
    }

    let (volume, rest) = split_volume(raw);
    let unc = volume.is_empty()
        && separators.len() > 1
        && rest.len() > 2
        && rest.starts_with(separators)
        && rest[1..].starts_with(separators);
    let rooted = rest.starts_with(separators);

    let mut parts: Vec<&str> = Vec::new();
    for segment in rest.split(separators) {
        match segment {
            "" | "." => {}
            ".." => match parts.last() {
                Some(last) if *last != ".." => {
                    parts.pop();
                }
                _ if rooted => {}
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }

    let mut out = String::with_capacity(raw.len());
    out.push_str(volume);
    if unc {
        out.push(out_sep);
    }
    if rooted {
        out.push(out_sep);
    }
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            out.push(out_sep);
        }
        out.push_str(part);
    }
    if out.is_empty() || (out == volume && !rooted) {
        out.push('.');
    }
    out
}

/// Split a leading `X:` drive designator.
fn split_volume(raw: &str) -> (&str, &str) {
    let bytes = raw.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        raw.split_at(2)
    } else {
        ("", raw)
    }
}
