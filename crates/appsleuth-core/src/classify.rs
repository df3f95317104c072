//! Semantic classification of discovered entries.
//!
//! Rules are evaluated in a fixed order and the first match wins. Web and
//! document checks run before the system-path check, so a `.url` file that
//! lives in a "System Tools" Start-Menu folder is still a URL.

use crate::model::ItemType;
use crate::paths::{extension_lower, has_path_prefix, match_key, trim_quotes};
use std::path::Path;

pub const WEB_EXTENSIONS: &[&str] = &[".url", ".htm", ".html", ".mht", ".mhtml"];

pub const DOCUMENT_EXTENSIONS: &[&str] = &[
    ".txt", ".md", ".markdown", ".pdf", ".rtf", ".doc", ".docx", ".xls", ".xlsx", ".ppt",
    ".pptx", ".csv", ".log", ".chm",
];

/// Shell URIs that only the OS itself handles.
pub const SYSTEM_URIS: &[&str] = &["shell:appsfolder", "ms-settings:"];

/// Start-Menu `Programs` subfolders whose shortcuts are OS tools.
pub const SYSTEM_SHORTCUT_FOLDERS: &[&str] =
    &["Administrative Tools", "System Tools", "Windows Tools"];

const SYSTEM_ROOT_CHILDREN: &[&str] = &["System32", "SysWOW64", "SystemApps", "Explorer.exe"];

/// Environment-derived locations the classifier compares against.
///
/// Built once per scan; all stored paths are [`match_key`]s.
#[derive(Debug, Clone, Default)]
pub struct ClassifierContext {
    system_roots: Vec<String>,
    system_shortcut_dirs: Vec<String>,
}

impl ClassifierContext {
    /// `system_roots` are OS binary directories (e.g. `C:\Windows\System32`).
    /// `program_menus` are Start-Menu `Programs` directories; the known
    /// system-tool subfolders beneath them mark a shortcut as a system entry.
    pub fn new<I, J, S, T>(system_roots: I, program_menus: J) -> Self
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        let mut ctx = Self::default();
        for root in system_roots {
            push_unique(&mut ctx.system_roots, match_key(root.as_ref()));
        }
        for menu in program_menus {
            let menu = match_key(menu.as_ref());
            if menu.is_empty() {
                continue;
            }
            for folder in SYSTEM_SHORTCUT_FOLDERS {
                push_unique(
                    &mut ctx.system_shortcut_dirs,
                    format!("{menu}/{}", folder.to_lowercase()),
                );
            }
        }
        ctx
    }

    /// Context for the running machine, from `WINDIR`, `SystemRoot`,
    /// `APPDATA` and `PROGRAMDATA`.
    pub fn from_env() -> Self {
        let mut system_roots = Vec::new();
        for var in ["WINDIR", "SystemRoot"] {
            let Some(base) = non_empty_env(var) else {
                continue;
            };
            for child in SYSTEM_ROOT_CHILDREN {
                system_roots.push(format!("{base}/{child}"));
            }
        }
        let program_menus: Vec<String> = ["APPDATA", "PROGRAMDATA"]
            .into_iter()
            .filter_map(non_empty_env)
            .map(|base| format!("{base}/Microsoft/Windows/Start Menu/Programs"))
            .collect();
        Self::new(system_roots, program_menus)
    }

    /// Classify a resolved shortcut. `fallback` is returned when nothing is
    /// known about the target.
    pub fn classify(
        &self,
        source: &str,
        target: &str,
        args: &str,
        fallback: ItemType,
    ) -> ItemType {
        let target = trim_quotes(target);
        let args = args.trim();
        let target_lower = target.to_lowercase();
        let args_lower = args.to_lowercase();

        if is_web_address(&target_lower) || is_web_address(&args_lower) {
            return ItemType::Url;
        }

        let ext = extension_lower(target);
        if WEB_EXTENSIONS.contains(&ext.as_str()) {
            return ItemType::Url;
        }
        if DOCUMENT_EXTENSIONS.contains(&ext.as_str()) {
            return ItemType::Document;
        }

        if self.is_system_shortcut_source(source)
            || self.is_system_binary_path(target)
            || SYSTEM_URIS.iter().any(|uri| args_lower.contains(uri))
        {
            return ItemType::System;
        }

        if target.is_empty() {
            return fallback;
        }
        if Path::new(target).is_dir() {
            return ItemType::Folder;
        }
        ItemType::Application
    }

    /// Coarse classification of a bare path, used before (or without)
    /// shortcut resolution.
    pub fn classify_path(&self, path: &str) -> ItemType {
        let trimmed = trim_quotes(path);
        let lower = trimmed.to_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            return ItemType::Url;
        }
        if SYSTEM_URIS.iter().any(|uri| lower.starts_with(uri)) {
            return ItemType::System;
        }
        let ext = extension_lower(trimmed);
        if WEB_EXTENSIONS.contains(&ext.as_str()) {
            return ItemType::Url;
        }
        if DOCUMENT_EXTENSIONS.contains(&ext.as_str()) {
            return ItemType::Document;
        }
        if !trimmed.is_empty() && Path::new(trimmed).is_dir() {
            return ItemType::Folder;
        }
        if self.is_system_binary_path(trimmed) {
            return ItemType::System;
        }
        ItemType::Application
    }

    /// Whether `path` lies under one of the OS binary roots.
    pub fn is_system_binary_path(&self, path: &str) -> bool {
        let key = match_key(trim_quotes(path));
        self.system_roots
            .iter()
            .any(|root| has_path_prefix(&key, root))
    }

    /// Whether a shortcut file sits in a system-tools Start-Menu folder.
    pub fn is_system_shortcut_source(&self, source: &str) -> bool {
        let key = match_key(source);
        self.system_shortcut_dirs
            .iter()
            .any(|dir| has_path_prefix(&key, dir))
    }
}

fn is_web_address(lower: &str) -> bool {
    lower.contains("http://") || lower.contains("https://")
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn push_unique(list: &mut Vec<String>, key: String) {
    if !key.is_empty() && !list.contains(&key) {
        list.push(key);
    }
}
