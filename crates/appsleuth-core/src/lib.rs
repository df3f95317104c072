//! AppSleuth Core: application discovery and icon resolution.
//!
//! This crate walks launcher locations (desktop, Start Menu), resolves
//! shortcuts, classifies and deduplicates what it finds, and keeps a
//! content-addressed cache of PNG icons for the resulting catalogue. It has
//! no UI dependencies.
//!
//! # Modules
//!
//! - [`scanner`]: root walking, dedup and progress reporting.
//! - [`classify`] / [`filter`]: item typing and uninstaller rejection.
//! - [`resolver`]: shortcut resolution capability.
//! - [`icon`]: icon cache, extractors and the catalogue-wide sync.
//! - [`catalog`]: ingestion of scan results into an [`store::ItemStore`].
//! - [`platform`]: Windows shell integration.
pub mod cancel;
pub mod catalog;
pub mod classify;
pub mod config;
pub mod error;
pub mod filter;
pub mod icon;
pub mod model;
pub mod paths;
pub mod platform;
pub mod resolver;
pub mod scanner;
pub mod store;

pub use cancel::CancelToken;
pub use error::{CoreError, CoreResult, ErrorKind};
