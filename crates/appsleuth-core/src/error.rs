//! Error taxonomy shared by every engine component.
//!
//! Callers branch on [`ErrorKind`] rather than on concrete variants: both
//! `Io` and `Failed` surface as [`ErrorKind::IoFailure`].

use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of a [`CoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Unsupported,
    InvalidInput,
    NotFound,
    IoFailure,
    Cancelled,
}

#[derive(Debug, Error)]
pub enum CoreError {
    /// The capability (resolver, extractor) does not exist on this platform.
    #[error("unsupported: {0}")]
    Unsupported(&'static str),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("{context} ({}): {source}", path.display())]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A platform or external-process failure with no underlying `io::Error`.
    #[error("{0}")]
    Failed(String),

    #[error("operation cancelled")]
    Cancelled,
}

pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    pub fn io(context: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CoreError::Io {
            context,
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::Unsupported(_) => ErrorKind::Unsupported,
            CoreError::InvalidInput(_) => ErrorKind::InvalidInput,
            CoreError::NotFound(_) => ErrorKind::NotFound,
            CoreError::Io { .. } | CoreError::Failed(_) => ErrorKind::IoFailure,
            CoreError::Cancelled => ErrorKind::Cancelled,
        }
    }

    pub fn is_unsupported(&self) -> bool {
        self.kind() == ErrorKind::Unsupported
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_and_failed_share_a_kind() {
        let io = CoreError::io(
            "reading icon",
            "/tmp/x.png",
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        assert_eq!(io.kind(), ErrorKind::IoFailure);
        assert_eq!(CoreError::Failed("boom".into()).kind(), ErrorKind::IoFailure);
    }

    #[test]
    fn io_message_names_the_path() {
        let err = CoreError::io(
            "creating icon cache",
            "/data/icons",
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        let text = err.to_string();
        assert!(text.starts_with("creating icon cache (/data/icons)"), "{text}");
    }
}
