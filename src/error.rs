use std::borrow::Cow;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias used by the loaders, the enhancer and the I/O layers.
pub(crate) type Result<T> = std::result::Result<T, OuiError>;

/// Failures that stop the operation using the affected source.
///
/// Row-level problems (short rows, unknown header layouts, missing registry
/// files) are not errors; they are counted in `RegistryStats` instead.
#[derive(Debug, Error)]
pub(crate) enum OuiError {
    #[error("source not found: {}", path.display())]
    MissingSource { path: PathBuf },

    #[error("failed to parse {}: {reason}", path.display())]
    Parse {
        path: PathBuf,
        reason: Cow<'static, str>,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },

    #[error("download of {url} failed: {reason}")]
    Download { url: String, reason: String },

    #[error("configuration error: {reason}")]
    Config { reason: Cow<'static, str> },

    #[error("not a MAC address: {input:?}")]
    InvalidMac { input: String },
}

impl OuiError {
    pub(crate) fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io {
            source,
            path: path.into(),
        }
    }

    pub(crate) fn parse(path: impl Into<PathBuf>, reason: impl Into<Cow<'static, str>>) -> Self {
        Self::Parse {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
