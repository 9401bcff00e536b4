//! Error taxonomy for the loader library.

use std::path::{Path, PathBuf};
use thiserror::Error;

pub type LoaderResult<T> = Result<T, LoaderError>;

#[derive(Debug, Error)]
pub enum LoaderError {
    /// A required setting was not supplied.
    #[error("{0}")]
    Configuration(String),

    /// The keystore is not a JKS container this codec understands.
    #[error("invalid keystore format: {0}")]
    Format(String),

    /// The trailing digest does not match the password and content.
    #[error("keystore integrity check failed (wrong password or corrupt file)")]
    Integrity,

    /// An entry kind whose extent cannot be determined, so it cannot be kept.
    #[error("unsupported keystore entry tag {tag} at index {index}")]
    UnsupportedEntry { tag: u32, index: usize },

    #[error("alias '{0}' already exists in keystore")]
    DuplicateAlias(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LoaderError {
    pub(crate) fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
