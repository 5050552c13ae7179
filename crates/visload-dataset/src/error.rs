use std::path::PathBuf;

use thiserror::Error;

/// Result type of dataset operations.
pub type DatasetResult<T> = Result<T, DatasetError>;

/// Error type for dataset download, caching and decoding.
#[derive(Error, Debug)]
pub enum DatasetError {
    /// I/O operation error.
    #[error("I/O error at `{path}`: {source}")]
    Io {
        /// File or directory being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The remote file could not be fetched.
    #[error("failed to download `{url}`: {reason}")]
    Download {
        /// Requested url.
        url: String,
        /// Failure description.
        reason: String,
    },

    /// A downloaded archive could not be unpacked.
    #[error("failed to unpack archive into `{path}`: {source}")]
    Archive {
        /// Destination directory.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A raw dataset file does not follow its expected binary layout.
    #[error("invalid dataset file `{path}`: {reason}")]
    Format {
        /// File being decoded.
        path: PathBuf,
        /// What was wrong.
        reason: String,
    },

    /// Files are missing from the cache and downloading is disabled.
    #[error("dataset file `{path}` not found and download is disabled")]
    NotFound {
        /// Missing file.
        path: PathBuf,
    },
}

impl DatasetError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn format(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Format {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
