//! Defines the error type shared by every fallible operation in this crate.
//!
//! Only I/O-facing operations return [`Result`].
//! Contract violations (e.g., asking a negative [`DataSet`] for a
//! ground-truth residual) are caller errors and panic instead.
//!
//! [`DataSet`]: crate::DataSet
use std::io;
use std::path::PathBuf;

use thiserror::Error;


/// Errors raised while reading lists, images, configurations, and snapshots.
#[derive(Debug, Error)]
pub enum JdaError {
    /// An underlying I/O operation failed.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    /// An image could not be opened or decoded.
    #[error("failed to decode image `{path}`: {source}")]
    Image {
        /// The offending image file.
        path: PathBuf,
        /// The decoder error.
        #[source]
        source: image::ImageError,
    },

    /// The configuration file is not valid JSON for [`Config`].
    ///
    /// [`Config`]: crate::Config
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// A configuration value is out of its valid range.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// A line of a list file cannot be parsed.
    #[error("malformed line {line} in `{path}`: {reason}")]
    MalformedList {
        /// The list file.
        path: PathBuf,
        /// 1-based line number.
        line: usize,
        /// What went wrong.
        reason: String,
    },

    /// A snapshot file is truncated or inconsistent.
    #[error("corrupt snapshot: {0}")]
    Snapshot(String),
}


/// Result type used across this crate.
pub type Result<T> = std::result::Result<T, JdaError>;
