//! Error types for configuration and I/O.

use std::path::PathBuf;

use miette::Diagnostic;

/// Main error type for weft plumbing.
#[derive(thiserror::Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum WeftError {
    /// Reading or writing a file failed.
    #[error("failed to access {path}")]
    #[diagnostic(code(weft::config::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The settings file extension is not one we know how to read.
    #[error("unsupported settings format: {0}")]
    #[diagnostic(
        code(weft::config::format),
        help("use a file ending in .json or .toml")
    )]
    UnsupportedFormat(PathBuf),

    /// JSON (de)serialization error.
    #[error(transparent)]
    #[diagnostic(code(weft::config::json))]
    Json(#[from] serde_json::Error),

    /// TOML parse error.
    #[error(transparent)]
    #[diagnostic(code(weft::config::toml))]
    TomlDe(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error(transparent)]
    #[diagnostic(code(weft::config::toml))]
    TomlSer(#[from] toml::ser::Error),
}

impl WeftError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True when the error means the file simply does not exist yet.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}
