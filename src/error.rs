//! Error types for MSI bundling.
//!
//! Provides contextual error chaining, filesystem errors that carry the
//! offending path, and variants for each failing stage of a build:
//! configuration, toolchain provisioning and toolchain invocation.
//!
//! # Example
//!
//! ```no_run
//! use kodegen_bundler_msi::error::{Context, ErrorExt, Result};
//! use std::path::Path;
//!
//! fn read_manifest(path: &Path) -> Result<toml::Value> {
//!     let contents = std::fs::read_to_string(path)
//!         .fs_context("reading manifest", path)?;
//!     toml::from_str(&contents)
//!         .map_err(|e| kodegen_bundler_msi::Error::Manifest(e.to_string()))
//!         .context("parsing manifest")
//! }
//! ```

use std::{
    fmt::Display,
    io,
    path::{self, PathBuf},
};
use thiserror::Error as DeriveError;

/// Errors returned by the MSI bundler.
#[derive(Debug, DeriveError)]
#[non_exhaustive]
pub enum Error {
    /// Error with context. Created by the [`Context`] trait.
    #[error("{0}: {1}")]
    Context(String, Box<Self>),

    /// File system error with path context.
    ///
    /// Created by the [`ErrorExt`] trait's `fs_context` method.
    #[error("{context} {path}: {error}")]
    Fs {
        /// Context describing the operation (e.g., "writing wxs document")
        context: &'static str,
        /// Path that was being accessed
        path: PathBuf,
        /// The underlying I/O error
        error: io::Error,
    },

    /// A toolchain binary could not be spawned at all.
    #[error("failed to run command {command}: {error}")]
    CommandFailed {
        /// Command that failed to execute
        command: String,
        /// The underlying error
        error: io::Error,
    },

    /// A toolchain binary ran and exited unsuccessfully.
    #[error("{tool} exited with status {code:?}: {stderr}")]
    ToolFailed {
        /// Tool name (candle, light)
        tool: String,
        /// Exit code, if the process was not killed by a signal
        code: Option<i32>,
        /// Captured standard error
        stderr: String,
    },

    /// GUID cache file exists but is not a JSON object of strings.
    #[error("invalid GUID cache {path}: {source}")]
    GuidCache {
        /// Cache file path
        path: PathBuf,
        /// Parse error
        #[source]
        source: serde_json::Error,
    },

    /// Build manifest could not be parsed or is inconsistent.
    #[error("invalid manifest: {0}")]
    Manifest(String),

    /// Target architecture outside the supported set.
    #[error("unsupported architecture: {0} (expected x86 or x64)")]
    InvalidArch(String),

    /// Generic I/O error.
    #[error("{0}")]
    IoError(#[from] io::Error),

    /// Path prefix stripping error.
    #[error("{0}")]
    StripError(#[from] path::StripPrefixError),

    /// JSON serialization error.
    #[error("{0}")]
    JsonError(#[from] serde_json::Error),

    /// HTTP client error (downloading the toolchain).
    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Invalid glob pattern.
    #[error("{0}")]
    GlobPattern(#[from] glob::PatternError),

    /// Glob execution error.
    #[error("{0}")]
    Glob(#[from] glob::GlobError),

    /// Hash mismatch for downloaded files.
    #[error("hash mismatch of downloaded file: expected {expected}, got {actual}")]
    HashMismatch {
        /// Expected hash value
        expected: String,
        /// Actual hash value
        actual: String,
    },

    /// Generic error with custom message.
    #[error("{0}")]
    GenericError(String),
}

impl Error {
    /// Returns a short hint for the user, when the failure has an obvious fix.
    pub fn recovery_hint(&self) -> Option<String> {
        match self {
            Error::Context(_, inner) => inner.recovery_hint(),
            Error::GuidCache { path, .. } => Some(format!(
                "fix or delete {} (deleting it changes the upgrade code)",
                path.display()
            )),
            Error::HttpError(_) | Error::HashMismatch { .. } => Some(
                "check network access, or extract the WiX binaries into the cache directory by hand"
                    .to_string(),
            ),
            Error::CommandFailed { .. } => Some(
                "on non-Windows hosts set [toolchain] runner = \"wine\" in the manifest".to_string(),
            ),
            Error::InvalidArch(_) => Some("use arch = \"x86\" or arch = \"x64\"".to_string()),
            _ => None,
        }
    }
}

/// Convenient type alias for Result.
pub type Result<T> = std::result::Result<T, Error>;

/// Trait for adding context to errors.
///
/// Similar to `anyhow::Context` but integrated with the bundler's [`Error`].
/// Works with both `Result<T, E>` and `Option<T>`.
pub trait Context<T> {
    /// Add context to an error.
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static;

    /// Add context to an error using a closure (lazy evaluation).
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T> Context<T> for Result<T> {
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
    {
        self.map_err(|e| Error::Context(context.to_string(), Box::new(e)))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|e| Error::Context(f().to_string(), Box::new(e)))
    }
}

impl<T> Context<T> for Option<T> {
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
    {
        self.ok_or_else(|| Error::GenericError(context.to_string()))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.ok_or_else(|| Error::GenericError(f().to_string()))
    }
}

/// Extension trait for filesystem operations with automatic path context.
pub trait ErrorExt<T> {
    /// Add filesystem context to an I/O error.
    ///
    /// The `context` should be a present-tense verb phrase describing the operation,
    /// e.g., "reading file", "creating directory".
    fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> ErrorExt<T> for std::result::Result<T, std::io::Error> {
    fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|error| Error::Fs {
            context,
            path: path.into(),
            error,
        })
    }
}

/// Macro for early return with error.
///
/// Converts the message into a [`Error::GenericError`] and returns immediately.
///
/// ```ignore
/// bail!("operation failed");
/// bail!("invalid value: {}", value);
/// ```
#[macro_export]
macro_rules! bail {
    ($msg:literal $(,)?) => {
        return Err($crate::error::Error::GenericError($msg.into()))
    };
    ($err:expr $(,)?) => {
        return Err($crate::error::Error::GenericError($err.to_string()))
    };
    ($fmt:expr, $($arg:tt)*) => {
        return Err($crate::error::Error::GenericError(format!($fmt, $($arg)*)))
    };
}
