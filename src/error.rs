//! # Error Handling
//!
//! This module defines the centralized error type for `descriptor-merge`. It
//! uses the `thiserror` library to build one `Error` enum that covers every
//! failure mode of the merge engine, the scoped cache and the adapters around
//! them.
//!
//! ## Key Components
//!
//! - **`Error`**: The enum of all errors the library can return. Each variant
//!   carries the context needed to explain the failure.
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.
//!
//! ## Propagation
//!
//! Errors fall into two families:
//!
//! - Cache-layer faults (`CacheEngine`, `LockPoisoned`) are degraded by the
//!   cache templates: reads become misses and failed writes still hand the
//!   computed value back to the caller.
//! - Merge and configuration faults (`Merge`, `UnresolvedCue`,
//!   `Configuration`, `InvalidScope`) always reach the caller. A silently wrong
//!   merged document is worse than a failed request.
//!
//! `Compute` wraps an error raised by a caller-supplied compute callback and
//! is passed through verbatim.

use thiserror::Error;

/// Main error type for descriptor-merge operations
#[derive(Error, Debug)]
pub enum Error {
    /// An operation referenced a cache scope that was never registered.
    #[error("Invalid cache scope: {scope}")]
    InvalidScope { scope: String },

    /// The underlying cache store failed (poisoned state, allocation, I/O).
    #[error("Internal cache engine failure: {message}")]
    CacheEngine { message: String },

    /// A cue could not merge a matched element pair.
    ///
    /// Aborts the whole document merge; no partial document is produced.
    #[error("Merge failure at <{element}>: {message}")]
    Merge { element: String, message: String },

    /// An attribute or configuration entry names a cue that does not exist.
    #[error("Unresolved merge cue '{cue}' (selected by '{attribute}')")]
    UnresolvedCue { attribute: String, cue: String },

    /// A caller-supplied compute callback failed.
    ///
    /// The original error is kept as the source, when one was given.
    #[error("Compute failure: {message}")]
    Compute {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Invalid configuration, either from a config file or from API use.
    #[error("Configuration error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    Configuration {
        message: String,
        /// Optional hint for how to fix the configuration
        hint: Option<String>,
    },

    /// Descriptor markup could not be parsed.
    #[error("XML parsing error: {message}")]
    XmlParse { message: String },

    /// A required descriptor is missing from the content store.
    #[error("Descriptor not found: {url}")]
    DescriptorNotFound { url: String },

    /// A mutex or other lock has been poisoned.
    #[error("Lock poisoned: {context}")]
    LockPoisoned { context: String },

    /// An error occurred during serialization.
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A regular expression error, wrapped from `regex::Error`.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// A glob pattern error, wrapped from `glob::PatternError`.
    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),
}

impl Error {
    /// Wrap an arbitrary error raised by a compute callback.
    pub fn compute<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Compute {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// Whether this error belongs to the cache layer and may be degraded.
    pub fn is_cache_fault(&self) -> bool {
        matches!(self, Error::CacheEngine { .. } | Error::LockPoisoned { .. })
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
