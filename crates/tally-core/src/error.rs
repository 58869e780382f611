//! Unified error types for all layers of the application.

use std::fmt::Debug;
use thiserror::Error;

/// Unified error type for the Tally transaction service.
///
/// The cache boundary translates every underlying store error into one of
/// these variants exactly once; callers branch on the tagged variants rather
/// than inspecting transport internals.
#[derive(Error, Debug)]
pub enum TallyError {
    // ============ Cache Errors ============
    /// Requested cache key is absent or expired. Expected and non-fatal;
    /// callers fall back to their recompute path.
    #[error("cache key not found: {key}")]
    CacheKeyNotFound { key: String },

    /// A cache write was rejected by the store.
    #[error("cache write failed: {0}")]
    CacheWriteFailed(String),

    /// A pattern-deletion scan aborted mid-iteration. Keys deleted before
    /// the abort stay deleted.
    #[error("cache scan failed: {0}")]
    CacheScanFailed(String),

    /// Another holder currently owns the lease on this resource. Expected
    /// and non-fatal; the work is already in progress elsewhere.
    #[error("lock not obtained: {resource}")]
    LockNotObtained { resource: String },

    /// The store did not answer the liveness probe at startup.
    #[error("cache unreachable at {addr}: {message}")]
    ConnectionUnreachable { addr: String, message: String },

    /// Any other store-side failure crossing the cache boundary.
    #[error("cache error: {0}")]
    Cache(String),

    // ============ Infrastructure Errors ============
    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Validation error
    #[error("validation error: {0}")]
    Validation(String),

    // ============ Internal Errors ============
    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),

    /// Generic error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TallyError {
    /// Returns a machine-readable error code for uniform upstream mapping.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::CacheKeyNotFound { .. } => "CACHE_KEY_NOT_FOUND",
            Self::CacheWriteFailed(_) => "CACHE_WRITE_FAILED",
            Self::CacheScanFailed(_) => "CACHE_SCAN_FAILED",
            Self::LockNotObtained { .. } => "LOCK_NOT_OBTAINED",
            Self::ConnectionUnreachable { .. } => "CONNECTION_UNREACHABLE",
            Self::Cache(_) => "CACHE_ERROR",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Internal(_) | Self::Other(_) => "INTERNAL_ERROR",
        }
    }

    /// Creates a not-found sentinel for a cache key.
    #[must_use]
    pub fn not_found<T: Into<String>>(key: T) -> Self {
        Self::CacheKeyNotFound { key: key.into() }
    }

    /// Creates a lock-contention sentinel for a resource.
    #[must_use]
    pub fn lock_not_obtained<T: Into<String>>(resource: T) -> Self {
        Self::LockNotObtained {
            resource: resource.into(),
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn configuration<T: Into<String>>(message: T) -> Self {
        Self::Configuration(message.into())
    }

    /// Creates a validation error.
    #[must_use]
    pub fn validation<T: Into<String>>(message: T) -> Self {
        Self::Validation(message.into())
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal<T: Into<String>>(message: T) -> Self {
        Self::Internal(message.into())
    }

    /// True for the absent-key sentinel, so callers can branch into their
    /// recompute path without string-matching error text.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::CacheKeyNotFound { .. })
    }

    /// True for the lock-contention sentinel.
    #[must_use]
    pub const fn is_lock_not_obtained(&self) -> bool {
        matches!(self, Self::LockNotObtained { .. })
    }

    /// Checks if this error is retriable.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::Cache(_) | Self::CacheWriteFailed(_) | Self::CacheScanFailed(_)
        )
    }
}

impl From<serde_json::Error> for TallyError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON serialization error: {}", err))
    }
}
