//! Error types for the cart client.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the cart backend client and the cart provider.
///
/// The four cart mutations never return these directly; remote failures
/// surface through [`crate::SyncTicket`] and
/// [`crate::CartStore::last_sync_error`].
#[derive(Debug, Error)]
pub enum CartError {
    /// HTTP request failed (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status.
    #[error("Cart API returned {status} for {path}")]
    Status {
        /// Response status code.
        status: reqwest::StatusCode,
        /// Request path (without base URL).
        path: String,
    },

    /// Response body was not the expected JSON.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A cart operation was used before the provider mounted a store.
    #[error("cart used outside of a mounted cart provider")]
    NoProvider,

    /// The sync lane stopped before reporting an outcome.
    #[error("sync worker stopped before the request completed")]
    SyncStopped,

    /// The in-memory test backend was told to fail.
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

/// Errors reading or writing the persisted session record.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Filesystem error on the session file.
    #[error("Session file {path}: {source}")]
    Io {
        /// Session file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Session file exists but is not a valid record.
    #[error("Corrupt session record: {0}")]
    Parse(#[from] serde_json::Error),

    /// No default location for the session file on this platform.
    #[error("No data directory available for the session file")]
    NoDataDir,
}

/// Result type alias for `CartError`.
pub type Result<T> = std::result::Result<T, CartError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_error_display() {
        let err = CartError::Status {
            status: reqwest::StatusCode::BAD_GATEWAY,
            path: "/api/cart/u1".to_string(),
        };
        assert_eq!(err.to_string(), "Cart API returned 502 Bad Gateway for /api/cart/u1");

        assert_eq!(
            CartError::NoProvider.to_string(),
            "cart used outside of a mounted cart provider"
        );
    }
}
