//! CLI command implementations.

pub mod cart;
pub mod session;

use std::path::PathBuf;

use agriverse_cart::{CartConfig, CartError, ConfigError, SessionError, SessionStore};
use agriverse_core::PriceError;
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Environment or flag could not be parsed.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Session record could not be read or written.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Cart client could not be set up.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Backend rejected the change.
    #[error("Backend rejected the change: {0}")]
    SyncFailed(String),

    /// Price flag was negative.
    #[error("Invalid price: {0}")]
    InvalidPrice(#[from] PriceError),

    /// Writing command output failed.
    #[error("Output error: {0}")]
    Output(#[from] std::io::Error),
}

/// Settings shared by every command.
pub struct Context {
    pub config: CartConfig,
    pub session: SessionStore,
}

impl Context {
    /// Load configuration from the environment and apply flag overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid or no session location
    /// can be determined.
    pub fn load(api_url: Option<&str>, session_file: Option<PathBuf>) -> Result<Self, CliError> {
        let mut config = CartConfig::from_env()?;
        if let Some(raw) = api_url {
            config = config.with_api_url(raw)?;
        }
        if session_file.is_some() {
            config.session_file = session_file;
        }

        let session = match &config.session_file {
            Some(path) => SessionStore::new(path),
            None => SessionStore::at_default_location()?,
        };

        Ok(Self { config, session })
    }
}
