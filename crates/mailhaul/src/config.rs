//! Connection configuration from the environment.

use std::env;

use anyhow::{Context, Result};

/// IMAP endpoint and credentials.
#[derive(Debug, Clone)]
pub struct ImapConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl ImapConfig {
    /// Loads configuration from environment variables.
    ///
    /// Reads from `.env` if present. Required:
    /// - `IMAP_USERNAME`
    /// - `IMAP_PASSWORD`
    ///
    /// Optional (with defaults):
    /// - `IMAP_HOST` (default: `imap.gmail.com`)
    /// - `IMAP_PORT` (default: `993`)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            host: env::var("IMAP_HOST").unwrap_or_else(|_| "imap.gmail.com".to_string()),
            port: env::var("IMAP_PORT")
                .unwrap_or_else(|_| "993".to_string())
                .parse()
                .context("invalid IMAP_PORT")?,
            username: env::var("IMAP_USERNAME").context("IMAP_USERNAME not set")?,
            password: env::var("IMAP_PASSWORD").context("IMAP_PASSWORD not set")?,
        })
    }
}
