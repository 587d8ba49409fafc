//! Runtime settings from environment variables.

use anyhow::{Context, Result};

/// How often the page is re-fetched when no interval is configured
pub const DEFAULT_REFRESH_SECS: u64 = 300;

/// Where the homework page lives and how often to re-fetch it.
#[derive(Debug, Clone)]
pub struct Settings {
    pub page_url: String,
    pub refresh_secs: u64,
}

impl Settings {
    /// Resolve settings, preferring an explicit URL over the environment.
    ///
    /// Expects `HW_PAGE_URL` to be set, either in the environment or in a
    /// `.env` file, unless a URL override is given. `HW_REFRESH_SECS`
    /// tunes the background refetch; 0 disables it.
    pub fn load(url_override: Option<String>) -> Result<Self> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let page_url = match url_override {
            Some(url) => url,
            None => std::env::var("HW_PAGE_URL")
                .context("HW_PAGE_URL environment variable not set (or pass --url)")?,
        };

        let refresh_secs = match std::env::var("HW_REFRESH_SECS") {
            Ok(raw) => raw
                .parse()
                .context("HW_REFRESH_SECS must be a number of seconds")?,
            Err(_) => DEFAULT_REFRESH_SECS,
        };

        Ok(Self {
            page_url,
            refresh_secs,
        })
    }
}
