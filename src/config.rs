//! Environment-driven configuration.

use std::path::PathBuf;

pub const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub path: PathBuf,
    pub page_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("catalog.db"),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl StoreConfig {
    /// Load configuration from environment variables, falling back to the
    /// defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        Self {
            path: std::env::var("CATALOG_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("catalog.db")),
            page_size: std::env::var("CATALOG_PAGE_SIZE")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_PAGE_SIZE),
        }
    }
}
