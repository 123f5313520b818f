use super::defaults;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Flattened runtime configuration. On disk it is split into tables, see `tables.rs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub catalog_base_url: String,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub page_size: u32,
    pub search_debounce_ms: u64,
    pub data_dir: String,
    pub collection_file: String,
    pub legacy_collection_file: Option<String>,
    pub bucket_file: String,
    pub log_level: LogLevel,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            catalog_base_url: defaults::default_catalog_base_url(),
            request_timeout_secs: defaults::default_request_timeout_secs(),
            connect_timeout_secs: defaults::default_connect_timeout_secs(),
            page_size: defaults::default_page_size(),
            search_debounce_ms: defaults::default_search_debounce_ms(),
            data_dir: defaults::default_data_dir(),
            collection_file: defaults::default_collection_file(),
            legacy_collection_file: defaults::default_legacy_collection_file(),
            bucket_file: defaults::default_bucket_file(),
            log_level: defaults::default_log_level(),
        }
    }
}

impl AppConfig {
    /// Clamp values into the ranges the coordinators accept.
    pub fn sanitized(mut self) -> Self {
        self.page_size = self.page_size.clamp(1, defaults::MAX_PAGE_SIZE);
        self.search_debounce_ms = self.search_debounce_ms.min(defaults::MAX_DEBOUNCE_MS);
        self.request_timeout_secs = self.request_timeout_secs.max(1);
        self.connect_timeout_secs = self.connect_timeout_secs.max(1);
        if self.catalog_base_url.trim().is_empty() {
            self.catalog_base_url = defaults::default_catalog_base_url();
        }
        if self.data_dir.trim().is_empty() {
            self.data_dir = defaults::default_data_dir();
        }
        if self
            .legacy_collection_file
            .as_deref()
            .is_some_and(|name| name.trim().is_empty())
        {
            self.legacy_collection_file = None;
        }
        self
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn data_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }
}

/// Supported logging verbosity levels.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_filter_str())
    }
}

impl LogLevel {
    pub fn as_filter_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
