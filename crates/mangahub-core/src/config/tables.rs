use super::defaults;
use super::models::{AppConfig, LogLevel};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub(super) struct ConfigTables {
    #[serde(default)]
    catalog: CatalogConfig,
    #[serde(default)]
    search: SearchConfig,
    #[serde(default)]
    storage: StorageConfig,
    #[serde(default)]
    logging: LoggingConfig,
}

impl From<ConfigTables> for AppConfig {
    fn from(tables: ConfigTables) -> Self {
        AppConfig {
            catalog_base_url: tables.catalog.base_url,
            request_timeout_secs: tables.catalog.request_timeout_secs,
            connect_timeout_secs: tables.catalog.connect_timeout_secs,
            page_size: tables.catalog.page_size,
            search_debounce_ms: tables.search.debounce_ms,
            data_dir: tables.storage.data_dir,
            collection_file: tables.storage.collection_file,
            legacy_collection_file: tables.storage.legacy_collection_file,
            bucket_file: tables.storage.bucket_file,
            log_level: tables.logging.log_level,
        }
    }
}

impl From<&AppConfig> for ConfigTables {
    fn from(config: &AppConfig) -> Self {
        ConfigTables {
            catalog: CatalogConfig {
                base_url: config.catalog_base_url.clone(),
                request_timeout_secs: config.request_timeout_secs,
                connect_timeout_secs: config.connect_timeout_secs,
                page_size: config.page_size,
            },
            search: SearchConfig {
                debounce_ms: config.search_debounce_ms,
            },
            storage: StorageConfig {
                data_dir: config.data_dir.clone(),
                collection_file: config.collection_file.clone(),
                legacy_collection_file: Some(
                    config.legacy_collection_file.clone().unwrap_or_default(),
                ),
                bucket_file: config.bucket_file.clone(),
            },
            logging: LoggingConfig {
                log_level: config.log_level,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
struct CatalogConfig {
    #[serde(default = "defaults::default_catalog_base_url")]
    base_url: String,
    #[serde(default = "defaults::default_request_timeout_secs")]
    request_timeout_secs: u64,
    #[serde(default = "defaults::default_connect_timeout_secs")]
    connect_timeout_secs: u64,
    #[serde(default = "defaults::default_page_size")]
    page_size: u32,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        CatalogConfig {
            base_url: defaults::default_catalog_base_url(),
            request_timeout_secs: defaults::default_request_timeout_secs(),
            connect_timeout_secs: defaults::default_connect_timeout_secs(),
            page_size: defaults::default_page_size(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
struct SearchConfig {
    #[serde(default = "defaults::default_search_debounce_ms")]
    debounce_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            debounce_ms: defaults::default_search_debounce_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
struct StorageConfig {
    #[serde(default = "defaults::default_data_dir")]
    data_dir: String,
    #[serde(default = "defaults::default_collection_file")]
    collection_file: String,
    // An empty name is written for "no legacy file" so the default does not
    // come back on reload.
    #[serde(default = "defaults::default_legacy_collection_file")]
    legacy_collection_file: Option<String>,
    #[serde(default = "defaults::default_bucket_file")]
    bucket_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            data_dir: defaults::default_data_dir(),
            collection_file: defaults::default_collection_file(),
            legacy_collection_file: defaults::default_legacy_collection_file(),
            bucket_file: defaults::default_bucket_file(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
struct LoggingConfig {
    #[serde(default = "defaults::default_log_level")]
    log_level: LogLevel,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            log_level: defaults::default_log_level(),
        }
    }
}
