use super::models::LogLevel;

pub(crate) const MAX_PAGE_SIZE: u32 = 100;
pub(crate) const MAX_DEBOUNCE_MS: u64 = 5_000;

pub(crate) fn default_catalog_base_url() -> String {
    "https://mymanga-acacademy-5607149ebe3d.herokuapp.com".to_string()
}

pub(crate) fn default_request_timeout_secs() -> u64 {
    20
}

pub(crate) fn default_connect_timeout_secs() -> u64 {
    10
}

pub(crate) fn default_page_size() -> u32 {
    crate::pagination::DEFAULT_PAGE_SIZE
}

pub(crate) fn default_search_debounce_ms() -> u64 {
    crate::search::DEFAULT_DEBOUNCE.as_millis() as u64
}

pub(crate) fn default_data_dir() -> String {
    "data".to_string()
}

pub(crate) fn default_collection_file() -> String {
    "CollectionMangas.json".to_string()
}

pub(crate) fn default_legacy_collection_file() -> Option<String> {
    Some("MyMangas.json".to_string())
}

pub(crate) fn default_bucket_file() -> String {
    "BucketMangas.json".to_string()
}

pub(crate) fn default_log_level() -> LogLevel {
    LogLevel::Info
}
