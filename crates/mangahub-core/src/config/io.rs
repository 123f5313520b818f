use super::models::AppConfig;
use super::tables::ConfigTables;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Load configuration from the given path, falling back to defaults on error.
pub fn load_config(path: &Path) -> AppConfig {
    let contents = match fs::read_to_string(path) {
        Ok(data) => {
            info!(path = %path.display(), "Loaded base config");
            data
        }
        Err(err) => {
            warn!(
                path = %path.display(),
                "Falling back to default config: {err}"
            );
            return AppConfig::default();
        }
    };

    match parse_config(&contents) {
        Ok(cfg) => {
            debug!("Parsed configuration from disk");
            cfg
        }
        Err(err) => {
            warn!(path = %path.display(), "Invalid config TOML: {err}");
            AppConfig::default()
        }
    }
}

pub fn parse_config(contents: &str) -> Result<AppConfig, toml::de::Error> {
    let tables: ConfigTables = toml::from_str(contents)?;
    Ok(AppConfig::from(tables).sanitized())
}

pub fn serialize_config(config: &AppConfig) -> Result<String, toml::ser::Error> {
    toml::to_string(&ConfigTables::from(config))
}

/// Write the configuration, creating the parent directory if needed.
pub fn save_config(path: &Path, config: &AppConfig) -> anyhow::Result<()> {
    let contents = serialize_config(config)?;
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;
    info!(path = %path.display(), "Saved config");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_temp_file(name: &str, ext: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        std::env::temp_dir().join(format!("mangahub-{name}-{nanos}.{ext}"))
    }

    #[test]
    fn empty_document_yields_defaults() {
        assert_eq!(parse_config("").unwrap(), AppConfig::default());
    }

    #[test]
    fn tables_map_onto_flat_config() {
        let cfg = parse_config(
            r#"
[catalog]
base_url = "http://localhost:8080"
page_size = 25

[search]
debounce_ms = 250

[storage]
data_dir = "/tmp/mangahub"
bucket_file = "Wishlist.json"

[logging]
log_level = "debug"
"#,
        )
        .unwrap();

        assert_eq!(cfg.catalog_base_url, "http://localhost:8080");
        assert_eq!(cfg.page_size, 25);
        assert_eq!(cfg.request_timeout_secs, 20);
        assert_eq!(cfg.search_debounce_ms, 250);
        assert_eq!(cfg.data_dir, "/tmp/mangahub");
        assert_eq!(cfg.collection_file, "CollectionMangas.json");
        assert_eq!(cfg.bucket_file, "Wishlist.json");
        assert_eq!(cfg.log_level, LogLevel::Debug);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let cfg = parse_config(
            r#"
[catalog]
page_size = 0
request_timeout_secs = 0

[search]
debounce_ms = 60000
"#,
        )
        .unwrap();
        assert_eq!(cfg.page_size, 1);
        assert_eq!(cfg.request_timeout_secs, 1);
        assert_eq!(cfg.search_debounce_ms, 5_000);

        let cfg = parse_config("[catalog]\npage_size = 500\n").unwrap();
        assert_eq!(cfg.page_size, 100);
    }

    #[test]
    fn invalid_toml_is_an_error_but_load_falls_back() {
        assert!(parse_config("[catalog\npage_size = ").is_err());

        let path = unique_temp_file("bad-config", "toml");
        fs::write(&path, "[search]\ndebounce_ms = \"soon\"\n").unwrap();
        assert_eq!(load_config(&path), AppConfig::default());
        let _ = fs::remove_file(&path);

        let missing = unique_temp_file("missing-config", "toml");
        assert_eq!(load_config(&missing), AppConfig::default());
    }

    #[test]
    fn saved_config_loads_back() {
        let path = unique_temp_file("saved-config", "toml");
        let mut cfg = AppConfig::default();
        cfg.page_size = 30;
        cfg.log_level = LogLevel::Warn;

        save_config(&path, &cfg).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("[storage]"));

        let loaded = load_config(&path);
        assert_eq!(loaded.page_size, 30);
        assert_eq!(loaded.log_level, LogLevel::Warn);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn disabled_legacy_file_survives_save_and_load() {
        let path = unique_temp_file("no-legacy", "toml");
        let cfg = AppConfig {
            legacy_collection_file: None,
            ..AppConfig::default()
        };

        save_config(&path, &cfg).unwrap();
        let loaded = load_config(&path);

        assert_eq!(loaded.legacy_collection_file, None);
        assert_eq!(loaded, cfg);
        let _ = fs::remove_file(&path);
    }
}
