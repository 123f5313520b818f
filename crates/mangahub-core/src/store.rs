//! JSON persistence for the two user lists.
//!
//! Each list is a single JSON array of [`UserTitle`] rewritten in full on
//! every save. Writes go to a sibling temp file which is then renamed over
//! the target.

use crate::config::AppConfig;
use crate::model::UserTitle;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use ts_rs::TS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub enum ListName {
    Collection,
    BucketList,
}

impl ListName {
    pub fn other(self) -> Self {
        match self {
            Self::Collection => Self::BucketList,
            Self::BucketList => Self::Collection,
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "collection" => Some(Self::Collection),
            "bucket" | "bucketlist" | "bucket-list" => Some(Self::BucketList),
            _ => None,
        }
    }
}

impl fmt::Display for ListName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Collection => write!(f, "collection"),
            Self::BucketList => write!(f, "bucketList"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to load {list} from {}: {reason}", .path.display())]
    Load {
        list: ListName,
        path: PathBuf,
        reason: String,
    },
    #[error("failed to save {list} to {}: {reason}", .path.display())]
    Save {
        list: ListName,
        path: PathBuf,
        reason: String,
    },
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Load { .. } => "load_failed",
            Self::Save { .. } => "save_failed",
        }
    }

    pub fn list(&self) -> ListName {
        match self {
            Self::Load { list, .. } | Self::Save { list, .. } => *list,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ListStore {
    dir: PathBuf,
    collection_file: String,
    legacy_collection_file: Option<String>,
    bucket_file: String,
}

impl ListStore {
    pub fn new(
        dir: impl Into<PathBuf>,
        collection_file: impl Into<String>,
        legacy_collection_file: Option<String>,
        bucket_file: impl Into<String>,
    ) -> Self {
        Self {
            dir: dir.into(),
            collection_file: collection_file.into(),
            legacy_collection_file,
            bucket_file: bucket_file.into(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.data_path(),
            config.collection_file.clone(),
            config.legacy_collection_file.clone(),
            config.bucket_file.clone(),
        )
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, list: ListName) -> PathBuf {
        match list {
            ListName::Collection => self.dir.join(&self.collection_file),
            ListName::BucketList => self.dir.join(&self.bucket_file),
        }
    }

    /// Current contents of `list`. A list that was never saved is empty.
    pub fn load(&self, list: ListName) -> Result<Vec<UserTitle>, StoreError> {
        let path = self.readable_path(list);
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(%list, path = %path.display(), "List file absent; starting empty");
                return Ok(Vec::new());
            }
            Err(err) => {
                warn!(%list, path = %path.display(), "Failed to read list: {err}");
                return Err(StoreError::Load {
                    list,
                    path,
                    reason: err.to_string(),
                });
            }
        };

        let items: Vec<UserTitle> = serde_json::from_slice(&data).map_err(|err| {
            warn!(%list, path = %path.display(), "Failed to decode list: {err}");
            StoreError::Load {
                list,
                path: path.clone(),
                reason: err.to_string(),
            }
        })?;
        debug!(%list, count = items.len(), "Loaded list");
        Ok(items)
    }

    /// Replace the whole of `list` with `items`.
    pub fn save(&self, list: ListName, items: &[UserTitle]) -> Result<(), StoreError> {
        let path = self.path_for(list);
        let save_error = |reason: String| StoreError::Save {
            list,
            path: path.clone(),
            reason,
        };

        let payload = serde_json::to_vec_pretty(items).map_err(|err| save_error(err.to_string()))?;
        fs::create_dir_all(&self.dir).map_err(|err| save_error(err.to_string()))?;

        let tmp = temp_path(&path);
        if let Err(err) = write_synced(&tmp, &payload).and_then(|_| fs::rename(&tmp, &path)) {
            warn!(%list, path = %path.display(), "Failed to save list: {err}");
            let _ = fs::remove_file(&tmp);
            return Err(save_error(err.to_string()));
        }
        info!(%list, count = items.len(), path = %path.display(), "Saved list");
        Ok(())
    }

    fn readable_path(&self, list: ListName) -> PathBuf {
        let path = self.path_for(list);
        if list != ListName::Collection || path.exists() {
            return path;
        }
        match &self.legacy_collection_file {
            Some(legacy) => {
                let legacy_path = self.dir.join(legacy);
                if legacy_path.exists() {
                    info!(path = %legacy_path.display(), "Reading collection from legacy file");
                    legacy_path
                } else {
                    path
                }
            }
            None => path,
        }
    }
}

/// Write `payload` and flush it to disk before the caller renames the file.
fn write_synced(path: &Path, payload: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(payload)?;
    file.sync_all()
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::ListStore;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    pub(crate) fn unique_temp_dir(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        std::env::temp_dir().join(format!("mangahub-{name}-{nanos}"))
    }

    pub(crate) fn temp_store(name: &str) -> ListStore {
        ListStore::new(
            unique_temp_dir(name),
            "CollectionMangas.json",
            Some("MyMangas.json".to_string()),
            "BucketMangas.json",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{temp_store, unique_temp_dir};
    use super::*;
    use crate::model::fixtures::title;

    #[test]
    fn missing_file_loads_empty() {
        let store = temp_store("store-missing");
        assert!(store.load(ListName::Collection).unwrap().is_empty());
        assert!(store.load(ListName::BucketList).unwrap().is_empty());
    }

    #[test]
    fn saved_lists_load_back_in_order() {
        let store = temp_store("store-roundtrip");
        let mut berserk = UserTitle::new(title(2, "Berserk", Some(41)));
        berserk.toggle_owned_volume(1).unwrap();
        berserk.set_reading_volume(1).unwrap();
        let items = vec![berserk, UserTitle::new(title(13, "One Piece", None))];

        store.save(ListName::Collection, &items).unwrap();

        assert_eq!(store.load(ListName::Collection).unwrap(), items);
        assert!(store.load(ListName::BucketList).unwrap().is_empty());
        assert!(!temp_path(&store.path_for(ListName::Collection)).exists());
        let _ = fs::remove_dir_all(store.dir());
    }

    #[test]
    fn save_replaces_previous_contents() {
        let store = temp_store("store-replace");
        let first = vec![UserTitle::new(title(1, "Monster", Some(18)))];
        store.save(ListName::BucketList, &first).unwrap();
        store.save(ListName::BucketList, &[]).unwrap();
        assert!(store.load(ListName::BucketList).unwrap().is_empty());
        let _ = fs::remove_dir_all(store.dir());
    }

    #[test]
    fn corrupt_file_is_a_load_error() {
        let store = temp_store("store-corrupt");
        fs::create_dir_all(store.dir()).unwrap();
        fs::write(store.path_for(ListName::BucketList), b"{not json").unwrap();

        let err = store.load(ListName::BucketList).unwrap_err();
        assert_eq!(err.code(), "load_failed");
        assert_eq!(err.list(), ListName::BucketList);
        let _ = fs::remove_dir_all(store.dir());
    }

    #[test]
    fn legacy_collection_file_is_read_when_current_is_absent() {
        let store = temp_store("store-legacy");
        fs::create_dir_all(store.dir()).unwrap();
        let legacy = vec![UserTitle::new(title(7, "Vagabond", Some(37)))];
        fs::write(
            store.dir().join("MyMangas.json"),
            serde_json::to_vec(&legacy).unwrap(),
        )
        .unwrap();

        assert_eq!(store.load(ListName::Collection).unwrap(), legacy);

        store.save(ListName::Collection, &[]).unwrap();
        assert!(store.path_for(ListName::Collection).exists());
        assert!(store.load(ListName::Collection).unwrap().is_empty());
        let _ = fs::remove_dir_all(store.dir());
    }

    #[test]
    fn save_into_a_file_path_fails() {
        let store = temp_store("store-blocked");
        fs::write(store.dir(), b"occupied").unwrap();

        let err = store
            .save(ListName::Collection, &[UserTitle::new(title(1, "Monster", None))])
            .unwrap_err();
        assert_eq!(err.code(), "save_failed");
        let _ = fs::remove_file(store.dir());
    }

    #[test]
    fn synced_write_replaces_the_whole_file() {
        let dir = unique_temp_dir("store-synced");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("list.json");
        fs::write(&path, b"[1, 2, 3, 4, 5]").unwrap();

        write_synced(&path, b"[]").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"[]");
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn list_names_display_and_parse() {
        assert_eq!(ListName::Collection.to_string(), "collection");
        assert_eq!(ListName::BucketList.to_string(), "bucketList");
        assert_eq!(ListName::parse("Bucket"), Some(ListName::BucketList));
        assert_eq!(ListName::Collection.other(), ListName::BucketList);
        assert_eq!(ListName::parse("wishlist"), None);
    }
}
