//! Keeps a title in at most one of the two user lists.
//!
//! A move rewrites two files one after the other. There is no shared
//! transaction: if the second write fails the first one stands, and the
//! error says so through `other_list_updated`.

use crate::alert::AlertView;
use crate::model::{Title, TitleId, UserTitle, VolumeError};
use crate::store::{ListName, ListStore, StoreError};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};
use ts_rs::TS;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Membership {
    pub in_collection: bool,
    pub in_bucket_list: bool,
}

impl Membership {
    pub fn contains(&self, list: ListName) -> bool {
        match list {
            ListName::Collection => self.in_collection,
            ListName::BucketList => self.in_bucket_list,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOutcome {
    /// The title was taken out of the other list.
    pub removed_from_other: bool,
    /// The title was appended to the target list (false if already there).
    pub added: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum MembershipError {
    #[error("could not read the collection: {0}")]
    CheckCollectionFailed(#[source] StoreError),
    #[error("could not save the collection: {source}")]
    SaveToCollectionFailed {
        other_list_updated: bool,
        #[source]
        source: StoreError,
    },
    #[error("could not read the bucket list: {0}")]
    CheckBucketFailed(#[source] StoreError),
    #[error("could not save the bucket list: {source}")]
    SaveToBucketFailed {
        other_list_updated: bool,
        #[source]
        source: StoreError,
    },
    #[error("title {0} is not in the collection")]
    NotInCollection(TitleId),
    #[error("title {id}: {source}")]
    InvalidVolume {
        id: TitleId,
        #[source]
        source: VolumeError,
    },
}

impl MembershipError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::CheckCollectionFailed(_) => "check_collection_failed",
            Self::SaveToCollectionFailed { .. } => "save_to_collection_failed",
            Self::CheckBucketFailed(_) => "check_bucket_failed",
            Self::SaveToBucketFailed { .. } => "save_to_bucket_failed",
            Self::NotInCollection(_) => "not_in_collection",
            Self::InvalidVolume { .. } => "invalid_volume",
        }
    }

    /// True when a failed move had already rewritten the other list.
    pub fn left_lists_inconsistent(&self) -> bool {
        matches!(
            self,
            Self::SaveToCollectionFailed {
                other_list_updated: true,
                ..
            } | Self::SaveToBucketFailed {
                other_list_updated: true,
                ..
            }
        )
    }

    pub fn to_alert(&self) -> AlertView {
        let message = match self {
            Self::CheckCollectionFailed(_) => "Error checking your collection".to_string(),
            Self::SaveToCollectionFailed { .. } => "Error saving to your collection".to_string(),
            Self::CheckBucketFailed(_) => "Error checking your bucket list".to_string(),
            Self::SaveToBucketFailed { .. } => "Error saving to your bucket list".to_string(),
            other => other.to_string(),
        };
        AlertView::new(self.code(), message)
    }

    fn check_failed(list: ListName, source: StoreError) -> Self {
        match list {
            ListName::Collection => Self::CheckCollectionFailed(source),
            ListName::BucketList => Self::CheckBucketFailed(source),
        }
    }

    fn save_failed(list: ListName, other_list_updated: bool, source: StoreError) -> Self {
        match list {
            ListName::Collection => Self::SaveToCollectionFailed {
                other_list_updated,
                source,
            },
            ListName::BucketList => Self::SaveToBucketFailed {
                other_list_updated,
                source,
            },
        }
    }
}

/// Serializes every load, mutate and save cycle on the two lists.
pub struct MembershipCoordinator {
    store: ListStore,
    write_lock: Mutex<()>,
}

impl MembershipCoordinator {
    pub fn new(store: ListStore) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &ListStore {
        &self.store
    }

    pub fn add_to_collection(&self, title: &Title) -> Result<MoveOutcome, MembershipError> {
        self.move_into(ListName::Collection, title)
    }

    pub fn add_to_bucket_list(&self, title: &Title) -> Result<MoveOutcome, MembershipError> {
        self.move_into(ListName::BucketList, title)
    }

    pub fn check_membership(&self, id: TitleId) -> Result<Membership, MembershipError> {
        let _guard = self.lock();
        let collection = self.load(ListName::Collection)?;
        let bucket = self.load(ListName::BucketList)?;
        Ok(Membership {
            in_collection: collection.iter().any(|entry| entry.id() == id),
            in_bucket_list: bucket.iter().any(|entry| entry.id() == id),
        })
    }

    pub fn load_list(&self, list: ListName) -> Result<Vec<UserTitle>, MembershipError> {
        let _guard = self.lock();
        self.load(list)
    }

    /// Remove `id` from `list`. Returns false when it was not there.
    pub fn remove(&self, list: ListName, id: TitleId) -> Result<bool, MembershipError> {
        let _guard = self.lock();
        let mut items = self.load(list)?;
        let before = items.len();
        items.retain(|entry| entry.id() != id);
        if items.len() == before {
            debug!(%list, title_id = id, "Nothing to remove");
            return Ok(false);
        }
        self.save(list, &items, false)?;
        info!(%list, title_id = id, "Removed title");
        Ok(true)
    }

    /// `volume` 0 means not started.
    pub fn set_reading_volume(&self, id: TitleId, volume: u32) -> Result<UserTitle, MembershipError> {
        self.update_in_collection(id, |entry| entry.set_reading_volume(volume))
    }

    pub fn toggle_owned_volume(&self, id: TitleId, volume: u32) -> Result<UserTitle, MembershipError> {
        self.update_in_collection(id, |entry| entry.toggle_owned_volume(volume).map(|_| ()))
    }

    fn move_into(&self, target: ListName, title: &Title) -> Result<MoveOutcome, MembershipError> {
        let _guard = self.lock();
        let source = target.other();
        let mut target_items = self.load(target)?;
        let mut source_items = self.load(source)?;

        let before = source_items.len();
        source_items.retain(|entry| entry.id() != title.id);
        let removed_from_other = source_items.len() != before;
        if removed_from_other {
            self.save(source, &source_items, false)?;
            info!(list = %source, title_id = title.id, "Removed title before move");
        }

        let added = !target_items.iter().any(|entry| entry.id() == title.id);
        if added {
            target_items.push(UserTitle::new(title.clone()));
            self.save(target, &target_items, removed_from_other)?;
            info!(list = %target, title_id = title.id, "Added title");
        } else {
            debug!(list = %target, title_id = title.id, "Title already present");
        }

        Ok(MoveOutcome {
            removed_from_other,
            added,
        })
    }

    fn update_in_collection<F>(&self, id: TitleId, mutate: F) -> Result<UserTitle, MembershipError>
    where
        F: FnOnce(&mut UserTitle) -> Result<(), VolumeError>,
    {
        let _guard = self.lock();
        let mut items = self.load(ListName::Collection)?;
        let entry = items
            .iter_mut()
            .find(|entry| entry.id() == id)
            .ok_or(MembershipError::NotInCollection(id))?;
        mutate(entry).map_err(|source| MembershipError::InvalidVolume { id, source })?;
        entry.refresh_completion();
        let updated = entry.clone();

        self.save(ListName::Collection, &items, false)?;
        debug!(
            title_id = id,
            reading = updated.reading_volume,
            owned = updated.owned_volumes.len(),
            completed = updated.is_completed,
            "Updated progress"
        );
        Ok(updated)
    }

    fn load(&self, list: ListName) -> Result<Vec<UserTitle>, MembershipError> {
        self.store
            .load(list)
            .map_err(|err| MembershipError::check_failed(list, err))
    }

    fn save(&self, list: ListName, items: &[UserTitle], other_list_updated: bool) -> Result<(), MembershipError> {
        self.store.save(list, items).map_err(|err| {
            if other_list_updated {
                warn!(%list, "Save failed after the other list was rewritten; lists may disagree");
            }
            MembershipError::save_failed(list, other_list_updated, err)
        })
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::title;
    use crate::store::test_support::temp_store;
    use std::collections::BTreeSet;
    use std::fs;

    fn coordinator(name: &str) -> MembershipCoordinator {
        MembershipCoordinator::new(temp_store(name))
    }

    fn ids(coordinator: &MembershipCoordinator, list: ListName) -> Vec<TitleId> {
        coordinator
            .load_list(list)
            .unwrap()
            .iter()
            .map(UserTitle::id)
            .collect()
    }

    fn cleanup(coordinator: &MembershipCoordinator) {
        let _ = fs::remove_dir_all(coordinator.store().dir());
    }

    #[test]
    fn adding_twice_keeps_a_single_entry() {
        let lists = coordinator("membership-idempotent");
        let berserk = title(2, "Berserk", Some(41));

        let first = lists.add_to_collection(&berserk).unwrap();
        let second = lists.add_to_collection(&berserk).unwrap();

        assert!(first.added);
        assert!(!second.added);
        assert_eq!(ids(&lists, ListName::Collection), vec![2]);
        cleanup(&lists);
    }

    #[test]
    fn moving_to_bucket_list_clears_collection_progress() {
        let lists = coordinator("membership-move");
        let naruto = title(11, "Naruto", Some(72));
        lists.add_to_collection(&naruto).unwrap();
        lists.toggle_owned_volume(11, 4).unwrap();
        lists.set_reading_volume(11, 3).unwrap();

        let outcome = lists.add_to_bucket_list(&naruto).unwrap();

        assert_eq!(
            outcome,
            MoveOutcome {
                removed_from_other: true,
                added: true
            }
        );
        assert!(ids(&lists, ListName::Collection).is_empty());
        let bucket = lists.load_list(ListName::BucketList).unwrap();
        assert_eq!(bucket.len(), 1);
        assert_eq!(bucket[0].id(), 11);
        assert!(bucket[0].owned_volumes.is_empty());
        assert_eq!(bucket[0].reading_volume, 0);
        cleanup(&lists);
    }

    #[test]
    fn any_sequence_of_adds_keeps_lists_disjoint() {
        let lists = coordinator("membership-exclusive");
        let titles: Vec<Title> = (1..=4).map(|id| title(id, "T", None)).collect();
        let steps = [
            (0, ListName::Collection),
            (1, ListName::BucketList),
            (0, ListName::BucketList),
            (2, ListName::Collection),
            (1, ListName::Collection),
            (0, ListName::Collection),
            (3, ListName::BucketList),
            (2, ListName::BucketList),
        ];
        for (index, list) in steps {
            match list {
                ListName::Collection => lists.add_to_collection(&titles[index]).unwrap(),
                ListName::BucketList => lists.add_to_bucket_list(&titles[index]).unwrap(),
            };
            let collection: BTreeSet<_> = ids(&lists, ListName::Collection).into_iter().collect();
            let bucket: BTreeSet<_> = ids(&lists, ListName::BucketList).into_iter().collect();
            assert!(collection.is_disjoint(&bucket), "step {index} {list}");
        }
        assert_eq!(ids(&lists, ListName::Collection), vec![2, 1]);
        assert_eq!(ids(&lists, ListName::BucketList), vec![4, 3]);
        cleanup(&lists);
    }

    #[test]
    fn check_membership_reports_each_list() {
        let lists = coordinator("membership-check");
        lists.add_to_collection(&title(1, "A", None)).unwrap();
        lists.add_to_bucket_list(&title(2, "B", None)).unwrap();

        assert_eq!(
            lists.check_membership(1).unwrap(),
            Membership {
                in_collection: true,
                in_bucket_list: false
            }
        );
        assert!(lists.check_membership(2).unwrap().contains(ListName::BucketList));
        assert_eq!(lists.check_membership(3).unwrap(), Membership::default());
        cleanup(&lists);
    }

    #[test]
    fn toggle_is_its_own_inverse_and_drives_completion() {
        let lists = coordinator("membership-toggle");
        lists.add_to_collection(&title(11, "Short", Some(4))).unwrap();
        for volume in 1..=3 {
            lists.toggle_owned_volume(11, volume).unwrap();
        }
        let before = lists.load_list(ListName::Collection).unwrap()[0].owned_volumes.clone();

        let completed = lists.toggle_owned_volume(11, 4).unwrap();
        assert!(completed.is_completed);
        let reverted = lists.toggle_owned_volume(11, 4).unwrap();
        assert!(!reverted.is_completed);
        assert_eq!(reverted.owned_volumes, before);

        let stored = &lists.load_list(ListName::Collection).unwrap()[0];
        assert_eq!(stored.owned_volumes, before);
        assert!(!stored.is_completed);
        cleanup(&lists);
    }

    #[test]
    fn progress_updates_validate_input() {
        let lists = coordinator("membership-validate");
        lists.add_to_collection(&title(5, "Five", Some(5))).unwrap();
        lists.add_to_bucket_list(&title(6, "Six", Some(5))).unwrap();

        let err = lists.set_reading_volume(5, 6).unwrap_err();
        assert_eq!(err.code(), "invalid_volume");
        let err = lists.toggle_owned_volume(5, 0).unwrap_err();
        assert_eq!(err.code(), "invalid_volume");
        let err = lists.toggle_owned_volume(6, 1).unwrap_err();
        assert!(matches!(err, MembershipError::NotInCollection(6)));

        assert_eq!(lists.set_reading_volume(5, 0).unwrap().reading_volume, 0);
        cleanup(&lists);
    }

    #[test]
    fn remove_drops_only_the_matching_entry() {
        let lists = coordinator("membership-remove");
        lists.add_to_bucket_list(&title(1, "A", None)).unwrap();
        lists.add_to_bucket_list(&title(2, "B", None)).unwrap();

        assert!(lists.remove(ListName::BucketList, 1).unwrap());
        assert!(!lists.remove(ListName::BucketList, 1).unwrap());
        assert_eq!(ids(&lists, ListName::BucketList), vec![2]);
        cleanup(&lists);
    }

    #[test]
    fn unreadable_list_maps_to_check_error() {
        let lists = coordinator("membership-corrupt");
        fs::create_dir_all(lists.store().dir()).unwrap();
        fs::write(lists.store().path_for(ListName::BucketList), b"[{").unwrap();

        let err = lists.add_to_collection(&title(1, "A", None)).unwrap_err();
        assert_eq!(err.code(), "check_bucket_failed");
        assert!(ids(&lists, ListName::Collection).is_empty());
        cleanup(&lists);
    }

    #[test]
    fn failed_second_write_reports_partial_move() {
        let lists = coordinator("membership-partial");
        let title = title(9, "Nine", None);
        lists.add_to_bucket_list(&title).unwrap();
        // A directory where the temp file goes makes the collection write fail.
        fs::create_dir_all(lists.store().dir().join("CollectionMangas.json.tmp")).unwrap();

        let err = lists.add_to_collection(&title).unwrap_err();

        assert_eq!(err.code(), "save_to_collection_failed");
        assert!(err.left_lists_inconsistent());
        assert!(ids(&lists, ListName::BucketList).is_empty());
        cleanup(&lists);
    }
}
