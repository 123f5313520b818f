//! Title filter over a locally stored list.

use crate::model::UserTitle;
use serde::Serialize;
use ts_rs::TS;

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct FilteredList {
    pub items: Vec<UserTitle>,
    /// False only when a non-empty query matched nothing.
    pub search_succeeded: bool,
}

/// Case-insensitive substring match on the main title; order is preserved.
pub fn filter_by_title(items: &[UserTitle], query: &str) -> FilteredList {
    let query = query.trim();
    let items: Vec<UserTitle> = items
        .iter()
        .filter(|entry| entry.title.title_contains(query))
        .cloned()
        .collect();
    let search_succeeded = !items.is_empty() || query.is_empty();
    FilteredList {
        items,
        search_succeeded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::title;

    fn shelf() -> Vec<UserTitle> {
        ["Berserk", "Vagabond", "Vinland Saga"]
            .iter()
            .enumerate()
            .map(|(index, name)| UserTitle::new(title(index as u64 + 1, name, None)))
            .collect()
    }

    #[test]
    fn matches_substrings_in_order() {
        let filtered = filter_by_title(&shelf(), "va");
        let names: Vec<_> = filtered.items.iter().map(|e| e.title.title.as_str()).collect();
        assert_eq!(names, vec!["Vagabond"]);
        assert!(filtered.search_succeeded);

        let filtered = filter_by_title(&shelf(), "V");
        assert_eq!(filtered.items.len(), 2);
    }

    #[test]
    fn empty_query_returns_everything() {
        let filtered = filter_by_title(&shelf(), "  ");
        assert_eq!(filtered.items.len(), 3);
        assert!(filtered.search_succeeded);

        let filtered = filter_by_title(&[], "");
        assert!(filtered.items.is_empty());
        assert!(filtered.search_succeeded);
    }

    #[test]
    fn no_match_flags_unsuccessful_search() {
        let filtered = filter_by_title(&shelf(), "monster");
        assert!(filtered.items.is_empty());
        assert!(!filtered.search_succeeded);
    }
}
