use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

/// Which slice of the catalog a paginated feed is reading.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
#[ts(export)]
pub enum CatalogQuery {
    AllTitles,
    BestRanked,
    ByGenre(String),
    ByTheme(String),
    ByDemographic(String),
    ByAuthor(String),
    SearchText(String),
}

impl CatalogQuery {
    /// Path below the base URL, one entry per segment (unencoded).
    pub(crate) fn path_segments(&self) -> Vec<&str> {
        match self {
            Self::AllTitles => vec!["list", "mangas"],
            Self::BestRanked => vec!["list", "bestMangas"],
            Self::ByGenre(name) => vec!["list", "mangaByGenre", name.as_str()],
            Self::ByTheme(name) => vec!["list", "mangaByTheme", name.as_str()],
            Self::ByDemographic(name) => vec!["list", "mangaByDemographic", name.as_str()],
            Self::ByAuthor(id) => vec!["list", "mangaByAuthor", id.as_str()],
            Self::SearchText(text) => vec!["search", "mangasContains", text.as_str()],
        }
    }

    pub fn is_search(&self) -> bool {
        matches!(self, Self::SearchText(_))
    }
}

impl fmt::Display for CatalogQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllTitles => write!(f, "all titles"),
            Self::BestRanked => write!(f, "best ranked"),
            Self::ByGenre(name) => write!(f, "genre:{name}"),
            Self::ByTheme(name) => write!(f, "theme:{name}"),
            Self::ByDemographic(name) => write!(f, "demographic:{name}"),
            Self::ByAuthor(id) => write!(f, "author:{id}"),
            Self::SearchText(text) => write!(f, "search:{text}"),
        }
    }
}

/// Category listings that return bare arrays of names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Taxonomy {
    Genres,
    Themes,
    Demographics,
}

impl Taxonomy {
    pub(crate) fn path_segments(self) -> [&'static str; 2] {
        match self {
            Self::Genres => ["list", "genres"],
            Self::Themes => ["list", "themes"],
            Self::Demographics => ["list", "demographics"],
        }
    }

    /// The paginated query listing titles tagged with `name`.
    pub fn query_for(self, name: &str) -> CatalogQuery {
        match self {
            Self::Genres => CatalogQuery::ByGenre(name.to_string()),
            Self::Themes => CatalogQuery::ByTheme(name.to_string()),
            Self::Demographics => CatalogQuery::ByDemographic(name.to_string()),
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "genre" | "genres" => Some(Self::Genres),
            "theme" | "themes" => Some(Self::Themes),
            "demographic" | "demographics" => Some(Self::Demographics),
            _ => None,
        }
    }
}

impl fmt::Display for Taxonomy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Genres => "genres",
            Self::Themes => "themes",
            Self::Demographics => "demographics",
        };
        write!(f, "{label}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_names_to_queries() {
        assert_eq!(
            Taxonomy::Genres.query_for("Action"),
            CatalogQuery::ByGenre("Action".to_string())
        );
        assert_eq!(
            Taxonomy::Demographics.query_for("Seinen"),
            CatalogQuery::ByDemographic("Seinen".to_string())
        );
        assert_eq!(Taxonomy::parse(" Themes "), Some(Taxonomy::Themes));
        assert_eq!(Taxonomy::parse("authors"), None);
    }

    #[test]
    fn query_serializes_as_tagged_value() {
        let json = serde_json::to_value(CatalogQuery::ByAuthor("abc".to_string())).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "by_author", "value": "abc"}));
        let json = serde_json::to_value(CatalogQuery::AllTitles).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "all_titles"}));
    }
}
