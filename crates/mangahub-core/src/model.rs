//! Catalog entities and the user-augmented variant persisted to disk.
//!
//! Field names follow the catalog's JSON (camelCase, including the upstream
//! `sypnosis` spelling) so the same types decode API payloads and round-trip
//! through the local list files.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use ts_rs::TS;

pub type TitleId = u64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Author {
    pub id: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

impl Author {
    pub fn display_name(&self) -> String {
        match (self.first_name.trim(), self.last_name.trim()) {
            ("", "") => "Unknown".to_string(),
            (first, "") => first.to_string(),
            ("", last) => last.to_string(),
            (first, last) => format!("{first} {last}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Genre {
    pub id: String,
    #[serde(rename = "genre")]
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Theme {
    pub id: String,
    #[serde(rename = "theme")]
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Demographic {
    pub id: String,
    #[serde(rename = "demographic")]
    pub label: String,
}

/// A single catalog entry as decoded from the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Title {
    #[ts(type = "number")]
    pub id: TitleId,
    pub title: String,
    #[serde(default)]
    pub title_english: Option<String>,
    #[serde(default)]
    pub title_japanese: Option<String>,
    #[serde(default)]
    pub score: f64,
    #[serde(default, rename = "sypnosis")]
    pub synopsis: Option<String>,
    #[serde(default)]
    pub background: Option<String>,
    #[serde(default, with = "catalog_date")]
    #[ts(type = "string | null")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, with = "catalog_date")]
    #[ts(type = "string | null")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: String,
    #[serde(rename = "mainPicture", default, deserialize_with = "unquoted")]
    #[ts(type = "string")]
    pub cover_url: String,
    #[serde(default, deserialize_with = "unquoted")]
    #[ts(type = "string")]
    pub url: String,
    #[serde(default)]
    pub authors: Vec<Author>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub themes: Vec<Theme>,
    #[serde(default)]
    pub demographics: Vec<Demographic>,
    #[serde(default)]
    pub chapters: Option<u32>,
    #[serde(default)]
    pub volumes: Option<u32>,
}

impl Title {
    pub fn is_scored(&self) -> bool {
        self.score > 0.0
    }

    /// Case-insensitive substring match on the main title.
    pub fn title_contains(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        needle.is_empty() || self.title.to_lowercase().contains(&needle)
    }
}

/// Envelope returned by every paginated catalog endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TitlePage {
    pub metadata: PageMetadata,
    #[serde(default)]
    pub items: Vec<Title>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageMetadata {
    pub page: u32,
    pub per: u32,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VolumeError {
    #[error("volume numbers start at 1")]
    Zero,
    #[error("volume {volume} is beyond the {total} volumes of this title")]
    OutOfRange { volume: u32, total: u32 },
}

/// A title stored in one of the local lists, with the user's progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UserTitle {
    #[serde(flatten)]
    pub title: Title,
    #[serde(rename = "boughtVolumes", default)]
    pub owned_volumes: BTreeSet<u32>,
    #[serde(default)]
    pub reading_volume: u32,
    #[serde(default)]
    pub is_completed: bool,
}

impl UserTitle {
    pub fn new(title: Title) -> Self {
        Self {
            title,
            owned_volumes: BTreeSet::new(),
            reading_volume: 0,
            is_completed: false,
        }
    }

    pub fn id(&self) -> TitleId {
        self.title.id
    }

    /// Recompute the cached completion flag. An unknown volume count is never complete.
    pub fn refresh_completion(&mut self) {
        self.is_completed = match self.title.volumes {
            Some(total) => self.owned_volumes.len() == total as usize,
            None => false,
        };
    }

    /// Flip ownership of `volume`; returns whether it is owned afterwards.
    pub fn toggle_owned_volume(&mut self, volume: u32) -> Result<bool, VolumeError> {
        if volume == 0 {
            return Err(VolumeError::Zero);
        }
        self.check_bound(volume)?;
        let owned = if self.owned_volumes.remove(&volume) {
            false
        } else {
            self.owned_volumes.insert(volume);
            true
        };
        self.refresh_completion();
        Ok(owned)
    }

    /// 0 means "not started".
    pub fn set_reading_volume(&mut self, volume: u32) -> Result<(), VolumeError> {
        self.check_bound(volume)?;
        self.reading_volume = volume;
        Ok(())
    }

    pub fn owned_fraction(&self) -> Option<f64> {
        match self.title.volumes {
            Some(0) | None => None,
            Some(total) => Some(self.owned_volumes.len() as f64 / total as f64),
        }
    }

    fn check_bound(&self, volume: u32) -> Result<(), VolumeError> {
        match self.title.volumes {
            Some(total) if volume > total => Err(VolumeError::OutOfRange { volume, total }),
            _ => Ok(()),
        }
    }
}

fn unquoted<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw.trim().trim_matches('"').to_string())
}

/// Dates on the wire look like `2004-07-12T00:00:00Z`.
mod catalog_date {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    const OFFSET_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";
    const UTC_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(date) => serializer.serialize_str(&date.format(UTC_FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let Some(raw) = Option::<String>::deserialize(deserializer)? else {
            return Ok(None);
        };
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        parse(raw)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("unrecognized date `{raw}`")))
    }

    pub(super) fn parse(raw: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(raw)
            .or_else(|_| DateTime::parse_from_str(raw, OFFSET_FORMAT))
            .ok()
            .map(|date| date.with_timezone(&Utc))
    }
}
