use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::str::FromStr;

use super::{ContentId, Document};
use crate::error::{AppError, AppResult};

/// Insertion-ordered set of content ids.
///
/// Membership checks go through a hash index; the ordered sequence is what
/// gets serialized so persisted JSON stays stable.
#[derive(Debug, Clone, Default)]
pub struct IdSet {
    order: Vec<ContentId>,
    index: HashSet<ContentId>,
}

impl IdSet {
    pub fn contains(&self, id: &ContentId) -> bool {
        self.index.contains(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ContentId> {
        self.order.iter()
    }

    pub fn as_slice(&self) -> &[ContentId] {
        &self.order
    }

    /// Appends the id unless already present. Returns whether it was added.
    fn insert(&mut self, id: ContentId) -> bool {
        if self.index.insert(id.clone()) {
            self.order.push(id);
            true
        } else {
            false
        }
    }

    fn remove(&mut self, id: &ContentId) -> bool {
        if self.index.remove(id) {
            self.order.retain(|existing| existing != id);
            true
        } else {
            false
        }
    }
}

impl PartialEq for IdSet {
    fn eq(&self, other: &Self) -> bool {
        self.order == other.order
    }
}

impl Eq for IdSet {}

impl FromIterator<ContentId> for IdSet {
    fn from_iter<T: IntoIterator<Item = ContentId>>(iter: T) -> Self {
        let mut set = IdSet::default();
        for id in iter {
            set.insert(id);
        }
        set
    }
}

impl Serialize for IdSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.order.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for IdSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let ids = Vec::<ContentId>::deserialize(deserializer)?;
        Ok(ids.into_iter().collect())
    }
}

/// One entry of the watched list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchedEntry {
    pub id: ContentId,
    /// 0 means unrated
    #[serde(default)]
    pub rating: i32,
    #[serde(deserialize_with = "deserialize_calendar_date")]
    pub date_watched: NaiveDate,
}

/// Accepts `YYYY-MM-DD` as well as a full timestamp, keeping only the date part
fn deserialize_calendar_date<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<NaiveDate, D::Error> {
    let raw = String::deserialize(deserializer)?;
    let date_part = raw.get(..10).unwrap_or(&raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").map_err(serde::de::Error::custom)
}

/// Watched entries keyed by content id, kept in insertion order
#[derive(Debug, Clone, Default)]
pub struct WatchedList {
    entries: Vec<WatchedEntry>,
    index: HashMap<ContentId, usize>,
}

impl WatchedList {
    pub fn contains(&self, id: &ContentId) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &ContentId) -> Option<&WatchedEntry> {
        self.index.get(id).map(|&position| &self.entries[position])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WatchedEntry> {
        self.entries.iter()
    }

    /// Replaces any existing entry for the same id, moving it to the end
    fn upsert(&mut self, entry: WatchedEntry) {
        self.remove(&entry.id);
        self.index.insert(entry.id.clone(), self.entries.len());
        self.entries.push(entry);
    }

    fn remove(&mut self, id: &ContentId) -> bool {
        if self.index.remove(id).is_none() {
            return false;
        }
        self.entries.retain(|entry| &entry.id != id);
        self.reindex();
        true
    }

    fn set_rating(&mut self, id: &ContentId, rating: i32) -> bool {
        match self.index.get(id) {
            Some(&position) => {
                self.entries[position].rating = rating;
                true
            }
            None => false,
        }
    }

    fn reindex(&mut self) {
        self.index = self
            .entries
            .iter()
            .enumerate()
            .map(|(position, entry)| (entry.id.clone(), position))
            .collect();
    }
}

impl PartialEq for WatchedList {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for WatchedList {}

impl Serialize for WatchedList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.entries.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for WatchedList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Vec::<WatchedEntry>::deserialize(deserializer)?;
        let mut list = WatchedList::default();
        for entry in raw {
            // First occurrence wins for duplicated ids
            if !list.contains(&entry.id) {
                list.upsert(entry);
            }
        }
        Ok(list)
    }
}

/// Names a top-level field of the list document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListField {
    Watchlist,
    Watched,
    Favorites,
}

impl ListField {
    pub const ALL: [ListField; 3] = [ListField::Watchlist, ListField::Watched, ListField::Favorites];

    pub fn as_str(&self) -> &'static str {
        match self {
            ListField::Watchlist => "watchlist",
            ListField::Watched => "watched",
            ListField::Favorites => "favorites",
        }
    }
}

impl Display for ListField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ListField {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "watchlist" => Ok(ListField::Watchlist),
            "watched" => Ok(ListField::Watched),
            "favorites" => Ok(ListField::Favorites),
            other => Err(AppError::NotFound(format!("list '{}'", other))),
        }
    }
}

/// The three personal lists of one session.
///
/// A value type: every transition returns a new `ListState` and leaves the
/// original untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListState {
    #[serde(default)]
    watchlist: IdSet,
    #[serde(default)]
    watched: WatchedList,
    #[serde(default)]
    favorites: IdSet,
}

impl ListState {
    pub fn watchlist(&self) -> &IdSet {
        &self.watchlist
    }

    pub fn watched(&self) -> &WatchedList {
        &self.watched
    }

    pub fn favorites(&self) -> &IdSet {
        &self.favorites
    }

    pub fn is_in_watchlist(&self, id: &ContentId) -> bool {
        self.watchlist.contains(id)
    }

    pub fn is_in_watched(&self, id: &ContentId) -> bool {
        self.watched.contains(id)
    }

    pub fn is_favorite(&self, id: &ContentId) -> bool {
        self.favorites.contains(id)
    }

    pub fn contains(&self, field: ListField, id: &ContentId) -> bool {
        match field {
            ListField::Watchlist => self.is_in_watchlist(id),
            ListField::Watched => self.is_in_watched(id),
            ListField::Favorites => self.is_favorite(id),
        }
    }

    pub fn with_watchlist_added(&self, id: ContentId) -> Self {
        let mut next = self.clone();
        next.watchlist.insert(id);
        next
    }

    pub fn with_watchlist_removed(&self, id: &ContentId) -> Self {
        let mut next = self.clone();
        next.watchlist.remove(id);
        next
    }

    /// Records `id` as watched on `date`, replacing any earlier entry
    pub fn with_watched_added(&self, id: ContentId, rating: i32, date: NaiveDate) -> Self {
        let mut next = self.clone();
        next.watched.upsert(WatchedEntry {
            id,
            rating,
            date_watched: date,
        });
        next
    }

    pub fn with_watched_removed(&self, id: &ContentId) -> Self {
        let mut next = self.clone();
        next.watched.remove(id);
        next
    }

    /// Changes the rating of an existing watched entry, keeping its date.
    ///
    /// Returns `None` when `id` is not on the watched list.
    pub fn with_watched_rating(&self, id: &ContentId, rating: i32) -> Option<Self> {
        let mut next = self.clone();
        next.watched.set_rating(id, rating).then_some(next)
    }

    pub fn with_favorite_added(&self, id: ContentId) -> Self {
        let mut next = self.clone();
        next.favorites.insert(id);
        next
    }

    pub fn with_favorite_removed(&self, id: &ContentId) -> Self {
        let mut next = self.clone();
        next.favorites.remove(id);
        next
    }

    /// JSON value of a single field, as written to the remote document
    pub fn field_value(&self, field: ListField) -> AppResult<Value> {
        let value = match field {
            ListField::Watchlist => serde_json::to_value(&self.watchlist)?,
            ListField::Watched => serde_json::to_value(&self.watched)?,
            ListField::Favorites => serde_json::to_value(&self.favorites)?,
        };
        Ok(value)
    }

    /// All three fields as a document
    pub fn to_document(&self) -> AppResult<Document> {
        let mut document = Document::new();
        for field in ListField::ALL {
            document.insert(field.as_str().to_string(), self.field_value(field)?);
        }
        Ok(document)
    }

    /// Builds a state from a remote document.
    ///
    /// Missing or malformed fields fall back to their empty form.
    pub fn from_document(document: &Document) -> Self {
        Self {
            watchlist: field_or_default(document, ListField::Watchlist),
            watched: field_or_default(document, ListField::Watched),
            favorites: field_or_default(document, ListField::Favorites),
        }
    }
}

fn field_or_default<T>(document: &Document, field: ListField) -> T
where
    T: serde::de::DeserializeOwned + Default,
{
    let Some(value) = document.get(field.as_str()) else {
        return T::default();
    };

    match serde_json::from_value(value.clone()) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!(field = %field, error = %e, "Malformed list field in document, using empty list");
            T::default()
        }
    }
}
