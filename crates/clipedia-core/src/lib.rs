//! clipedia-core: item model, storage traits, and the windowed collection cache

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

pub mod analyzer;
pub mod bridge;
pub mod cache;
pub mod collection;
pub mod coordinator;
pub mod error;
pub mod filter;
mod reconcile;
pub mod tracker;

#[cfg(feature = "sqlite")]
mod sqlite_store;

pub use bridge::{CommandBridge, LocalBridge};
pub use cache::CacheStore;
pub use collection::{Slot, WindowConfig, WindowedCollection};
pub use coordinator::{Completion, FetchReport, PageFetchCoordinator, PageState, PageTicket};
pub use error::BridgeError;
pub use filter::{FilterCriteria, SearchMatcher, SearchMode, TypeFilter};
#[cfg(feature = "sqlite")]
pub use sqlite_store::{SqliteStore, StoreImpl};
#[cfg(not(feature = "sqlite"))]
pub type StoreImpl = MemStore;
pub use tracker::ViewportWindowTracker;

pub type ItemId = String;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub content: String,
    pub kind: ItemKind,
    pub captured_at: DateTime<Utc>,
    pub pinned: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    pub source_app: Option<String>,
}

impl Item {
    pub fn new<S: Into<String>>(content: S, kind: ItemKind) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            content: content.into(),
            kind,
            captured_at: Utc::now(),
            pinned: false,
            tags: Vec::new(),
            source_app: None,
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Adds `tag` unless already present; returns whether it was added.
    pub fn push_tag(&mut self, tag: &str) -> bool {
        if self.has_tag(tag) {
            return false;
        }
        self.tags.push(tag.to_string());
        true
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    #[default]
    Text,
    Image,
    File,
}

impl ItemKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemKind::Text => "text",
            ItemKind::Image => "image",
            ItemKind::File => "file",
        }
    }
}

impl std::str::FromStr for ItemKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(ItemKind::Text),
            "image" => Ok(ItemKind::Image),
            "file" => Ok(ItemKind::File),
            other => Err(format!("unknown item kind: {other}")),
        }
    }
}

/// Item as it crosses the command bridge: camelCase keys, `capturedAt` as ISO-8601 text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireItem {
    pub id: ItemId,
    pub content: String,
    pub kind: ItemKind,
    pub captured_at: String,
    pub pinned: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_app: Option<String>,
}

impl From<&Item> for WireItem {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id.clone(),
            content: item.content.clone(),
            kind: item.kind,
            captured_at: item.captured_at.to_rfc3339_opts(SecondsFormat::Micros, true),
            pinned: item.pinned,
            tags: if item.tags.is_empty() {
                None
            } else {
                Some(item.tags.clone())
            },
            source_app: item.source_app.clone(),
        }
    }
}

impl TryFrom<WireItem> for Item {
    type Error = BridgeError;

    fn try_from(w: WireItem) -> Result<Self, Self::Error> {
        let captured_at = match DateTime::parse_from_rfc3339(&w.captured_at) {
            Ok(t) => t.with_timezone(&Utc),
            Err(source) => {
                return Err(BridgeError::Timestamp {
                    id: w.id,
                    value: w.captured_at,
                    source,
                })
            }
        };
        let mut item = Self {
            id: w.id,
            content: w.content,
            kind: w.kind,
            captured_at,
            pinned: w.pinned,
            tags: Vec::new(),
            source_app: w.source_app,
        };
        for tag in w.tags.unwrap_or_default() {
            item.push_tag(&tag);
        }
        Ok(item)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagInfo {
    pub name: String,
    pub color: Option<String>,
    pub system: bool,
}

pub trait Store: Send + Sync {
    fn init(&self) -> anyhow::Result<()> {
        Ok(())
    }
    fn insert(&self, item: &Item) -> anyhow::Result<()>;
    /// Builds a new item from captured content, tags it, and stores it.
    fn capture(
        &self,
        content: &str,
        kind: ItemKind,
        source_app: Option<&str>,
    ) -> anyhow::Result<Item> {
        let mut item = Item::new(content, kind);
        item.source_app = source_app.map(str::to_string);
        if kind == ItemKind::Text {
            for tag in analyzer::analyze(content) {
                item.push_tag(&tag);
            }
        }
        self.insert(&item)?;
        Ok(item)
    }
    fn count(&self) -> anyhow::Result<usize>;
    /// Items in collection order (pinned first, newest first).
    fn page(&self, offset: usize, limit: usize) -> anyhow::Result<Vec<Item>>;
    fn get(&self, id: &str) -> anyhow::Result<Option<Item>>;
    fn search(&self, pattern: &str, is_regex: bool) -> anyhow::Result<Vec<Item>>;
    /// Every item carrying `tag`, in collection order.
    fn items_by_tag(&self, tag: &str) -> anyhow::Result<Vec<Item>>;
    fn set_pinned(&self, id: &str, pinned: bool) -> anyhow::Result<()>;
    fn delete(&self, id: &str) -> anyhow::Result<()>;
    fn clear(&self) -> anyhow::Result<()>;
    // Tags
    fn add_tag(&self, id: &str, tag: &str) -> anyhow::Result<()>;
    fn remove_tag(&self, id: &str, tag: &str) -> anyhow::Result<()>;
    fn list_all_tags(&self) -> anyhow::Result<Vec<TagInfo>>;
    fn create_custom_tag(&self, name: &str, color: Option<&str>) -> anyhow::Result<()>;
    fn update_tag_color(&self, name: &str, color: &str) -> anyhow::Result<()>;
    fn delete_custom_tag(&self, name: &str) -> anyhow::Result<()>;
}

/// Collection order shared by every store: pinned first, then newest first.
pub(crate) fn collection_order(a: &Item, b: &Item) -> std::cmp::Ordering {
    b.pinned
        .cmp(&a.pinned)
        .then_with(|| b.captured_at.cmp(&a.captured_at))
}

/// Merges tags in use with the custom tag table into the `listAllTags` shape.
pub(crate) fn merge_tag_infos<'a>(
    in_use: impl IntoIterator<Item = &'a str>,
    custom: impl IntoIterator<Item = (String, Option<String>)>,
) -> Vec<TagInfo> {
    let mut out: std::collections::BTreeMap<String, TagInfo> = std::collections::BTreeMap::new();
    for name in in_use {
        out.entry(name.to_string()).or_insert_with(|| TagInfo {
            name: name.to_string(),
            color: None,
            system: analyzer::is_system_tag(name),
        });
    }
    for (name, color) in custom {
        let system = analyzer::is_system_tag(&name);
        out.insert(name.clone(), TagInfo { name, color, system });
    }
    out.into_values().collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationStatus {
    pub current: i64,
    pub latest: i64,
    pub pending: Vec<String>,
}

#[cfg(feature = "sqlite")]
/// Leading digits of a migration file stem, e.g. `0002_custom_tags` -> 2.
pub(crate) fn parse_version_prefix(stem: &str) -> Option<u32> {
    let digits: String = stem.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// In-memory store used by tests and as the fallback backend.
#[derive(Default)]
pub struct MemStore {
    inner: RwLock<Vec<Item>>,
    custom_tags: RwLock<Vec<(String, Option<String>)>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `items`, e.g. for fixtures.
    pub fn with_items(items: Vec<Item>) -> Self {
        Self {
            inner: RwLock::new(items),
            custom_tags: RwLock::new(Vec::new()),
        }
    }

    fn sorted(&self) -> Vec<Item> {
        let mut v = read(&self.inner).clone();
        v.sort_by(collection_order);
        v
    }
}

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

impl Store for MemStore {
    fn insert(&self, item: &Item) -> anyhow::Result<()> {
        let mut v = write(&self.inner);
        if v.iter().any(|c| c.id == item.id) {
            anyhow::bail!("duplicate item id {}", item.id);
        }
        v.push(item.clone());
        Ok(())
    }

    fn count(&self) -> anyhow::Result<usize> {
        Ok(read(&self.inner).len())
    }

    fn page(&self, offset: usize, limit: usize) -> anyhow::Result<Vec<Item>> {
        Ok(self.sorted().into_iter().skip(offset).take(limit).collect())
    }

    fn get(&self, id: &str) -> anyhow::Result<Option<Item>> {
        Ok(read(&self.inner).iter().find(|c| c.id == id).cloned())
    }

    fn search(&self, pattern: &str, is_regex: bool) -> anyhow::Result<Vec<Item>> {
        let matcher = SearchMatcher::new(pattern, SearchMode::from_regex_flag(is_regex));
        Ok(self
            .sorted()
            .into_iter()
            .filter(|c| matcher.matches(c))
            .collect())
    }

    fn items_by_tag(&self, tag: &str) -> anyhow::Result<Vec<Item>> {
        Ok(self.sorted().into_iter().filter(|c| c.has_tag(tag)).collect())
    }

    fn set_pinned(&self, id: &str, pinned: bool) -> anyhow::Result<()> {
        let mut v = write(&self.inner);
        if let Some(c) = v.iter_mut().find(|c| c.id == id) {
            c.pinned = pinned;
        }
        Ok(())
    }

    fn delete(&self, id: &str) -> anyhow::Result<()> {
        write(&self.inner).retain(|c| c.id != id);
        Ok(())
    }

    fn clear(&self) -> anyhow::Result<()> {
        write(&self.inner).clear();
        Ok(())
    }

    fn add_tag(&self, id: &str, tag: &str) -> anyhow::Result<()> {
        let mut v = write(&self.inner);
        if let Some(c) = v.iter_mut().find(|c| c.id == id) {
            c.push_tag(tag);
        }
        Ok(())
    }

    fn remove_tag(&self, id: &str, tag: &str) -> anyhow::Result<()> {
        let mut v = write(&self.inner);
        if let Some(c) = v.iter_mut().find(|c| c.id == id) {
            c.tags.retain(|t| t != tag);
        }
        Ok(())
    }

    fn list_all_tags(&self) -> anyhow::Result<Vec<TagInfo>> {
        let items = read(&self.inner);
        let custom = read(&self.custom_tags).clone();
        Ok(merge_tag_infos(
            items.iter().flat_map(|c| c.tags.iter().map(String::as_str)),
            custom,
        ))
    }

    fn create_custom_tag(&self, name: &str, color: Option<&str>) -> anyhow::Result<()> {
        let mut tags = write(&self.custom_tags);
        if tags.iter().any(|(n, _)| n == name) {
            anyhow::bail!("tag {name} already exists");
        }
        tags.push((name.to_string(), color.map(str::to_string)));
        Ok(())
    }

    fn update_tag_color(&self, name: &str, color: &str) -> anyhow::Result<()> {
        let mut tags = write(&self.custom_tags);
        match tags.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = Some(color.to_string()),
            None => tags.push((name.to_string(), Some(color.to_string()))),
        }
        Ok(())
    }

    fn delete_custom_tag(&self, name: &str) -> anyhow::Result<()> {
        write(&self.custom_tags).retain(|(n, _)| n != name);
        for c in write(&self.inner).iter_mut() {
            c.tags.retain(|t| t != name);
        }
        Ok(())
    }
}
