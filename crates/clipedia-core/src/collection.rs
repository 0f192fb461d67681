//! The windowed collection: one owned state object behind the renderer
//!
//! `WindowedCollection` owns the bridge, the viewport tracker and a
//! mutex-guarded [`PageFetchCoordinator`]. The lock is only ever held for
//! short synchronous sections, never across an `.await`, so overlapping
//! range requests and mutations interleave freely on one task.

use crate::bridge::{decode_items, CommandBridge};
use crate::coordinator::{FetchReport, PageFetchCoordinator, PageState, PageTicket};
use crate::error::Result;
use crate::filter::{self, FilterCriteria};
use crate::tracker::ViewportWindowTracker;
use crate::{Item, TagInfo};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const DEFAULT_THRESHOLD: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub page_size: usize,
    /// Look-ahead past the last visible index.
    pub threshold: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// What a renderer shows at one index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    Loaded(Item),
    Placeholder,
}

pub struct WindowedCollection<B> {
    pub(crate) bridge: B,
    tracker: ViewportWindowTracker,
    state: Mutex<PageFetchCoordinator>,
}

impl<B: CommandBridge> WindowedCollection<B> {
    pub fn new(bridge: B, config: WindowConfig) -> Self {
        Self {
            bridge,
            tracker: ViewportWindowTracker::new(config.threshold),
            state: Mutex::new(PageFetchCoordinator::new(config.page_size)),
        }
    }

    pub fn bridge(&self) -> &B {
        &self.bridge
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, PageFetchCoordinator> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Fetches the total count, then page 0. A failed count leaves the total untouched.
    pub async fn load_initial(&self) -> FetchReport {
        let generation = self.state().generation();
        let total = match self.bridge.count_total().await {
            Ok(n) => n,
            Err(e) => {
                warn!(error = %e, "failed to fetch total count");
                return FetchReport::default();
            }
        };
        if !self.state().apply_total_count(generation, total) {
            debug!(generation, "count superseded by a newer reset");
            return FetchReport::default();
        }
        if total == 0 {
            return FetchReport::default();
        }
        self.request_range(0, 0).await
    }

    /// Re-reads the total count without touching cached pages.
    pub async fn refresh_count(&self) -> Option<usize> {
        let generation = self.state().generation();
        match self.bridge.count_total().await {
            Ok(n) => self.state().apply_total_count(generation, n).then_some(n),
            Err(e) => {
                warn!(error = %e, "failed to refresh total count");
                None
            }
        }
    }

    /// Fetches every page in `[start, stop]` that is neither loaded nor in flight.
    pub async fn request_range(&self, start: usize, stop: usize) -> FetchReport {
        let tickets = self.state().plan(start, stop);
        let mut report = FetchReport {
            requested: tickets.iter().map(|t| t.page).collect(),
            ..FetchReport::default()
        };
        let completions = join_all(tickets.into_iter().map(|t| self.fetch_ticket(t))).await;
        for completion in completions {
            report.record(completion);
        }
        report
    }

    async fn fetch_ticket(&self, ticket: PageTicket) -> crate::coordinator::Completion {
        let fetched = self
            .bridge
            .fetch_page(ticket.offset, ticket.limit)
            .await
            .and_then(decode_items);
        match fetched {
            Ok(items) => self.state().complete(ticket, items),
            Err(e) => {
                warn!(page = ticket.page, offset = ticket.offset, error = %e, "page fetch failed");
                self.state().fail(ticket)
            }
        }
    }

    /// Viewport signal: fetches whatever the visible range plus look-ahead is missing.
    pub async fn on_viewport(&self, first: usize, last: usize) -> FetchReport {
        let missing = self.tracker.missing(self.state().cache(), first, last);
        match missing {
            Some(range) => self.request_range(*range.start(), *range.end()).await,
            None => FetchReport::default(),
        }
    }

    pub fn total_count(&self) -> usize {
        self.state().cache().total_count()
    }

    pub fn page_state(&self, page: usize) -> PageState {
        self.state().page_state(page)
    }

    pub fn is_item_loaded(&self, index: usize) -> bool {
        self.state().cache().is_loaded(index)
    }

    pub fn get(&self, index: usize) -> Option<Item> {
        self.state().cache().get(index).cloned()
    }

    /// `None` past the end of the collection.
    pub fn slot(&self, index: usize) -> Option<Slot> {
        let state = self.state();
        let cache = state.cache();
        if index >= cache.total_count() {
            return None;
        }
        Some(match cache.get(index) {
            Some(item) => Slot::Loaded(item.clone()),
            None => Slot::Placeholder,
        })
    }

    /// Slots for `[start, stop]`, clamped to the collection.
    pub fn slots(&self, start: usize, stop: usize) -> Vec<(usize, Slot)> {
        (start..=stop)
            .map_while(|i| self.slot(i).map(|s| (i, s)))
            .collect()
    }

    /// Filtered view of the currently loaded items, in cache order.
    pub fn display_list(&self, criteria: &FilterCriteria) -> Vec<Item> {
        let state = self.state();
        filter::apply(state.cache().loaded_items().map(|(_, item)| item), criteria)
            .into_iter()
            .cloned()
            .collect()
    }

    pub async fn search_full_collection(&self, pattern: &str, is_regex: bool) -> Result<Vec<Item>> {
        let wire = self.bridge.search_full_collection(pattern, is_regex).await?;
        decode_items(wire)
    }

    /// Store-side tag lookup; like search it is not limited to cached pages.
    pub async fn items_by_tag(&self, tag: &str) -> Result<Vec<Item>> {
        let wire = self.bridge.items_by_tag(tag).await?;
        decode_items(wire)
    }

    pub async fn list_all_tags(&self) -> Result<Vec<TagInfo>> {
        self.bridge.list_all_tags().await
    }
}
