//! Sparse, index-addressed cache of fetched items
//!
//! Slots are a growable `Vec<Option<Item>>` where `None` means "not loaded";
//! a parallel per-page bitset records which pages hold a completed fetch.

use crate::Item;

#[derive(Debug, Clone)]
pub struct CacheStore {
    page_size: usize,
    slots: Vec<Option<Item>>,
    loaded: Vec<bool>,
    total_count: usize,
}

impl CacheStore {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            slots: Vec::new(),
            loaded: Vec::new(),
            total_count: 0,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn page_of(&self, index: usize) -> usize {
        index / self.page_size
    }

    pub fn get(&self, index: usize) -> Option<&Item> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    pub fn is_loaded(&self, index: usize) -> bool {
        self.get(index).is_some()
    }

    pub fn has_page(&self, page: usize) -> bool {
        self.loaded.get(page).copied().unwrap_or(false)
    }

    /// Writes `items` at `[page * page_size, ..)` and marks the page loaded.
    ///
    /// The page's previous slots are cleared first, so a shorter re-fetch
    /// leaves no stale tail behind.
    pub fn put_page(&mut self, page: usize, items: Vec<Item>) {
        let start = page * self.page_size;
        let page_end = (start + self.page_size).min(self.slots.len());
        for slot in self.slots.iter_mut().take(page_end).skip(start) {
            *slot = None;
        }
        let len = items.len().min(self.page_size);
        if self.slots.len() < start + len {
            self.slots.resize(start + len, None);
        }
        for (offset, item) in items.into_iter().take(len).enumerate() {
            self.slots[start + offset] = Some(item);
        }
        if self.loaded.len() <= page {
            self.loaded.resize(page + 1, false);
        }
        self.loaded[page] = true;
    }

    /// Drops every entry and loaded mark. The total count survives until the next refresh.
    pub fn reset(&mut self) {
        self.slots.clear();
        self.loaded.clear();
    }

    pub fn total_count(&self) -> usize {
        self.total_count
    }

    pub fn set_total_count(&mut self, n: usize) {
        self.total_count = n;
    }

    pub fn loaded_pages(&self) -> impl Iterator<Item = usize> + '_ {
        self.loaded
            .iter()
            .enumerate()
            .filter_map(|(page, loaded)| loaded.then_some(page))
    }

    /// Loaded entries in index order, bounded by the total count.
    pub fn loaded_items(&self) -> impl Iterator<Item = (usize, &Item)> + '_ {
        self.slots
            .iter()
            .take(self.total_count)
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|item| (index, item)))
    }

    pub fn find(&self, id: &str) -> Option<&Item> {
        self.slots.iter().flatten().find(|item| item.id == id)
    }

    /// Sets `pinned` on every cached entry with `id`; returns how many were touched.
    pub fn set_pinned(&mut self, id: &str, pinned: bool) -> usize {
        let mut touched = 0;
        for item in self.slots.iter_mut().flatten().filter(|item| item.id == id) {
            item.pinned = pinned;
            touched += 1;
        }
        touched
    }
}
