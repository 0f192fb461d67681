//! Page-fetch planning and completion over the cache
//!
//! The coordinator is sans-IO: [`PageFetchCoordinator::plan`] hands out
//! tickets for pages that are neither loaded nor in flight, and the caller
//! reports each ticket back through [`PageFetchCoordinator::complete`] or
//! [`PageFetchCoordinator::fail`]. Every reset bumps the generation so that
//! tickets issued for a superseded index space are discarded on return.

use crate::cache::CacheStore;
use crate::Item;
use std::collections::HashSet;
use tracing::debug;

pub type Generation = u64;

/// One planned `fetchPage(offset, limit)` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageTicket {
    pub page: usize,
    pub offset: usize,
    pub limit: usize,
    pub generation: Generation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    NotLoaded,
    InFlight,
    Loaded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Page written to the cache.
    Applied { page: usize, items: usize },
    /// Fetch failed; page is eligible for retry.
    Failed { page: usize },
    /// Ticket predates the current generation; nothing was touched.
    Stale { page: usize },
}

impl Completion {
    pub fn page(&self) -> usize {
        match *self {
            Completion::Applied { page, .. }
            | Completion::Failed { page }
            | Completion::Stale { page } => page,
        }
    }
}

/// Outcome of one range request, by page number.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchReport {
    pub requested: Vec<usize>,
    pub loaded: Vec<usize>,
    pub failed: Vec<usize>,
    pub stale: Vec<usize>,
}

impl FetchReport {
    pub fn record(&mut self, completion: Completion) {
        match completion {
            Completion::Applied { page, .. } => self.loaded.push(page),
            Completion::Failed { page } => self.failed.push(page),
            Completion::Stale { page } => self.stale.push(page),
        }
    }
}

#[derive(Debug)]
pub struct PageFetchCoordinator {
    cache: CacheStore,
    in_flight: HashSet<usize>,
    generation: Generation,
}

impl PageFetchCoordinator {
    pub fn new(page_size: usize) -> Self {
        Self {
            cache: CacheStore::new(page_size),
            in_flight: HashSet::new(),
            generation: 0,
        }
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut CacheStore {
        &mut self.cache
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn page_state(&self, page: usize) -> PageState {
        if self.cache.has_page(page) {
            PageState::Loaded
        } else if self.in_flight.contains(&page) {
            PageState::InFlight
        } else {
            PageState::NotLoaded
        }
    }

    /// Plans fetches for `[start, stop]` (inclusive) and marks them in flight.
    ///
    /// `stop` is clamped to the last index of the current total.
    pub fn plan(&mut self, start: usize, stop: usize) -> Vec<PageTicket> {
        let total = self.cache.total_count();
        if total == 0 || start > stop || start >= total {
            return Vec::new();
        }
        let stop = stop.min(total - 1);
        let page_size = self.cache.page_size();
        let first = start / page_size;
        let last = stop / page_size;
        let mut tickets = Vec::new();
        for page in first..=last {
            if self.cache.has_page(page) || self.in_flight.contains(&page) {
                continue;
            }
            self.in_flight.insert(page);
            tickets.push(PageTicket {
                page,
                offset: page * page_size,
                limit: page_size,
                generation: self.generation,
            });
        }
        if !tickets.is_empty() {
            debug!(start, stop, pages = ?tickets.iter().map(|t| t.page).collect::<Vec<_>>(), generation = self.generation, "planned page fetches");
        }
        tickets
    }

    pub fn complete(&mut self, ticket: PageTicket, items: Vec<Item>) -> Completion {
        if ticket.generation != self.generation {
            debug!(page = ticket.page, ticket_generation = ticket.generation, generation = self.generation, "discarding stale page");
            return Completion::Stale { page: ticket.page };
        }
        self.in_flight.remove(&ticket.page);
        let count = items.len();
        self.cache.put_page(ticket.page, items);
        Completion::Applied {
            page: ticket.page,
            items: count,
        }
    }

    pub fn fail(&mut self, ticket: PageTicket) -> Completion {
        if ticket.generation != self.generation {
            return Completion::Stale { page: ticket.page };
        }
        self.in_flight.remove(&ticket.page);
        Completion::Failed { page: ticket.page }
    }

    /// Clears the cache and in-flight set and starts a new generation.
    pub fn reset(&mut self) -> Generation {
        self.cache.reset();
        self.in_flight.clear();
        self.generation += 1;
        debug!(generation = self.generation, "cache reset");
        self.generation
    }

    /// Applies a count that was requested during `generation`; returns false if superseded.
    pub fn apply_total_count(&mut self, generation: Generation, n: usize) -> bool {
        if generation != self.generation {
            return false;
        }
        self.cache.set_total_count(n);
        true
    }
}
