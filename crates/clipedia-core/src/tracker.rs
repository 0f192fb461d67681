use crate::cache::CacheStore;
use std::ops::RangeInclusive;

/// Demand signal for the visible window: finds the indices that still need fetching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewportWindowTracker {
    threshold: usize,
}

impl ViewportWindowTracker {
    pub fn new(threshold: usize) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Minimal range covering every unloaded index in `[first, last + threshold]`,
    /// clamped to the total count. `None` when everything is already cached.
    pub fn missing(
        &self,
        cache: &CacheStore,
        first: usize,
        last: usize,
    ) -> Option<RangeInclusive<usize>> {
        let total = cache.total_count();
        if total == 0 || first > last || first >= total {
            return None;
        }
        let end = last.saturating_add(self.threshold).min(total - 1);
        let lo = (first..=end).find(|&i| !cache.is_loaded(i))?;
        let hi = (lo..=end).rev().find(|&i| !cache.is_loaded(i)).unwrap_or(lo);
        Some(lo..=hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Item, ItemKind};

    fn cache_with(total: usize, pages: &[usize]) -> CacheStore {
        let mut cache = CacheStore::new(10);
        cache.set_total_count(total);
        for &p in pages {
            let items = (0..10).map(|i| Item::new(format!("{p}-{i}"), ItemKind::Text)).collect();
            cache.put_page(p, items);
        }
        cache
    }

    #[test]
    fn fully_loaded_window_has_no_demand() {
        let cache = cache_with(30, &[0, 1]);
        assert_eq!(ViewportWindowTracker::new(5).missing(&cache, 0, 10), None);
    }

    #[test]
    fn look_ahead_extends_past_visible_range() {
        let cache = cache_with(30, &[0]);
        assert_eq!(ViewportWindowTracker::new(5).missing(&cache, 2, 8), Some(10..=13));
    }

    #[test]
    fn demand_is_clamped_to_total() {
        let cache = cache_with(25, &[0]);
        assert_eq!(ViewportWindowTracker::new(50).missing(&cache, 5, 9), Some(10..=24));
        assert_eq!(ViewportWindowTracker::new(0).missing(&cache, 40, 45), None);
    }
}
