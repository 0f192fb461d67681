#![allow(dead_code)]
use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use clipedia_core::bridge::encode_items;
use clipedia_core::error::Result;
use clipedia_core::{CommandBridge, Item, ItemKind, TagInfo, WireItem};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

/// `n` items in collection order, newest first: `item-0` is at index 0.
pub fn numbered(n: usize) -> Vec<Item> {
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    (0..n)
        .map(|i| {
            let mut item = Item::new(format!("item-{i}"), ItemKind::Text);
            item.captured_at = base - Duration::seconds(i as i64);
            item
        })
        .collect()
}

/// Bridge over a plain `Vec` that records calls and can hold or fail fetches.
#[derive(Default)]
pub struct ScriptedBridge {
    items: Mutex<Vec<Item>>,
    fetch_calls: Mutex<HashMap<usize, usize>>,
    pin_calls: Mutex<Vec<(String, bool)>>,
    gates: Mutex<HashMap<usize, Arc<Semaphore>>>,
    fail_fetch: Mutex<HashSet<usize>>,
    corrupt_fetch: Mutex<HashSet<usize>>,
    pub fail_count: AtomicBool,
    pub fail_pins: AtomicBool,
    pub fail_deletes: AtomicBool,
}

impl ScriptedBridge {
    pub fn with_items(items: Vec<Item>) -> Arc<Self> {
        Arc::new(Self {
            items: Mutex::new(items),
            ..Self::default()
        })
    }

    pub fn items(&self) -> Vec<Item> {
        self.items.lock().unwrap().clone()
    }

    pub fn fetch_calls(&self, offset: usize) -> usize {
        self.fetch_calls.lock().unwrap().get(&offset).copied().unwrap_or(0)
    }

    pub fn total_fetch_calls(&self) -> usize {
        self.fetch_calls.lock().unwrap().values().sum()
    }

    pub fn pin_calls(&self) -> Vec<(String, bool)> {
        self.pin_calls.lock().unwrap().clone()
    }

    /// Fetches at `offset` block until [`release`](Self::release).
    pub fn hold(&self, offset: usize) {
        self.gates
            .lock()
            .unwrap()
            .insert(offset, Arc::new(Semaphore::new(0)));
    }

    pub fn release(&self, offset: usize) {
        if let Some(gate) = self.gates.lock().unwrap().remove(&offset) {
            gate.close();
        }
    }

    /// Next fetch at `offset` fails.
    pub fn fail_next_fetch(&self, offset: usize) {
        self.fail_fetch.lock().unwrap().insert(offset);
    }

    /// Next fetch at `offset` returns an item with an unparseable timestamp.
    pub fn corrupt_next_fetch(&self, offset: usize) {
        self.corrupt_fetch.lock().unwrap().insert(offset);
    }

    /// Waits until at least `n` fetches at `offset` have started.
    pub async fn wait_for_fetch(&self, offset: usize, n: usize) {
        while self.fetch_calls(offset) < n {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl CommandBridge for ScriptedBridge {
    async fn count_total(&self) -> Result<usize> {
        if self.fail_count.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("count unavailable").into());
        }
        Ok(self.items.lock().unwrap().len())
    }

    async fn fetch_page(&self, offset: usize, limit: usize) -> Result<Vec<WireItem>> {
        *self.fetch_calls.lock().unwrap().entry(offset).or_default() += 1;
        let gate = self.gates.lock().unwrap().get(&offset).cloned();
        if let Some(gate) = gate {
            let _ = gate.acquire().await;
        }
        if self.fail_fetch.lock().unwrap().remove(&offset) {
            return Err(anyhow::anyhow!("fetch at {offset} failed").into());
        }
        let items = self.items.lock().unwrap();
        let page: Vec<Item> = items.iter().skip(offset).take(limit).cloned().collect();
        let mut wire = encode_items(&page);
        if self.corrupt_fetch.lock().unwrap().remove(&offset) {
            if let Some(first) = wire.first_mut() {
                first.captured_at = "yesterday".into();
            }
        }
        Ok(wire)
    }

    async fn search_full_collection(
        &self,
        pattern: &str,
        _is_regex: bool,
    ) -> Result<Vec<WireItem>> {
        let items = self.items.lock().unwrap();
        let hits: Vec<Item> = items
            .iter()
            .filter(|i| i.content.contains(pattern))
            .cloned()
            .collect();
        Ok(encode_items(&hits))
    }

    async fn items_by_tag(&self, tag: &str) -> Result<Vec<WireItem>> {
        let items = self.items.lock().unwrap();
        let hits: Vec<Item> = items.iter().filter(|i| i.has_tag(tag)).cloned().collect();
        Ok(encode_items(&hits))
    }

    async fn set_pinned(&self, id: &str, desired: bool) -> Result<()> {
        self.pin_calls.lock().unwrap().push((id.to_string(), desired));
        if self.fail_pins.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("pin rejected").into());
        }
        if let Some(item) = self.items.lock().unwrap().iter_mut().find(|i| i.id == id) {
            item.pinned = desired;
        }
        Ok(())
    }

    async fn delete_item(&self, id: &str) -> Result<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("delete rejected").into());
        }
        self.items.lock().unwrap().retain(|i| i.id != id);
        Ok(())
    }

    async fn delete_all(&self) -> Result<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("delete rejected").into());
        }
        self.items.lock().unwrap().clear();
        Ok(())
    }

    async fn list_all_tags(&self) -> Result<Vec<TagInfo>> {
        Ok(Vec::new())
    }
}
