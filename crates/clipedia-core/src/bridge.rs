//! Command bridge to the host-resident store
//!
//! The windowed collection only ever talks to a [`CommandBridge`]. Items come
//! back in wire form and are decoded at the boundary.

use crate::error::{BridgeError, Result};
use crate::{Item, Store, TagInfo, WireItem};
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait CommandBridge: Send + Sync {
    async fn count_total(&self) -> Result<usize>;
    async fn fetch_page(&self, offset: usize, limit: usize) -> Result<Vec<WireItem>>;
    /// Server-evaluated search over the whole collection (non-windowed path).
    async fn search_full_collection(&self, pattern: &str, is_regex: bool)
        -> Result<Vec<WireItem>>;
    /// Every item carrying `tag`, regardless of what is cached.
    async fn items_by_tag(&self, tag: &str) -> Result<Vec<WireItem>>;
    async fn set_pinned(&self, id: &str, desired: bool) -> Result<()>;
    async fn delete_item(&self, id: &str) -> Result<()>;
    async fn delete_all(&self) -> Result<()>;
    async fn list_all_tags(&self) -> Result<Vec<TagInfo>>;
}

#[async_trait]
impl<B: CommandBridge + ?Sized> CommandBridge for Arc<B> {
    async fn count_total(&self) -> Result<usize> {
        (**self).count_total().await
    }
    async fn fetch_page(&self, offset: usize, limit: usize) -> Result<Vec<WireItem>> {
        (**self).fetch_page(offset, limit).await
    }
    async fn search_full_collection(
        &self,
        pattern: &str,
        is_regex: bool,
    ) -> Result<Vec<WireItem>> {
        (**self).search_full_collection(pattern, is_regex).await
    }
    async fn items_by_tag(&self, tag: &str) -> Result<Vec<WireItem>> {
        (**self).items_by_tag(tag).await
    }
    async fn set_pinned(&self, id: &str, desired: bool) -> Result<()> {
        (**self).set_pinned(id, desired).await
    }
    async fn delete_item(&self, id: &str) -> Result<()> {
        (**self).delete_item(id).await
    }
    async fn delete_all(&self) -> Result<()> {
        (**self).delete_all().await
    }
    async fn list_all_tags(&self) -> Result<Vec<TagInfo>> {
        (**self).list_all_tags().await
    }
}

/// Decodes a wire page; one bad timestamp fails the whole page.
pub fn decode_items(wire: Vec<WireItem>) -> Result<Vec<Item>> {
    wire.into_iter().map(Item::try_from).collect()
}

pub fn encode_items(items: &[Item]) -> Vec<WireItem> {
    items.iter().map(WireItem::from).collect()
}

/// Bridge over an in-process [`Store`]; each call runs on Tokio's blocking pool.
pub struct LocalBridge<S: ?Sized> {
    store: Arc<S>,
}

impl<S: Store + ?Sized + 'static> LocalBridge<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    async fn run<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&S) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let out = tokio::task::spawn_blocking(move || f(&store)).await??;
        Ok(out)
    }
}

#[async_trait]
impl<S: Store + ?Sized + 'static> CommandBridge for LocalBridge<S> {
    async fn count_total(&self) -> Result<usize> {
        self.run(|s| s.count()).await
    }

    async fn fetch_page(&self, offset: usize, limit: usize) -> Result<Vec<WireItem>> {
        if limit == 0 {
            return Err(BridgeError::InvalidPage { offset, limit });
        }
        let items = self.run(move |s| s.page(offset, limit)).await?;
        Ok(encode_items(&items))
    }

    async fn search_full_collection(
        &self,
        pattern: &str,
        is_regex: bool,
    ) -> Result<Vec<WireItem>> {
        let pattern = pattern.to_string();
        let items = self.run(move |s| s.search(&pattern, is_regex)).await?;
        Ok(encode_items(&items))
    }

    async fn items_by_tag(&self, tag: &str) -> Result<Vec<WireItem>> {
        let tag = tag.to_string();
        let items = self.run(move |s| s.items_by_tag(&tag)).await?;
        Ok(encode_items(&items))
    }

    async fn set_pinned(&self, id: &str, desired: bool) -> Result<()> {
        let id = id.to_string();
        self.run(move |s| s.set_pinned(&id, desired)).await
    }

    async fn delete_item(&self, id: &str) -> Result<()> {
        let id = id.to_string();
        self.run(move |s| s.delete(&id)).await
    }

    async fn delete_all(&self) -> Result<()> {
        self.run(|s| s.clear()).await
    }

    async fn list_all_tags(&self) -> Result<Vec<TagInfo>> {
        self.run(|s| s.list_all_tags()).await
    }
}
