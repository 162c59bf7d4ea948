//! Rendered-page cache for the public HTML routes.
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Invalidation hook the admin pipeline calls after a successful save.
#[async_trait]
pub trait Revalidate: Send + Sync {
    async fn revalidate(&self, paths: &[String]);

    /// Drop every cached page.
    async fn revalidate_all(&self);
}

/// Path → rendered HTML. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct PageCache {
    pages: Arc<RwLock<HashMap<String, String>>>,
}

impl PageCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, path: &str) -> Option<String> {
        self.pages.read().await.get(path).cloned()
    }

    pub async fn put(&self, path: &str, html: String) {
        self.pages.write().await.insert(path.to_string(), html);
    }

    /// Drop everything, e.g. after a retailer change that may touch any page.
    pub async fn clear(&self) {
        let mut pages = self.pages.write().await;
        debug!(pages = pages.len(), "cleared page cache");
        pages.clear();
    }

    pub async fn len(&self) -> usize {
        self.pages.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.pages.read().await.is_empty()
    }
}

#[async_trait]
impl Revalidate for PageCache {
    async fn revalidate(&self, paths: &[String]) {
        let mut pages = self.pages.write().await;
        for path in paths {
            if pages.remove(path).is_some() {
                debug!(path = %path, "dropped cached page");
            }
        }
    }

    async fn revalidate_all(&self) {
        self.clear().await;
    }
}

/// For callers with nothing cached, e.g. the seeding binary.
pub struct NoCache;

#[async_trait]
impl Revalidate for NoCache {
    async fn revalidate(&self, _paths: &[String]) {}

    async fn revalidate_all(&self) {}
}
