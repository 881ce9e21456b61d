//! In-process cache for catalog listings.
//!
//! Entries are filled lazily by readers and dropped wholesale by
//! [`CatalogCache::invalidate_catalog`] at the end of every catalog mutation.
//! A generation counter keeps a reader that loaded before an invalidation
//! from re-inserting what it read.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use shopfront_catalog::Category;

use crate::views::ProductView;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Categories,
    FeaturedProducts,
    NewProducts,
}

#[derive(Debug, Clone)]
enum Cached {
    Categories(Arc<Vec<Category>>),
    Products(Arc<Vec<ProductView>>),
}

#[derive(Debug, Default)]
struct Entries {
    generation: u64,
    map: HashMap<CacheKey, Cached>,
}

#[derive(Debug, Default)]
pub struct CatalogCache {
    inner: RwLock<Entries>,
}

impl CatalogCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current generation; pass it back to `put_*` after loading.
    pub fn generation(&self) -> u64 {
        self.inner.read().map(|e| e.generation).unwrap_or(u64::MAX)
    }

    pub fn categories(&self) -> Option<Arc<Vec<Category>>> {
        match self.get(CacheKey::Categories)? {
            Cached::Categories(c) => Some(c),
            Cached::Products(_) => None,
        }
    }

    pub fn products(&self, key: CacheKey) -> Option<Arc<Vec<ProductView>>> {
        match self.get(key)? {
            Cached::Products(p) => Some(p),
            Cached::Categories(_) => None,
        }
    }

    pub fn put_categories(&self, generation: u64, categories: Vec<Category>) -> Arc<Vec<Category>> {
        let value = Arc::new(categories);
        self.put(CacheKey::Categories, generation, Cached::Categories(value.clone()));
        value
    }

    pub fn put_products(&self, key: CacheKey, generation: u64, products: Vec<ProductView>) -> Arc<Vec<ProductView>> {
        let value = Arc::new(products);
        self.put(key, generation, Cached::Products(value.clone()));
        value
    }

    pub fn is_cached(&self, key: CacheKey) -> bool {
        self.get(key).is_some()
    }

    /// Drop every catalog entry.
    pub fn invalidate_catalog(&self) {
        match self.inner.write() {
            Ok(mut entries) => {
                entries.generation = entries.generation.wrapping_add(1);
                entries.map.clear();
                debug!(generation = entries.generation, "catalog cache invalidated");
            }
            Err(poisoned) => {
                warn!("catalog cache lock poisoned; resetting");
                let mut entries = poisoned.into_inner();
                entries.generation = entries.generation.wrapping_add(1);
                entries.map.clear();
                self.inner.clear_poison();
            }
        }
    }

    fn get(&self, key: CacheKey) -> Option<Cached> {
        let entries = self.inner.read().ok()?;
        entries.map.get(&key).cloned()
    }

    fn put(&self, key: CacheKey, generation: u64, value: Cached) {
        let Ok(mut entries) = self.inner.write() else {
            return;
        };
        if entries.generation == generation {
            entries.map.insert(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopfront_core::CategoryId;

    fn category(name: &str) -> Category {
        Category {
            id: CategoryId::new(),
            name: name.to_string(),
            description: None,
            image: None,
        }
    }

    #[test]
    fn stores_and_returns_categories() {
        let cache = CatalogCache::new();
        assert!(cache.categories().is_none());

        let generation = cache.generation();
        cache.put_categories(generation, vec![category("Frames")]);

        assert_eq!(cache.categories().unwrap().len(), 1);
        assert!(cache.is_cached(CacheKey::Categories));
    }

    #[test]
    fn invalidate_clears_every_key() {
        let cache = CatalogCache::new();
        let generation = cache.generation();
        cache.put_categories(generation, vec![]);
        cache.put_products(CacheKey::FeaturedProducts, generation, vec![]);
        cache.put_products(CacheKey::NewProducts, generation, vec![]);

        cache.invalidate_catalog();

        assert!(!cache.is_cached(CacheKey::Categories));
        assert!(!cache.is_cached(CacheKey::FeaturedProducts));
        assert!(!cache.is_cached(CacheKey::NewProducts));
    }

    #[test]
    fn stale_load_is_not_cached() {
        let cache = CatalogCache::new();
        let before = cache.generation();
        cache.invalidate_catalog();

        cache.put_categories(before, vec![category("Old")]);
        assert!(cache.categories().is_none());
    }
}
