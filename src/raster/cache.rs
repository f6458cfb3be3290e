//! LRU cache for rendered page bitmaps
//!
//! Keyed by (page, scale); multiple scales of the same page coexist (a
//! thumbnail strip at low scale next to a detail view at high scale).
//! Eviction is by total cached pixels against a budget, least recently
//! used first - page bitmaps dominate memory, entry counts don't.

use std::sync::Arc;

use lru::LruCache;

use crate::raster::PageBitmap;

/// Cache key for rendered pages
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RasterKey {
    /// Page index (0-based)
    pub page: usize,
    /// Scale factor (stored as millionths for stable hashing)
    pub scale_millionths: u64,
}

impl RasterKey {
    #[must_use]
    pub fn new(page: usize, scale: f64) -> Self {
        Self {
            page,
            scale_millionths: (scale * 1_000_000.0).round() as u64,
        }
    }

    #[must_use]
    pub fn scale(&self) -> f64 {
        self.scale_millionths as f64 / 1_000_000.0
    }
}

/// Pixel-budgeted LRU cache of rendered page bitmaps
pub struct RasterCache {
    cache: LruCache<RasterKey, Arc<PageBitmap>>,
    max_pixels: usize,
    cached_pixels: usize,
}

impl RasterCache {
    /// Create a cache bounded by total cached pixels.
    #[must_use]
    pub fn new(max_pixels: usize) -> Self {
        Self {
            cache: LruCache::unbounded(),
            max_pixels: max_pixels.max(1),
            cached_pixels: 0,
        }
    }

    /// Get a cached bitmap, promoting it in the LRU order
    #[must_use]
    pub fn get(&mut self, key: &RasterKey) -> Option<Arc<PageBitmap>> {
        self.cache.get(key).cloned()
    }

    /// Check for a key without promoting it
    #[must_use]
    pub fn contains(&self, key: &RasterKey) -> bool {
        self.cache.contains(key)
    }

    /// Insert a bitmap, evicting least-recently-used entries past the
    /// pixel budget. The newest entry always stays, even when it alone
    /// exceeds the budget.
    pub fn insert(&mut self, key: RasterKey, data: PageBitmap) -> Arc<PageBitmap> {
        let arc = Arc::new(data);
        self.cached_pixels += arc.pixel_count();
        if let Some(old) = self.cache.put(key, Arc::clone(&arc)) {
            self.cached_pixels = self.cached_pixels.saturating_sub(old.pixel_count());
        }

        while self.cached_pixels > self.max_pixels && self.cache.len() > 1 {
            if let Some((evicted_key, evicted)) = self.cache.pop_lru() {
                self.cached_pixels = self.cached_pixels.saturating_sub(evicted.pixel_count());
                log::debug!(
                    "raster cache: evicted page {} at scale {:.3} ({} px over budget)",
                    evicted_key.page,
                    evicted_key.scale(),
                    evicted.pixel_count()
                );
            } else {
                break;
            }
        }

        arc
    }

    /// Drop every cached bitmap (document changed)
    pub fn invalidate_all(&mut self) {
        self.cache.clear();
        self.cached_pixels = 0;
    }

    /// Drop all cached scales of one page
    pub fn invalidate_page(&mut self, page: usize) {
        let stale: Vec<RasterKey> = self
            .cache
            .iter()
            .filter(|(k, _)| k.page == page)
            .map(|(k, _)| *k)
            .collect();

        for key in stale {
            if let Some(dropped) = self.cache.pop(&key) {
                self.cached_pixels = self.cached_pixels.saturating_sub(dropped.pixel_count());
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Total pixels currently cached
    #[must_use]
    pub fn cached_pixels(&self) -> usize {
        self.cached_pixels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    fn bitmap(page: usize, side: u32) -> PageBitmap {
        PageBitmap::new(page, 1.0, RgbaImage::new(side, side))
    }

    #[test]
    fn insert_and_get() {
        let mut cache = RasterCache::new(1_000_000);
        let key = RasterKey::new(0, 1.5);
        cache.insert(key, bitmap(0, 10));

        assert!(cache.contains(&key));
        assert!(cache.get(&key).is_some());
        assert_eq!(cache.cached_pixels(), 100);
    }

    #[test]
    fn scales_of_one_page_coexist() {
        let mut cache = RasterCache::new(1_000_000);
        cache.insert(RasterKey::new(3, 0.25), bitmap(3, 10));
        cache.insert(RasterKey::new(3, 2.0), bitmap(3, 80));

        assert!(cache.contains(&RasterKey::new(3, 0.25)));
        assert!(cache.contains(&RasterKey::new(3, 2.0)));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn pixel_budget_evicts_lru() {
        // Budget fits two 10x10 bitmaps but not three.
        let mut cache = RasterCache::new(250);
        cache.insert(RasterKey::new(0, 1.0), bitmap(0, 10));
        cache.insert(RasterKey::new(1, 1.0), bitmap(1, 10));
        cache.insert(RasterKey::new(2, 1.0), bitmap(2, 10));

        assert!(!cache.contains(&RasterKey::new(0, 1.0)));
        assert!(cache.contains(&RasterKey::new(1, 1.0)));
        assert!(cache.contains(&RasterKey::new(2, 1.0)));
        assert!(cache.cached_pixels() <= 250);
    }

    #[test]
    fn get_promotes_against_eviction() {
        let mut cache = RasterCache::new(250);
        cache.insert(RasterKey::new(0, 1.0), bitmap(0, 10));
        cache.insert(RasterKey::new(1, 1.0), bitmap(1, 10));

        // Touch page 0 so page 1 becomes the eviction candidate.
        let _ = cache.get(&RasterKey::new(0, 1.0));
        cache.insert(RasterKey::new(2, 1.0), bitmap(2, 10));

        assert!(cache.contains(&RasterKey::new(0, 1.0)));
        assert!(!cache.contains(&RasterKey::new(1, 1.0)));
    }

    #[test]
    fn oversized_entry_still_cached() {
        let mut cache = RasterCache::new(50);
        cache.insert(RasterKey::new(0, 4.0), bitmap(0, 100));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn invalidate_all_clears_budget_accounting() {
        let mut cache = RasterCache::new(1_000_000);
        cache.insert(RasterKey::new(0, 1.0), bitmap(0, 10));
        cache.insert(RasterKey::new(1, 1.0), bitmap(1, 10));

        cache.invalidate_all();
        assert!(cache.is_empty());
        assert_eq!(cache.cached_pixels(), 0);
    }

    #[test]
    fn invalidate_page_drops_every_scale() {
        let mut cache = RasterCache::new(1_000_000);
        cache.insert(RasterKey::new(0, 1.0), bitmap(0, 10));
        cache.insert(RasterKey::new(0, 2.0), bitmap(0, 20));
        cache.insert(RasterKey::new(1, 1.0), bitmap(1, 10));

        cache.invalidate_page(0);
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&RasterKey::new(1, 1.0)));
        assert_eq!(cache.cached_pixels(), 100);
    }
}
