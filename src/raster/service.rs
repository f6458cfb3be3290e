//! Render service - manages the worker pool and cache
//!
//! The service is the only way the rest of the crate reaches the
//! rasterizer. It coalesces duplicate requests (a key that is cached or
//! already in flight enqueues nothing), hands out responses tagged with
//! the key they were requested for, and never paints a stale result - the
//! caller checks the key before use.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use flume::{Receiver, Sender};

use crate::error::PageRenderError;
use crate::raster::cache::{RasterCache, RasterKey};
use crate::raster::request::{RenderRequest, RenderResponse, RequestId};
use crate::raster::worker::render_worker;
use crate::raster::{PageBitmap, PageRasterizer, DEFAULT_CACHE_PIXELS, DEFAULT_WORKERS};

/// Worker pool and cache configuration
#[derive(Clone, Copy, Debug)]
pub struct RasterConfig {
    pub workers: usize,
    pub max_cached_pixels: usize,
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            max_cached_pixels: DEFAULT_CACHE_PIXELS,
        }
    }
}

/// Manages page rendering with worker threads and a shared cache
pub struct RenderService {
    request_tx: Sender<RenderRequest>,
    response_rx: Receiver<RenderResponse>,
    cache: Arc<Mutex<RasterCache>>,
    next_request_id: u64,
    in_flight: HashMap<RasterKey, RequestId>,
    num_workers: usize,
}

impl RenderService {
    /// Spawn the worker pool for one loaded document.
    #[must_use]
    pub fn new(rasterizer: Arc<dyn PageRasterizer>, config: RasterConfig) -> Self {
        let cache = Arc::new(Mutex::new(RasterCache::new(config.max_cached_pixels)));

        // flume gives us MPMC channels: multiple workers pull from one
        // shared request queue, which mpsc receivers cannot do.
        let (request_tx, request_rx) = flume::unbounded();
        let (response_tx, response_rx) = flume::unbounded();

        let num_workers = config.workers.max(1);
        for _ in 0..num_workers {
            let raster = Arc::clone(&rasterizer);
            let rx = request_rx.clone();
            let tx = response_tx.clone();
            let cache_clone = Arc::clone(&cache);

            std::thread::spawn(move || {
                render_worker(raster, rx, tx, cache_clone);
            });
        }

        Self {
            request_tx,
            response_rx,
            cache,
            next_request_id: 1,
            in_flight: HashMap::new(),
            num_workers,
        }
    }

    /// Request a render unconditionally. Prefer
    /// [`Self::request_if_needed`], which coalesces.
    pub fn request_page(&mut self, page: usize, scale: f64) -> RequestId {
        let key = RasterKey::new(page, scale);
        let id = self.next_id();
        let _ = self.request_tx.send(RenderRequest::Page { id, key });
        self.in_flight.insert(key, id);
        id
    }

    /// Request a render only if the key is neither cached nor already in
    /// flight. This is the coalescing point: concurrent requests for one
    /// key produce a single underlying render.
    pub fn request_if_needed(&mut self, page: usize, scale: f64) -> Option<RequestId> {
        let key = RasterKey::new(page, scale);
        if self.is_cached(&key) || self.in_flight.contains_key(&key) {
            return None;
        }
        Some(self.request_page(page, scale))
    }

    /// Queue a render ahead of need; same coalescing rules.
    pub fn prefetch(&mut self, page: usize, scale: f64) -> Option<RequestId> {
        let key = RasterKey::new(page, scale);
        if self.is_cached(&key) || self.in_flight.contains_key(&key) {
            return None;
        }
        let id = self.next_id();
        let _ = self.request_tx.send(RenderRequest::Prefetch { id, key });
        self.in_flight.insert(key, id);
        Some(id)
    }

    /// Drain completed responses without blocking. Stale responses (keys
    /// nobody is interested in anymore) still land in the cache via the
    /// worker; the caller filters by key before painting.
    pub fn poll_responses(&mut self) -> Vec<RenderResponse> {
        let mut responses = vec![];

        while let Ok(response) = self.response_rx.try_recv() {
            self.settle(&response);
            responses.push(response);
        }

        responses
    }

    /// Block until the given key is available (or failed). Used by the
    /// export path, which has nothing else to do until the bitmap exists.
    pub fn fetch_blocking(&mut self, page: usize, scale: f64) -> Result<Arc<PageBitmap>, PageRenderError> {
        let key = RasterKey::new(page, scale);

        if let Some(cached) = self.cached(page, scale) {
            return Ok(cached);
        }
        self.request_if_needed(page, scale);

        loop {
            let response = self.response_rx.recv().map_err(|_| PageRenderError {
                page,
                detail: "render workers shut down".into(),
            })?;
            self.settle(&response);

            match response {
                RenderResponse::Page { key: got, data, .. } if got == key => return Ok(data),
                RenderResponse::Error { key: got, fault, .. } if got == key => {
                    return Err(PageRenderError {
                        page,
                        detail: fault.to_string(),
                    });
                }
                // A response for some other key: already settled into the
                // cache by the worker, keep waiting for ours.
                _ => {}
            }
        }
    }

    /// Cached bitmap for a key, if present.
    #[must_use]
    pub fn cached(&self, page: usize, scale: f64) -> Option<Arc<PageBitmap>> {
        self.cache
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(&RasterKey::new(page, scale))
    }

    /// Drop all cached bitmaps and forget in-flight bookkeeping (results
    /// of in-flight renders will be ignored by key checks).
    pub fn invalidate_all(&mut self) {
        self.cache
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .invalidate_all();
        self.in_flight.clear();
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.in_flight.len()
    }

    fn is_cached(&self, key: &RasterKey) -> bool {
        self.cache
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .contains(key)
    }

    fn settle(&mut self, response: &RenderResponse) {
        match response {
            RenderResponse::Page { key, .. } => {
                self.in_flight.remove(key);
            }
            RenderResponse::Error { key, fault, .. } => {
                log::warn!("render failed for page {} at scale {:.3}: {fault}", key.page, key.scale());
                self.in_flight.remove(key);
            }
        }
    }

    fn next_id(&mut self) -> RequestId {
        let id = RequestId::new(self.next_request_id);
        self.next_request_id += 1;
        id
    }

    /// Shutdown all workers
    pub fn shutdown(&self) {
        for _ in 0..self.num_workers {
            let _ = self.request_tx.send(RenderRequest::Shutdown);
        }
    }
}

impl Drop for RenderService {
    fn drop(&mut self) {
        self.shutdown();
    }
}
