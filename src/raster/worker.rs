//! Render worker - runs in dedicated thread(s)

use std::sync::{Arc, Mutex};

use flume::{Receiver, Sender};

use crate::raster::cache::{RasterCache, RasterKey};
use crate::raster::request::{RenderRequest, RenderResponse, RequestId};
use crate::raster::PageRasterizer;

/// Main worker function. Pulls requests from the shared queue until
/// shutdown. Workers write straight into the shared cache and notify the
/// service through the response channel.
pub fn render_worker(
    rasterizer: Arc<dyn PageRasterizer>,
    requests: Receiver<RenderRequest>,
    responses: Sender<RenderResponse>,
    cache: Arc<Mutex<RasterCache>>,
) {
    for request in requests {
        match request {
            RenderRequest::Page { id, key } | RenderRequest::Prefetch { id, key } => {
                handle_page_request(rasterizer.as_ref(), id, key, &cache, &responses);
            }

            RenderRequest::Shutdown => break,
        }
    }
}

fn handle_page_request(
    rasterizer: &dyn PageRasterizer,
    id: RequestId,
    key: RasterKey,
    cache: &Arc<Mutex<RasterCache>>,
    responses: &Sender<RenderResponse>,
) {
    // Another worker may have completed the same key while this request
    // sat in the queue.
    let cached = cache
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .get(&key);
    if let Some(cached) = cached {
        let _ = responses.send(RenderResponse::Page {
            id,
            key,
            data: cached,
        });
        return;
    }

    match rasterizer.render_page(key.page, key.scale()) {
        Ok(data) => {
            let cached = cache
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .insert(key, data);
            let _ = responses.send(RenderResponse::Page {
                id,
                key,
                data: cached,
            });
        }
        Err(fault) => {
            let _ = responses.send(RenderResponse::Error { id, key, fault });
        }
    }
}
