//! Render request and response types

use std::sync::Arc;

use crate::raster::cache::RasterKey;
use crate::raster::PageBitmap;

/// Unique identifier for render requests
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RequestId(pub u64);

impl RequestId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

/// Errors from the underlying rasterizer
#[derive(Debug, thiserror::Error)]
pub enum RenderFault {
    #[error("page {page} out of range (document has {count} pages)")]
    PageOutOfRange { page: usize, count: usize },

    #[error("{detail}")]
    Generic { detail: String },
}

impl RenderFault {
    pub fn generic(msg: impl Into<String>) -> Self {
        Self::Generic { detail: msg.into() }
    }
}

/// Request sent to render workers
#[derive(Debug)]
pub enum RenderRequest {
    /// Render a page for immediate display or export
    Page { id: RequestId, key: RasterKey },

    /// Render a page ahead of need (same handling, lower urgency)
    Prefetch { id: RequestId, key: RasterKey },

    /// Shutdown the worker
    Shutdown,
}

/// Response from render workers. Carries the key the work was requested
/// for so the caller can check relevance before using the result - a
/// render is never allowed to win a race and paint the wrong page.
#[derive(Debug)]
pub enum RenderResponse {
    Page {
        id: RequestId,
        key: RasterKey,
        data: Arc<PageBitmap>,
    },

    Error {
        id: RequestId,
        key: RasterKey,
        fault: RenderFault,
    },
}
