//! Page rasterization infrastructure
//!
//! Pages are rendered on worker threads behind MPMC channels, cached by
//! (page, scale) with a total-pixel budget, and handed out as shared
//! immutable bitmaps.

mod backend;
mod bitmap;
mod cache;
mod request;
mod service;
mod worker;

pub use backend::{DocumentBackend, PageRasterizer};
pub use bitmap::PageBitmap;
pub use cache::{RasterCache, RasterKey};
pub use request::{RenderFault, RenderRequest, RenderResponse, RequestId};
pub use service::{RasterConfig, RenderService};

/// Default worker pool size. One worker keeps rendering serialized, which
/// is all the interactive path needs.
pub const DEFAULT_WORKERS: usize = 1;

/// Default cache budget in pixels (~256 MiB of RGBA).
pub const DEFAULT_CACHE_PIXELS: usize = 1 << 26;
