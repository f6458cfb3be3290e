//! Interfaces to the external page rasterizer

use std::sync::Arc;

use crate::error::DocumentLoadError;
use crate::geometry::PageSize;
use crate::raster::request::RenderFault;
use crate::raster::PageBitmap;

/// A loaded source document that can report page geometry and decode
/// pages into bitmaps. Implemented by the host's PDF engine of choice;
/// this crate only consumes the interface.
///
/// Native page sizes must be in the same unit system the document encoder
/// consumes.
pub trait PageRasterizer: Send + Sync {
    fn page_count(&self) -> usize;

    /// Native size of a page in document units.
    fn page_size(&self, page: usize) -> Result<PageSize, RenderFault>;

    /// Decode one page into a bitmap at `scale` pixels per document unit.
    fn render_page(&self, page: usize, scale: f64) -> Result<PageBitmap, RenderFault>;
}

/// Opens raw document bytes into a rasterizer handle.
pub trait DocumentBackend: Send + Sync {
    fn open(&self, bytes: &[u8]) -> Result<Arc<dyn PageRasterizer>, DocumentLoadError>;
}
