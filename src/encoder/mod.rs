//! Output document assembly
//!
//! The engine never serializes documents itself; it feeds pages - original
//! pass-throughs or flattened bitmaps - to a [`DocumentEncoder`]. One
//! concrete implementation backed by `lopdf` ships with the crate.

mod pdf;

pub use pdf::PdfEncoder;

use crate::error::EncodeFault;
use crate::geometry::PageSize;
use crate::raster::PageBitmap;

/// Serializes pages into an output document. The encoder holds the source
/// document it was created from, so original pages are addressed by index
/// alone. Pages are appended strictly in order.
pub trait DocumentEncoder {
    /// Pass the source page through unchanged, preserving its vector
    /// content.
    fn append_original_page(&mut self, index: usize) -> Result<(), EncodeFault>;

    /// Append a raster page. The output page's dimensions must equal
    /// `native` exactly, regardless of the bitmap's pixel resolution.
    fn append_bitmap_page(&mut self, bitmap: &PageBitmap, native: PageSize)
        -> Result<(), EncodeFault>;

    /// Serialize the output document.
    fn finish(self: Box<Self>) -> Result<Vec<u8>, EncodeFault>;
}
