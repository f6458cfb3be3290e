//! Rendered page bitmap

use image::RgbaImage;

use crate::geometry::PageSize;

/// A raster of one page at a given scale (bitmap pixels per document
/// unit). Never mutated after rendering; the compositor always draws into
/// a fresh copy, so a cached bitmap never shows burned-in markup.
#[derive(Clone)]
pub struct PageBitmap {
    /// Page index (0-based)
    pub page_index: usize,
    /// Pixels per document unit this raster was produced at
    pub scale: f64,
    /// RGBA pixel buffer
    pub image: RgbaImage,
}

impl PageBitmap {
    #[must_use]
    pub fn new(page_index: usize, scale: f64, image: RgbaImage) -> Self {
        Self {
            page_index,
            scale,
            image,
        }
    }

    /// Pixel dimensions a page of `native` size occupies at `scale`.
    #[must_use]
    pub fn dimensions_for(native: PageSize, scale: f64) -> (u32, u32) {
        let w = (native.width * scale).ceil().max(1.0) as u32;
        let h = (native.height * scale).ceil().max(1.0) as u32;
        (w, h)
    }

    #[must_use]
    pub fn pixel_width(&self) -> u32 {
        self.image.width()
    }

    #[must_use]
    pub fn pixel_height(&self) -> u32 {
        self.image.height()
    }

    #[must_use]
    pub fn pixel_count(&self) -> usize {
        self.image.width() as usize * self.image.height() as usize
    }
}

impl std::fmt::Debug for PageBitmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageBitmap")
            .field("page_index", &self.page_index)
            .field("scale", &self.scale)
            .field("pixel_width", &self.image.width())
            .field("pixel_height", &self.image.height())
            .finish_non_exhaustive()
    }
}
