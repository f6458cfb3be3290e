//! lopdf-backed document encoder
//!
//! Loads the source document once, then assembles the output page tree
//! from a mix of source page references and freshly built raster pages.
//! A raster page is a Flate-compressed DeviceRGB image XObject drawn over
//! a MediaBox equal to the page's native size, so the printable area
//! matches the source exactly even though the content is now pixels.

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use rayon::prelude::*;

use crate::encoder::DocumentEncoder;
use crate::error::{DocumentLoadError, EncodeFault};
use crate::geometry::PageSize;
use crate::raster::PageBitmap;

pub struct PdfEncoder {
    doc: Document,
    source_pages: Vec<ObjectId>,
    appended: Vec<ObjectId>,
    image_seq: usize,
}

impl PdfEncoder {
    /// Load the source document this encoder will rebuild.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DocumentLoadError> {
        let doc = Document::load_mem(bytes)
            .map_err(|e| DocumentLoadError::Unreadable(e.to_string()))?;

        // get_pages is keyed by 1-based page number in order.
        let source_pages: Vec<ObjectId> = doc.get_pages().values().copied().collect();
        if source_pages.is_empty() {
            return Err(DocumentLoadError::Empty);
        }

        Ok(Self {
            doc,
            source_pages,
            appended: Vec::new(),
            image_seq: 0,
        })
    }

    /// Number of pages in the source document.
    #[must_use]
    pub fn source_page_count(&self) -> usize {
        self.source_pages.len()
    }

    fn pages_root_id(&self) -> Result<ObjectId, EncodeFault> {
        let root = self
            .doc
            .trailer
            .get(b"Root")
            .map_err(|_| EncodeFault::Malformed("no Root in trailer".into()))?;
        let catalog_id = root
            .as_reference()
            .map_err(|_| EncodeFault::Malformed("Root is not a reference".into()))?;

        let catalog = self
            .doc
            .get_object(catalog_id)
            .and_then(Object::as_dict)
            .map_err(|_| EncodeFault::Malformed("invalid catalog".into()))?;

        catalog
            .get(b"Pages")
            .and_then(Object::as_reference)
            .map_err(|_| EncodeFault::Malformed("catalog has no Pages reference".into()))
    }

    /// Pack the bitmap into an image XObject stream. RGBA to RGB row
    /// conversion runs in parallel; export-scale bitmaps are the largest
    /// buffers in the whole pipeline.
    fn build_image_stream(bitmap: &PageBitmap) -> Result<Stream, EncodeFault> {
        let width = bitmap.pixel_width() as usize;
        let height = bitmap.pixel_height() as usize;
        let raw = bitmap.image.as_raw();

        let mut rgb = vec![0u8; width * height * 3];
        rgb.par_chunks_mut(width * 3)
            .zip(raw.par_chunks(width * 4))
            .for_each(|(dst, src)| {
                for i in 0..width {
                    dst[i * 3..i * 3 + 3].copy_from_slice(&src[i * 4..i * 4 + 3]);
                }
            });

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(&rgb)
            .map_err(|e| EncodeFault::Stream(e.to_string()))?;
        let compressed = encoder
            .finish()
            .map_err(|e| EncodeFault::Stream(e.to_string()))?;

        let mut dict = Dictionary::new();
        dict.set("Type", Object::Name(b"XObject".to_vec()));
        dict.set("Subtype", Object::Name(b"Image".to_vec()));
        dict.set("Width", Object::Integer(width as i64));
        dict.set("Height", Object::Integer(height as i64));
        dict.set("ColorSpace", Object::Name(b"DeviceRGB".to_vec()));
        dict.set("BitsPerComponent", Object::Integer(8));
        dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));

        Ok(Stream::new(dict, compressed))
    }
}

impl DocumentEncoder for PdfEncoder {
    fn append_original_page(&mut self, index: usize) -> Result<(), EncodeFault> {
        let page_id = *self
            .source_pages
            .get(index)
            .ok_or(EncodeFault::PageOutOfRange(index))?;
        self.appended.push(page_id);
        Ok(())
    }

    fn append_bitmap_page(
        &mut self,
        bitmap: &PageBitmap,
        native: PageSize,
    ) -> Result<(), EncodeFault> {
        let image_stream = Self::build_image_stream(bitmap)?;
        let image_id = self.doc.add_object(image_stream);

        let name = format!("Im{}", self.image_seq);
        self.image_seq += 1;

        // Stretch the image over the full native page area.
        let content = format!(
            "q\n{w} 0 0 {h} 0 0 cm\n/{name} Do\nQ",
            w = native.width,
            h = native.height,
        );
        let content_id = self
            .doc
            .add_object(Stream::new(Dictionary::new(), content.into_bytes()));

        let mut xobjects = Dictionary::new();
        xobjects.set(name, Object::Reference(image_id));
        let mut resources = Dictionary::new();
        resources.set("XObject", Object::Dictionary(xobjects));

        let pages_root = self.pages_root_id()?;
        let mut page = Dictionary::new();
        page.set("Type", Object::Name(b"Page".to_vec()));
        page.set("Parent", Object::Reference(pages_root));
        page.set(
            "MediaBox",
            Object::Array(vec![
                Object::Real(0.0),
                Object::Real(0.0),
                Object::Real(native.width as f32),
                Object::Real(native.height as f32),
            ]),
        );
        page.set("Resources", Object::Dictionary(resources));
        page.set("Contents", Object::Reference(content_id));

        let page_id = self.doc.add_object(Object::Dictionary(page));
        self.appended.push(page_id);

        log::debug!(
            "encoder: raster page {} ({}x{} px over {}x{} units)",
            self.appended.len() - 1,
            bitmap.pixel_width(),
            bitmap.pixel_height(),
            native.width,
            native.height,
        );
        Ok(())
    }

    fn finish(mut self: Box<Self>) -> Result<Vec<u8>, EncodeFault> {
        let pages_root = self.pages_root_id()?;

        // Reparent every emitted page onto the root so the rebuilt Kids
        // array is consistent even when the source used a nested tree.
        for &page_id in &self.appended {
            if let Ok(Object::Dictionary(dict)) = self.doc.get_object_mut(page_id) {
                dict.set("Parent", Object::Reference(pages_root));
            }
        }

        let kids: Vec<Object> = self
            .appended
            .iter()
            .map(|&id| Object::Reference(id))
            .collect();
        let count = kids.len() as i64;

        match self.doc.get_object_mut(pages_root) {
            Ok(Object::Dictionary(pages_dict)) => {
                pages_dict.set("Kids", Object::Array(kids));
                pages_dict.set("Count", Object::Integer(count));
            }
            _ => return Err(EncodeFault::Malformed("invalid pages dictionary".into())),
        }

        self.doc.compress();

        let mut buffer = Vec::new();
        self.doc
            .save_to(&mut buffer)
            .map_err(|e| EncodeFault::Finalize(e.to_string()))?;
        Ok(buffer)
    }
}
