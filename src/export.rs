//! Export pipeline
//!
//! Walks every page in order and decides between two paths: pages with no
//! markup pass through to the encoder untouched, preserving their vector
//! content; marked pages are rendered at export scale, composited and
//! re-encoded as raster. Rendering of the next marked page is prefetched
//! while the current page is composited and encoded, never more than one
//! page ahead - export-scale bitmaps dominate peak memory.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::compositor::OverlayCompositor;
use crate::encoder::DocumentEncoder;
use crate::error::{ExportError, PageRenderError};
use crate::geometry::PageSize;
use crate::markup::MarkupStore;
use crate::raster::{PageBitmap, PageRasterizer, RenderService};

/// Default export render scale (pixels per document unit). Higher than
/// typical preview scales; flattened pages should survive printing.
pub const DEFAULT_EXPORT_SCALE: f64 = 2.0;

/// What to do when one page fails to render during export.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Abort the whole export; no document is produced.
    Abort,
    /// Emit the untouched original page instead, record the skip, and
    /// continue. Skips are surfaced in the report, never dropped.
    KeepOriginal,
}

#[derive(Clone, Copy, Debug)]
pub struct ExportOptions {
    /// Render scale for flattened pages
    pub scale: f64,
    pub failure_policy: FailurePolicy,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            scale: DEFAULT_EXPORT_SCALE,
            failure_policy: FailurePolicy::Abort,
        }
    }
}

/// Incremental progress, reported after every page.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct ExportProgress {
    pub completed: usize,
    pub total: usize,
}

/// What the export actually did, page by page.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ExportReport {
    pub total_pages: usize,
    /// Pages re-encoded as raster
    pub flattened: Vec<usize>,
    /// Pages whose markup could not be applied; emitted as untouched
    /// originals under [`FailurePolicy::KeepOriginal`]
    pub skipped: Vec<usize>,
}

impl ExportReport {
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".into())
    }
}

/// Drives one export run over the render service, markup store and
/// compositor. Reads markup, never mutates it.
pub struct ExportPipeline<'a> {
    rasterizer: &'a dyn PageRasterizer,
    service: &'a mut RenderService,
    store: &'a MarkupStore,
    compositor: &'a OverlayCompositor,
}

impl<'a> ExportPipeline<'a> {
    pub fn new(
        rasterizer: &'a dyn PageRasterizer,
        service: &'a mut RenderService,
        store: &'a MarkupStore,
        compositor: &'a OverlayCompositor,
    ) -> Self {
        Self {
            rasterizer,
            service,
            store,
            compositor,
        }
    }

    /// Run the export. `progress` fires after each page; `cancel` is
    /// checked between pages (an in-flight render completes first).
    pub fn run(
        mut self,
        mut encoder: Box<dyn DocumentEncoder>,
        options: ExportOptions,
        mut progress: impl FnMut(ExportProgress),
        cancel: &AtomicBool,
    ) -> Result<(Vec<u8>, ExportReport), ExportError> {
        let total = self.rasterizer.page_count();
        let marked: Vec<usize> = self
            .store
            .marked_pages()
            .filter(|&page| page < total)
            .collect();

        let mut report = ExportReport {
            total_pages: total,
            ..ExportReport::default()
        };

        log::info!(
            "export: {total} pages, {} with markup, scale {:.2}",
            marked.len(),
            options.scale
        );

        for page in 0..total {
            if cancel.load(Ordering::Relaxed) {
                log::info!("export cancelled after {page} pages");
                return Err(ExportError::Cancelled { completed: page });
            }

            if !self.store.has_markup(page) {
                encoder.append_original_page(page)?;
            } else {
                // Bounded pipelining: queue the next marked page so a
                // worker renders it while this one is encoded.
                if let Some(&next) = marked.iter().find(|&&m| m > page) {
                    self.service.prefetch(next, options.scale);
                }

                match self.render_for_flatten(page, options.scale) {
                    Ok((bitmap, native)) => {
                        let flattened = self
                            .compositor
                            .render_flattened(bitmap.as_ref(), self.store.get(page));
                        encoder.append_bitmap_page(&flattened, native)?;
                        report.flattened.push(page);
                    }
                    Err(err) => match options.failure_policy {
                        FailurePolicy::Abort => {
                            return Err(ExportError::Aborted { page, source: err });
                        }
                        FailurePolicy::KeepOriginal => {
                            log::warn!("export: page {page} skipped ({err}); emitting original");
                            encoder.append_original_page(page)?;
                            report.skipped.push(page);
                        }
                    },
                }
            }

            progress(ExportProgress {
                completed: page + 1,
                total,
            });
        }

        let bytes = encoder.finish()?;
        Ok((bytes, report))
    }

    /// Render the page at export scale and look up its native size. Both
    /// failures are per-page and subject to the failure policy.
    fn render_for_flatten(
        &mut self,
        page: usize,
        scale: f64,
    ) -> Result<(Arc<PageBitmap>, PageSize), PageRenderError> {
        let native = self
            .rasterizer
            .page_size(page)
            .map_err(|fault| PageRenderError {
                page,
                detail: fault.to_string(),
            })?;
        let bitmap = self.service.fetch_blocking(page, scale)?;
        Ok((bitmap, native))
    }
}
