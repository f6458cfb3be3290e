//! Editing session facade
//!
//! The thin surface the host UI drives: document lifecycle, the active
//! page and its viewport, mark begin/update/commit, undo, preview frames
//! and export. Everything else in the crate is reached through here.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use image::RgbaImage;

use crate::compositor::OverlayCompositor;
use crate::encoder::PdfEncoder;
use crate::error::{DocumentLoadError, ExportError, InvalidMarkupError};
use crate::export::{ExportOptions, ExportPipeline, ExportProgress, ExportReport};
use crate::geometry::{PageSize, ScreenPoint, ViewMetrics};
use crate::interaction::{CommitOutcome, InteractionController, Tool};
use crate::markup::{MarkupPrimitive, MarkupStore};
use crate::raster::{DocumentBackend, PageRasterizer, RasterConfig, RenderService};

/// Preview render scale (pixels per document unit)
pub const DEFAULT_PREVIEW_SCALE: f64 = 1.5;

#[derive(Clone, Copy, Debug)]
pub struct SessionConfig {
    pub raster: RasterConfig,
    pub preview_scale: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            raster: RasterConfig::default(),
            preview_scale: DEFAULT_PREVIEW_SCALE,
        }
    }
}

/// One preview request's result.
pub enum PreviewFrame {
    /// Page bitmap with current markup composited, ready to blit
    Ready(RgbaImage),
    /// Render queued; poll again after the host's next tick
    Pending,
}

struct LoadedDocument {
    rasterizer: Arc<dyn PageRasterizer>,
    service: RenderService,
    source_bytes: Vec<u8>,
}

/// An editing session over one loaded document. Dropping the session (or
/// loading another document) discards all markup and cached renders.
pub struct MarkupSession {
    backend: Arc<dyn DocumentBackend>,
    config: SessionConfig,
    doc: Option<LoadedDocument>,
    store: MarkupStore,
    controller: InteractionController,
    compositor: OverlayCompositor,
    viewport: Option<ViewMetrics>,
}

impl MarkupSession {
    #[must_use]
    pub fn new(backend: Arc<dyn DocumentBackend>, config: SessionConfig) -> Self {
        Self {
            backend,
            config,
            doc: None,
            store: MarkupStore::new(),
            controller: InteractionController::new(),
            compositor: OverlayCompositor::new(),
            viewport: None,
        }
    }

    /// Load a source document, replacing any previous one and all state
    /// derived from it. On failure the previous session state is left
    /// untouched.
    pub fn load_document(&mut self, bytes: Vec<u8>) -> Result<(), DocumentLoadError> {
        let rasterizer = self.backend.open(&bytes)?;
        if rasterizer.page_count() == 0 {
            return Err(DocumentLoadError::Empty);
        }

        log::info!("session: loaded document with {} pages", rasterizer.page_count());
        let service = RenderService::new(Arc::clone(&rasterizer), self.config.raster);
        self.doc = Some(LoadedDocument {
            rasterizer,
            service,
            source_bytes: bytes,
        });
        self.controller.set_active_page(None);
        self.controller.clear_all(&mut self.store);
        self.viewport = None;
        Ok(())
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.doc.is_some()
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        self.doc.as_ref().map_or(0, |d| d.rasterizer.page_count())
    }

    #[must_use]
    pub fn native_size(&self, page: usize) -> Option<PageSize> {
        self.doc
            .as_ref()
            .and_then(|d| d.rasterizer.page_size(page).ok())
    }

    /// Make `page` the drawing target and describe how it is displayed.
    /// A draft in progress on another page is cancelled, never committed.
    pub fn set_active_page(&mut self, page: usize, viewport: ViewMetrics) {
        self.controller.set_active_page(Some(page));
        self.viewport = Some(viewport);
        if let Some(doc) = &mut self.doc {
            doc.service
                .request_if_needed(page, self.config.preview_scale);
        }
    }

    /// Update display metrics (zoom, resize) for the active page.
    pub fn update_viewport(&mut self, viewport: ViewMetrics) {
        self.viewport = Some(viewport);
    }

    pub fn set_tool(&mut self, tool: Tool) {
        self.controller.set_tool(tool);
    }

    pub fn begin_mark(&mut self, screen: ScreenPoint) {
        if let Some(view) = self.viewport {
            self.controller.begin_mark(screen, &view);
        }
    }

    pub fn update_mark(&mut self, screen: ScreenPoint) {
        if let Some(view) = self.viewport {
            self.controller.update_mark(screen, &view);
        }
    }

    pub fn commit_mark(&mut self) -> Result<CommitOutcome, InvalidMarkupError> {
        self.controller.commit_mark(&mut self.store)
    }

    pub fn cancel_mark(&mut self) {
        self.controller.cancel_mark();
    }

    /// Undo the most recent mark on a page. No-op when the page has none.
    pub fn undo(&mut self, page: usize) -> Option<MarkupPrimitive> {
        self.controller.undo(&mut self.store, page)
    }

    pub fn clear_page(&mut self, page: usize) {
        self.controller.clear_page(&mut self.store, page);
    }

    pub fn clear_all(&mut self) {
        self.controller.clear_all(&mut self.store);
    }

    #[must_use]
    pub fn markup_count(&self) -> usize {
        self.store.count()
    }

    #[must_use]
    pub fn page_markup(&self, page: usize) -> &[MarkupPrimitive] {
        self.store.get(page)
    }

    /// Current preview for a page: the cached bitmap at preview scale
    /// with the page's markup composited over it. Kicks off a render and
    /// returns [`PreviewFrame::Pending`] when the bitmap is not ready;
    /// results for stale requests are filtered by key inside the service,
    /// so a late render never paints the wrong page.
    pub fn preview(&mut self, page: usize) -> PreviewFrame {
        let Some(doc) = &mut self.doc else {
            return PreviewFrame::Pending;
        };

        doc.service.poll_responses();
        match doc.service.cached(page, self.config.preview_scale) {
            Some(bitmap) => PreviewFrame::Ready(
                self.compositor
                    .render_preview(bitmap.as_ref(), self.store.get(page)),
            ),
            None => {
                doc.service
                    .request_if_needed(page, self.config.preview_scale);
                PreviewFrame::Pending
            }
        }
    }

    /// Export with default progress/cancellation plumbing.
    pub fn export_document(
        &mut self,
        options: ExportOptions,
    ) -> Result<(Vec<u8>, ExportReport), ExportError> {
        let cancel = AtomicBool::new(false);
        self.export_document_with(options, |_| {}, &cancel)
    }

    /// Export, reporting progress after every page and honoring
    /// cancellation between pages. The markup store is read, never
    /// mutated; exporting twice yields the same result.
    pub fn export_document_with(
        &mut self,
        options: ExportOptions,
        progress: impl FnMut(ExportProgress),
        cancel: &AtomicBool,
    ) -> Result<(Vec<u8>, ExportReport), ExportError> {
        let Some(doc) = &mut self.doc else {
            return Err(ExportError::NoDocument);
        };

        let encoder = PdfEncoder::from_bytes(&doc.source_bytes).map_err(|e| {
            ExportError::Encoder(crate::error::EncodeFault::Malformed(e.to_string()))
        })?;

        let pipeline = ExportPipeline::new(
            doc.rasterizer.as_ref(),
            &mut doc.service,
            &self.store,
            &self.compositor,
        );
        let (bytes, report) = pipeline.run(Box::new(encoder), options, progress, cancel)?;

        if !report.skipped.is_empty() {
            log::warn!(
                "export finished with skipped pages: {:?}",
                report.skipped
            );
        }
        Ok((bytes, report))
    }
}
