//! Export pipeline scenarios with a counting rasterizer double and a
//! recording encoder double.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use image::{Rgba, RgbaImage};
use pretty_assertions::assert_eq;

use pagemark::encoder::DocumentEncoder;
use pagemark::error::EncodeFault;
use pagemark::export::{ExportOptions, ExportPipeline, FailurePolicy};
use pagemark::geometry::{DocRect, PageSize};
use pagemark::markup::{MarkupPrimitive, MarkupStore, RectMark};
use pagemark::raster::{PageBitmap, PageRasterizer, RasterConfig, RenderFault, RenderService};
use pagemark::{ExportError, OverlayCompositor};

struct StubRasterizer {
    pages: usize,
    native: PageSize,
    renders: AtomicUsize,
    fail_page: Option<usize>,
}

impl StubRasterizer {
    fn new(pages: usize) -> Arc<Self> {
        Arc::new(Self {
            pages,
            native: PageSize::letter(),
            renders: AtomicUsize::new(0),
            fail_page: None,
        })
    }

    fn failing_on(pages: usize, fail_page: usize) -> Arc<Self> {
        Arc::new(Self {
            pages,
            native: PageSize::letter(),
            renders: AtomicUsize::new(0),
            fail_page: Some(fail_page),
        })
    }
}

impl PageRasterizer for StubRasterizer {
    fn page_count(&self) -> usize {
        self.pages
    }

    fn page_size(&self, page: usize) -> Result<PageSize, RenderFault> {
        if page >= self.pages {
            return Err(RenderFault::PageOutOfRange {
                page,
                count: self.pages,
            });
        }
        Ok(self.native)
    }

    fn render_page(&self, page: usize, scale: f64) -> Result<PageBitmap, RenderFault> {
        if self.fail_page == Some(page) {
            return Err(RenderFault::generic("corrupt page content"));
        }
        self.renders.fetch_add(1, Ordering::SeqCst);
        let (w, h) = PageBitmap::dimensions_for(self.native, scale);
        Ok(PageBitmap::new(
            page,
            scale,
            RgbaImage::from_pixel(w, h, Rgba([255, 255, 255, 255])),
        ))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum PageEvent {
    Original(usize),
    Bitmap {
        page: usize,
        native: PageSize,
        pixel_size: (u32, u32),
    },
}

/// Encoder double that records every call.
struct RecordingEncoder {
    events: Arc<Mutex<Vec<PageEvent>>>,
}

impl RecordingEncoder {
    fn new() -> (Box<Self>, Arc<Mutex<Vec<PageEvent>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        (
            Box::new(Self {
                events: Arc::clone(&events),
            }),
            events,
        )
    }
}

impl DocumentEncoder for RecordingEncoder {
    fn append_original_page(&mut self, index: usize) -> Result<(), EncodeFault> {
        self.events.lock().unwrap().push(PageEvent::Original(index));
        Ok(())
    }

    fn append_bitmap_page(
        &mut self,
        bitmap: &PageBitmap,
        native: PageSize,
    ) -> Result<(), EncodeFault> {
        self.events.lock().unwrap().push(PageEvent::Bitmap {
            page: bitmap.page_index,
            native,
            pixel_size: (bitmap.pixel_width(), bitmap.pixel_height()),
        });
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<Vec<u8>, EncodeFault> {
        Ok(b"%PDF-stub".to_vec())
    }
}

fn redaction(x: f64, y: f64, w: f64, h: f64) -> MarkupPrimitive {
    MarkupPrimitive::Rect(RectMark::redaction(DocRect::new(x, y, w, h)))
}

#[test]
fn export_without_markup_is_all_passthrough() {
    let raster = StubRasterizer::new(4);
    let mut service = RenderService::new(raster.clone(), RasterConfig::default());
    let store = MarkupStore::new();
    let compositor = OverlayCompositor::without_font();

    let (encoder, events) = RecordingEncoder::new();
    let pipeline = ExportPipeline::new(raster.as_ref(), &mut service, &store, &compositor);
    let (_, report) = pipeline
        .run(
            encoder,
            ExportOptions::default(),
            |_| {},
            &AtomicBool::new(false),
        )
        .unwrap();

    let events = events.lock().unwrap();
    assert_eq!(
        *events,
        vec![
            PageEvent::Original(0),
            PageEvent::Original(1),
            PageEvent::Original(2),
            PageEvent::Original(3),
        ]
    );
    // No markup anywhere: not a single page was rendered or flattened.
    assert_eq!(raster.renders.load(Ordering::SeqCst), 0);
    assert!(report.flattened.is_empty());
    assert!(report.skipped.is_empty());
}

#[test]
fn marked_page_is_flattened_with_native_size_preserved() {
    let raster = StubRasterizer::new(3);
    let mut service = RenderService::new(raster.clone(), RasterConfig::default());
    let mut store = MarkupStore::new();
    store.append(1, redaction(10.0, 10.0, 50.0, 20.0)).unwrap();
    let compositor = OverlayCompositor::without_font();

    let options = ExportOptions {
        scale: 2.0,
        ..ExportOptions::default()
    };
    let (encoder, events) = RecordingEncoder::new();
    let pipeline = ExportPipeline::new(raster.as_ref(), &mut service, &store, &compositor);
    let (_, report) = pipeline
        .run(encoder, options, |_| {}, &AtomicBool::new(false))
        .unwrap();

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 3);
    assert_eq!(events[0], PageEvent::Original(0));
    assert_eq!(events[2], PageEvent::Original(2));
    let PageEvent::Bitmap {
        page,
        native,
        pixel_size,
    } = &events[1]
    else {
        panic!("page 1 should be a bitmap page, got {:?}", events[1]);
    };
    assert_eq!(*page, 1);
    assert_eq!(*native, PageSize::letter());
    // Export renders at 2x, but the native size stays the source size.
    assert_eq!(*pixel_size, (1224, 1584));

    assert_eq!(report.flattened, vec![1]);
    assert_eq!(report.total_pages, 3);
}

#[test]
fn abort_policy_stops_on_the_failing_page() {
    let raster = StubRasterizer::failing_on(3, 1);
    let mut service = RenderService::new(raster.clone(), RasterConfig::default());
    let mut store = MarkupStore::new();
    store.append(1, redaction(0.0, 0.0, 10.0, 10.0)).unwrap();
    let compositor = OverlayCompositor::without_font();

    let (encoder, _) = RecordingEncoder::new();
    let pipeline = ExportPipeline::new(raster.as_ref(), &mut service, &store, &compositor);
    let err = pipeline
        .run(
            encoder,
            ExportOptions::default(),
            |_| {},
            &AtomicBool::new(false),
        )
        .unwrap_err();

    match err {
        ExportError::Aborted { page, .. } => assert_eq!(page, 1),
        other => panic!("expected abort, got {other:?}"),
    }
}

#[test]
fn keep_original_policy_substitutes_and_reports_the_skip() {
    let raster = StubRasterizer::failing_on(3, 1);
    let mut service = RenderService::new(raster.clone(), RasterConfig::default());
    let mut store = MarkupStore::new();
    store.append(1, redaction(0.0, 0.0, 10.0, 10.0)).unwrap();
    store.append(2, redaction(5.0, 5.0, 10.0, 10.0)).unwrap();
    let compositor = OverlayCompositor::without_font();

    let options = ExportOptions {
        failure_policy: FailurePolicy::KeepOriginal,
        ..ExportOptions::default()
    };
    let (encoder, events) = RecordingEncoder::new();
    let pipeline = ExportPipeline::new(raster.as_ref(), &mut service, &store, &compositor);
    let (_, report) = pipeline
        .run(encoder, options, |_| {}, &AtomicBool::new(false))
        .unwrap();

    // Page 1 fell back to the original; page 2's markup still flattened.
    let events = events.lock().unwrap();
    assert_eq!(events[0], PageEvent::Original(0));
    assert_eq!(events[1], PageEvent::Original(1));
    assert!(matches!(events[2], PageEvent::Bitmap { page: 2, .. }));

    // The skip is surfaced, never silent.
    assert_eq!(report.skipped, vec![1]);
    assert_eq!(report.flattened, vec![2]);
}

#[test]
fn progress_is_reported_after_every_page() {
    let raster = StubRasterizer::new(5);
    let mut service = RenderService::new(raster.clone(), RasterConfig::default());
    let mut store = MarkupStore::new();
    store.append(3, redaction(0.0, 0.0, 20.0, 20.0)).unwrap();
    let compositor = OverlayCompositor::without_font();

    let mut seen = Vec::new();
    let (encoder, _) = RecordingEncoder::new();
    let pipeline = ExportPipeline::new(raster.as_ref(), &mut service, &store, &compositor);
    pipeline
        .run(
            encoder,
            ExportOptions::default(),
            |p| seen.push((p.completed, p.total)),
            &AtomicBool::new(false),
        )
        .unwrap();

    assert_eq!(seen, vec![(1, 5), (2, 5), (3, 5), (4, 5), (5, 5)]);
}

#[test]
fn cancellation_between_pages_returns_no_document() {
    let raster = StubRasterizer::new(3);
    let mut service = RenderService::new(raster.clone(), RasterConfig::default());
    let store = MarkupStore::new();
    let compositor = OverlayCompositor::without_font();

    let cancel = AtomicBool::new(true);
    let (encoder, events) = RecordingEncoder::new();
    let pipeline = ExportPipeline::new(raster.as_ref(), &mut service, &store, &compositor);
    let err = pipeline
        .run(encoder, ExportOptions::default(), |_| {}, &cancel)
        .unwrap_err();

    assert!(matches!(err, ExportError::Cancelled { completed: 0 }));
    assert!(events.lock().unwrap().is_empty());
}

#[test]
fn export_does_not_consume_the_markup() {
    let raster = StubRasterizer::new(2);
    let mut service = RenderService::new(raster.clone(), RasterConfig::default());
    let mut store = MarkupStore::new();
    store.append(0, redaction(10.0, 10.0, 40.0, 40.0)).unwrap();
    let compositor = OverlayCompositor::without_font();

    for _ in 0..2 {
        let (encoder, events) = RecordingEncoder::new();
        let pipeline = ExportPipeline::new(raster.as_ref(), &mut service, &store, &compositor);
        pipeline
            .run(
                encoder,
                ExportOptions::default(),
                |_| {},
                &AtomicBool::new(false),
            )
            .unwrap();
        let events = events.lock().unwrap();
        assert!(matches!(events[0], PageEvent::Bitmap { page: 0, .. }));
    }
    assert_eq!(store.count(), 1);
}
