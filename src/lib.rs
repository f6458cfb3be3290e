//! pagemark - page raster-overlay engine
//!
//! Marks regions and strokes on individual pages of a paginated document,
//! accumulates that markup per page across an editing session, and
//! produces an output document embedding the markup - flattened to raster
//! where it must be irreversible (redaction), passed through untouched
//! elsewhere.
//!
//! The page rasterizer and document encoder are external collaborators:
//! the engine consumes them through the [`raster::PageRasterizer`] and
//! [`encoder::DocumentEncoder`] traits. A `lopdf`-backed encoder ships
//! with the crate; the rasterizer is supplied by the host.

pub mod compositor;
pub mod encoder;
pub mod error;
pub mod export;
pub mod geometry;
pub mod interaction;
pub mod markup;
pub mod raster;
pub mod session;

pub use compositor::OverlayCompositor;
pub use error::{
    DocumentLoadError, EncodeFault, ExportError, InvalidMarkupError, PageRenderError,
};
pub use export::{ExportOptions, ExportProgress, ExportReport, FailurePolicy};
pub use geometry::{DocPoint, DocRect, DocYAxis, PageSize, ScreenPoint, ViewMetrics};
pub use interaction::{CommitOutcome, InteractionController, Tool};
pub use markup::{MarkupPrimitive, MarkupStore};
pub use raster::{DocumentBackend, PageBitmap, PageRasterizer, RenderService};
pub use session::{MarkupSession, PreviewFrame, SessionConfig};
