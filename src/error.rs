//! Error taxonomy for the markup engine

use thiserror::Error;

/// The source document could not be loaded. Fatal to the session; no
/// partial state is retained.
#[derive(Debug, Error)]
pub enum DocumentLoadError {
    #[error("document is unreadable: {0}")]
    Unreadable(String),

    #[error("document has no pages")]
    Empty,
}

/// One page failed to rasterize. Scoped to that page; unrelated pages are
/// unaffected.
#[derive(Debug, Error)]
#[error("page {page} failed to render: {detail}")]
pub struct PageRenderError {
    /// Page index (0-based)
    pub page: usize,
    pub detail: String,
}

/// A primitive failed validation at commit time. Rejected primitives are
/// never stored.
#[derive(Debug, Error)]
pub enum InvalidMarkupError {
    #[error("{kind} has non-finite coordinates")]
    NonFinite { kind: &'static str },

    #[error("{kind} has non-positive extent {width}x{height}")]
    EmptyExtent {
        kind: &'static str,
        width: f64,
        height: f64,
    },

    #[error("stroke has no points")]
    EmptyStroke,

    #[error("stroke width {0} is not positive")]
    BadStrokeWidth(f64),

    #[error("text note is empty")]
    EmptyText,

    #[error("stamp image has zero pixels")]
    EmptyStampImage,
}

/// Failures in the document encoder
#[derive(Debug, Error)]
pub enum EncodeFault {
    #[error("malformed source document: {0}")]
    Malformed(String),

    #[error("page index {0} out of range")]
    PageOutOfRange(usize),

    #[error("failed to encode page stream: {0}")]
    Stream(String),

    #[error("failed to serialize output document: {0}")]
    Finalize(String),
}

/// Export failed or was cancelled. A partial document is never returned.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no document is loaded")]
    NoDocument,

    #[error("export aborted on page {page}")]
    Aborted {
        page: usize,
        #[source]
        source: PageRenderError,
    },

    #[error("export cancelled after {completed} pages")]
    Cancelled { completed: usize },

    #[error("document encoder failed")]
    Encoder(#[from] EncodeFault),
}
