//! Pointer interaction state machine
//!
//! Idle -> (pointer down) -> Drawing -> (pointer up) -> Idle. Every
//! incoming point is converted to document space before it touches the
//! draft; the draft itself never holds screen coordinates. Only one page
//! is active for drawing at a time, and switching pages mid-draw cancels
//! the draft - it is never committed against the wrong page.

use std::sync::Arc;

use image::{Rgba, RgbaImage};

use crate::error::InvalidMarkupError;
use crate::geometry::{
    screen_to_document, DocPoint, DocRect, DocYAxis, ScreenPoint, ViewMetrics,
};
use crate::markup::{
    MarkupPrimitive, MarkupStore, RectKind, RectMark, StampMark, StrokeMark, TextNoteMark,
};

/// Minimum extent (document units) a dragged draft must reach to commit.
/// Accidental taps produce sub-threshold drafts, which are discarded.
pub const MIN_COMMIT_EXTENT: f64 = 2.0;

/// The tool driving the next mark.
#[derive(Clone, Debug)]
pub enum Tool {
    Redact,
    Highlight { color: Rgba<u8> },
    Ink { width: f64, color: Rgba<u8> },
    Note { text: String },
    Stamp { image: Arc<RgbaImage>, width: f64, height: f64 },
}

impl Default for Tool {
    fn default() -> Self {
        Self::Redact
    }
}

/// In-progress, uncommitted mark. Coordinates are document space.
#[derive(Clone, Debug)]
enum Draft {
    Rect {
        kind: RectKind,
        color: Rgba<u8>,
        start: DocPoint,
        current: DocPoint,
    },
    Ink {
        width: f64,
        color: Rgba<u8>,
        points: Vec<DocPoint>,
    },
    Place {
        at: DocPoint,
    },
}

/// What happened to the draft at pointer-up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Draft appended to the store
    Committed,
    /// Draft below the minimum extent; nothing stored
    Discarded,
    /// There was no draft to commit
    NoDraft,
}

/// Translates begin/update/commit pointer events into store mutations.
/// This is the only component that ever mutates the [`MarkupStore`].
#[derive(Default)]
pub struct InteractionController {
    tool: Tool,
    active_page: Option<usize>,
    draft: Option<Draft>,
}

impl InteractionController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_tool(&mut self, tool: Tool) {
        // A tool change mid-draw invalidates the draft's meaning.
        self.cancel_mark();
        self.tool = tool;
    }

    #[must_use]
    pub fn tool(&self) -> &Tool {
        &self.tool
    }

    /// Change the page marks are drawn on. An in-progress draft is
    /// cancelled, not committed against the new page.
    pub fn set_active_page(&mut self, page: Option<usize>) {
        if self.active_page != page {
            if self.draft.is_some() {
                log::debug!(
                    "interaction: page switch mid-draw, draft on page {:?} cancelled",
                    self.active_page
                );
            }
            self.cancel_mark();
            self.active_page = page;
        }
    }

    #[must_use]
    pub fn active_page(&self) -> Option<usize> {
        self.active_page
    }

    #[must_use]
    pub fn is_drawing(&self) -> bool {
        self.draft.is_some()
    }

    /// Pointer down: start a draft at the given screen point. No-op when
    /// no page is active.
    pub fn begin_mark(&mut self, screen: ScreenPoint, view: &ViewMetrics) {
        if self.active_page.is_none() {
            return;
        }
        let p = screen_to_document(screen, view, DocYAxis::BottomUp);

        self.draft = Some(match &self.tool {
            Tool::Redact => Draft::Rect {
                kind: RectKind::Redaction,
                color: crate::markup::REDACTION_FILL,
                start: p,
                current: p,
            },
            Tool::Highlight { color } => Draft::Rect {
                kind: RectKind::Highlight,
                color: *color,
                start: p,
                current: p,
            },
            Tool::Ink { width, color } => Draft::Ink {
                width: *width,
                color: *color,
                points: vec![p],
            },
            Tool::Note { .. } | Tool::Stamp { .. } => Draft::Place { at: p },
        });
    }

    /// Pointer move while drawing: extend the draft.
    pub fn update_mark(&mut self, screen: ScreenPoint, view: &ViewMetrics) {
        let p = screen_to_document(screen, view, DocYAxis::BottomUp);

        match &mut self.draft {
            Some(Draft::Rect { current, .. }) => *current = p,
            Some(Draft::Ink { points, .. }) => points.push(p),
            Some(Draft::Place { at }) => *at = p,
            None => {}
        }
    }

    /// Discard the draft without committing.
    pub fn cancel_mark(&mut self) {
        self.draft = None;
    }

    /// Pointer up: resolve the draft into a committed primitive, or
    /// discard it when it stayed below the minimum extent.
    pub fn commit_mark(&mut self, store: &mut MarkupStore) -> Result<CommitOutcome, InvalidMarkupError> {
        let Some(draft) = self.draft.take() else {
            return Ok(CommitOutcome::NoDraft);
        };
        let Some(page) = self.active_page else {
            return Ok(CommitOutcome::NoDraft);
        };

        let primitive = match draft {
            Draft::Rect {
                kind,
                color,
                start,
                current,
            } => {
                let rect = DocRect::from_corners(start, current);
                if rect.max_extent() < MIN_COMMIT_EXTENT {
                    return Ok(CommitOutcome::Discarded);
                }
                MarkupPrimitive::Rect(RectMark { rect, kind, color })
            }
            Draft::Ink { width, color, points } => {
                if path_length(&points) < MIN_COMMIT_EXTENT {
                    return Ok(CommitOutcome::Discarded);
                }
                MarkupPrimitive::Stroke(StrokeMark { points, width, color })
            }
            Draft::Place { at } => match &self.tool {
                Tool::Note { text } => MarkupPrimitive::TextNote(TextNoteMark {
                    anchor: at,
                    text: text.clone(),
                }),
                Tool::Stamp { image, width, height } => MarkupPrimitive::Stamp(StampMark {
                    // Centered on the release point.
                    rect: DocRect::new(at.x - width / 2.0, at.y - height / 2.0, *width, *height),
                    image: Arc::clone(image),
                }),
                // Tool changed since pointer-down; set_tool cancels the
                // draft, so this arm is unreachable in practice.
                _ => return Ok(CommitOutcome::Discarded),
            },
        };

        store.append(page, primitive)?;
        Ok(CommitOutcome::Committed)
    }

    /// Undo the most recent mark on a page. Store mutations all funnel
    /// through this controller; callers never touch the store directly.
    pub fn undo(&mut self, store: &mut MarkupStore, page: usize) -> Option<MarkupPrimitive> {
        store.pop_last(page)
    }

    pub fn clear_page(&mut self, store: &mut MarkupStore, page: usize) {
        store.clear_page(page);
    }

    pub fn clear_all(&mut self, store: &mut MarkupStore) {
        self.cancel_mark();
        store.clear_all();
    }
}

fn path_length(points: &[DocPoint]) -> f64 {
    points
        .windows(2)
        .map(|pair| {
            let (a, b) = (pair[0], pair[1]);
            ((b.x - a.x).powi(2) + (b.y - a.y).powi(2)).sqrt()
        })
        .sum()
}
