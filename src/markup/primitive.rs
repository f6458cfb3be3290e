//! Markup primitive variants
//!
//! One tagged union covers every mark a user can make. The compositor
//! matches exhaustively on it, so adding a variant without a drawing rule
//! is a compile error rather than an invisible no-op. All coordinates are
//! document space, bottom-up; a primitive recorded at one zoom level
//! renders identically at every other.

use std::sync::Arc;

use image::{Rgba, RgbaImage};

use crate::error::InvalidMarkupError;
use crate::geometry::{DocPoint, DocRect};

/// Opaque black used for redaction fills
pub const REDACTION_FILL: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Default highlight: translucent yellow
pub const HIGHLIGHT_FILL: Rgba<u8> = Rgba([255, 230, 0, 90]);

/// Default ink color
pub const INK_COLOR: Rgba<u8> = Rgba([16, 36, 160, 255]);

/// How a rectangle mark is filled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RectKind {
    /// Solid, fully opaque fill. A translucent redaction leaks content,
    /// so the compositor forces alpha to 255 for this kind.
    Redaction,
    /// Partial-alpha overlay fill.
    Highlight,
}

/// A rectangular mark: redaction block or highlight box.
#[derive(Clone, Debug)]
pub struct RectMark {
    pub rect: DocRect,
    pub kind: RectKind,
    pub color: Rgba<u8>,
}

impl RectMark {
    #[must_use]
    pub fn redaction(rect: DocRect) -> Self {
        Self {
            rect,
            kind: RectKind::Redaction,
            color: REDACTION_FILL,
        }
    }

    #[must_use]
    pub fn highlight(rect: DocRect, color: Rgba<u8>) -> Self {
        Self {
            rect,
            kind: RectKind::Highlight,
            color,
        }
    }
}

/// A freehand ink stroke through a sequence of document-space points.
#[derive(Clone, Debug)]
pub struct StrokeMark {
    pub points: Vec<DocPoint>,
    /// Stroke width in document units
    pub width: f64,
    pub color: Rgba<u8>,
}

/// A short text label anchored at a point.
#[derive(Clone, Debug)]
pub struct TextNoteMark {
    pub anchor: DocPoint,
    pub text: String,
}

/// A raster stamp (signature image, seal) scaled to a rectangle. Aspect
/// ratio is the recorder's responsibility; the compositor fills the rect.
#[derive(Clone, Debug)]
pub struct StampMark {
    pub rect: DocRect,
    pub image: Arc<RgbaImage>,
}

/// One user-drawn mark.
#[derive(Clone, Debug)]
pub enum MarkupPrimitive {
    Rect(RectMark),
    Stroke(StrokeMark),
    TextNote(TextNoteMark),
    Stamp(StampMark),
}

impl MarkupPrimitive {
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Rect(r) => match r.kind {
                RectKind::Redaction => "redaction",
                RectKind::Highlight => "highlight",
            },
            Self::Stroke(_) => "stroke",
            Self::TextNote(_) => "text note",
            Self::Stamp(_) => "stamp",
        }
    }

    /// Validate the primitive before it is stored. Invalid primitives are
    /// rejected here and never reach the store or the compositor.
    pub fn validate(&self) -> Result<(), InvalidMarkupError> {
        match self {
            Self::Rect(r) => validate_rect(&r.rect, self.kind_name()),
            Self::Stroke(s) => {
                if s.points.is_empty() {
                    return Err(InvalidMarkupError::EmptyStroke);
                }
                if !s.points.iter().all(|p| p.is_finite()) {
                    return Err(InvalidMarkupError::NonFinite { kind: "stroke" });
                }
                if !(s.width > 0.0 && s.width.is_finite()) {
                    return Err(InvalidMarkupError::BadStrokeWidth(s.width));
                }
                Ok(())
            }
            Self::TextNote(n) => {
                if !n.anchor.is_finite() {
                    return Err(InvalidMarkupError::NonFinite { kind: "text note" });
                }
                if n.text.trim().is_empty() {
                    return Err(InvalidMarkupError::EmptyText);
                }
                Ok(())
            }
            Self::Stamp(s) => {
                validate_rect(&s.rect, "stamp")?;
                if s.image.width() == 0 || s.image.height() == 0 {
                    return Err(InvalidMarkupError::EmptyStampImage);
                }
                Ok(())
            }
        }
    }
}

fn validate_rect(rect: &DocRect, kind: &'static str) -> Result<(), InvalidMarkupError> {
    if !rect.is_finite() {
        return Err(InvalidMarkupError::NonFinite { kind });
    }
    if rect.width <= 0.0 || rect.height <= 0.0 {
        return Err(InvalidMarkupError::EmptyExtent {
            kind,
            width: rect.width,
            height: rect.height,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_width_rect_is_rejected() {
        let mark = MarkupPrimitive::Rect(RectMark::redaction(DocRect::new(10.0, 10.0, 0.0, 20.0)));
        assert!(matches!(
            mark.validate(),
            Err(InvalidMarkupError::EmptyExtent { .. })
        ));
    }

    #[test]
    fn negative_height_rect_is_rejected() {
        let mark =
            MarkupPrimitive::Rect(RectMark::highlight(DocRect::new(0.0, 0.0, 5.0, -1.0), HIGHLIGHT_FILL));
        assert!(mark.validate().is_err());
    }

    #[test]
    fn nan_coordinates_are_rejected() {
        let mark =
            MarkupPrimitive::Rect(RectMark::redaction(DocRect::new(f64::NAN, 0.0, 5.0, 5.0)));
        assert!(matches!(
            mark.validate(),
            Err(InvalidMarkupError::NonFinite { .. })
        ));
    }

    #[test]
    fn single_point_stroke_is_valid() {
        let mark = MarkupPrimitive::Stroke(StrokeMark {
            points: vec![DocPoint::new(1.0, 2.0)],
            width: 2.0,
            color: INK_COLOR,
        });
        assert!(mark.validate().is_ok());
    }

    #[test]
    fn empty_stroke_is_rejected() {
        let mark = MarkupPrimitive::Stroke(StrokeMark {
            points: vec![],
            width: 2.0,
            color: INK_COLOR,
        });
        assert!(matches!(mark.validate(), Err(InvalidMarkupError::EmptyStroke)));
    }

    #[test]
    fn whitespace_note_is_rejected() {
        let mark = MarkupPrimitive::TextNote(TextNoteMark {
            anchor: DocPoint::new(10.0, 10.0),
            text: "   ".into(),
        });
        assert!(matches!(mark.validate(), Err(InvalidMarkupError::EmptyText)));
    }

    #[test]
    fn empty_stamp_image_is_rejected() {
        let mark = MarkupPrimitive::Stamp(StampMark {
            rect: DocRect::new(0.0, 0.0, 50.0, 20.0),
            image: Arc::new(RgbaImage::new(0, 0)),
        });
        assert!(matches!(
            mark.validate(),
            Err(InvalidMarkupError::EmptyStampImage)
        ));
    }
}
