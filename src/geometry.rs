//! Coordinate transformation between screen, canvas-device and document space
//!
//! Three independent factors separate an on-screen pointer position from a
//! position on the page: the CSS-pixel to backing-store ratio of the canvas,
//! the render scale of the current view, and the Y-axis orientation of the
//! document's own coordinate system. All three live here and nowhere else;
//! every other module speaks either document space or one bitmap's pixel
//! space.

/// A point in screen space: CSS pixels, origin top-left, Y down.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A point in document space (native page units).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DocPoint {
    pub x: f64,
    pub y: f64,
}

impl DocPoint {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Native page dimensions in document units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// US Letter, 72 units per inch
    #[must_use]
    pub const fn letter() -> Self {
        Self::new(612.0, 792.0)
    }

    /// ISO A4
    #[must_use]
    pub const fn a4() -> Self {
        Self::new(595.0, 842.0)
    }
}

/// An axis-aligned rectangle in document space, anchored at its
/// lower-left corner when the document convention is bottom-up.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DocRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl DocRect {
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Normalized bounding box of two corner points.
    #[must_use]
    pub fn from_corners(a: DocPoint, b: DocPoint) -> Self {
        let x = a.x.min(b.x);
        let y = a.y.min(b.y);
        Self {
            x,
            y,
            width: (a.x - b.x).abs(),
            height: (a.y - b.y).abs(),
        }
    }

    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }

    /// Longest side, used for minimum-extent checks.
    #[must_use]
    pub fn max_extent(&self) -> f64 {
        self.width.max(self.height)
    }
}

/// Y-axis orientation of the document coordinate system being converted
/// to or from. Never assumed; always passed explicitly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocYAxis {
    /// Origin bottom-left, Y grows upward (PDF user space).
    BottomUp,
    /// Origin top-left, Y grows downward.
    TopDown,
}

/// Everything needed to map a pointer position onto a page: the CSS display
/// size of the canvas, its device-pixel backing size, and the page's native
/// size in document units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewMetrics {
    /// Canvas CSS display width/height in CSS pixels
    pub css_width: f64,
    pub css_height: f64,
    /// Canvas backing-store width/height in device pixels
    pub device_width: f64,
    pub device_height: f64,
    /// Native page size in document units
    pub native: PageSize,
}

impl ViewMetrics {
    /// Metrics for a canvas whose backing store matches its CSS size
    /// scaled by `device_pixel_ratio`.
    #[must_use]
    pub fn with_ratio(css_width: f64, css_height: f64, ratio: f64, native: PageSize) -> Self {
        Self {
            css_width,
            css_height,
            device_width: css_width * ratio,
            device_height: css_height * ratio,
            native,
        }
    }
}

/// Convert a screen-space point (CSS pixels, top-left origin) to document
/// space under the given axis convention.
#[must_use]
pub fn screen_to_document(p: ScreenPoint, view: &ViewMetrics, axis: DocYAxis) -> DocPoint {
    // CSS pixels -> device pixels of the backing store
    let device_x = p.x * (view.device_width / view.css_width);
    let device_y = p.y * (view.device_height / view.css_height);

    // device pixels -> fraction of the page
    let x_frac = device_x / view.device_width;
    let y_frac = device_y / view.device_height;

    let doc_x = x_frac * view.native.width;
    let doc_y = match axis {
        DocYAxis::BottomUp => (1.0 - y_frac) * view.native.height,
        DocYAxis::TopDown => y_frac * view.native.height,
    };

    DocPoint::new(doc_x, doc_y)
}

/// Inverse of [`screen_to_document`].
#[must_use]
pub fn document_to_screen(p: DocPoint, view: &ViewMetrics, axis: DocYAxis) -> ScreenPoint {
    let x_frac = p.x / view.native.width;
    let y_frac = match axis {
        DocYAxis::BottomUp => 1.0 - (p.y / view.native.height),
        DocYAxis::TopDown => p.y / view.native.height,
    };

    let device_x = x_frac * view.device_width;
    let device_y = y_frac * view.device_height;

    ScreenPoint::new(
        device_x * (view.css_width / view.device_width),
        device_y * (view.css_height / view.device_height),
    )
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn dimension() -> impl Strategy<Value = f64> {
        1.0f64..2000.0
    }

    fn ratio() -> impl Strategy<Value = f64> {
        prop_oneof![Just(1.0), Just(1.5), Just(2.0), Just(3.0)]
    }

    proptest! {
        /// Screen -> document -> screen round-trips within tolerance for
        /// both axis conventions.
        #[test]
        fn roundtrip_screen_document_screen(
            css_w in dimension(),
            css_h in dimension(),
            page_w in dimension(),
            page_h in dimension(),
            r in ratio(),
        ) {
            let view = ViewMetrics::with_ratio(css_w, css_h, r, PageSize::new(page_w, page_h));
            let s = ScreenPoint::new(css_w / 3.0, css_h / 4.0);

            for axis in [DocYAxis::BottomUp, DocYAxis::TopDown] {
                let d = screen_to_document(s, &view, axis);
                let back = document_to_screen(d, &view, axis);
                prop_assert!((back.x - s.x).abs() < 1e-6, "x: {} vs {}", back.x, s.x);
                prop_assert!((back.y - s.y).abs() < 1e-6, "y: {} vs {}", back.y, s.y);
            }
        }

        /// A document point projected at two different view scales recovers
        /// the same document position from both projections.
        #[test]
        fn document_position_is_scale_invariant(
            page_w in dimension(),
            page_h in dimension(),
            s1 in 0.5f64..4.0,
            s2 in 0.5f64..4.0,
        ) {
            prop_assume!((s1 - s2).abs() > 1e-3);
            let native = PageSize::new(page_w, page_h);
            let d = DocPoint::new(page_w / 2.0, page_h / 3.0);

            let view1 = ViewMetrics::with_ratio(page_w * s1, page_h * s1, 1.0, native);
            let view2 = ViewMetrics::with_ratio(page_w * s2, page_h * s2, 2.0, native);

            let back1 = screen_to_document(
                document_to_screen(d, &view1, DocYAxis::BottomUp), &view1, DocYAxis::BottomUp);
            let back2 = screen_to_document(
                document_to_screen(d, &view2, DocYAxis::BottomUp), &view2, DocYAxis::BottomUp);

            prop_assert!((back1.x - d.x).abs() < 1e-6);
            prop_assert!((back1.y - d.y).abs() < 1e-6);
            prop_assert!((back2.x - d.x).abs() < 1e-6);
            prop_assert!((back2.y - d.y).abs() < 1e-6);
        }

        /// Mixing conventions moves every off-center point; converting with
        /// the wrong axis is never a silent no-op.
        #[test]
        fn conventions_disagree_off_center(
            page_w in dimension(),
            page_h in dimension(),
        ) {
            let view = ViewMetrics::with_ratio(page_w, page_h, 1.0, PageSize::new(page_w, page_h));
            let s = ScreenPoint::new(page_w / 2.0, page_h / 4.0);

            let up = screen_to_document(s, &view, DocYAxis::BottomUp);
            let down = screen_to_document(s, &view, DocYAxis::TopDown);
            prop_assert!((up.y - down.y).abs() > 1e-6);
            prop_assert!((up.x - down.x).abs() < 1e-9);
        }
    }
}
