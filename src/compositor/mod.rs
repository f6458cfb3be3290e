//! Overlay compositor
//!
//! Draws a page bitmap plus its markup primitives onto a fresh pixel
//! buffer, for the live preview and for export. Primitives arrive in
//! document space; the conversion to this bitmap's pixel space (scale and
//! Y flip) happens here and only here, so a primitive recorded once
//! renders correctly against bitmaps of any resolution.

mod font;

pub use font::NoteFont;

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

use crate::geometry::{DocPoint, DocRect};
use crate::markup::{MarkupPrimitive, RectKind, StampMark, StrokeMark, TextNoteMark};
use crate::raster::PageBitmap;

/// Note text size in document units
const NOTE_TEXT_SIZE: f64 = 11.0;
/// Chip padding around note text, document units
const NOTE_PAD: f64 = 3.0;
/// Note chip fill (opaque pale yellow)
const NOTE_CHIP: Rgba<u8> = Rgba([255, 249, 196, 255]);
/// Note text color
const NOTE_TEXT: Rgba<u8> = Rgba([40, 40, 40, 255]);

/// Composites markup primitives over page bitmaps.
pub struct OverlayCompositor {
    font: Option<NoteFont>,
}

impl OverlayCompositor {
    /// Compositor with a system font for note text, when one exists.
    #[must_use]
    pub fn new() -> Self {
        Self {
            font: NoteFont::discover(),
        }
    }

    /// Compositor that renders notes as chips only. Deterministic in
    /// environments without fonts.
    #[must_use]
    pub fn without_font() -> Self {
        Self { font: None }
    }

    #[must_use]
    pub fn with_font(font: NoteFont) -> Self {
        Self { font: Some(font) }
    }

    /// Composite for the live preview. The cached bitmap is read-only;
    /// the returned buffer is what the host blits to its surface.
    #[must_use]
    pub fn render_preview(&self, bitmap: &PageBitmap, marks: &[MarkupPrimitive]) -> RgbaImage {
        self.composite(bitmap, marks)
    }

    /// Composite for export: a fresh bitmap with the markup burned in,
    /// carrying the source bitmap's page index and scale.
    #[must_use]
    pub fn render_flattened(&self, bitmap: &PageBitmap, marks: &[MarkupPrimitive]) -> PageBitmap {
        PageBitmap::new(bitmap.page_index, bitmap.scale, self.composite(bitmap, marks))
    }

    /// Draw order is insertion order: later marks sit on top.
    fn composite(&self, bitmap: &PageBitmap, marks: &[MarkupPrimitive]) -> RgbaImage {
        let mut out = bitmap.image.clone();
        let scale = bitmap.scale;

        for mark in marks {
            match mark {
                MarkupPrimitive::Rect(r) => {
                    let px = PixelBox::from_doc_rect(&out, &r.rect, scale);
                    match r.kind {
                        // Redaction is load-bearing: the fill must be
                        // fully opaque or content leaks through.
                        RectKind::Redaction => fill_rect(&mut out, px, r.color),
                        RectKind::Highlight => blend_rect(&mut out, px, r.color),
                    }
                }
                MarkupPrimitive::Stroke(s) => draw_stroke(&mut out, s, scale),
                MarkupPrimitive::TextNote(n) => self.draw_note(&mut out, n, scale),
                MarkupPrimitive::Stamp(s) => draw_stamp(&mut out, s, scale),
            }
        }

        out
    }

    fn draw_note(&self, img: &mut RgbaImage, note: &TextNoteMark, scale: f64) {
        let text = note.text.trim();
        let px_size = (NOTE_TEXT_SIZE * scale) as f32;
        let pad = (NOTE_PAD * scale).max(1.0) as f32;

        let (text_w, text_h) = match &self.font {
            Some(font) => font.measure(text, px_size),
            // Fallback metric so the chip still has a sensible size.
            None => (0.55 * px_size * text.chars().count() as f32, 1.2 * px_size),
        };

        let anchor = doc_to_px(img, note.anchor, scale);
        let chip = PixelBox::clamped(
            img,
            anchor.0,
            anchor.1,
            anchor.0 + f64::from(text_w + 2.0 * pad),
            anchor.1 + f64::from(text_h + 2.0 * pad),
        );
        fill_rect(img, chip, NOTE_CHIP);

        if let Some(font) = &self.font {
            let baseline = anchor.1 as f32 + pad + font.ascent(px_size);
            font.draw(img, anchor.0 as f32 + pad, baseline, px_size, NOTE_TEXT, text);
        }
    }
}

impl Default for OverlayCompositor {
    fn default() -> Self {
        Self::new()
    }
}

/// Clamped pixel-space rectangle within one bitmap
#[derive(Clone, Copy, Debug)]
struct PixelBox {
    x0: u32,
    y0: u32,
    x1: u32,
    y1: u32,
}

impl PixelBox {
    /// Convert a bottom-up document rect into this bitmap's top-down
    /// pixel space.
    fn from_doc_rect(img: &RgbaImage, rect: &DocRect, scale: f64) -> Self {
        let h = f64::from(img.height());
        Self::clamped(
            img,
            rect.x * scale,
            h - (rect.y + rect.height) * scale,
            (rect.x + rect.width) * scale,
            h - rect.y * scale,
        )
    }

    fn clamped(img: &RgbaImage, x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        let w = f64::from(img.width());
        let h = f64::from(img.height());
        Self {
            x0: x0.floor().clamp(0.0, w) as u32,
            y0: y0.floor().clamp(0.0, h) as u32,
            x1: x1.ceil().clamp(0.0, w) as u32,
            y1: y1.ceil().clamp(0.0, h) as u32,
        }
    }

    fn width(self) -> u32 {
        self.x1.saturating_sub(self.x0)
    }

    fn height(self) -> u32 {
        self.y1.saturating_sub(self.y0)
    }
}

/// Bottom-up document point to top-down pixel coordinates.
fn doc_to_px(img: &RgbaImage, p: DocPoint, scale: f64) -> (f64, f64) {
    (p.x * scale, f64::from(img.height()) - p.y * scale)
}

/// Solid fill, alpha forced opaque.
fn fill_rect(img: &mut RgbaImage, r: PixelBox, color: Rgba<u8>) {
    let solid = Rgba([color[0], color[1], color[2], 255]);
    for y in r.y0..r.y1 {
        for x in r.x0..r.x1 {
            img.put_pixel(x, y, solid);
        }
    }
}

/// Src-over fill with the color's own alpha.
fn blend_rect(img: &mut RgbaImage, r: PixelBox, color: Rgba<u8>) {
    for y in r.y0..r.y1 {
        for x in r.x0..r.x1 {
            blend_px(img, i64::from(x), i64::from(y), color);
        }
    }
}

/// Src-over blend of one pixel; out-of-bounds coordinates are ignored.
fn blend_px(img: &mut RgbaImage, x: i64, y: i64, color: Rgba<u8>) {
    if x < 0 || y < 0 || x >= i64::from(img.width()) || y >= i64::from(img.height()) {
        return;
    }
    let (x, y) = (x as u32, y as u32);
    let dst = *img.get_pixel(x, y);
    let sa = f32::from(color[3]) / 255.0;
    let da = f32::from(dst[3]) / 255.0;
    let oa = sa + da * (1.0 - sa);
    if oa <= 0.0 {
        img.put_pixel(x, y, Rgba([0, 0, 0, 0]));
        return;
    }

    let mut out = [0u8; 4];
    for c in 0..3 {
        let s = f32::from(color[c]);
        let d = f32::from(dst[c]);
        out[c] = ((s * sa + d * da * (1.0 - sa)) / oa).round().clamp(0.0, 255.0) as u8;
    }
    out[3] = (oa * 255.0).round() as u8;
    img.put_pixel(x, y, Rgba(out));
}

/// Stamp discs along each segment. A zero-length stroke (single click)
/// draws one dot rather than failing.
fn draw_stroke(img: &mut RgbaImage, stroke: &StrokeMark, scale: f64) {
    let radius = (stroke.width * scale / 2.0).max(0.5);
    let px_points: Vec<(f64, f64)> = stroke
        .points
        .iter()
        .map(|p| doc_to_px(img, *p, scale))
        .collect();

    match px_points.as_slice() {
        [] => {}
        [single] => draw_disc(img, *single, radius, stroke.color),
        _ => {
            for pair in px_points.windows(2) {
                let (ax, ay) = pair[0];
                let (bx, by) = pair[1];
                let dist = ((bx - ax).powi(2) + (by - ay).powi(2)).sqrt();
                let steps = (dist / (radius * 0.5).max(0.25)).ceil().max(1.0) as usize;
                for i in 0..=steps {
                    let t = i as f64 / steps as f64;
                    let x = ax + (bx - ax) * t;
                    let y = ay + (by - ay) * t;
                    draw_disc(img, (x, y), radius, stroke.color);
                }
            }
        }
    }
}

fn draw_disc(img: &mut RgbaImage, center: (f64, f64), radius: f64, color: Rgba<u8>) {
    let r = radius.ceil() as i64;
    let cx = center.0.round() as i64;
    let cy = center.1.round() as i64;
    let r2 = radius * radius;

    for dy in -r..=r {
        for dx in -r..=r {
            if (dx * dx + dy * dy) as f64 <= r2 {
                blend_px(img, cx + dx, cy + dy, color);
            }
        }
    }
}

/// Scale the stamp image to its target rect and blend it over the page.
fn draw_stamp(img: &mut RgbaImage, stamp: &StampMark, scale: f64) {
    let target = PixelBox::from_doc_rect(img, &stamp.rect, scale);
    let (w, h) = (target.width(), target.height());
    if w == 0 || h == 0 {
        return;
    }

    let resized = imageops::resize(stamp.image.as_ref(), w, h, FilterType::Triangle);
    for (sx, sy, px) in resized.enumerate_pixels() {
        blend_px(
            img,
            i64::from(target.x0 + sx),
            i64::from(target.y0 + sy),
            *px,
        );
    }
}
