//! System font lookup and glyph rasterization for text notes

use std::path::PathBuf;

use ab_glyph::{point, Font, FontVec, PxScale, ScaleFont};
use image::{Rgba, RgbaImage};
use walkdir::WalkDir;

const FONT_DIRS: &[&str] = &["/usr/share/fonts", "/usr/local/share/fonts"];

/// A parsed font used to rasterize note text. Looked up once from the
/// system font directories; when none is usable, notes render chip-only.
pub struct NoteFont {
    font: FontVec,
}

impl NoteFont {
    pub fn from_bytes(bytes: Vec<u8>) -> Option<Self> {
        FontVec::try_from_vec(bytes).ok().map(|font| Self { font })
    }

    /// Walk the usual font directories and take the first parseable
    /// TrueType/OpenType file.
    pub fn discover() -> Option<Self> {
        let mut dirs: Vec<PathBuf> = FONT_DIRS.iter().map(PathBuf::from).collect();
        if let Some(home) = std::env::var_os("HOME") {
            dirs.push(PathBuf::from(home).join(".fonts"));
        }

        for dir in dirs {
            for entry in WalkDir::new(&dir)
                .max_depth(6)
                .into_iter()
                .filter_map(Result::ok)
            {
                let path = entry.path();
                let ext = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(str::to_ascii_lowercase);
                if !matches!(ext.as_deref(), Some("ttf" | "otf")) {
                    continue;
                }
                if let Ok(bytes) = std::fs::read(path) {
                    if let Some(font) = Self::from_bytes(bytes) {
                        log::debug!("note font: {}", path.display());
                        return Some(font);
                    }
                }
            }
        }

        log::warn!("no usable system font found; text notes render as chips only");
        None
    }

    /// Width and line height of `text` at `px` pixels.
    #[must_use]
    pub fn measure(&self, text: &str, px: f32) -> (f32, f32) {
        let scaled = self.font.as_scaled(PxScale::from(px));
        let width = text
            .chars()
            .map(|c| scaled.h_advance(self.font.glyph_id(c)))
            .sum();
        (width, scaled.height())
    }

    #[must_use]
    pub fn ascent(&self, px: f32) -> f32 {
        self.font.as_scaled(PxScale::from(px)).ascent()
    }

    /// Rasterize `text` with its baseline at (`origin_x`, `baseline_y`).
    pub fn draw(
        &self,
        img: &mut RgbaImage,
        origin_x: f32,
        baseline_y: f32,
        px: f32,
        color: Rgba<u8>,
        text: &str,
    ) {
        let scale = PxScale::from(px);
        let scaled = self.font.as_scaled(scale);
        let mut caret = origin_x;

        for ch in text.chars() {
            let id = self.font.glyph_id(ch);
            let glyph = id.with_scale_and_position(scale, point(caret, baseline_y));
            caret += scaled.h_advance(id);

            if let Some(outline) = self.font.outline_glyph(glyph) {
                let bounds = outline.px_bounds();
                outline.draw(|gx, gy, coverage| {
                    let x = (bounds.min.x + gx as f32).round() as i64;
                    let y = (bounds.min.y + gy as f32).round() as i64;
                    let alpha = (f32::from(color[3]) * coverage.clamp(0.0, 1.0)) as u8;
                    super::blend_px(img, x, y, Rgba([color[0], color[1], color[2], alpha]));
                });
            }
        }
    }
}
