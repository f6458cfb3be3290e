//! Per-page markup primitives and their store

mod primitive;
mod store;

pub use primitive::{
    MarkupPrimitive, RectKind, RectMark, StampMark, StrokeMark, TextNoteMark, HIGHLIGHT_FILL,
    INK_COLOR, REDACTION_FILL,
};
pub use store::MarkupStore;
