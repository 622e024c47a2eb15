//! Diagram image loading.

mod decode;

pub use decode::{DiagramImage, PREVIEW_MAX_DIMS, load_preview};
