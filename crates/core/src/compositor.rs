//! Overlay compositor
//!
//! Draws the placed items belonging to one page onto a drawing surface, after
//! the base raster for that page is already in place. The surface itself is
//! abstract: the UI shell records draw commands it replays with its painter,
//! and tests record calls directly.

use crate::annotation::{AnnotationPayload, AnnotationStore, Color, PageNumber, SurfacePoint};

/// Fixed style for placed text
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub size_px: f32,
    pub color: Color,
}

/// All placed text renders the same way
pub const TEXT_STYLE: TextStyle = TextStyle { size_px: 16.0, color: Color::BLACK };

#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    #[error("malformed signature image ({width}x{height} with {actual} bytes)")]
    MalformedImage { width: u32, height: u32, actual: usize },
    #[error("surface error: {0}")]
    Surface(String),
}

/// Target the compositor paints overlays into
///
/// Positions are in page-bitmap pixel space. Implementations may clip items
/// that extend past their bounds; the compositor never clips on its own.
pub trait DrawSurface {
    fn draw_image(
        &mut self,
        image: &crate::annotation::SignatureImage,
        position: SurfacePoint,
    ) -> Result<(), ComposeError>;

    fn draw_text(
        &mut self,
        text: &str,
        position: SurfacePoint,
        style: TextStyle,
    ) -> Result<(), ComposeError>;
}

/// Draw every item of `page` onto `surface`, in store insertion order.
///
/// Later items land on top of earlier ones. An item that fails to draw is
/// logged and skipped; the rest of the page's overlays still go through.
/// Returns how many items were drawn.
pub fn composite_overlays<S: DrawSurface + ?Sized>(
    store: &AnnotationStore,
    page: PageNumber,
    surface: &mut S,
) -> usize {
    let mut drawn = 0;

    for item in store.for_page(page) {
        let result = match item.payload() {
            AnnotationPayload::Signature(image) => {
                if image.is_well_formed() {
                    surface.draw_image(image, item.position())
                } else {
                    Err(ComposeError::MalformedImage {
                        width: image.width(),
                        height: image.height(),
                        actual: image.rgba().len(),
                    })
                }
            }
            AnnotationPayload::Text(text) => surface.draw_text(text, item.position(), TEXT_STYLE),
        };

        match result {
            Ok(()) => drawn += 1,
            Err(err) => log::warn!("skipping annotation {} on page {page}: {err}", item.id()),
        }
    }

    drawn
}
