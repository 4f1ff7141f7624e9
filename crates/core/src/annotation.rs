//! Placed-item data model
//!
//! Signatures and text snippets dropped onto a page. Coordinates live in
//! page-bitmap pixel space: origin at the top-left of the rendered surface,
//! X to the right, Y downward, units are surface pixels at the scale the
//! page was rasterized at.

use std::sync::Arc;

/// Unique identifier for a placed item
///
/// Generated using UUID v4; stable for the lifetime of the store.
pub type AnnotationId = uuid::Uuid;

/// Unique identifier for a captured signature image
pub type ImageId = uuid::Uuid;

/// 1-based page number. Page 1 is the first page of the document.
pub type PageNumber = u16;

/// A point on the rendered page surface, in bitmap pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfacePoint {
    pub x: f32,
    pub y: f32,
}

impl SurfacePoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Component-wise offset from `other` to `self`
    pub fn offset_from(&self, other: SurfacePoint) -> (f32, f32) {
        (self.x - other.x, self.y - other.y)
    }
}

/// RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub const BLACK: Color = Color { r: 0, g: 0, b: 0, a: 255 };
    pub const WHITE: Color = Color { r: 255, g: 255, b: 255, a: 255 };
}

/// A captured signature as a raw RGBA bitmap
///
/// Produced by the signature pad (or decoded from an imported image file) and
/// shared between the store and whatever textures the UI uploads; the pixel
/// buffer is reference-counted, never copied per draw.
///
/// Construction does not validate the buffer; the compositor checks
/// [`SignatureImage::is_well_formed`] before drawing and skips bad handles.
#[derive(Debug, Clone)]
pub struct SignatureImage {
    id: ImageId,
    width: u32,
    height: u32,
    rgba: Arc<[u8]>,
}

impl SignatureImage {
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> Self {
        Self { id: ImageId::new_v4(), width, height, rgba: rgba.into() }
    }

    pub fn id(&self) -> ImageId {
        self.id
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }

    /// Whether the buffer actually holds `width * height` RGBA pixels
    pub fn is_well_formed(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.rgba.len() == (self.width as usize) * (self.height as usize) * 4
    }
}

/// What a placed item carries
#[derive(Debug, Clone)]
pub enum AnnotationPayload {
    /// A signature image, drawn unscaled at the item position
    Signature(SignatureImage),
    /// A text snippet, drawn with the compositor's fixed style
    Text(String),
}

/// A single placed item: payload, owning page, and surface position
///
/// Position is the only mutable part; it moves during drags.
#[derive(Debug, Clone)]
pub struct Annotation {
    id: AnnotationId,
    page: PageNumber,
    position: SurfacePoint,
    payload: AnnotationPayload,
}

impl Annotation {
    pub fn signature(page: PageNumber, position: SurfacePoint, image: SignatureImage) -> Self {
        Self {
            id: AnnotationId::new_v4(),
            page,
            position,
            payload: AnnotationPayload::Signature(image),
        }
    }

    pub fn text(page: PageNumber, position: SurfacePoint, text: impl Into<String>) -> Self {
        Self {
            id: AnnotationId::new_v4(),
            page,
            position,
            payload: AnnotationPayload::Text(text.into()),
        }
    }

    pub fn id(&self) -> AnnotationId {
        self.id
    }

    pub fn page(&self) -> PageNumber {
        self.page
    }

    pub fn position(&self) -> SurfacePoint {
        self.position
    }

    pub fn set_position(&mut self, position: SurfacePoint) {
        self.position = position;
    }

    pub fn payload(&self) -> &AnnotationPayload {
        &self.payload
    }

    /// Axis-aligned pickup box, present only for signatures
    ///
    /// Text items are placed once and never picked up, so they expose no box.
    pub fn bounding_box(&self) -> Option<(f32, f32, f32, f32)> {
        match &self.payload {
            AnnotationPayload::Signature(image) => Some((
                self.position.x,
                self.position.y,
                self.position.x + image.width() as f32,
                self.position.y + image.height() as f32,
            )),
            AnnotationPayload::Text(_) => None,
        }
    }

    /// Whether `point` falls inside the pickup box (bounds inclusive)
    pub fn contains(&self, point: SurfacePoint) -> bool {
        match self.bounding_box() {
            Some((x0, y0, x1, y1)) => {
                point.x >= x0 && point.x <= x1 && point.y >= y0 && point.y <= y1
            }
            None => false,
        }
    }
}

/// Insertion-ordered collection of placed items
///
/// Order matters twice over: overlays draw in insertion order (later items on
/// top) and drag hit-testing scans in insertion order (first match wins).
/// Items are addressed by index; there is no removal.
#[derive(Debug, Default)]
pub struct AnnotationStore {
    items: Vec<Annotation>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item, returning its index
    pub fn push(&mut self, annotation: Annotation) -> usize {
        self.items.push(annotation);
        self.items.len() - 1
    }

    pub fn get(&self, index: usize) -> Option<&Annotation> {
        self.items.get(index)
    }

    /// Move an item; false if the index is stale
    pub fn set_position(&mut self, index: usize, position: SurfacePoint) -> bool {
        match self.items.get_mut(index) {
            Some(item) => {
                item.set_position(position);
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.items.iter()
    }

    /// Items on `page`, in insertion order
    pub fn for_page(&self, page: PageNumber) -> impl Iterator<Item = &Annotation> {
        self.items.iter().filter(move |item| item.page() == page)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(width: u32, height: u32) -> SignatureImage {
        SignatureImage::new(width, height, vec![0; (width * height * 4) as usize])
    }

    #[test]
    fn push_preserves_insertion_order() {
        let mut store = AnnotationStore::new();
        store.push(Annotation::text(1, SurfacePoint::new(0.0, 0.0), "first"));
        store.push(Annotation::signature(1, SurfacePoint::new(10.0, 10.0), image(4, 4)));
        store.push(Annotation::text(1, SurfacePoint::new(5.0, 5.0), "last"));

        let kinds: Vec<bool> = store
            .iter()
            .map(|item| matches!(item.payload(), AnnotationPayload::Text(_)))
            .collect();
        assert_eq!(kinds, vec![true, false, true]);
    }

    #[test]
    fn for_page_filters_by_page_only() {
        let mut store = AnnotationStore::new();
        store.push(Annotation::text(1, SurfacePoint::new(0.0, 0.0), "one"));
        store.push(Annotation::text(2, SurfacePoint::new(0.0, 0.0), "two"));
        store.push(Annotation::text(1, SurfacePoint::new(0.0, 0.0), "three"));

        assert_eq!(store.for_page(1).count(), 2);
        assert_eq!(store.for_page(2).count(), 1);
        assert_eq!(store.for_page(3).count(), 0);
    }

    #[test]
    fn set_position_moves_item_in_place() {
        let mut store = AnnotationStore::new();
        let index = store.push(Annotation::signature(
            1,
            SurfacePoint::new(20.0, 30.0),
            image(8, 8),
        ));

        assert!(store.set_position(index, SurfacePoint::new(50.0, 60.0)));
        let moved = store.get(index).expect("item should exist");
        assert_eq!(moved.position(), SurfacePoint::new(50.0, 60.0));

        assert!(!store.set_position(99, SurfacePoint::new(0.0, 0.0)));
    }

    #[test]
    fn signature_pickup_box_covers_image_extent() {
        let item = Annotation::signature(1, SurfacePoint::new(100.0, 200.0), image(40, 20));

        assert!(item.contains(SurfacePoint::new(100.0, 200.0)));
        assert!(item.contains(SurfacePoint::new(140.0, 220.0)));
        assert!(item.contains(SurfacePoint::new(120.0, 210.0)));
        assert!(!item.contains(SurfacePoint::new(99.0, 210.0)));
        assert!(!item.contains(SurfacePoint::new(141.0, 210.0)));
        assert!(!item.contains(SurfacePoint::new(120.0, 221.0)));
    }

    #[test]
    fn text_items_are_never_hit() {
        let item = Annotation::text(1, SurfacePoint::new(100.0, 100.0), "hello");
        assert!(item.bounding_box().is_none());
        assert!(!item.contains(SurfacePoint::new(100.0, 100.0)));
    }

    #[test]
    fn well_formed_checks_buffer_extent() {
        assert!(image(4, 4).is_well_formed());
        assert!(!SignatureImage::new(4, 4, vec![0; 7]).is_well_formed());
        assert!(!SignatureImage::new(0, 4, Vec::new()).is_well_formed());
    }
}
