//! Viewer core for the PDF signer.
//!
//! State model and logic for loading a document, rendering pages behind a
//! one-in-flight render gate, overlaying placed signatures and text, and
//! moving placed items around. Engine access goes through
//! `pdf-signer-render`; everything here is driven by the UI shell.

pub mod annotation;
pub mod compositor;
pub mod loader;
pub mod placement;
pub mod viewer;

pub use annotation::{
    Annotation, AnnotationId, AnnotationPayload, AnnotationStore, Color, ImageId, PageNumber,
    SignatureImage, SurfacePoint,
};
pub use compositor::{composite_overlays, ComposeError, DrawSurface, TextStyle, TEXT_STYLE};
pub use loader::{DocumentLoader, LoadError, LoadedDocument};
pub use placement::{DragState, PlacementController, PlacementEffect};
pub use viewer::{RenderAction, ViewerState, DEFAULT_SCALE, MIN_SCALE, ZOOM_STEP};
