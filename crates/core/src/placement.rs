//! Placement controller
//!
//! Two interaction machines over the annotation store. The drag machine picks
//! up a placed signature on pointer-down, tracks it under the pointer with the
//! grab-time offset, and drops it on pointer-up. Text placement is a
//! one-shot: armed with a non-empty snippet, the next surface click places it
//! and the handler disarms itself.
//!
//! Drag moves only ask for an overlay recomposite; the expensive base raster
//! is rebuilt once, when the drag ends.

use crate::annotation::{Annotation, AnnotationStore, PageNumber, SurfacePoint};

/// Drag machine state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragState {
    Idle,
    Dragging {
        /// Store index of the grabbed item
        item_index: usize,
        /// Pointer position minus item position at grab time
        grab_offset: (f32, f32),
    },
}

/// What the caller must redraw after an interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementEffect {
    /// Overlays changed; redraw them over the existing base raster.
    Recomposite,
    /// The page itself must be re-rasterized, overlays included.
    Rerender,
}

#[derive(Debug)]
pub struct PlacementController {
    drag: DragState,
    pending_text: Option<String>,
}

impl PlacementController {
    pub fn new() -> Self {
        Self { drag: DragState::Idle, pending_text: None }
    }

    pub fn drag_state(&self) -> DragState {
        self.drag
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.drag, DragState::Dragging { .. })
    }

    // --- signature drag ---------------------------------------------------

    /// Pointer pressed at `pointer` on `page`.
    ///
    /// Scans signatures on the page in store order and grabs the first whose
    /// pickup box contains the pointer; overlapping later items never win.
    /// Returns the grabbed index, or None (state stays Idle, nothing changes).
    pub fn pointer_down(
        &mut self,
        store: &AnnotationStore,
        page: PageNumber,
        pointer: SurfacePoint,
    ) -> Option<usize> {
        for (index, item) in store.iter().enumerate() {
            if item.page() != page || !item.contains(pointer) {
                continue;
            }

            self.drag = DragState::Dragging {
                item_index: index,
                grab_offset: pointer.offset_from(item.position()),
            };
            log::debug!("grabbed annotation {} at index {index}", item.id());
            return Some(index);
        }

        None
    }

    /// Pointer moved to `pointer`; no-op unless a drag is active.
    pub fn pointer_move(
        &mut self,
        store: &mut AnnotationStore,
        pointer: SurfacePoint,
    ) -> Option<PlacementEffect> {
        let DragState::Dragging { item_index, grab_offset } = self.drag else {
            return None;
        };

        store.set_position(
            item_index,
            SurfacePoint::new(pointer.x - grab_offset.0, pointer.y - grab_offset.1),
        );
        Some(PlacementEffect::Recomposite)
    }

    /// Pointer released, anywhere. Ends an active drag.
    pub fn pointer_up(&mut self) -> Option<PlacementEffect> {
        if !self.is_dragging() {
            return None;
        }
        self.drag = DragState::Idle;
        Some(PlacementEffect::Rerender)
    }

    // --- one-shot text placement ------------------------------------------

    /// Arm text placement. Empty text refuses to arm.
    pub fn arm_text(&mut self, text: impl Into<String>) -> bool {
        let text = text.into();
        if text.is_empty() {
            return false;
        }
        self.pending_text = Some(text);
        true
    }

    pub fn armed_text(&self) -> Option<&str> {
        self.pending_text.as_deref()
    }

    /// Drop armed text without placing it (mode switched off).
    pub fn disarm_text(&mut self) {
        self.pending_text = None;
    }

    /// Surface clicked at `pointer` while text is armed: append the snippet
    /// at the click point and disarm. No-op when nothing is armed.
    pub fn place_text(
        &mut self,
        store: &mut AnnotationStore,
        page: PageNumber,
        pointer: SurfacePoint,
    ) -> Option<PlacementEffect> {
        let text = self.pending_text.take()?;
        store.push(Annotation::text(page, pointer, text));
        Some(PlacementEffect::Rerender)
    }
}

impl Default for PlacementController {
    fn default() -> Self {
        Self::new()
    }
}
