//! Viewer state and the render gate
//!
//! One value holds everything the page view depends on: the current page, the
//! zoom scale, and the render gate that serializes rasterization. The gate
//! allows at most one render in flight; requests issued meanwhile collapse
//! into a single pending page (last write wins — coalescing, not queuing),
//! which is promoted exactly once when the in-flight render completes.

use crate::annotation::PageNumber;

/// Zoom never drops below this
pub const MIN_SCALE: f32 = 0.5;

/// Zoom in/out increment
pub const ZOOM_STEP: f32 = 0.25;

pub const DEFAULT_SCALE: f32 = 1.0;

/// Outcome of a render request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderAction {
    /// No render was in flight; the caller must rasterize this page now.
    Begin(PageNumber),
    /// A render is in flight; the request became the pending page,
    /// replacing any earlier pending request.
    Coalesced,
}

/// Consolidated view state for one loaded document
#[derive(Debug, Clone)]
pub struct ViewerState {
    current_page: PageNumber,
    page_count: PageNumber,
    scale: f32,
    in_flight: Option<PageNumber>,
    pending: Option<PageNumber>,
}

impl ViewerState {
    /// Fresh state for a document with `page_count` pages, positioned on
    /// page 1 at the default zoom.
    pub fn new(page_count: PageNumber) -> Self {
        Self {
            current_page: 1,
            page_count,
            scale: DEFAULT_SCALE,
            in_flight: None,
            pending: None,
        }
    }

    pub fn current_page(&self) -> PageNumber {
        self.current_page
    }

    pub fn page_count(&self) -> PageNumber {
        self.page_count
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn render_in_flight(&self) -> Option<PageNumber> {
        self.in_flight
    }

    pub fn pending_page(&self) -> Option<PageNumber> {
        self.pending
    }

    // --- navigation -------------------------------------------------------

    /// Step back one page. Returns the page to render, or None at page 1.
    pub fn prev_page(&mut self) -> Option<PageNumber> {
        if self.current_page <= 1 {
            return None;
        }
        self.current_page -= 1;
        Some(self.current_page)
    }

    /// Step forward one page. Returns the page to render, or None at the end.
    pub fn next_page(&mut self) -> Option<PageNumber> {
        if self.current_page >= self.page_count {
            return None;
        }
        self.current_page += 1;
        Some(self.current_page)
    }

    /// Jump directly to `page`. Returns the page to render; None when the
    /// target is out of range or already current.
    pub fn go_to_page(&mut self, page: PageNumber) -> Option<PageNumber> {
        if page < 1 || page > self.page_count || page == self.current_page {
            return None;
        }
        self.current_page = page;
        Some(page)
    }

    // --- zoom -------------------------------------------------------------

    /// Zoom in one step. Unbounded upward.
    pub fn zoom_in(&mut self) {
        self.scale += ZOOM_STEP;
    }

    /// Zoom out one step, refusing to cross the floor. Returns whether the
    /// scale actually changed.
    pub fn zoom_out(&mut self) -> bool {
        if self.scale <= MIN_SCALE {
            return false;
        }
        self.scale -= ZOOM_STEP;
        true
    }

    // --- render gate ------------------------------------------------------

    /// Ask for `page` to be rasterized.
    ///
    /// With nothing in flight the caller must begin rendering immediately.
    /// Otherwise the request overwrites the pending slot; intermediate
    /// requests are dropped in favor of the most recent one.
    pub fn request_render(&mut self, page: PageNumber) -> RenderAction {
        if self.in_flight.is_some() {
            self.pending = Some(page);
            RenderAction::Coalesced
        } else {
            self.in_flight = Some(page);
            RenderAction::Begin(page)
        }
    }

    /// Mark the in-flight render (and its compositing) finished.
    ///
    /// If a request arrived meanwhile, the surviving pending page becomes the
    /// new in-flight render and is returned so the caller services it — once.
    pub fn complete_render(&mut self) -> Option<PageNumber> {
        self.in_flight = None;
        let next = self.pending.take();
        if let Some(page) = next {
            self.in_flight = Some(page);
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn navigation_clamps_at_both_ends() {
        let mut state = ViewerState::new(3);
        assert_eq!(state.prev_page(), None);
        assert_eq!(state.current_page(), 1);

        assert_eq!(state.next_page(), Some(2));
        assert_eq!(state.next_page(), Some(3));
        assert_eq!(state.next_page(), None);
        assert_eq!(state.current_page(), 3);

        assert_eq!(state.prev_page(), Some(2));
    }

    #[test]
    fn go_to_page_rejects_out_of_range_and_no_ops_on_current() {
        let mut state = ViewerState::new(5);
        assert_eq!(state.go_to_page(0), None);
        assert_eq!(state.go_to_page(6), None);
        assert_eq!(state.go_to_page(1), None);
        assert_eq!(state.go_to_page(4), Some(4));
        assert_eq!(state.current_page(), 4);
    }

    #[test]
    fn zoom_out_stops_at_floor() {
        let mut state = ViewerState::new(1);
        assert!(state.zoom_out());
        assert!(state.zoom_out());
        assert_eq!(state.scale(), MIN_SCALE);
        assert!(!state.zoom_out());
        assert_eq!(state.scale(), MIN_SCALE);
    }

    #[test]
    fn zoom_in_has_no_ceiling() {
        let mut state = ViewerState::new(1);
        for _ in 0..40 {
            state.zoom_in();
        }
        assert_eq!(state.scale(), DEFAULT_SCALE + 40.0 * ZOOM_STEP);
    }

    #[test]
    fn idle_gate_begins_immediately() {
        let mut state = ViewerState::new(3);
        assert_eq!(state.request_render(1), RenderAction::Begin(1));
        assert_eq!(state.render_in_flight(), Some(1));
        assert_eq!(state.complete_render(), None);
        assert_eq!(state.render_in_flight(), None);
    }

    #[test]
    fn burst_of_requests_coalesces_to_the_latest() {
        let mut state = ViewerState::new(5);
        assert_eq!(state.request_render(1), RenderAction::Begin(1));

        // Pages 2, 3, 4 requested while page 1 renders.
        assert_eq!(state.request_render(2), RenderAction::Coalesced);
        assert_eq!(state.request_render(3), RenderAction::Coalesced);
        assert_eq!(state.request_render(4), RenderAction::Coalesced);
        assert_eq!(state.pending_page(), Some(4));

        // Exactly one follow-up render, for page 4 only.
        assert_eq!(state.complete_render(), Some(4));
        assert_eq!(state.render_in_flight(), Some(4));
        assert_eq!(state.complete_render(), None);
        assert_eq!(state.render_in_flight(), None);
    }

    #[test]
    fn pending_is_serviced_exactly_once() {
        let mut state = ViewerState::new(3);
        state.request_render(1);
        state.request_render(2);

        assert_eq!(state.complete_render(), Some(2));
        assert_eq!(state.pending_page(), None);
        assert_eq!(state.complete_render(), None);
    }
}
