//! End-to-end viewer flow against the lopdf backend: load a document, drive
//! the render gate the way the UI shell does, place and move annotations, and
//! check what lands on the surface.

use lopdf::{dictionary, Document, Object};
use pdf_signer_core::{
    composite_overlays, Annotation, AnnotationStore, ComposeError, DocumentLoader, DrawSurface,
    PlacementController, PlacementEffect, RenderAction, SignatureImage, SurfacePoint, TextStyle,
    ViewerState,
};
use pdf_signer_render::{LopdfEngine, OpenSource, PdfEngine, RenderRequest};

fn fixture(pages: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids: Vec<Object> = Vec::new();

    for _ in 0..pages {
        let page = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        };
        kids.push(doc.add_object(page).into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("fixture should serialize");
    bytes
}

#[derive(Debug, Clone, PartialEq)]
enum Overlay {
    Image(SurfacePoint),
    Text(String, SurfacePoint),
}

/// Stand-in for the UI scene: remembers the overlays of the last render.
#[derive(Default)]
struct Scene {
    overlays: Vec<Overlay>,
}

impl DrawSurface for Scene {
    fn draw_image(
        &mut self,
        _image: &SignatureImage,
        position: SurfacePoint,
    ) -> Result<(), ComposeError> {
        self.overlays.push(Overlay::Image(position));
        Ok(())
    }

    fn draw_text(
        &mut self,
        text: &str,
        position: SurfacePoint,
        _style: TextStyle,
    ) -> Result<(), ComposeError> {
        self.overlays.push(Overlay::Text(text.to_owned(), position));
        Ok(())
    }
}

/// The shell's render loop: rasterize the in-flight page, composite, complete,
/// and keep going while completions promote a pending page. Returns the pages
/// actually rasterized, in order, plus the final scene.
fn drain_renders(
    engine: &LopdfEngine,
    handle: pdf_signer_render::DocumentHandle,
    state: &mut ViewerState,
    store: &AnnotationStore,
) -> (Vec<u16>, Scene) {
    let mut rendered = Vec::new();
    let mut scene = Scene::default();

    while let Some(page) = state.render_in_flight() {
        let request = RenderRequest { page_index: u32::from(page) - 1, scale: state.scale() };
        let image = engine.render_page(handle, request).expect("raster should succeed");
        assert!(image.width() > 0 && image.height() > 0);

        // Fresh surface per render; overlays only ever land on top of a
        // completed base raster.
        scene = Scene::default();
        composite_overlays(store, page, &mut scene);

        rendered.push(page);
        state.complete_render();
    }

    (rendered, scene)
}

fn signature(width: u32, height: u32) -> SignatureImage {
    SignatureImage::new(width, height, vec![128; (width * height * 4) as usize])
}

#[test]
fn text_placed_on_page_two_survives_navigation_without_duplicating() {
    let mut engine = LopdfEngine::new();
    let mut loader = DocumentLoader::new();
    let loaded = loader
        .open_source(&mut engine, OpenSource::Bytes(fixture(3)))
        .expect("document should load");

    let mut state = ViewerState::new(loaded.page_count);
    let mut store = AnnotationStore::new();
    let mut controller = PlacementController::new();

    // Initial render of page 1.
    assert_eq!(state.request_render(1), RenderAction::Begin(1));
    drain_renders(&engine, loaded.handle, &mut state, &store);

    // Navigate to page 2 and drop "Approved" at (100, 200).
    let page = state.next_page().expect("page 2 should exist");
    state.request_render(page);
    drain_renders(&engine, loaded.handle, &mut state, &store);

    assert!(controller.arm_text("Approved"));
    let effect = controller.place_text(&mut store, page, SurfacePoint::new(100.0, 200.0));
    assert_eq!(effect, Some(PlacementEffect::Rerender));

    state.request_render(page);
    let (_, scene) = drain_renders(&engine, loaded.handle, &mut state, &store);
    assert_eq!(
        scene.overlays,
        vec![Overlay::Text("Approved".to_owned(), SurfacePoint::new(100.0, 200.0))]
    );

    // Away to page 1 and back: still exactly one "Approved", same spot.
    let back = state.prev_page().expect("page 1 should exist");
    state.request_render(back);
    let (_, scene) = drain_renders(&engine, loaded.handle, &mut state, &store);
    assert!(scene.overlays.is_empty());

    let again = state.next_page().expect("page 2 should exist");
    state.request_render(again);
    let (_, scene) = drain_renders(&engine, loaded.handle, &mut state, &store);
    assert_eq!(
        scene.overlays,
        vec![Overlay::Text("Approved".to_owned(), SurfacePoint::new(100.0, 200.0))]
    );
    assert_eq!(store.len(), 1);
}

#[test]
fn burst_during_in_flight_render_services_only_the_latest_page() {
    let mut engine = LopdfEngine::new();
    let mut loader = DocumentLoader::new();
    let loaded = loader
        .open_source(&mut engine, OpenSource::Bytes(fixture(5)))
        .expect("document should load");

    let mut state = ViewerState::new(loaded.page_count);
    let store = AnnotationStore::new();

    // Page 1 starts rendering; 2, 3, 4 arrive before it completes.
    assert_eq!(state.request_render(1), RenderAction::Begin(1));
    assert_eq!(state.request_render(2), RenderAction::Coalesced);
    assert_eq!(state.request_render(3), RenderAction::Coalesced);
    assert_eq!(state.request_render(4), RenderAction::Coalesced);

    let (rendered, _) = drain_renders(&engine, loaded.handle, &mut state, &store);
    assert_eq!(rendered, vec![1, 4]);
}

#[test]
fn dragging_a_signature_recomposites_until_release_then_rerenders() {
    let mut engine = LopdfEngine::new();
    let mut loader = DocumentLoader::new();
    let loaded = loader
        .open_source(&mut engine, OpenSource::Bytes(fixture(1)))
        .expect("document should load");

    let mut state = ViewerState::new(loaded.page_count);
    let mut store = AnnotationStore::new();
    let mut controller = PlacementController::new();

    store.push(Annotation::signature(1, SurfacePoint::new(100.0, 100.0), signature(50, 20)));

    state.request_render(1);
    drain_renders(&engine, loaded.handle, &mut state, &store);

    // Grab inside the box with a (10, 5) offset and move twice.
    assert_eq!(controller.pointer_down(&store, 1, SurfacePoint::new(110.0, 105.0)), Some(0));

    let moves = [SurfacePoint::new(150.0, 130.0), SurfacePoint::new(220.0, 90.0)];
    for pointer in moves {
        // Overlay-only redraw while the drag is live; no raster request.
        assert_eq!(
            controller.pointer_move(&mut store, pointer),
            Some(PlacementEffect::Recomposite)
        );
        assert_eq!(state.render_in_flight(), None);

        let mut scene = Scene::default();
        composite_overlays(&store, 1, &mut scene);
        assert_eq!(
            scene.overlays,
            vec![Overlay::Image(SurfacePoint::new(pointer.x - 10.0, pointer.y - 5.0))]
        );
    }

    // Release rebuilds the base raster once.
    assert_eq!(controller.pointer_up(), Some(PlacementEffect::Rerender));
    state.request_render(state.current_page());
    let (rendered, scene) = drain_renders(&engine, loaded.handle, &mut state, &store);
    assert_eq!(rendered, vec![1]);
    assert_eq!(scene.overlays, vec![Overlay::Image(SurfacePoint::new(210.0, 85.0))]);

    // And the position stays frozen afterwards.
    assert_eq!(controller.pointer_move(&mut store, SurfacePoint::new(0.0, 0.0)), None);
    assert_eq!(
        store.get(0).expect("item should exist").position(),
        SurfacePoint::new(210.0, 85.0)
    );
}
