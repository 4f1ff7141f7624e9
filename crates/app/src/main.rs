//! PDF Signer — egui shell
//!
//! Wires the viewer core to an eframe window: toolbar, thumbnail sidebar,
//! page viewport, signature pad, and the per-frame render loop. Rasterized
//! pages become textures; overlays are recorded by the compositor and
//! replayed with the painter on every frame, so drags only recomposite while
//! the base raster is rebuilt once on drop.

mod signature_pad;

use eframe::egui;
use pdf_signer_core::{
    composite_overlays, Annotation, AnnotationStore, ComposeError, DocumentLoader, DrawSurface,
    ImageId, PageNumber, PlacementController, PlacementEffect, SignatureImage, SurfacePoint,
    TextStyle, ViewerState,
};
use pdf_signer_render::{PdfEngine, RenderRequest, ThumbnailSize};
use signature_pad::SignaturePad;
use std::collections::HashMap;
use std::path::PathBuf;

fn main() -> eframe::Result {
    env_logger::init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([800.0, 600.0])
            .with_title("PDF Signer"),
        ..Default::default()
    };

    eframe::run_native(
        "PDF Signer",
        options,
        Box::new(|cc| Ok(Box::new(PdfSignerApp::new(cc)))),
    )
}

/// Prefer PDFium when it is compiled in and its library binds; otherwise run
/// on the placeholder backend so the app still opens and paginates documents.
fn build_engine() -> Box<dyn PdfEngine> {
    #[cfg(feature = "pdfium")]
    {
        match pdf_signer_render::pdfium_backend::PdfiumEngine::new() {
            Ok(engine) => return Box::new(engine),
            Err(err) => {
                log::warn!("PDFium unavailable, falling back to placeholder rendering: {err}")
            }
        }
    }

    Box::new(pdf_signer_render::default_engine())
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Tool {
    Select,
    Signature,
    Text,
}

/// One recorded overlay draw, replayed over the page texture each frame
enum OverlayCmd {
    Image { image: SignatureImage, position: SurfacePoint },
    Text { text: String, position: SurfacePoint, style: TextStyle },
}

/// Compositor target: records draw commands instead of touching pixels
#[derive(Default)]
struct OverlayRecorder {
    cmds: Vec<OverlayCmd>,
}

impl DrawSurface for OverlayRecorder {
    fn draw_image(
        &mut self,
        image: &SignatureImage,
        position: SurfacePoint,
    ) -> Result<(), ComposeError> {
        self.cmds.push(OverlayCmd::Image { image: image.clone(), position });
        Ok(())
    }

    fn draw_text(
        &mut self,
        text: &str,
        position: SurfacePoint,
        style: TextStyle,
    ) -> Result<(), ComposeError> {
        self.cmds.push(OverlayCmd::Text { text: text.to_owned(), position, style });
        Ok(())
    }
}

/// The drawing surface of the most recent render. Rebuilt from scratch every
/// time a page rasterizes; the old one is dropped with its texture.
struct PageScene {
    page: PageNumber,
    texture: egui::TextureHandle,
    /// Logical size in UI points; positions share this space.
    size: egui::Vec2,
    overlays: Vec<OverlayCmd>,
}

enum ResolvedOverlay {
    Image { texture: egui::TextureId, position: SurfacePoint, size: egui::Vec2 },
    Text { text: String, position: SurfacePoint, size_px: f32, color: egui::Color32 },
}

struct ErrorDialogState {
    message: String,
}

struct PdfSignerApp {
    engine: Box<dyn PdfEngine>,
    loader: DocumentLoader,

    // View state for the loaded document
    viewer: Option<ViewerState>,
    store: AnnotationStore,
    controller: PlacementController,

    // UI state
    current_tool: Tool,
    text_draft: String,
    signature_pad: SignaturePad,

    // Render products
    scene: Option<PageScene>,
    signature_textures: HashMap<ImageId, egui::TextureHandle>,
    thumbnails: HashMap<PageNumber, egui::TextureHandle>,

    error_dialog: Option<ErrorDialogState>,
}

impl PdfSignerApp {
    fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        Self {
            engine: build_engine(),
            loader: DocumentLoader::new(),
            viewer: None,
            store: AnnotationStore::new(),
            controller: PlacementController::new(),
            current_tool: Tool::Select,
            text_draft: String::new(),
            signature_pad: SignaturePad::new(),
            scene: None,
            signature_textures: HashMap::new(),
            thumbnails: HashMap::new(),
            error_dialog: None,
        }
    }

    fn show_error(&mut self, message: impl Into<String>) {
        self.error_dialog = Some(ErrorDialogState { message: message.into() });
    }

    /// Open a PDF file using the file picker
    fn open_file(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("PDF", &["pdf"])
            .pick_file()
        {
            self.load_pdf(path);
        }
    }

    fn load_pdf(&mut self, path: PathBuf) {
        match self.loader.open(self.engine.as_mut(), &path) {
            Ok(Some(loaded)) => {
                self.viewer = Some(ViewerState::new(loaded.page_count));
                self.scene = None;
                self.thumbnails.clear();
                self.queue_render(1);
            }
            // Not a PDF: the selection is dropped without feedback.
            Ok(None) => {}
            Err(err) => {
                self.show_error(format!("Failed to open PDF: {err}"));
            }
        }
    }

    fn queue_render(&mut self, page: PageNumber) {
        if let Some(viewer) = self.viewer.as_mut() {
            viewer.request_render(page);
        }
    }

    /// Rebuild only the overlay command list over the existing base raster.
    fn recomposite(&mut self) {
        let Some(scene) = self.scene.as_mut() else { return };
        let mut recorder = OverlayRecorder::default();
        composite_overlays(&self.store, scene.page, &mut recorder);
        scene.overlays = recorder.cmds;
    }

    /// Drive the render gate: rasterize the in-flight page, composite its
    /// overlays into a fresh scene, and complete — which promotes a coalesced
    /// pending page for the next pass of the loop.
    fn service_renders(&mut self, ctx: &egui::Context) {
        let Some(loaded) = self.loader.current() else { return };
        let pixels_per_point = ctx.pixels_per_point();
        let mut rendered = false;

        loop {
            let Some((page, scale)) = self
                .viewer
                .as_ref()
                .and_then(|v| v.render_in_flight().map(|page| (page, v.scale())))
            else {
                break;
            };

            let request = RenderRequest {
                page_index: u32::from(page) - 1,
                scale: scale * pixels_per_point,
            };

            match self.engine.render_page(loaded.handle, request) {
                Ok(bitmap) => {
                    let size = egui::vec2(bitmap.width() as f32, bitmap.height() as f32)
                        / pixels_per_point;
                    let color_image = egui::ColorImage::from_rgba_unmultiplied(
                        [bitmap.width() as usize, bitmap.height() as usize],
                        bitmap.as_raw(),
                    );
                    let texture = ctx.load_texture(
                        format!("page_{page}"),
                        color_image,
                        egui::TextureOptions::LINEAR,
                    );

                    let mut recorder = OverlayRecorder::default();
                    composite_overlays(&self.store, page, &mut recorder);

                    self.scene =
                        Some(PageScene { page, texture, size, overlays: recorder.cmds });
                    rendered = true;
                }
                Err(err) => {
                    log::error!("failed to render page {page}: {err}");
                    self.show_error(format!("Failed to render page {page}: {err}"));
                    self.scene = None;
                }
            }

            if let Some(viewer) = self.viewer.as_mut() {
                viewer.complete_render();
            }
        }

        if rendered {
            ctx.request_repaint();
        }
    }

    fn go_to_page(&mut self, page: PageNumber) {
        if let Some(target) = self.viewer.as_mut().and_then(|v| v.go_to_page(page)) {
            self.queue_render(target);
        }
    }

    fn set_tool(&mut self, tool: Tool) {
        if self.current_tool == tool {
            return;
        }
        if tool != Tool::Text {
            self.controller.disarm_text();
        }
        if tool != Tool::Signature {
            self.signature_pad.clear();
        }
        self.current_tool = tool;
    }

    /// Rasterize the pad's ink and drop it on the current page.
    fn save_signature(&mut self) {
        let Some(image) = self.signature_pad.save() else { return };
        self.place_signature(image);
    }

    /// Pick a PNG/JPEG and place it as a signature.
    fn import_signature(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Image", &["png", "jpg", "jpeg"])
            .pick_file()
        else {
            return;
        };

        match image::open(&path) {
            Ok(decoded) => {
                let rgba = decoded.to_rgba8();
                let (width, height) = rgba.dimensions();
                self.place_signature(SignatureImage::new(width, height, rgba.into_raw()));
            }
            Err(err) => self.show_error(format!("Failed to load image: {err}")),
        }
    }

    fn place_signature(&mut self, image: SignatureImage) {
        let Some(viewer) = self.viewer.as_ref() else { return };
        let page = viewer.current_page();

        // New signatures land centered on the current surface.
        let position = match self.scene.as_ref() {
            Some(scene) => SurfacePoint::new(
                (scene.size.x - image.width() as f32) / 2.0,
                (scene.size.y - image.height() as f32) / 2.0,
            ),
            None => SurfacePoint::new(0.0, 0.0),
        };

        log::info!("placed signature {} on page {page}", image.id());
        self.store.push(Annotation::signature(page, position, image));
        self.set_tool(Tool::Select);
        self.queue_render(page);
    }

    fn handle_keyboard(&mut self, ctx: &egui::Context) {
        let (prev, next, escape) = ctx.input(|i| {
            (
                i.key_pressed(egui::Key::ArrowLeft),
                i.key_pressed(egui::Key::ArrowRight),
                i.key_pressed(egui::Key::Escape),
            )
        });

        if escape {
            if self.error_dialog.is_some() {
                self.error_dialog = None;
            } else {
                self.set_tool(Tool::Select);
            }
        }

        // Leave the arrows alone while a text field has focus.
        if ctx.memory(|m| m.focused().is_some()) {
            return;
        }

        if next {
            if let Some(page) = self.viewer.as_mut().and_then(|v| v.next_page()) {
                self.queue_render(page);
            }
        }
        if prev {
            if let Some(page) = self.viewer.as_mut().and_then(|v| v.prev_page()) {
                self.queue_render(page);
            }
        }
    }
}

impl eframe::App for PdfSignerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_keyboard(ctx);
        self.draw_toolbar(ctx);
        self.draw_sidebar(ctx);
        self.draw_viewport(ctx);
        self.draw_signature_pad(ctx);
        self.draw_error_dialog(ctx);
        self.service_renders(ctx);
    }
}

impl PdfSignerApp {
    fn draw_toolbar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.add_space(8.0);

                if ui.button("📂 Open").clicked() {
                    self.open_file();
                }

                ui.separator();

                ui.add_enabled_ui(self.viewer.is_some(), |ui| {
                    if ui.button("◀").clicked() {
                        if let Some(page) = self.viewer.as_mut().and_then(|v| v.prev_page()) {
                            self.queue_render(page);
                        }
                    }

                    let page_text = match &self.viewer {
                        Some(viewer) => {
                            format!("{} / {}", viewer.current_page(), viewer.page_count())
                        }
                        None => "— / —".to_owned(),
                    };
                    ui.label(page_text);

                    if ui.button("▶").clicked() {
                        if let Some(page) = self.viewer.as_mut().and_then(|v| v.next_page()) {
                            self.queue_render(page);
                        }
                    }

                    ui.separator();

                    if ui.button("−").clicked() {
                        let target = self.viewer.as_mut().and_then(|v| {
                            v.zoom_out().then(|| v.current_page())
                        });
                        if let Some(page) = target {
                            self.queue_render(page);
                        }
                    }

                    let zoom_text = self
                        .viewer
                        .as_ref()
                        .map(|v| format!("{:.0}%", v.scale() * 100.0))
                        .unwrap_or_else(|| "100%".to_owned());
                    ui.label(zoom_text);

                    if ui.button("+").clicked() {
                        let target = self.viewer.as_mut().map(|v| {
                            v.zoom_in();
                            v.current_page()
                        });
                        if let Some(page) = target {
                            self.queue_render(page);
                        }
                    }

                    ui.separator();

                    self.tool_button(ui, Tool::Signature, "✍ Sign");
                    self.tool_button(ui, Tool::Text, "Text");

                    if self.current_tool == Tool::Text {
                        ui.add(
                            egui::TextEdit::singleline(&mut self.text_draft)
                                .hint_text("Text to place…")
                                .desired_width(160.0),
                        );

                        if self.controller.armed_text().is_some() {
                            ui.weak("click the page to place");
                        } else if ui
                            .add_enabled(!self.text_draft.is_empty(), egui::Button::new("Place"))
                            .clicked()
                        {
                            self.controller.arm_text(self.text_draft.clone());
                        }
                    }

                    ui.separator();

                    if ui.button("Import signature…").clicked() {
                        self.import_signature();
                    }
                });
            });
        });
    }

    fn tool_button(&mut self, ui: &mut egui::Ui, tool: Tool, label: &str) {
        let selected = self.current_tool == tool;
        if ui.selectable_label(selected, label).clicked() {
            // Clicking the active tool toggles it off.
            self.set_tool(if selected { Tool::Select } else { tool });
        }
    }

    fn draw_sidebar(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("thumbnails")
            .default_width(130.0)
            .resizable(true)
            .show(ctx, |ui| {
                ui.heading("Pages");
                ui.separator();

                let Some(loaded) = self.loader.current() else {
                    ui.weak("No document loaded");
                    return;
                };

                egui::ScrollArea::vertical().show(ui, |ui| {
                    for page in 1..=loaded.page_count {
                        self.ensure_thumbnail(ctx, loaded.handle, page);

                        let is_current = self
                            .viewer
                            .as_ref()
                            .is_some_and(|v| v.current_page() == page);

                        let stroke = if is_current {
                            egui::Stroke::new(2.0, ui.visuals().selection.bg_fill)
                        } else {
                            egui::Stroke::new(
                                1.0,
                                ui.visuals().widgets.inactive.bg_stroke.color,
                            )
                        };

                        let frame = egui::Frame::NONE
                            .stroke(stroke)
                            .inner_margin(2.0)
                            .corner_radius(4.0);

                        let response = frame.show(ui, |ui| {
                            ui.vertical_centered(|ui| {
                                if let Some(thumb) = self.thumbnails.get(&page) {
                                    ui.image(thumb);
                                } else {
                                    let (rect, _) = ui.allocate_exact_size(
                                        egui::vec2(100.0, 140.0),
                                        egui::Sense::hover(),
                                    );
                                    ui.painter().rect_filled(
                                        rect,
                                        4.0,
                                        ui.visuals().widgets.inactive.bg_fill,
                                    );
                                }
                                ui.small(format!("{page}"));
                            });
                        });

                        if response.response.interact(egui::Sense::click()).clicked() {
                            self.go_to_page(page);
                        }

                        ui.add_space(4.0);
                    }
                });
            });
    }

    fn ensure_thumbnail(
        &mut self,
        ctx: &egui::Context,
        handle: pdf_signer_render::DocumentHandle,
        page: PageNumber,
    ) {
        if self.thumbnails.contains_key(&page) {
            return;
        }

        let target = ThumbnailSize { width_px: 100, height_px: 140 };
        match self.engine.render_thumbnail(handle, u32::from(page) - 1, target) {
            Ok(bitmap) => {
                let color_image = egui::ColorImage::from_rgba_unmultiplied(
                    [bitmap.width() as usize, bitmap.height() as usize],
                    bitmap.as_raw(),
                );
                let texture = ctx.load_texture(
                    format!("thumb_{page}"),
                    color_image,
                    egui::TextureOptions::LINEAR,
                );
                self.thumbnails.insert(page, texture);
            }
            Err(err) => {
                log::warn!("failed to render thumbnail for page {page}: {err}");
            }
        }
    }

    fn draw_viewport(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            if self.loader.current().is_none() {
                ui.centered_and_justified(|ui| {
                    ui.heading("Open a PDF to get started");
                });
                return;
            }

            let Some((page, texture_id, size)) =
                self.scene.as_ref().map(|s| (s.page, s.texture.id(), s.size))
            else {
                return;
            };

            let resolved = self.resolve_overlays(ctx);

            egui::ScrollArea::both().auto_shrink([false, false]).show(ui, |ui| {
                // Center the page in the viewport.
                let available = ui.available_size();
                let padding_x = ((available.x - size.x) / 2.0).max(0.0);
                let padding_y = ((available.y - size.y) / 2.0).max(0.0);

                ui.add_space(padding_y);
                ui.horizontal(|ui| {
                    ui.add_space(padding_x);
                    let (rect, response) =
                        ui.allocate_exact_size(size, egui::Sense::click_and_drag());

                    // Base raster first, overlays strictly on top of it.
                    let uv = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
                    let painter = ui.painter_at(rect);
                    painter.image(texture_id, rect, uv, egui::Color32::WHITE);

                    for cmd in &resolved {
                        match cmd {
                            ResolvedOverlay::Image { texture, position, size } => {
                                let origin = rect.min + egui::vec2(position.x, position.y);
                                painter.image(
                                    *texture,
                                    egui::Rect::from_min_size(origin, *size),
                                    uv,
                                    egui::Color32::WHITE,
                                );
                            }
                            ResolvedOverlay::Text { text, position, size_px, color } => {
                                painter.text(
                                    rect.min + egui::vec2(position.x, position.y),
                                    egui::Align2::LEFT_BOTTOM,
                                    text,
                                    egui::FontId::proportional(*size_px),
                                    *color,
                                );
                            }
                        }
                    }

                    self.handle_pointer(&response, rect, page);
                });
            });
        });
    }

    /// Turn recorded overlay commands into painter-ready data, uploading
    /// signature textures on first use.
    fn resolve_overlays(&mut self, ctx: &egui::Context) -> Vec<ResolvedOverlay> {
        let Some(scene) = self.scene.as_ref() else {
            return Vec::new();
        };

        let mut resolved = Vec::with_capacity(scene.overlays.len());
        for cmd in &scene.overlays {
            match cmd {
                OverlayCmd::Image { image, position } => {
                    let texture = self
                        .signature_textures
                        .entry(image.id())
                        .or_insert_with(|| {
                            let color_image = egui::ColorImage::from_rgba_unmultiplied(
                                [image.width() as usize, image.height() as usize],
                                image.rgba(),
                            );
                            ctx.load_texture(
                                format!("signature_{}", image.id()),
                                color_image,
                                egui::TextureOptions::LINEAR,
                            )
                        })
                        .id();

                    resolved.push(ResolvedOverlay::Image {
                        texture,
                        position: *position,
                        size: egui::vec2(image.width() as f32, image.height() as f32),
                    });
                }
                OverlayCmd::Text { text, position, style } => {
                    resolved.push(ResolvedOverlay::Text {
                        text: text.clone(),
                        position: *position,
                        size_px: style.size_px,
                        color: egui::Color32::from_rgba_unmultiplied(
                            style.color.r,
                            style.color.g,
                            style.color.b,
                            style.color.a,
                        ),
                    });
                }
            }
        }
        resolved
    }

    fn handle_pointer(&mut self, response: &egui::Response, rect: egui::Rect, page: PageNumber) {
        let to_surface =
            |pos: egui::Pos2| SurfacePoint::new(pos.x - rect.min.x, pos.y - rect.min.y);

        // Armed text wins the next click, then the handler is gone.
        if response.clicked() {
            if let Some(pos) = response.interact_pointer_pos() {
                if self.controller.armed_text().is_some()
                    && self
                        .controller
                        .place_text(&mut self.store, page, to_surface(pos))
                        .is_some()
                {
                    self.text_draft.clear();
                    self.set_tool(Tool::Select);
                    self.queue_render(page);
                }
            }
        }

        if response.drag_started() {
            if let Some(pos) = response.interact_pointer_pos() {
                self.controller.pointer_down(&self.store, page, to_surface(pos));
            }
        } else if response.dragged() {
            if let Some(pos) = response.interact_pointer_pos() {
                match self.controller.pointer_move(&mut self.store, to_surface(pos)) {
                    Some(PlacementEffect::Recomposite) => self.recomposite(),
                    Some(PlacementEffect::Rerender) => self.queue_render(page),
                    None => {}
                }
            }
        }

        if response.drag_stopped()
            && self.controller.pointer_up() == Some(PlacementEffect::Rerender)
        {
            self.queue_render(page);
        }
    }

    fn draw_signature_pad(&mut self, ctx: &egui::Context) {
        if self.current_tool != Tool::Signature {
            return;
        }

        let mut save = false;
        let mut clear = false;

        egui::Window::new("Signature")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::RIGHT_BOTTOM, [-16.0, -16.0])
            .show(ctx, |ui| {
                self.signature_pad.ui(ui);
                ui.add_space(8.0);
                ui.horizontal(|ui| {
                    if ui.button("Clear").clicked() {
                        clear = true;
                    }

                    let can_save = !self.signature_pad.is_empty() && self.viewer.is_some();
                    if ui.add_enabled(can_save, egui::Button::new("Save")).clicked() {
                        save = true;
                    }
                });
            });

        if clear {
            self.signature_pad.clear();
        }
        if save {
            self.save_signature();
        }
    }

    fn draw_error_dialog(&mut self, ctx: &egui::Context) {
        let Some(error) = &self.error_dialog else {
            return;
        };

        let message = error.message.clone();
        let mut should_close = false;

        egui::Window::new("Error")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(&message);
                ui.add_space(12.0);
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Min), |ui| {
                    if ui.button("OK").clicked() {
                        should_close = true;
                    }
                });
            });

        if should_close {
            self.error_dialog = None;
        }
    }
}
