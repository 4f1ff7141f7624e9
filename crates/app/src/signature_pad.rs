//! Signature pad
//!
//! A small drawing surface the user scribbles a signature onto. Strokes are
//! raw pointer polylines; saving rasterizes them into an RGBA image by
//! stamping a round pen along every segment, cropped to the ink's bounding
//! box. No smoothing is applied.

use eframe::egui;
use pdf_signer_core::SignatureImage;

/// Pen radius in pixels, for both the preview and the rasterized image
const PEN_RADIUS: i32 = 2;

/// Pad canvas size in UI points
pub const PAD_SIZE: egui::Vec2 = egui::vec2(360.0, 180.0);

/// Background matches the pad widget: near-opaque white, so the placed
/// signature reads as a small card on top of the page.
const BACKGROUND: [u8; 4] = [255, 255, 255, 230];
const INK: [u8; 4] = [0, 0, 0, 255];

#[derive(Default)]
pub struct SignaturePad {
    strokes: Vec<Vec<egui::Pos2>>,
}

impl SignaturePad {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.iter().all(|stroke| stroke.is_empty())
    }

    pub fn clear(&mut self) {
        self.strokes.clear();
    }

    /// Draw the pad canvas and collect pointer strokes.
    pub fn ui(&mut self, ui: &mut egui::Ui) {
        let (rect, response) = ui.allocate_exact_size(PAD_SIZE, egui::Sense::drag());
        let painter = ui.painter_at(rect);

        painter.rect_filled(
            rect,
            4.0,
            egui::Color32::from_rgba_unmultiplied(
                BACKGROUND[0],
                BACKGROUND[1],
                BACKGROUND[2],
                BACKGROUND[3],
            ),
        );

        if response.drag_started() {
            self.strokes.push(Vec::new());
        }
        if response.dragged() {
            if let Some(pos) = response.interact_pointer_pos() {
                let local = (pos - rect.min).to_pos2();
                if let Some(stroke) = self.strokes.last_mut() {
                    stroke.push(local);
                }
            }
        }

        let stroke_style = egui::Stroke::new((PEN_RADIUS * 2) as f32, egui::Color32::BLACK);
        for stroke in &self.strokes {
            if stroke.len() == 1 {
                painter.circle_filled(rect.min + stroke[0].to_vec2(), PEN_RADIUS as f32, egui::Color32::BLACK);
            }
            for pair in stroke.windows(2) {
                painter.line_segment([rect.min + pair[0].to_vec2(), rect.min + pair[1].to_vec2()], stroke_style);
            }
        }
    }

    /// Rasterize the current ink and reset the pad.
    ///
    /// An empty pad saves nothing.
    pub fn save(&mut self) -> Option<SignatureImage> {
        if self.is_empty() {
            return None;
        }

        let image = rasterize(&self.strokes);
        self.strokes.clear();
        Some(image)
    }
}

fn ink_bounds(strokes: &[Vec<egui::Pos2>]) -> egui::Rect {
    let mut bounds = egui::Rect::NOTHING;
    for stroke in strokes {
        for point in stroke {
            bounds.extend_with(*point);
        }
    }
    bounds
}

fn rasterize(strokes: &[Vec<egui::Pos2>]) -> SignatureImage {
    let bounds = ink_bounds(strokes);
    let margin = PEN_RADIUS as f32 + 1.0;

    let width = (bounds.width() + margin * 2.0).ceil().max(1.0) as u32;
    let height = (bounds.height() + margin * 2.0).ceil().max(1.0) as u32;

    let mut data = Vec::with_capacity((width * height * 4) as usize);
    for _ in 0..width * height {
        data.extend_from_slice(&BACKGROUND);
    }

    let origin = bounds.min - egui::vec2(margin, margin);
    for stroke in strokes {
        if let Some(first) = stroke.first() {
            stamp(&mut data, width, height, *first - origin);
        }
        for pair in stroke.windows(2) {
            let from = pair[0] - origin;
            let to = pair[1] - origin;
            let length = (to - from).length();
            let steps = length.ceil().max(1.0) as u32;
            for step in 0..=steps {
                let t = step as f32 / steps as f32;
                stamp(&mut data, width, height, from + (to - from) * t);
            }
        }
    }

    SignatureImage::new(width, height, data)
}

/// Stamp a filled pen disc into the RGBA buffer, clipped at the edges.
fn stamp(data: &mut [u8], width: u32, height: u32, center: egui::Vec2) {
    let cx = center.x.round() as i32;
    let cy = center.y.round() as i32;

    for dy in -PEN_RADIUS..=PEN_RADIUS {
        for dx in -PEN_RADIUS..=PEN_RADIUS {
            if dx * dx + dy * dy > PEN_RADIUS * PEN_RADIUS {
                continue;
            }
            let px = cx + dx;
            let py = cy + dy;
            if px < 0 || py < 0 || px >= width as i32 || py >= height as i32 {
                continue;
            }
            let index = ((py as u32 * width + px as u32) * 4) as usize;
            data[index..index + 4].copy_from_slice(&INK);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_pad_saves_nothing() {
        let mut pad = SignaturePad::new();
        assert!(pad.save().is_none());
    }

    #[test]
    fn saved_image_is_well_formed_and_cropped_to_the_ink() {
        let mut pad = SignaturePad::new();
        pad.strokes.push(vec![egui::pos2(50.0, 40.0), egui::pos2(90.0, 60.0)]);

        let image = pad.save().expect("ink should produce an image");
        assert!(image.is_well_formed());

        // 40x20 of ink plus the pen margin on each side.
        let margin = (PEN_RADIUS + 1) as u32;
        assert_eq!(image.width(), 40 + margin * 2);
        assert_eq!(image.height(), 20 + margin * 2);

        // Saving resets the pad.
        assert!(pad.is_empty());
        assert!(pad.save().is_none());
    }

    #[test]
    fn stroke_endpoints_carry_ink() {
        let mut pad = SignaturePad::new();
        pad.strokes.push(vec![egui::pos2(10.0, 10.0), egui::pos2(20.0, 10.0)]);
        let image = pad.save().expect("ink should produce an image");

        let margin = PEN_RADIUS as f32 + 1.0;
        let probe = |x: u32, y: u32| {
            let index = ((y * image.width() + x) * 4) as usize;
            image.rgba()[index]
        };

        // Both endpoints map to (point - origin); ink is black (r == 0),
        // background is white (r == 255).
        assert_eq!(probe(margin as u32, margin as u32), 0);
        assert_eq!(probe(margin as u32 + 10, margin as u32), 0);
        assert_eq!(probe(0, image.height() - 1), 255);
    }
}
