//! Canvas composition: scaled image, status label and polygon overlay.

use ab_glyph::{FontArc, FontVec};
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_filled_rect_mut, draw_line_segment_mut, draw_text_mut,
};
use imageproc::rect::Rect;

use crate::annotation::{AnnotationRecord, LabelState, Point};
use crate::constants::{canvas, overlay};
use crate::view_transform::ViewTransform;

/// Label font bundled with the binary.
const EMBEDDED_FONT: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

/// Produces one canvas raster per redraw.
///
/// Rendering never mutates annotation or view state.
pub struct Renderer {
    background: Rgb<u8>,
    font: Option<FontArc>,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(canvas::BACKGROUND)
    }
}

impl Renderer {
    /// Renderer using the bundled label font.
    pub fn new(background: [u8; 3]) -> Self {
        let font = match FontArc::try_from_slice(EMBEDDED_FONT) {
            Ok(font) => Some(font),
            Err(e) => {
                log::warn!("Failed to load embedded font, drawing status swatch only: {}", e);
                None
            }
        };
        Self {
            background: Rgb(background),
            font,
        }
    }

    /// Use `font` for the status label text instead of the bundled one.
    pub fn with_font(mut self, font: FontVec) -> Self {
        self.font = Some(FontArc::new(font));
        self
    }

    /// Draw only the colored status swatch, no label text.
    pub fn without_font(mut self) -> Self {
        self.font = None;
        self
    }

    /// Compose `image` at the view's current scale and overlay the record's
    /// label and polygon.
    pub fn render(
        &self,
        image: &RgbImage,
        view: &ViewTransform,
        record: &AnnotationRecord,
    ) -> RgbImage {
        let size = view.canvas();
        let mut frame = RgbImage::from_pixel(size.width, size.height, self.background);

        self.draw_image(&mut frame, image, view);
        self.draw_label(&mut frame, record.state());
        if record.is_bad() && !record.polygon().is_empty() {
            draw_polygon(&mut frame, view, record.polygon(), record.finished());
        }

        frame
    }

    /// Resize only the visible part of the source and paste it at its
    /// canvas position.
    fn draw_image(&self, frame: &mut RgbImage, image: &RgbImage, view: &ViewTransform) {
        let layout = view.layout();
        let scale = view.scale();
        if layout.scaled_width == 0 || layout.scaled_height == 0 {
            return;
        }

        let (Some((x0, x1)), Some((y0, y1))) = (
            visible_source_range(layout.offset_x, frame.width(), image.width(), scale),
            visible_source_range(layout.offset_y, frame.height(), image.height(), scale),
        ) else {
            return;
        };

        let target_w = (((x1 - x0) as f32 * scale) as u32).max(1);
        let target_h = (((y1 - y0) as f32 * scale) as u32).max(1);
        let visible = imageops::crop_imm(image, x0, y0, x1 - x0, y1 - y0).to_image();
        let scaled = imageops::resize(&visible, target_w, target_h, FilterType::Triangle);

        let dest_x = i64::from(layout.offset_x) + (x0 as f32 * scale).round() as i64;
        let dest_y = i64::from(layout.offset_y) + (y0 as f32 * scale).round() as i64;
        imageops::overlay(frame, &scaled, dest_x, dest_y);
    }

    fn draw_label(&self, frame: &mut RgbImage, state: LabelState) {
        let (x, y) = overlay::LABEL_POSITION;
        let swatch = overlay::SWATCH_SIZE;
        let swatch_y = y + (overlay::LABEL_SCALE as i32 - swatch as i32) / 2;
        draw_filled_rect_mut(
            frame,
            Rect::at(x, swatch_y).of_size(swatch, swatch),
            Rgb(status_color(state)),
        );

        if let Some(font) = &self.font {
            draw_text_mut(
                frame,
                Rgb(overlay::LABEL_COLOR),
                x + swatch as i32 + 6,
                y,
                overlay::LABEL_SCALE,
                font,
                state.label(),
            );
        }
    }
}

/// Source pixel range `[start, end)` on one axis that lands on the canvas.
fn visible_source_range(
    offset: i32,
    canvas_len: u32,
    image_len: u32,
    scale: f32,
) -> Option<(u32, u32)> {
    // Visible span in scaled-image coordinates
    let first = (-offset).max(0) as f32;
    let last = (i64::from(canvas_len) - i64::from(offset)) as f32;

    let start = ((first / scale).floor().max(0.0) as u32).min(image_len);
    let end = ((last / scale).ceil().max(0.0) as u32).min(image_len);
    (start < end).then_some((start, end))
}

/// Swatch color shown next to the status label.
fn status_color(state: LabelState) -> [u8; 3] {
    match state {
        LabelState::Unlabeled => [128, 128, 128],
        LabelState::Good => [0, 200, 0],
        LabelState::BadOpen | LabelState::BadClosed => [220, 0, 0],
    }
}

fn draw_polygon(frame: &mut RgbImage, view: &ViewTransform, polygon: &[Point], closed: bool) {
    let edge = Rgb(overlay::EDGE_COLOR);
    let canvas_points: Vec<Point> = polygon.iter().map(|p| view.to_canvas(*p)).collect();

    for pair in canvas_points.windows(2) {
        draw_thick_line(frame, pair[0], pair[1], edge);
    }
    if closed && canvas_points.len() >= 2 {
        let first = canvas_points[0];
        let last = canvas_points[canvas_points.len() - 1];
        draw_thick_line(frame, last, first, edge);
    }

    // Markers on top of the edges
    for p in &canvas_points {
        draw_filled_circle_mut(
            frame,
            (p.x as i32, p.y as i32),
            overlay::VERTEX_RADIUS,
            Rgb(overlay::VERTEX_COLOR),
        );
    }
}

/// Two-pixel line: the segment plus a copy shifted along the minor axis.
fn draw_thick_line(frame: &mut RgbImage, a: Point, b: Point, color: Rgb<u8>) {
    draw_line_segment_mut(frame, (a.x, a.y), (b.x, b.y), color);
    let (dx, dy) = if (b.x - a.x).abs() >= (b.y - a.y).abs() {
        (0.0, 1.0)
    } else {
        (1.0, 0.0)
    };
    draw_line_segment_mut(frame, (a.x + dx, a.y + dy), (b.x + dx, b.y + dy), color);
}
