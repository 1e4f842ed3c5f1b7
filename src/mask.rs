//! Rasterization of a defect polygon into a binary mask.
//!
//! Masks have the resolution of the source image. Vertices are rounded to
//! whole pixels and the polygon is filled together with its outline, so an
//! axis-aligned rectangle from `(x0, y0)` to `(x1, y1)` covers the pixels in
//! `[x0, x1] × [y0, y1]`.

use image::{GrayImage, Luma};
use imageproc::drawing::{draw_line_segment_mut, draw_polygon_mut};
use imageproc::point::Point as PixelPoint;
use serde::{Deserialize, Serialize};

use crate::annotation::Point;
use crate::constants::{MASK_BLACK, MASK_WHITE};

/// What to produce for a bad image without any recorded vertices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyPolygonPolicy {
    /// Mark the whole image as defective.
    #[default]
    FillAll,
    /// Produce an all-black mask.
    FillNone,
}

/// Converts bad-image polygons into masks.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaskRasterizer {
    pub empty_policy: EmptyPolygonPolicy,
}

impl MaskRasterizer {
    pub fn new(empty_policy: EmptyPolygonPolicy) -> Self {
        Self { empty_policy }
    }

    /// Rasterize `polygon` onto a `width × height` mask.
    ///
    /// The polygon is closed automatically. No antialiasing: every pixel is
    /// either [`MASK_WHITE`] or [`MASK_BLACK`]. A polygon with fewer than
    /// three distinct pixel vertices is drawn as a point or a line.
    pub fn rasterize(&self, width: u32, height: u32, polygon: &[Point]) -> GrayImage {
        if polygon.is_empty() {
            let fill = match self.empty_policy {
                EmptyPolygonPolicy::FillAll => MASK_WHITE,
                EmptyPolygonPolicy::FillNone => MASK_BLACK,
            };
            return GrayImage::from_pixel(width, height, Luma([fill]));
        }

        let mut mask = GrayImage::from_pixel(width, height, Luma([MASK_BLACK]));
        let white = Luma([MASK_WHITE]);
        let ring = open_ring(polygon);

        match ring.as_slice() {
            [] => {}
            [a] => draw_line_segment_mut(&mut mask, to_f32(*a), to_f32(*a), white),
            [a, b] => draw_line_segment_mut(&mut mask, to_f32(*a), to_f32(*b), white),
            _ => draw_polygon_mut(&mut mask, &ring, white),
        }

        mask
    }
}

/// Rasterize with the default empty-polygon policy (fill everything).
pub fn rasterize(width: u32, height: u32, polygon: &[Point]) -> GrayImage {
    MaskRasterizer::default().rasterize(width, height, polygon)
}

/// Vertices rounded to pixels, without repeats and without a closing copy
/// of the first vertex.
fn open_ring(polygon: &[Point]) -> Vec<PixelPoint<i32>> {
    let mut ring: Vec<PixelPoint<i32>> = polygon
        .iter()
        .map(|p| PixelPoint::new(p.x.round() as i32, p.y.round() as i32))
        .collect();
    ring.dedup();
    while ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    ring
}

fn to_f32(p: PixelPoint<i32>) -> (f32, f32) {
    (p.x as f32, p.y as f32)
}
