//! Mapping between original-image pixel space and the fixed-size canvas.
//!
//! Offsets are never stored: [`ViewTransform::layout`] derives them from the
//! current scale on every call, so repeated zooming cannot accumulate drift.

use crate::annotation::Point;
use crate::constants::{canvas, zoom};

/// Fixed display surface dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl CanvasSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for CanvasSize {
    fn default() -> Self {
        Self::new(canvas::WIDTH, canvas::HEIGHT)
    }
}

/// Zoom step and clamp range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomLimits {
    /// Multiplier per wheel tick
    pub factor: f32,
    pub min_scale: f32,
    pub max_scale: f32,
}

impl ZoomLimits {
    /// Clamp a scale into the allowed range.
    pub fn clamp(&self, scale: f32) -> f32 {
        scale.clamp(self.min_scale, self.max_scale)
    }
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self {
            factor: zoom::FACTOR,
            min_scale: zoom::MIN_SCALE,
            max_scale: zoom::MAX_SCALE,
        }
    }
}

/// How the scaled image relates to the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutMode {
    /// Image fits entirely and is centered; offsets are non-negative.
    Centered,
    /// Image overflows at least one axis and is center-cropped.
    Cropped,
}

/// Placement of the scaled image on the canvas for one redraw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub offset_x: i32,
    pub offset_y: i32,
    pub scaled_width: u32,
    pub scaled_height: u32,
    pub mode: LayoutMode,
}

impl Layout {
    /// Compute the layout of an `image_width × image_height` image at `scale`.
    ///
    /// Each axis uses `(canvas - scaled) / 2` with truncating division, which
    /// centers on axes that fit and center-crops on axes that overflow.
    pub fn compute(canvas: CanvasSize, image_width: u32, image_height: u32, scale: f32) -> Self {
        let scaled_width = (image_width as f32 * scale) as u32;
        let scaled_height = (image_height as f32 * scale) as u32;

        let mode = if scaled_width <= canvas.width && scaled_height <= canvas.height {
            LayoutMode::Centered
        } else {
            LayoutMode::Cropped
        };

        Self {
            offset_x: centered_offset(canvas.width, scaled_width),
            offset_y: centered_offset(canvas.height, scaled_height),
            scaled_width,
            scaled_height,
            mode,
        }
    }

    /// Whether a canvas position may receive a polygon point.
    ///
    /// While the image is centered, only clicks on its footprint (edges
    /// inclusive) count. A cropped image covers the relevant area, so any
    /// position is accepted.
    pub fn accepts_click(&self, x: f32, y: f32) -> bool {
        match self.mode {
            LayoutMode::Cropped => true,
            LayoutMode::Centered => {
                let left = self.offset_x as f32;
                let top = self.offset_y as f32;
                x >= left
                    && x <= left + self.scaled_width as f32
                    && y >= top
                    && y <= top + self.scaled_height as f32
            }
        }
    }
}

fn centered_offset(canvas_len: u32, scaled_len: u32) -> i32 {
    let diff = i64::from(canvas_len) - i64::from(scaled_len);
    (diff / 2).clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// View state for the image currently on screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    canvas: CanvasSize,
    image_width: u32,
    image_height: u32,
    scale: f32,
    limits: ZoomLimits,
}

impl ViewTransform {
    /// Fit-to-window scale for an image, clamped into `limits`.
    pub fn fit_scale(
        canvas: CanvasSize,
        image_width: u32,
        image_height: u32,
        limits: ZoomLimits,
    ) -> f32 {
        let sx = canvas.width as f32 / image_width as f32;
        let sy = canvas.height as f32 / image_height as f32;
        limits.clamp(sx.min(sy))
    }

    /// Create a transform fitted to the image.
    ///
    /// Returns `None` for zero-area images; callers reject those as invalid
    /// before any view exists.
    pub fn fit(
        canvas: CanvasSize,
        image_width: u32,
        image_height: u32,
        limits: ZoomLimits,
    ) -> Option<Self> {
        if image_width == 0 || image_height == 0 {
            return None;
        }
        Some(Self {
            canvas,
            image_width,
            image_height,
            scale: Self::fit_scale(canvas, image_width, image_height, limits),
            limits,
        })
    }

    /// Scale after one wheel event.
    ///
    /// A positive delta zooms in by one factor step, a negative delta zooms
    /// out by one step, zero leaves the scale untouched.
    pub fn zoomed_scale(scale: f32, wheel_delta: f32, limits: ZoomLimits) -> f32 {
        let next = if wheel_delta > 0.0 {
            scale * limits.factor
        } else if wheel_delta < 0.0 {
            scale / limits.factor
        } else {
            scale
        };
        limits.clamp(next)
    }

    /// Apply one wheel event and return the new scale.
    pub fn zoom(&mut self, wheel_delta: f32) -> f32 {
        self.scale = Self::zoomed_scale(self.scale, wheel_delta, self.limits);
        self.scale
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn canvas(&self) -> CanvasSize {
        self.canvas
    }

    /// Original image dimensions.
    pub fn image_size(&self) -> (u32, u32) {
        (self.image_width, self.image_height)
    }

    /// Placement for the current scale.
    pub fn layout(&self) -> Layout {
        Layout::compute(self.canvas, self.image_width, self.image_height, self.scale)
    }

    /// Original-space point to canvas pixel position.
    pub fn to_canvas(&self, point: Point) -> Point {
        let layout = self.layout();
        Point::new(
            (point.x * self.scale).round() + layout.offset_x as f32,
            (point.y * self.scale).round() + layout.offset_y as f32,
        )
    }

    /// Canvas position to sub-pixel original-space point.
    pub fn to_original(&self, point: Point) -> Point {
        let layout = self.layout();
        Point::new(
            (point.x - layout.offset_x as f32) / self.scale,
            (point.y - layout.offset_y as f32) / self.scale,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 0.0001;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    fn view(w: u32, h: u32) -> ViewTransform {
        ViewTransform::fit(CanvasSize::default(), w, h, ZoomLimits::default()).unwrap()
    }

    #[test]
    fn test_fit_scale_uses_tighter_axis() {
        let t = view(1600, 600);
        assert!(approx_eq(t.scale(), 0.5));

        let t = view(400, 1200);
        assert!(approx_eq(t.scale(), 0.5));
    }

    #[test]
    fn test_fit_scale_is_clamped() {
        let t = view(10, 10);
        assert!(approx_eq(t.scale(), 10.0));

        let t = view(100_000, 100_000);
        assert!(approx_eq(t.scale(), 0.1));
    }

    #[test]
    fn test_zero_area_image_has_no_view() {
        let limits = ZoomLimits::default();
        assert!(ViewTransform::fit(CanvasSize::default(), 0, 10, limits).is_none());
        assert!(ViewTransform::fit(CanvasSize::default(), 10, 0, limits).is_none());
    }

    #[test]
    fn test_zoom_steps_and_clamps() {
        let limits = ZoomLimits::default();
        assert!(approx_eq(ViewTransform::zoomed_scale(1.0, 1.0, limits), 1.1));
        assert!(approx_eq(ViewTransform::zoomed_scale(1.1, -1.0, limits), 1.0));
        assert!(approx_eq(ViewTransform::zoomed_scale(2.0, 0.0, limits), 2.0));
        assert!(approx_eq(ViewTransform::zoomed_scale(9.5, 1.0, limits), 10.0));
        assert!(approx_eq(ViewTransform::zoomed_scale(0.105, -1.0, limits), 0.1));
    }

    #[test]
    fn test_repeated_zoom_stays_in_range() {
        let mut t = view(800, 600);
        for _ in 0..100 {
            t.zoom(1.0);
        }
        assert!(approx_eq(t.scale(), 10.0));
        for _ in 0..200 {
            t.zoom(-1.0);
        }
        assert!(approx_eq(t.scale(), 0.1));
    }

    #[test]
    fn test_layout_centering() {
        let t = view(400, 600);
        let layout = t.layout();
        assert_eq!(layout.mode, LayoutMode::Centered);
        assert_eq!(layout.scaled_width, 400);
        assert_eq!(layout.scaled_height, 600);
        assert_eq!(layout.offset_x, 200);
        assert_eq!(layout.offset_y, 0);
    }

    #[test]
    fn test_layout_centering_property_over_scales() {
        let canvas = CanvasSize::default();
        for &(w, h) in &[(640, 480), (1024, 768), (33, 77), (800, 600), (1, 1)] {
            let mut scale = 0.1f32;
            while scale <= 10.0 {
                let layout = Layout::compute(canvas, w, h, scale);
                if layout.mode == LayoutMode::Centered {
                    assert!(layout.offset_x >= 0 && layout.offset_y >= 0);
                    assert!(layout.offset_x as u32 + layout.scaled_width <= canvas.width);
                    assert!(layout.offset_y as u32 + layout.scaled_height <= canvas.height);
                } else {
                    assert!(layout.offset_x <= 0 || layout.offset_y <= 0);
                }
                scale *= 1.1;
            }
        }
    }

    #[test]
    fn test_layout_cropping() {
        let mut t = view(800, 600);
        t.zoom(1.0);
        let layout = t.layout();
        assert_eq!(layout.mode, LayoutMode::Cropped);
        assert_eq!(layout.scaled_width, 880);
        assert_eq!(layout.scaled_height, 660);
        assert_eq!(layout.offset_x, -40);
        assert_eq!(layout.offset_y, -30);
    }

    #[test]
    fn test_layout_cropped_on_one_axis_only() {
        // Wide strip zoomed past the canvas width but not its height
        let layout = Layout::compute(CanvasSize::default(), 1000, 100, 1.0);
        assert_eq!(layout.mode, LayoutMode::Cropped);
        assert_eq!(layout.offset_x, -100);
        assert_eq!(layout.offset_y, 250);
    }

    #[test]
    fn test_canvas_round_trip() {
        let canvas = CanvasSize::default();
        let limits = ZoomLimits::default();
        for &scale in &[0.1f32, 0.37, 1.0, 2.5, 7.3, 10.0] {
            let mut t = ViewTransform::fit(canvas, 640, 480, limits).unwrap();
            t.scale = scale;
            for &(x, y) in &[(0.0f32, 0.0f32), (12.3, 45.6), (320.5, 240.25), (639.0, 479.0)] {
                let p = Point::new(x, y);
                let back = t.to_original(t.to_canvas(p));
                // One canvas pixel of rounding maps to 1/scale original units
                assert!((back.x - p.x).abs() * scale <= 0.5 + EPSILON);
                assert!((back.y - p.y).abs() * scale <= 0.5 + EPSILON);
            }
        }
    }

    #[test]
    fn test_to_original_inverts_offset() {
        let t = view(400, 300);
        // scale 2.0, scaled 800x600, no offset
        assert!(approx_eq(t.scale(), 2.0));
        let p = t.to_original(Point::new(100.0, 50.0));
        assert!(approx_eq(p.x, 50.0));
        assert!(approx_eq(p.y, 25.0));
    }

    #[test]
    fn test_click_acceptance() {
        let t = view(400, 600);
        let layout = t.layout();
        assert!(!layout.accepts_click(100.0, 300.0));
        assert!(layout.accepts_click(200.0, 0.0));
        assert!(layout.accepts_click(600.0, 600.0));
        assert!(!layout.accepts_click(600.5, 10.0));

        let mut t = view(800, 600);
        t.zoom(1.0);
        assert!(t.layout().accepts_click(0.0, 0.0));
    }
}
