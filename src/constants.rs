//! Global constants for the annotation tool.
//!
//! Most of these are defaults; the user-facing ones can be overridden through
//! [`crate::config::AppConfig`].

/// Fixed display surface.
pub mod canvas {
    /// Canvas width in pixels
    pub const WIDTH: u32 = 800;
    /// Canvas height in pixels
    pub const HEIGHT: u32 = 600;
    /// Fill color outside the image footprint
    pub const BACKGROUND: [u8; 3] = [0, 0, 0];
}

/// Wheel zoom behaviour.
pub mod zoom {
    /// Multiplier applied per positive wheel tick (divisor per negative tick)
    pub const FACTOR: f32 = 1.1;
    /// Lowest allowed scale
    pub const MIN_SCALE: f32 = 0.1;
    /// Highest allowed scale
    pub const MAX_SCALE: f32 = 10.0;
}

/// Overlay drawing on top of the rendered image.
pub mod overlay {
    /// Baseline-ish anchor of the status label (top-left of the text box)
    pub const LABEL_POSITION: (i32, i32) = (10, 8);
    /// Label glyph height in pixels
    pub const LABEL_SCALE: f32 = 28.0;
    /// Label color
    pub const LABEL_COLOR: [u8; 3] = [0, 0, 255];
    /// Size of the colored status swatch drawn next to the text
    pub const SWATCH_SIZE: u32 = 12;
    /// Polygon vertex marker radius
    pub const VERTEX_RADIUS: i32 = 3;
    /// Polygon vertex color
    pub const VERTEX_COLOR: [u8; 3] = [255, 0, 0];
    /// Polygon edge color
    pub const EDGE_COLOR: [u8; 3] = [0, 255, 0];
}

/// Output layout written by the exporter.
pub mod export {
    /// Output root, relative to the input folder
    pub const OUT_DIR: &str = "out";
    /// Good images
    pub const GOOD_DIR: &str = "good";
    /// Bad images
    pub const BAD_DIR: &str = "bad";
    /// Binary masks for bad images
    pub const MASK_DIR: &str = "masks";
    /// Appended to the image stem to form the mask file name
    pub const MASK_SUFFIX: &str = "_mask";
    /// Mask files are always lossless
    pub const MASK_EXTENSION: &str = "png";
}

/// File extensions picked up by the directory scan (lowercase, without dots).
pub const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// A bad polygon needs at least this many vertices before it can be closed.
pub const MIN_FINISH_POINTS: usize = 2;

/// Mask pixel value for the defect region.
pub const MASK_WHITE: u8 = 255;

/// Mask pixel value for the background.
pub const MASK_BLACK: u8 = 0;
