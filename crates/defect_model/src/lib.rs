//! Defect model service interface.
//!
//! The annotation tool exports a labeled dataset (good images, bad images and
//! one binary mask per bad image) and hands it to a [`DefectModel`]. Training
//! yields a [`Component`] that can be persisted and used to score new images.
//!
//! [`TemplateModel`] is a small statistical baseline so the pipeline runs
//! without an external inference runtime.

mod error;
mod template;

use std::path::Path;

use image::{DynamicImage, GrayImage};

pub use error::ModelError;
pub use template::{TemplateComponent, TemplateModel};

/// Training input as three parallel collections.
///
/// `masks[i]` belongs to `bad[i]`.
#[derive(Debug, Clone, Default)]
pub struct TrainingSet {
    pub good: Vec<DynamicImage>,
    pub bad: Vec<DynamicImage>,
    pub masks: Vec<GrayImage>,
}

impl TrainingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of images and masks.
    pub fn len(&self) -> usize {
        self.good.len() + self.bad.len() + self.masks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Result of scoring one image.
#[derive(Debug, Clone, PartialEq)]
pub struct Score {
    /// How far the image deviates from the learned good appearance.
    pub deviation_score: f32,
    /// Full result as a JSON document.
    pub json_report: String,
}

/// A trained artifact.
pub trait Component {
    /// Name given at training time.
    fn name(&self) -> &str;

    /// Persist the component to a single file.
    fn save(&self, path: &Path) -> Result<(), ModelError>;

    /// Score an image against the learned appearance.
    fn score(&self, image: &DynamicImage) -> Result<Score, ModelError>;
}

/// A trainable defect model.
pub trait DefectModel {
    /// Unique identifier for this model (e.g., "template").
    fn id(&self) -> &'static str;

    /// Train a named component from an exported dataset.
    fn train(&self, name: &str, set: &TrainingSet) -> Result<Box<dyn Component>, ModelError>;
}
