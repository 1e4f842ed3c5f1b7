//! Per-pixel mean/deviation template learned from good images.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage};
use serde::{Deserialize, Serialize};

use crate::{Component, DefectModel, ModelError, Score, TrainingSet};

/// Floor for the per-pixel deviation so flat regions do not explode z-scores.
const MIN_STD_DEV: f32 = 1.0;

/// Mask pixels above this value count as defect.
const MASK_THRESHOLD: u8 = 127;

/// Baseline model: images are reduced to a small grayscale template and
/// compared pixel by pixel against the good-image statistics.
#[derive(Debug, Clone, Copy)]
pub struct TemplateModel {
    /// Side length of the square template
    pub template_size: u32,
    /// z-score above which a pixel counts as an outlier in reports
    pub outlier_z: f32,
}

impl Default for TemplateModel {
    fn default() -> Self {
        Self {
            template_size: 64,
            outlier_z: 3.0,
        }
    }
}

impl DefectModel for TemplateModel {
    fn id(&self) -> &'static str {
        "template"
    }

    fn train(&self, name: &str, set: &TrainingSet) -> Result<Box<dyn Component>, ModelError> {
        Ok(Box::new(TemplateComponent::fit(self, name, set)?))
    }
}

/// Trained template statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateComponent {
    pub name: String,
    pub size: u32,
    pub outlier_z: f32,
    pub good_samples: usize,
    /// Mean z-score inside the annotated defect regions of the bad images
    pub defect_reference: Option<f32>,
    mean: Vec<f32>,
    std_dev: Vec<f32>,
}

#[derive(Serialize)]
struct ScoreReport<'a> {
    component: &'a str,
    deviation_score: f32,
    outlier_fraction: f32,
    template_size: u32,
    defect_reference: Option<f32>,
}

impl TemplateComponent {
    fn fit(model: &TemplateModel, name: &str, set: &TrainingSet) -> Result<Self, ModelError> {
        if set.good.is_empty() {
            return Err(ModelError::EmptyTrainingSet);
        }

        let size = model.template_size.max(1);
        let pixels = template_len(size).ok_or_else(|| {
            ModelError::InvalidComponent(format!("template size {} is too large", size))
        })?;
        let mut sum = vec![0.0f64; pixels];
        let mut sum_sq = vec![0.0f64; pixels];

        for image in &set.good {
            for (i, v) in sample(&image.to_luma8(), size).into_iter().enumerate() {
                let v = f64::from(v);
                sum[i] += v;
                sum_sq[i] += v * v;
            }
        }

        let n = set.good.len() as f64;
        let mean: Vec<f32> = sum.iter().map(|s| (s / n) as f32).collect();
        let std_dev: Vec<f32> = sum
            .iter()
            .zip(&sum_sq)
            .map(|(s, sq)| {
                let m = s / n;
                ((sq / n - m * m).max(0.0).sqrt() as f32).max(MIN_STD_DEV)
            })
            .collect();

        let mut component = Self {
            name: name.to_string(),
            size,
            outlier_z: model.outlier_z,
            good_samples: set.good.len(),
            defect_reference: None,
            mean,
            std_dev,
        };
        component.defect_reference = component.defect_reference(set);

        log::info!(
            "Trained template '{}' from {} good images ({}x{})",
            component.name,
            component.good_samples,
            size,
            size
        );
        Ok(component)
    }

    /// Average z-score inside the masked region of each bad image.
    fn defect_reference(&self, set: &TrainingSet) -> Option<f32> {
        let per_image: Vec<f32> = set
            .bad
            .iter()
            .zip(&set.masks)
            .filter_map(|(image, mask)| {
                let z = self.z_map(image);
                let mask = sample(mask, self.size);
                let inside: Vec<f32> = z
                    .iter()
                    .zip(&mask)
                    .filter(|(_, m)| **m > f32::from(MASK_THRESHOLD))
                    .map(|(z, _)| *z)
                    .collect();
                (!inside.is_empty()).then(|| inside.iter().sum::<f32>() / inside.len() as f32)
            })
            .collect();

        (!per_image.is_empty()).then(|| per_image.iter().sum::<f32>() / per_image.len() as f32)
    }

    fn z_map(&self, image: &DynamicImage) -> Vec<f32> {
        sample(&image.to_luma8(), self.size)
            .into_iter()
            .zip(self.mean.iter().zip(&self.std_dev))
            .map(|(v, (m, s))| (v - m).abs() / s)
            .collect()
    }

    /// Read a component written by [`Component::save`].
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let reader = BufReader::new(File::open(path)?);
        let component: Self = serde_json::from_reader(reader)?;

        let expected = template_len(component.size).ok_or_else(|| {
            ModelError::InvalidComponent(format!("template size {} is too large", component.size))
        })?;
        if component.mean.len() != expected || component.std_dev.len() != expected {
            return Err(ModelError::InvalidComponent(format!(
                "expected {} template values, found {} / {}",
                expected,
                component.mean.len(),
                component.std_dev.len()
            )));
        }
        Ok(component)
    }
}

impl Component for TemplateComponent {
    fn name(&self) -> &str {
        &self.name
    }

    fn save(&self, path: &Path) -> Result<(), ModelError> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        log::debug!("Saved component '{}' to {:?}", self.name, path);
        Ok(())
    }

    fn score(&self, image: &DynamicImage) -> Result<Score, ModelError> {
        let z = self.z_map(image);
        let count = z.len().max(1) as f32;
        let deviation_score = z.iter().sum::<f32>() / count;
        let outlier_fraction = z.iter().filter(|v| **v > self.outlier_z).count() as f32 / count;

        let json_report = serde_json::to_string(&ScoreReport {
            component: &self.name,
            deviation_score,
            outlier_fraction,
            template_size: self.size,
            defect_reference: self.defect_reference,
        })?;

        Ok(Score {
            deviation_score,
            json_report,
        })
    }
}

/// Number of values in a `size × size` template.
fn template_len(size: u32) -> Option<usize> {
    u64::from(size)
        .checked_mul(u64::from(size))
        .and_then(|n| usize::try_from(n).ok())
}

/// Resize to the template grid and flatten to intensities.
fn sample(image: &GrayImage, size: u32) -> Vec<f32> {
    imageops::resize(image, size, size, FilterType::Triangle)
        .pixels()
        .map(|p| f32::from(p[0]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb, RgbImage};

    fn flat(value: u8) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 24, Rgb([value, value, value])))
    }

    fn model() -> TemplateModel {
        TemplateModel {
            template_size: 8,
            outlier_z: 3.0,
        }
    }

    fn training_set() -> TrainingSet {
        TrainingSet {
            good: vec![flat(100), flat(102), flat(98)],
            bad: vec![flat(200)],
            masks: vec![GrayImage::from_pixel(32, 24, Luma([255]))],
        }
    }

    #[test]
    fn test_train_requires_good_images() {
        let set = TrainingSet {
            good: Vec::new(),
            ..training_set()
        };
        assert!(matches!(
            model().train("empty", &set),
            Err(ModelError::EmptyTrainingSet)
        ));
    }

    #[test]
    fn test_good_scores_lower_than_bad() {
        let component = model().train("screw", &training_set()).unwrap();
        let good = component.score(&flat(100)).unwrap();
        let bad = component.score(&flat(200)).unwrap();

        assert_eq!(component.name(), "screw");
        assert!(good.deviation_score < 1.0);
        assert!(bad.deviation_score > 10.0);
    }

    #[test]
    fn test_report_is_json() {
        let component = model().train("screw", &training_set()).unwrap();
        let score = component.score(&flat(200)).unwrap();
        let report: serde_json::Value = serde_json::from_str(&score.json_report).unwrap();

        assert_eq!(report["component"], "screw");
        assert_eq!(report["template_size"], 8);
        assert_eq!(report["outlier_fraction"], 1.0);
        assert!(report["defect_reference"].as_f64().unwrap() > 10.0);
    }

    #[test]
    fn test_defect_reference_needs_mask_pixels() {
        let set = TrainingSet {
            masks: vec![GrayImage::from_pixel(32, 24, Luma([0]))],
            ..training_set()
        };
        let component = TemplateComponent::fit(&model(), "screw", &set).unwrap();
        assert_eq!(component.defect_reference, None);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("component.json");
        let component = TemplateComponent::fit(&model(), "screw", &training_set()).unwrap();
        component.save(&path).unwrap();

        let loaded = TemplateComponent::load(&path).unwrap();
        assert_eq!(loaded, component);
    }

    #[test]
    fn test_load_rejects_huge_template_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("component.json");
        let mut component = TemplateComponent::fit(&model(), "screw", &training_set()).unwrap();
        component.size = 70_000;
        component.save(&path).unwrap();

        assert!(matches!(
            TemplateComponent::load(&path),
            Err(ModelError::InvalidComponent(_))
        ));
    }

    #[test]
    fn test_template_len() {
        assert_eq!(template_len(64), Some(4096));
        assert_eq!(template_len(70_000), Some(4_900_000_000));
    }

    #[test]
    fn test_load_rejects_truncated_template() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("component.json");
        let mut component = TemplateComponent::fit(&model(), "screw", &training_set()).unwrap();
        component.mean.pop();
        component.save(&path).unwrap();

        assert!(matches!(
            TemplateComponent::load(&path),
            Err(ModelError::InvalidComponent(_))
        ));
    }
}
