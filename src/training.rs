//! Post-export step: train a component on the exported dataset and score the
//! bad images with it.

use std::path::{Path, PathBuf};

use defect_model::{DefectModel, Score};

use crate::config::TrainingConfig;
use crate::error::{AnnotatorError, Result};
use crate::export::DatasetExporter;

/// What the training step produced.
#[derive(Debug)]
pub struct TrainingOutcome {
    pub component_path: PathBuf,
    /// One score per re-read bad image, in file order
    pub scores: Vec<Score>,
    pub result_files: Vec<PathBuf>,
}

/// Re-read the export, train, save the component to
/// `<folder>/<component_file>` and optionally score every bad image.
///
/// Returns `Ok(None)` when there are no good images to learn from.
pub fn train_and_score(
    model: &dyn DefectModel,
    config: &TrainingConfig,
    folder: &Path,
    exporter: &DatasetExporter,
) -> Result<Option<TrainingOutcome>> {
    let set = exporter.reingest()?;
    if set.good.is_empty() {
        log::warn!("No good images exported; skipping training");
        return Ok(None);
    }

    log::info!(
        "🧠 Training '{}' with the {} model on {} good and {} bad images",
        config.component_name,
        model.id(),
        set.good.len(),
        set.bad.len()
    );
    let component = model.train(&config.component_name, &set)?;

    let component_path = folder.join(&config.component_file);
    component.save(&component_path)?;
    log::info!("💾 Saved component to {:?}", component_path);

    let mut outcome = TrainingOutcome {
        component_path,
        scores: Vec::new(),
        result_files: Vec::new(),
    };
    if !config.score_bad_images {
        return Ok(Some(outcome));
    }

    for (idx, image) in set.bad.iter().enumerate() {
        let score = component.score(image)?;
        log::info!("Deviation score: {}", score.deviation_score);
        log::info!("JSON result: {}", score.json_report);

        let path = exporter.layout().root.join(format!("result_{}.json", idx));
        std::fs::write(&path, &score.json_report)
            .map_err(|e| AnnotatorError::io_failure(&path, e))?;
        outcome.result_files.push(path);
        outcome.scores.push(score);
    }

    Ok(Some(outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{AnnotationStore, Point};
    use defect_model::TemplateModel;
    use image::{Rgb, RgbImage};

    fn dataset(dir: &Path) -> DatasetExporter {
        for (name, value) in [("a.png", 100), ("b.png", 104), ("c.png", 220)] {
            RgbImage::from_pixel(32, 32, Rgb([value, value, value]))
                .save(dir.join(name))
                .unwrap();
        }
        let mut store = AnnotationStore::from_directory(dir).unwrap();
        store.mark_good();
        store.advance(1);
        store.mark_good();
        store.advance(1);
        store.mark_bad();
        for (x, y) in [(0.0, 0.0), (16.0, 0.0), (16.0, 16.0)] {
            store.add_point(Point::new(x, y));
        }
        store.finish_current().unwrap();

        let exporter = DatasetExporter::new(dir.join("out"));
        exporter.export(&store).unwrap();
        exporter
    }

    #[test]
    fn test_train_saves_component_and_scores_bad_images() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = dataset(dir.path());
        let config = TrainingConfig::default();

        let outcome = train_and_score(&TemplateModel::default(), &config, dir.path(), &exporter)
            .unwrap()
            .unwrap();

        assert_eq!(outcome.component_path, dir.path().join("component_1.json"));
        assert!(outcome.component_path.is_file());
        assert_eq!(outcome.scores.len(), 1);
        assert!(outcome.scores[0].deviation_score > 10.0);

        let written = std::fs::read_to_string(&outcome.result_files[0]).unwrap();
        assert_eq!(written, outcome.scores[0].json_report);
        assert!(outcome.result_files[0].ends_with("result_0.json"));
    }

    #[test]
    fn test_scoring_can_be_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = dataset(dir.path());
        let config = TrainingConfig {
            score_bad_images: false,
            ..TrainingConfig::default()
        };

        let outcome = train_and_score(&TemplateModel::default(), &config, dir.path(), &exporter)
            .unwrap()
            .unwrap();
        assert!(outcome.scores.is_empty());
        assert!(outcome.component_path.is_file());
    }

    #[test]
    fn test_no_good_images_skips_training() {
        let dir = tempfile::tempdir().unwrap();
        RgbImage::new(8, 8).save(dir.path().join("a.png")).unwrap();
        let mut store = AnnotationStore::from_directory(dir.path()).unwrap();
        store.mark_bad();
        let exporter = DatasetExporter::new(dir.path().join("out"));
        exporter.export(&store).unwrap();

        let outcome = train_and_score(
            &TemplateModel::default(),
            &TrainingConfig::default(),
            dir.path(),
            &exporter,
        )
        .unwrap();
        assert!(outcome.is_none());
        assert!(!dir.path().join("component_1.json").exists());
    }
}
