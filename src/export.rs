//! Dataset export: good/bad image copies plus one mask per bad image.
//!
//! Export is best-effort. A failure on one file is recorded in the
//! [`ExportReport`] and the remaining records are still processed, so a
//! failed run leaves whatever subset completed on disk.
//!
//! ```text
//! <out>/good/<original filename>
//! <out>/bad/<original filename>
//! <out>/masks/<stem>_mask.png
//! ```

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use defect_model::TrainingSet;

use crate::annotation::{AnnotationRecord, AnnotationStore};
use crate::constants::export;
use crate::data::{list_files, load_mask};
use crate::error::{AnnotatorError, Result};
use crate::mask::MaskRasterizer;

/// Output directories rooted at one folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportLayout {
    pub root: PathBuf,
    pub good: PathBuf,
    pub bad: PathBuf,
    pub masks: PathBuf,
}

impl ExportLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            good: root.join(export::GOOD_DIR),
            bad: root.join(export::BAD_DIR),
            masks: root.join(export::MASK_DIR),
            root,
        }
    }

    /// Create all output directories (existing ones are fine).
    pub fn create_dirs(&self) -> Result<()> {
        for dir in [&self.good, &self.bad, &self.masks] {
            std::fs::create_dir_all(dir).map_err(|e| AnnotatorError::io_failure(dir, e))?;
        }
        Ok(())
    }
}

/// A per-file problem that did not stop the export.
#[derive(Debug)]
pub struct ExportWarning {
    /// Source image the problem relates to
    pub source: PathBuf,
    pub error: AnnotatorError,
}

/// Result of an export run.
#[derive(Debug, Default)]
pub struct ExportReport {
    pub good_copied: usize,
    pub bad_copied: usize,
    pub masks_written: usize,
    /// Unlabeled records; they produce no files
    pub skipped_unannotated: usize,
    /// Files created during export.
    pub files_created: Vec<PathBuf>,
    pub warnings: Vec<ExportWarning>,
}

impl ExportReport {
    /// Check if there were any warnings.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    fn warn(&mut self, source: &Path, error: AnnotatorError) {
        log::warn!("⚠️  Export of {:?}: {}", source, error);
        self.warnings.push(ExportWarning {
            source: source.to_path_buf(),
            error,
        });
    }
}

/// Writes the annotated dataset and reads it back for training.
#[derive(Debug, Clone)]
pub struct DatasetExporter {
    layout: ExportLayout,
    rasterizer: MaskRasterizer,
    mask_suffix: String,
}

impl DatasetExporter {
    pub fn new(out_root: impl Into<PathBuf>) -> Self {
        Self {
            layout: ExportLayout::new(out_root),
            rasterizer: MaskRasterizer::default(),
            mask_suffix: export::MASK_SUFFIX.to_string(),
        }
    }

    pub fn with_rasterizer(mut self, rasterizer: MaskRasterizer) -> Self {
        self.rasterizer = rasterizer;
        self
    }

    pub fn with_mask_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.mask_suffix = suffix.into();
        self
    }

    pub fn layout(&self) -> &ExportLayout {
        &self.layout
    }

    /// Mask file name for a source image: `<stem><suffix>.png`.
    pub fn mask_file_name(&self, source: &Path) -> Option<String> {
        let stem = source.file_stem()?.to_string_lossy();
        Some(format!(
            "{}{}.{}",
            stem,
            self.mask_suffix,
            export::MASK_EXTENSION
        ))
    }

    /// Export every annotated record.
    ///
    /// Only failing to create the output directories is an error; per-file
    /// failures end up in the report.
    pub fn export(&self, store: &AnnotationStore) -> Result<ExportReport> {
        self.layout.create_dirs()?;

        let mut report = ExportReport::default();
        let mut masks_seen = HashSet::new();

        for record in store.records() {
            if !record.is_annotated() {
                report.skipped_unannotated += 1;
                continue;
            }
            if record.is_good() {
                if self.copy_into(record, &self.layout.good, &mut report) {
                    report.good_copied += 1;
                }
            } else {
                if self.copy_into(record, &self.layout.bad, &mut report) {
                    report.bad_copied += 1;
                }
                self.write_mask(record, &mut masks_seen, &mut report);
            }
        }

        log::info!(
            "💾 Exported {} good, {} bad, {} masks to {:?} ({} unannotated skipped, {} warnings)",
            report.good_copied,
            report.bad_copied,
            report.masks_written,
            self.layout.root,
            report.skipped_unannotated,
            report.warnings.len()
        );
        Ok(report)
    }

    fn copy_into(&self, record: &AnnotationRecord, dir: &Path, report: &mut ExportReport) -> bool {
        let source = record.file_path();
        let Some(file_name) = source.file_name() else {
            report.warn(
                source,
                AnnotatorError::invalid_image(source, "path has no file name"),
            );
            return false;
        };

        let dest = dir.join(file_name);
        match std::fs::copy(source, &dest) {
            Ok(_) => {
                report.files_created.push(dest);
                true
            }
            Err(e) => {
                report.warn(source, AnnotatorError::io_failure(&dest, e));
                false
            }
        }
    }

    fn write_mask(
        &self,
        record: &AnnotationRecord,
        masks_seen: &mut HashSet<PathBuf>,
        report: &mut ExportReport,
    ) {
        let source = record.file_path();
        let (width, height) = match image::image_dimensions(source) {
            Ok((w, h)) if w > 0 && h > 0 => (w, h),
            Ok(_) => {
                report.warn(source, AnnotatorError::invalid_image(source, "image has zero area"));
                return;
            }
            Err(e) => {
                report.warn(
                    source,
                    AnnotatorError::invalid_image(source, format!("failed to read size: {}", e)),
                );
                return;
            }
        };

        let Some(name) = self.mask_file_name(source) else {
            report.warn(
                source,
                AnnotatorError::invalid_image(source, "path has no file stem"),
            );
            return;
        };
        let dest = self.layout.masks.join(name);
        if !masks_seen.insert(dest.clone()) {
            log::warn!("Mask {:?} written twice; images share a stem", dest);
        }

        let mask = self.rasterizer.rasterize(width, height, record.polygon());
        match mask.save(&dest) {
            Ok(()) => {
                report.masks_written += 1;
                report.files_created.push(dest);
            }
            Err(e) => report.warn(source, AnnotatorError::Image(e)),
        }
    }

    /// Read the exported dataset back from disk.
    ///
    /// Bad images are paired with their masks by file stem; a bad image
    /// without a readable mask is left out so `masks[i]` always belongs to
    /// `bad[i]`. Undecodable files are skipped with a warning.
    pub fn reingest(&self) -> Result<TrainingSet> {
        let mut set = TrainingSet::new();

        for path in list_files(&self.layout.good)? {
            match image::open(&path) {
                Ok(img) => set.good.push(img),
                Err(e) => log::warn!("Skipping {:?}: {}", path, e),
            }
        }

        let mut masks: HashMap<String, PathBuf> = list_files(&self.layout.masks)?
            .into_iter()
            .filter_map(|p| Some((p.file_name()?.to_string_lossy().into_owned(), p)))
            .collect();

        for path in list_files(&self.layout.bad)? {
            let Some(mask_path) = self.mask_file_name(&path).and_then(|n| masks.remove(&n)) else {
                log::warn!("No mask for {:?}; leaving it out of training", path);
                continue;
            };
            let image = match image::open(&path) {
                Ok(img) => img,
                Err(e) => {
                    log::warn!("Skipping {:?}: {}", path, e);
                    continue;
                }
            };
            match load_mask(&mask_path) {
                Ok(mask) => {
                    set.bad.push(image);
                    set.masks.push(mask);
                }
                Err(e) => log::warn!("Skipping {:?}: {}", path, e),
            }
        }

        for orphan in masks.values() {
            log::warn!("Mask {:?} has no matching bad image", orphan);
        }

        log::info!(
            "Re-read {} good images, {} bad images, and {} masks for training.",
            set.good.len(),
            set.bad.len(),
            set.masks.len()
        );
        Ok(set)
    }
}
