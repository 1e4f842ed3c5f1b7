//! Per-image label state and the ordered store that owns it.
//!
//! Each image is labeled good or bad; a bad image additionally carries a
//! single defect polygon in original-image coordinates.

use std::path::{Path, PathBuf};

use crate::constants::MIN_FINISH_POINTS;
use crate::error::{AnnotatorError, Result};

// ============================================================================
// Geometry
// ============================================================================

/// A 2D point. Polygon vertices are stored in original-image space with
/// sub-pixel precision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

// ============================================================================
// Annotation Record
// ============================================================================

/// Label state derived from a record's flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelState {
    Unlabeled,
    Good,
    /// Bad image whose polygon is still being drawn.
    BadOpen,
    /// Bad image whose polygon has been closed.
    BadClosed,
}

impl LabelState {
    /// Text shown in the canvas status label.
    pub fn label(&self) -> &'static str {
        match self {
            LabelState::Unlabeled => "Unlabeled",
            LabelState::Good => "Good",
            LabelState::BadOpen | LabelState::BadClosed => "Bad",
        }
    }
}

/// Annotation state for one source image.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationRecord {
    file_path: PathBuf,
    is_annotated: bool,
    is_good: bool,
    finished: bool,
    polygon: Vec<Point>,
}

impl AnnotationRecord {
    /// Create an unlabeled record.
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
            is_annotated: false,
            is_good: true,
            finished: false,
            polygon: Vec::new(),
        }
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn is_annotated(&self) -> bool {
        self.is_annotated
    }

    /// Only meaningful when [`Self::is_annotated`] is true.
    pub fn is_good(&self) -> bool {
        self.is_good
    }

    /// True once a bad polygon has been closed.
    pub fn finished(&self) -> bool {
        self.finished
    }

    pub fn polygon(&self) -> &[Point] {
        &self.polygon
    }

    /// Whether this record is currently labeled bad.
    pub fn is_bad(&self) -> bool {
        self.is_annotated && !self.is_good
    }

    pub fn state(&self) -> LabelState {
        match (self.is_annotated, self.is_good, self.finished) {
            (false, _, _) => LabelState::Unlabeled,
            (true, true, _) => LabelState::Good,
            (true, false, false) => LabelState::BadOpen,
            (true, false, true) => LabelState::BadClosed,
        }
    }

    /// Label as good. Always clears any polygon.
    pub fn mark_good(&mut self) {
        self.is_annotated = true;
        self.is_good = true;
        self.finished = false;
        self.polygon.clear();
    }

    /// Label as bad with a fresh, open polygon.
    pub fn mark_bad(&mut self) {
        self.is_annotated = true;
        self.is_good = false;
        self.finished = false;
        self.polygon.clear();
    }

    /// Clear and reopen the polygon of a bad record. No-op otherwise.
    pub fn reset(&mut self) {
        if self.is_bad() {
            self.polygon.clear();
            self.finished = false;
        }
    }

    /// Append a vertex. Returns false (and changes nothing) unless the
    /// record is labeled bad.
    pub fn add_point(&mut self, point: Point) -> bool {
        if !self.is_bad() {
            return false;
        }
        self.polygon.push(point);
        true
    }

    /// Close the polygon of a bad record.
    pub fn finish(&mut self) -> Result<()> {
        if !self.is_bad() || self.polygon.len() < MIN_FINISH_POINTS {
            return Err(AnnotatorError::InsufficientPoints {
                count: if self.is_bad() { self.polygon.len() } else { 0 },
            });
        }
        self.finished = true;
        Ok(())
    }
}

// ============================================================================
// Annotation Store
// ============================================================================

/// Label counts across a store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LabelSummary {
    pub unlabeled: usize,
    pub good: usize,
    pub bad_open: usize,
    pub bad_closed: usize,
}

/// Ordered records, one per image, with a cyclic cursor.
///
/// Never empty: construction fails when there is nothing to annotate.
#[derive(Debug, Clone)]
pub struct AnnotationStore {
    records: Vec<AnnotationRecord>,
    current_index: usize,
}

impl AnnotationStore {
    /// Build a store from image paths, sorted by path, all unlabeled.
    ///
    /// Returns `None` when `paths` is empty.
    pub fn load<I, P>(paths: I) -> Option<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut paths: Vec<PathBuf> = paths.into_iter().map(Into::into).collect();
        if paths.is_empty() {
            return None;
        }
        paths.sort();

        Some(Self {
            records: paths.into_iter().map(AnnotationRecord::new).collect(),
            current_index: 0,
        })
    }

    /// Scan `dir` for supported images and build a store from them.
    pub fn from_directory(dir: &Path) -> Result<Self> {
        let paths = crate::data::scan_directory(dir)?;
        Self::load(paths).ok_or_else(|| AnnotatorError::NoImagesFound {
            dir: dir.to_path_buf(),
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Always false; kept for API symmetry with [`Self::len`].
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[AnnotationRecord] {
        &self.records
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current(&self) -> &AnnotationRecord {
        &self.records[self.current_index]
    }

    fn current_mut(&mut self) -> &mut AnnotationRecord {
        &mut self.records[self.current_index]
    }

    /// Move the cursor by `step`, wrapping at both ends.
    pub fn advance(&mut self, step: isize) {
        let len = self.records.len() as isize;
        self.current_index = (self.current_index as isize + step).rem_euclid(len) as usize;
        log::debug!(
            "Cursor moved to {}/{}",
            self.current_index + 1,
            self.records.len()
        );
    }

    pub fn mark_good(&mut self) {
        self.current_mut().mark_good();
        log::debug!("Marked good: {:?}", self.current().file_path());
    }

    pub fn mark_bad(&mut self) {
        self.current_mut().mark_bad();
        log::debug!("Marked bad: {:?}", self.current().file_path());
    }

    pub fn reset_current(&mut self) {
        self.current_mut().reset();
    }

    /// Append a polygon vertex to the current record if it is labeled bad.
    pub fn add_point(&mut self, point: Point) -> bool {
        let added = self.current_mut().add_point(point);
        if added {
            log::debug!(
                "Added point ({:.2}, {:.2}), polygon has {} vertices",
                point.x,
                point.y,
                self.current().polygon().len()
            );
        }
        added
    }

    /// Close the current polygon; fails with `InsufficientPoints` and leaves
    /// the record untouched when it cannot be closed.
    pub fn finish_current(&mut self) -> Result<()> {
        self.current_mut().finish()
    }

    pub fn summary(&self) -> LabelSummary {
        let mut summary = LabelSummary::default();
        for record in &self.records {
            match record.state() {
                LabelState::Unlabeled => summary.unlabeled += 1,
                LabelState::Good => summary.good += 1,
                LabelState::BadOpen => summary.bad_open += 1,
                LabelState::BadClosed => summary.bad_closed += 1,
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> AnnotationStore {
        AnnotationStore::load(["c.png", "a.png", "b.jpg"]).unwrap()
    }

    fn bad_with_points(n: usize) -> AnnotationRecord {
        let mut record = AnnotationRecord::new("x.png");
        record.mark_bad();
        for i in 0..n {
            record.add_point(Point::new(i as f32, i as f32));
        }
        record
    }

    #[test]
    fn test_load_sorts_and_starts_unlabeled() {
        let store = store();
        let names: Vec<_> = store
            .records()
            .iter()
            .map(|r| r.file_path().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a.png", "b.jpg", "c.png"]);
        assert!(store.records().iter().all(|r| r.state() == LabelState::Unlabeled));
        assert_eq!(store.current_index(), 0);
    }

    #[test]
    fn test_load_empty() {
        assert!(AnnotationStore::load(Vec::<PathBuf>::new()).is_none());
    }

    #[test]
    fn test_cyclic_navigation() {
        let mut store = store();
        store.advance(-1);
        assert_eq!(store.current_index(), 2);
        store.advance(1);
        assert_eq!(store.current_index(), 0);
        store.advance(1);
        store.advance(1);
        store.advance(1);
        assert_eq!(store.current_index(), 0);
    }

    #[test]
    fn test_mark_good_then_bad_clears_polygon() {
        let mut record = bad_with_points(3);
        record.finish().unwrap();
        assert_eq!(record.state(), LabelState::BadClosed);

        record.mark_good();
        record.mark_bad();
        assert!(record.polygon().is_empty());
        assert!(!record.finished());
        assert_eq!(record.state(), LabelState::BadOpen);
    }

    #[test]
    fn test_mark_good_clears_polygon() {
        let mut record = bad_with_points(4);
        record.mark_good();
        assert_eq!(record.state(), LabelState::Good);
        assert!(record.polygon().is_empty());
    }

    #[test]
    fn test_add_point_ignored_unless_bad() {
        let mut record = AnnotationRecord::new("x.png");
        assert!(!record.add_point(Point::new(1.0, 1.0)));
        record.mark_good();
        assert!(!record.add_point(Point::new(1.0, 1.0)));
        assert!(record.polygon().is_empty());

        record.mark_bad();
        assert!(record.add_point(Point::new(1.5, 2.5)));
        assert_eq!(record.polygon(), &[Point::new(1.5, 2.5)]);
    }

    #[test]
    fn test_finish_guard() {
        let mut record = bad_with_points(1);
        let err = record.finish().unwrap_err();
        assert!(matches!(err, AnnotatorError::InsufficientPoints { count: 1 }));
        assert!(!record.finished());

        record.add_point(Point::new(5.0, 0.0));
        record.finish().unwrap();
        assert!(record.finished());
    }

    #[test]
    fn test_finish_rejected_for_good_and_unlabeled() {
        let mut record = AnnotationRecord::new("x.png");
        assert!(record.finish().is_err());
        record.mark_good();
        assert!(record.finish().is_err());
        assert!(!record.finished());
    }

    #[test]
    fn test_reset_reopens_closed_polygon() {
        let mut record = bad_with_points(3);
        record.finish().unwrap();
        record.reset();
        assert_eq!(record.state(), LabelState::BadOpen);
        assert!(record.polygon().is_empty());
    }

    #[test]
    fn test_reset_is_noop_for_good() {
        let mut record = AnnotationRecord::new("x.png");
        record.mark_good();
        record.reset();
        assert_eq!(record.state(), LabelState::Good);
    }

    #[test]
    fn test_store_operates_on_current() {
        let mut store = store();
        store.advance(1);
        store.mark_bad();
        store.add_point(Point::new(0.0, 0.0));
        store.add_point(Point::new(10.0, 0.0));
        store.finish_current().unwrap();

        assert_eq!(store.records()[0].state(), LabelState::Unlabeled);
        assert_eq!(store.records()[1].state(), LabelState::BadClosed);

        let summary = store.summary();
        assert_eq!(summary.unlabeled, 2);
        assert_eq!(summary.bad_closed, 1);
    }

    #[test]
    fn test_label_text() {
        assert_eq!(LabelState::Unlabeled.label(), "Unlabeled");
        assert_eq!(LabelState::Good.label(), "Good");
        assert_eq!(LabelState::BadOpen.label(), "Bad");
        assert_eq!(LabelState::BadClosed.label(), "Bad");
    }
}
