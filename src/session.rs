//! Annotation session: the event loop tying input, state, rendering and
//! display together.

use std::path::{Path, PathBuf};

use image::RgbImage;

use crate::annotation::AnnotationStore;
use crate::config::AppConfig;
use crate::controller::{InteractionController, Outcome};
use crate::data::load_image;
use crate::error::{AnnotatorError, Result};
use crate::event::{EventSource, InputEvent};
use crate::keybindings::Command;
use crate::render::Renderer;
use crate::view_transform::{CanvasSize, ViewTransform, ZoomLimits};

// ============================================================================
// Display sinks
// ============================================================================

/// Receives every composed canvas frame.
pub trait FrameSink {
    fn present(&mut self, frame: &RgbImage) -> Result<()>;
}

/// Writes each frame to a PNG file, replacing the previous one.
#[derive(Debug, Clone)]
pub struct PngPreview {
    path: PathBuf,
}

impl PngPreview {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FrameSink for PngPreview {
    fn present(&mut self, frame: &RgbImage) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| AnnotatorError::io_failure(parent, e))?;
        }
        frame.save(&self.path)?;
        Ok(())
    }
}

/// Counts frames and keeps the latest one.
#[derive(Debug, Default)]
pub struct FrameCounter {
    pub frames: usize,
    pub last: Option<RgbImage>,
}

impl FrameSink for FrameCounter {
    fn present(&mut self, frame: &RgbImage) -> Result<()> {
        self.frames += 1;
        self.last = Some(frame.clone());
        Ok(())
    }
}

// ============================================================================
// Session
// ============================================================================

/// Image currently on screen.
struct Loaded {
    image: RgbImage,
    view: ViewTransform,
}

pub struct Session {
    canvas: CanvasSize,
    limits: ZoomLimits,
    renderer: Renderer,
    controller: InteractionController,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(
            CanvasSize::default(),
            ZoomLimits::default(),
            Renderer::default(),
            InteractionController::default(),
        )
    }
}

impl Session {
    pub fn new(
        canvas: CanvasSize,
        limits: ZoomLimits,
        renderer: Renderer,
        controller: InteractionController,
    ) -> Self {
        Self {
            canvas,
            limits,
            renderer,
            controller,
        }
    }

    /// Build a session from configuration, loading the label font if set.
    ///
    /// An unreadable font is logged and the bundled font is used instead.
    pub fn from_config(config: &AppConfig) -> Self {
        let mut renderer = Renderer::new(config.canvas.background);
        if let Some(path) = &config.label_font {
            match load_font(path) {
                Ok(font) => renderer = renderer.with_font(font),
                Err(e) => log::warn!("Label font unavailable, using the bundled font: {}", e),
            }
        }

        Self::new(
            config.canvas.size(),
            config.zoom.limits(),
            renderer,
            InteractionController::new(config.keybindings.clone()),
        )
    }

    pub fn controller(&self) -> &InteractionController {
        &self.controller
    }

    /// Run until a quit command, a close event or the end of input.
    ///
    /// Returns the store with every annotation made during the session.
    /// Only a failure to present the very first frame is an error; later
    /// display failures are logged.
    pub fn run(
        &self,
        mut store: AnnotationStore,
        mut source: impl EventSource,
        sink: &mut impl FrameSink,
    ) -> Result<AnnotationStore> {
        let Some(mut loaded) = self.load_current(&mut store, 1) else {
            log::error!("None of the {} images could be loaded", store.len());
            return Ok(store);
        };
        log_progress(&store);
        sink.present(&self.renderer.render(&loaded.image, &loaded.view, store.current()))?;

        while let Some(event) = source.next_event() {
            let outcome = self.controller.handle(&event, &mut store, &mut loaded.view);

            match &outcome {
                Outcome::Quit => break,
                Outcome::Rejected(AnnotatorError::InsufficientPoints { .. }) => {
                    log::warn!("Need at least 2 points to finish annotation.");
                }
                Outcome::Rejected(e) => log::warn!("{}", e),
                Outcome::Navigated => {
                    let step = match self.command_of(&event) {
                        Some(Command::Previous) => -1,
                        _ => 1,
                    };
                    match self.load_current(&mut store, step) {
                        Some(next) => loaded = next,
                        None => {
                            log::error!("No loadable images left");
                            break;
                        }
                    }
                }
                Outcome::Ignored | Outcome::Redraw => {}
            }

            if outcome.needs_redraw() {
                let frame = self.renderer.render(&loaded.image, &loaded.view, store.current());
                if let Err(e) = sink.present(&frame) {
                    log::warn!("Failed to present frame: {}", e);
                }
            }
            if matches!(event, InputEvent::KeyPressed { .. }) {
                log_progress(&store);
            }
        }

        let summary = store.summary();
        log::info!(
            "Session ended: {} good, {} bad ({} open), {} unlabeled",
            summary.good,
            summary.bad_open + summary.bad_closed,
            summary.bad_open,
            summary.unlabeled
        );
        Ok(store)
    }

    fn command_of(&self, event: &InputEvent) -> Option<Command> {
        match event {
            InputEvent::KeyPressed { key } => self.controller.bindings().command_for_key(*key),
            _ => None,
        }
    }

    /// Load the current image, stepping past undecodable ones. `None` when
    /// no image in the store can be loaded.
    fn load_current(&self, store: &mut AnnotationStore, step: isize) -> Option<Loaded> {
        for _ in 0..store.len() {
            let path = store.current().file_path();
            match load_image(path) {
                Ok(image) => {
                    let view =
                        ViewTransform::fit(self.canvas, image.width(), image.height(), self.limits)?;
                    log::debug!(
                        "🖼️ Loaded {:?} ({}x{}) at {:.3}x",
                        path,
                        image.width(),
                        image.height(),
                        view.scale()
                    );
                    return Some(Loaded { image, view });
                }
                Err(e) => {
                    log::warn!("⚠️  {}; skipping", e);
                    store.advance(step);
                }
            }
        }
        None
    }
}

fn log_progress(store: &AnnotationStore) {
    log::info!(
        "Image {}/{} - {}",
        store.current_index() + 1,
        store.len(),
        store.current().file_path().display()
    );
}

fn load_font(path: &Path) -> Result<ab_glyph::FontVec> {
    let bytes = std::fs::read(path).map_err(|e| AnnotatorError::io_failure(path, e))?;
    ab_glyph::FontVec::try_from_vec(bytes)
        .map_err(|e| AnnotatorError::invalid_image(path, format!("invalid font: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{LabelState, Point};
    use crate::event::MouseButton;
    use crate::input::ScriptedInput;
    use image::Rgb;

    fn write_images(dir: &Path, names: &[&str]) {
        for name in names {
            RgbImage::from_pixel(400, 300, Rgb([120, 120, 120]))
                .save(dir.join(name))
                .unwrap();
        }
    }

    fn click(x: f32, y: f32) -> InputEvent {
        InputEvent::MousePressed {
            button: MouseButton::Left,
            position: Point::new(x, y),
        }
    }

    fn key(key: char) -> InputEvent {
        InputEvent::KeyPressed { key }
    }

    #[test]
    fn test_scripted_run_matches_direct_store_use() {
        let dir = tempfile::tempdir().unwrap();
        write_images(dir.path(), &["a.png", "b.png", "c.png"]);
        let store = AnnotationStore::from_directory(dir.path()).unwrap();

        // 400x300 fits at 2.0, so canvas (100, 50) is image (50, 25)
        let script = "g\nn\nb\nclick 100 50\nclick 300 50\nclick 300 250\nf\nq\n";
        let mut sink = FrameCounter::default();
        let store = Session::default()
            .run(store, ScriptedInput::new(script.as_bytes()), &mut sink)
            .unwrap();

        let mut expected = AnnotationStore::from_directory(dir.path()).unwrap();
        expected.mark_good();
        expected.advance(1);
        expected.mark_bad();
        for (x, y) in [(50.0, 25.0), (150.0, 25.0), (150.0, 125.0)] {
            expected.add_point(Point::new(x, y));
        }
        expected.finish_current().unwrap();

        assert_eq!(store.records(), expected.records());
        assert_eq!(store.current_index(), 1);
        // initial frame plus g, n, b, three clicks and f
        assert_eq!(sink.frames, 8);
        assert_eq!(sink.last.unwrap().dimensions(), (800, 600));
    }

    #[test]
    fn test_undecodable_image_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.png"), b"not a png").unwrap();
        write_images(dir.path(), &["b.png"]);
        let store = AnnotationStore::from_directory(dir.path()).unwrap();

        let events = vec![key('g'), InputEvent::Close];
        let mut sink = FrameCounter::default();
        let store = Session::default()
            .run(store, events.into_iter(), &mut sink)
            .unwrap();

        assert_eq!(store.records()[0].state(), LabelState::Unlabeled);
        assert_eq!(store.records()[1].state(), LabelState::Good);
    }

    #[test]
    fn test_all_images_undecodable_ends_session() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.png"), b"junk").unwrap();
        std::fs::write(dir.path().join("b.jpg"), b"junk").unwrap();
        let store = AnnotationStore::from_directory(dir.path()).unwrap();

        let mut sink = FrameCounter::default();
        let store = Session::default()
            .run(store, vec![key('g')].into_iter(), &mut sink)
            .unwrap();

        assert_eq!(sink.frames, 0);
        assert_eq!(store.summary().unlabeled, 2);
    }

    #[test]
    fn test_rejected_finish_keeps_polygon_open() {
        let dir = tempfile::tempdir().unwrap();
        write_images(dir.path(), &["a.png"]);
        let store = AnnotationStore::from_directory(dir.path()).unwrap();

        let events = vec![key('b'), click(10.0, 10.0), key('f')];
        let store = Session::default()
            .run(store, events.into_iter(), &mut FrameCounter::default())
            .unwrap();

        assert_eq!(store.current().state(), LabelState::BadOpen);
        assert_eq!(store.current().polygon().len(), 1);
    }

    #[test]
    fn test_png_preview_writes_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("preview.png");
        let mut preview = PngPreview::new(&path);
        preview
            .present(&RgbImage::from_pixel(8, 6, Rgb([1, 2, 3])))
            .unwrap();

        let written = image::open(&path).unwrap().to_rgb8();
        assert_eq!(written.dimensions(), (8, 6));
        assert_eq!(written.get_pixel(0, 0), &Rgb([1, 2, 3]));
    }
}
