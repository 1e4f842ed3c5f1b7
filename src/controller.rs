//! Event dispatch for the annotation loop.
//!
//! The controller is the only code that mutates the [`AnnotationStore`] and
//! the [`ViewTransform`]. It reports what happened so the caller can redraw
//! or load another image.

use crate::annotation::{AnnotationStore, LabelState};
use crate::error::AnnotatorError;
use crate::event::{InputEvent, MouseButton};
use crate::keybindings::{Command, KeyBindings};
use crate::view_transform::ViewTransform;

/// Result of handling a single event.
#[derive(Debug)]
pub enum Outcome {
    /// Nothing changed.
    Ignored,
    /// State or view changed; redraw the current image.
    Redraw,
    /// The cursor moved; load the new current image and refit the view.
    Navigated,
    /// The command was refused. State is unchanged; report and continue.
    Rejected(AnnotatorError),
    /// End the annotation session.
    Quit,
}

impl Outcome {
    /// Whether the canvas must be redrawn after this outcome.
    pub fn needs_redraw(&self) -> bool {
        matches!(self, Outcome::Redraw | Outcome::Navigated)
    }
}

/// Maps input events onto store and view mutations.
#[derive(Debug, Clone, Default)]
pub struct InteractionController {
    bindings: KeyBindings,
}

impl InteractionController {
    pub fn new(bindings: KeyBindings) -> Self {
        Self { bindings }
    }

    pub fn bindings(&self) -> &KeyBindings {
        &self.bindings
    }

    /// Handle one event against the current image's view.
    pub fn handle(
        &self,
        event: &InputEvent,
        store: &mut AnnotationStore,
        view: &mut ViewTransform,
    ) -> Outcome {
        match event {
            InputEvent::MouseWheel { delta, .. } => {
                let scale = view.zoom(*delta);
                log::debug!("🔍 Zoom: {:.3}x", scale);
                Outcome::Redraw
            }
            InputEvent::MousePressed {
                button: MouseButton::Left,
                position,
            } => {
                // Points are only captured while a bad polygon is open
                if store.current().state() != LabelState::BadOpen {
                    return Outcome::Ignored;
                }
                if !view.layout().accepts_click(position.x, position.y) {
                    log::trace!("Click at ({}, {}) outside image", position.x, position.y);
                    return Outcome::Ignored;
                }
                let point = view.to_original(*position);
                if store.add_point(point) {
                    Outcome::Redraw
                } else {
                    Outcome::Ignored
                }
            }
            InputEvent::MousePressed { .. } => Outcome::Ignored,
            InputEvent::KeyPressed { key } => match self.bindings.command_for_key(*key) {
                Some(command) => self.apply(command, store),
                None => {
                    log::trace!("Unbound key '{}'", key);
                    Outcome::Ignored
                }
            },
            InputEvent::Close => Outcome::Quit,
        }
    }

    fn apply(&self, command: Command, store: &mut AnnotationStore) -> Outcome {
        match command {
            Command::Next => {
                store.advance(1);
                Outcome::Navigated
            }
            Command::Previous => {
                store.advance(-1);
                Outcome::Navigated
            }
            Command::MarkGood => {
                store.mark_good();
                Outcome::Redraw
            }
            Command::MarkBad => {
                store.mark_bad();
                Outcome::Redraw
            }
            Command::ResetPolygon => {
                store.reset_current();
                Outcome::Redraw
            }
            Command::Finish => match store.finish_current() {
                Ok(()) => {
                    log::info!(
                        "Annotation finished for image: {:?}",
                        store.current().file_path()
                    );
                    Outcome::Redraw
                }
                Err(e) => Outcome::Rejected(e),
            },
            Command::Quit => Outcome::Quit,
        }
    }
}
