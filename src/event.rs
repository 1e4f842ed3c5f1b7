//! Discrete input events delivered by the windowing substrate.

use crate::annotation::Point;

/// Events the annotation loop responds to.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// Mouse button pressed at a canvas position.
    MousePressed { button: MouseButton, position: Point },
    /// Mouse wheel scrolled. Positive deltas zoom in.
    MouseWheel { delta: f32, position: Point },
    /// Single-character key command.
    KeyPressed { key: char },
    /// Window closed by the substrate.
    Close,
}

/// Mouse buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Blocking source of input events.
pub trait EventSource {
    /// Wait for the next event. `None` means the input is exhausted and the
    /// session should end.
    fn next_event(&mut self) -> Option<InputEvent>;
}

impl<S: EventSource + ?Sized> EventSource for &mut S {
    fn next_event(&mut self) -> Option<InputEvent> {
        (**self).next_event()
    }
}

/// Replays a fixed list of events.
impl EventSource for std::vec::IntoIter<InputEvent> {
    fn next_event(&mut self) -> Option<InputEvent> {
        self.next()
    }
}
