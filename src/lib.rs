//! Defect Annotator
//!
//! Label images as good or bad, outline defects on the bad ones, and export
//! an image dataset with binary masks for training a defect model.

pub mod annotation;
pub mod config;
pub mod constants;
pub mod controller;
pub mod data;
pub mod error;
pub mod event;
pub mod export;
pub mod input;
pub mod keybindings;
pub mod mask;
pub mod render;
pub mod session;
pub mod training;
pub mod view_transform;

pub use annotation::{AnnotationRecord, AnnotationStore, LabelState, Point};
pub use config::{AppConfig, ConfigError};
pub use controller::{InteractionController, Outcome};
pub use error::{AnnotatorError, Result};
pub use event::{EventSource, InputEvent, MouseButton};
pub use export::{DatasetExporter, ExportReport};
pub use input::ScriptedInput;
pub use keybindings::{Command, KeyBindings};
pub use mask::{EmptyPolygonPolicy, MaskRasterizer};
pub use render::Renderer;
pub use session::{FrameSink, PngPreview, Session};
pub use view_transform::ViewTransform;
