//! Image discovery and decoding.
//!
//! The annotation core only needs two things from the file system: the list
//! of candidate images in a folder and an RGB buffer for the image on screen.

mod loader;

pub use loader::{is_supported_file, list_files, load_image, load_mask, scan_directory};
