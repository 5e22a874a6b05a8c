//! YOLAB - YOLO bounding-box label editor engine
//!
//! The state, geometry and persistence core of an image annotation tool.
//! Hosts bring the canvas and raw input; this crate brings the label
//! format, the annotation store, background image loading and autosave.

pub mod config;
pub mod constants;
pub mod controller;
pub mod files;
pub mod format;
pub mod model;
pub mod state;
pub mod surface;
pub mod taxonomy;

pub use config::EngineConfig;
pub use controller::{InteractionController, InteractionMode};
pub use model::{BoxGeometry, BoxId, LabelBox, Point};
pub use state::{Session, SessionEvent};
pub use surface::{RenderSurface, ShapeHandle, SurfaceBinding};
pub use taxonomy::ClassTaxonomy;
