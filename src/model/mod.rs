//! Core annotation data model.

pub mod annotation;

pub use annotation::{BoxGeometry, BoxId, LabelBox, Point};
