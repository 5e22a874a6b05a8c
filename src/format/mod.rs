//! Label text format support.
//!
//! The YOLO row codec plus the autosave scheduler that decides when a
//! mutated annotation set goes back to disk.
//!
//! # Example
//!
//! ```rust,ignore
//! use yolab::format::yolo;
//!
//! let rows = yolo::decode_document("2 0.5 0.5 0.25 0.25\n", 800.0, 600.0);
//! assert_eq!(rows.len(), 1);
//! ```

pub mod auto_save;
pub mod error;
pub mod yolo;

pub use auto_save::AutoSaveManager;
pub use error::LabelFormatError;
pub use yolo::ParsedRow;
