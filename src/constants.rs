//! Global constants for the yolab engine

/// Class id assigned to a box when none is specified
pub const DEFAULT_CLASS_ID: &str = "0";

/// Largest class id accepted from user input (inclusive)
pub const MAX_CLASS_ID: i64 = 10_000;

/// Quiescence window before a dirty annotation set is autosaved, in milliseconds
pub const DEFAULT_AUTOSAVE_DEBOUNCE_MS: u64 = 1000;

/// Minimum drawn-box edge in pixels; drags below this in both dimensions
/// are treated as accidental clicks
pub const MIN_BOX_SIZE: f64 = 5.0;

/// Fractional digits written when a box row is recomputed from geometry
pub const YOLO_FRACTION_DIGITS: usize = 15;

/// Pixel offset applied to pasted boxes so copies do not hide the originals
pub const PASTE_OFFSET: f64 = 10.0;
