//! Core data types for box annotations.
//!
//! Geometry lives in pixel space of the currently loaded image. The
//! normalized YOLO representation only exists at the file boundary
//! (see [`crate::format::yolo`]).

use crate::constants::DEFAULT_CLASS_ID;

/// Unique identifier for a box within the current image session.
///
/// Surrogate key issued by the store; array positions are not identity
/// because boxes can be reordered and deleted.
pub type BoxId = u64;

/// A point in canvas pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in pixel space. Width and height are always >= 0.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoxGeometry {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl BoxGeometry {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Build a normalized rectangle from two opposite corners.
    ///
    /// The corners may come from any drag direction; left/top take the
    /// minimum per axis and width/height the absolute difference, so the
    /// result never has negative dimensions.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            left: a.x.min(b.x),
            top: a.y.min(b.y),
            width: (a.x - b.x).abs(),
            height: (a.y - b.y).abs(),
        }
    }

    /// Return a copy with any negative dimension flipped into place.
    pub fn normalized(&self) -> Self {
        let corner = Point::new(self.left + self.width, self.top + self.height);
        Self::from_corners(Point::new(self.left, self.top), corner)
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.left + self.width / 2.0, self.top + self.height / 2.0)
    }

    /// Check if a point is inside this rectangle (edges inclusive).
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left
            && point.x <= self.right()
            && point.y >= self.top
            && point.y <= self.bottom()
    }

    /// Return a copy shifted by the given deltas.
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self {
            left: self.left + dx,
            top: self.top + dy,
            ..*self
        }
    }

    /// Clamp the rectangle's position into a `bounds_width` x `bounds_height`
    /// area, keeping its size. A rectangle larger than the bounds is pinned
    /// to the top-left corner.
    pub fn clamped_to(&self, bounds_width: f64, bounds_height: f64) -> Self {
        let left = self.left.clamp(0.0, (bounds_width - self.width).max(0.0));
        let top = self.top.clamp(0.0, (bounds_height - self.height).max(0.0));
        Self { left, top, ..*self }
    }
}

/// One annotated rectangle with its class tag.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelBox {
    /// Stable identity within the current image.
    pub id: BoxId,

    /// Pixel-space rectangle relative to the active image.
    pub geometry: BoxGeometry,

    /// String-encoded non-negative integer class, canonical form
    /// (no sign, no leading zeros).
    pub class_id: String,

    /// The label-file row this box was parsed from, verbatim.
    ///
    /// Present only while the box is untouched since load; any geometry or
    /// class mutation clears it. While present, serializing the box must
    /// reproduce these exact bytes so unchanged files never diff.
    pub original_row: Option<String>,

    /// Whether the box is part of the active selection. Derived UI state,
    /// never persisted.
    pub selected: bool,
}

impl LabelBox {
    /// Create a fresh box that did not come from a file.
    pub fn new(id: BoxId, geometry: BoxGeometry, class_id: impl Into<String>) -> Self {
        let class_id = class_id.into();
        let class_id = if class_id.is_empty() {
            DEFAULT_CLASS_ID.to_string()
        } else {
            class_id
        };
        Self {
            id,
            geometry,
            class_id,
            original_row: None,
            selected: false,
        }
    }

    /// Create a box restored from a label file, keeping its source row.
    pub fn from_file(
        id: BoxId,
        geometry: BoxGeometry,
        class_id: impl Into<String>,
        original_row: impl Into<String>,
    ) -> Self {
        Self {
            original_row: Some(original_row.into()),
            ..Self::new(id, geometry, class_id)
        }
    }

    /// Whether the box still matches the row it was loaded from.
    pub fn is_pristine(&self) -> bool {
        self.original_row.is_some()
    }
}
