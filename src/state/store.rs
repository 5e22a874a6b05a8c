//! In-memory annotation set for the active image.
//!
//! The store owns the ordered set of boxes currently being edited. Order
//! is display/z-order and becomes row order when the set is serialized.
//! Every mutation that invalidates a box's serialized form clears its
//! verbatim source row; structural changes recompute the issue flags.

use std::collections::HashSet;

use thiserror::Error;

use crate::model::{BoxGeometry, BoxId, LabelBox};

/// Store contract violations. These do not occur from normal UI flows.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Index {index} out of range for {len} box(es)")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Query filter for [`AnnotationStore::by_class`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ClassFilter {
    /// Match every box.
    #[default]
    All,
    /// Match boxes with exactly this class id.
    Class(String),
}

impl ClassFilter {
    fn matches(&self, label_box: &LabelBox) -> bool {
        match self {
            Self::All => true,
            Self::Class(class_id) => label_box.class_id == *class_id,
        }
    }
}

/// The authoritative set of boxes for the currently loaded image.
#[derive(Debug, Default)]
pub struct AnnotationStore {
    boxes: Vec<LabelBox>,
    next_id: BoxId,
    issues: HashSet<BoxId>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a freshly drawn box. It has no source row, so it always
    /// serializes from its geometry.
    pub fn add(&mut self, geometry: BoxGeometry, class_id: impl Into<String>) -> BoxId {
        let id = self.fresh_id();
        self.boxes.push(LabelBox::new(id, geometry, class_id));
        self.recompute_issues();
        id
    }

    /// Add a box restored from a label file, keeping its row verbatim.
    pub fn add_pristine(
        &mut self,
        geometry: BoxGeometry,
        class_id: impl Into<String>,
        original_row: impl Into<String>,
    ) -> BoxId {
        let id = self.fresh_id();
        self.boxes
            .push(LabelBox::from_file(id, geometry, class_id, original_row));
        self.recompute_issues();
        id
    }

    /// Remove a box. Removing an id that is already gone is a no-op: UI
    /// delete buttons race with keyboard delete.
    ///
    /// Returns whether a box was actually removed.
    pub fn remove(&mut self, id: BoxId) -> bool {
        let before = self.boxes.len();
        self.boxes.retain(|b| b.id != id);
        let removed = self.boxes.len() != before;
        if removed {
            self.recompute_issues();
        }
        removed
    }

    /// Replace a box's geometry. Clears its source row: the box no longer
    /// matches what was loaded.
    ///
    /// Returns false if the id is unknown.
    pub fn set_geometry(&mut self, id: BoxId, geometry: BoxGeometry) -> bool {
        let Some(label_box) = self.boxes.iter_mut().find(|b| b.id == id) else {
            return false;
        };
        label_box.geometry = geometry;
        label_box.original_row = None;
        self.recompute_issues();
        true
    }

    /// Replace a box's class. Clears its source row but leaves the
    /// geometry untouched.
    ///
    /// Returns false if the id is unknown.
    pub fn set_class(&mut self, id: BoxId, class_id: impl Into<String>) -> bool {
        let Some(label_box) = self.boxes.iter_mut().find(|b| b.id == id) else {
            return false;
        };
        label_box.class_id = class_id.into();
        label_box.original_row = None;
        true
    }

    /// Move a box within the z-order.
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<(), StoreError> {
        let len = self.boxes.len();
        for index in [from, to] {
            if index >= len {
                return Err(StoreError::IndexOutOfRange { index, len });
            }
        }
        let label_box = self.boxes.remove(from);
        self.boxes.insert(to, label_box);
        Ok(())
    }

    /// Boxes matching a class filter, in set order.
    pub fn by_class(&self, filter: &ClassFilter) -> Vec<LabelBox> {
        self.boxes
            .iter()
            .filter(|b| filter.matches(b))
            .cloned()
            .collect()
    }

    /// Snapshot of the whole set, safe to keep while the store mutates.
    pub fn all(&self) -> Vec<LabelBox> {
        self.boxes.clone()
    }

    /// Borrowed view of the set in order.
    pub fn boxes(&self) -> &[LabelBox] {
        &self.boxes
    }

    pub fn get(&self, id: BoxId) -> Option<&LabelBox> {
        self.boxes.iter().find(|b| b.id == id)
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// Class ids currently in use, in set order.
    pub fn class_ids(&self) -> impl Iterator<Item = &str> {
        self.boxes.iter().map(|b| b.class_id.as_str())
    }

    /// Drop every box. Used when navigating away from the image.
    pub fn clear(&mut self) {
        self.boxes.clear();
        self.issues.clear();
    }

    // === Selection =========================================================

    /// Select exactly one box, deselecting the rest.
    pub fn select_only(&mut self, id: BoxId) {
        for label_box in &mut self.boxes {
            label_box.selected = label_box.id == id;
        }
    }

    /// Flip one box's selection without touching the others.
    pub fn toggle_selected(&mut self, id: BoxId) {
        if let Some(label_box) = self.boxes.iter_mut().find(|b| b.id == id) {
            label_box.selected = !label_box.selected;
        }
    }

    pub fn select_all(&mut self) {
        for label_box in &mut self.boxes {
            label_box.selected = true;
        }
    }

    pub fn clear_selection(&mut self) {
        for label_box in &mut self.boxes {
            label_box.selected = false;
        }
    }

    /// Ids of the selected boxes, in set order.
    pub fn selected_ids(&self) -> Vec<BoxId> {
        self.boxes
            .iter()
            .filter(|b| b.selected)
            .map(|b| b.id)
            .collect()
    }

    /// The selected boxes themselves, in set order.
    pub fn selected_boxes(&self) -> impl Iterator<Item = &LabelBox> {
        self.boxes.iter().filter(|b| b.selected)
    }

    // === Issue detection ===================================================

    /// Whether a box is flagged for review (suspiciously small).
    pub fn is_issue(&self, id: BoxId) -> bool {
        self.issues.contains(&id)
    }

    /// Ids of all flagged boxes, in set order.
    pub fn issue_ids(&self) -> Vec<BoxId> {
        self.boxes
            .iter()
            .filter(|b| self.issues.contains(&b.id))
            .map(|b| b.id)
            .collect()
    }

    fn fresh_id(&mut self) -> BoxId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Flag boxes whose area is strictly below half the mean area of the
    /// set. Runs after every structural change; an empty set has no
    /// issues.
    fn recompute_issues(&mut self) {
        self.issues.clear();
        if self.boxes.is_empty() {
            return;
        }

        let mean = self.boxes.iter().map(|b| b.geometry.area()).sum::<f64>()
            / self.boxes.len() as f64;
        let threshold = 0.5 * mean;

        self.issues = self
            .boxes
            .iter()
            .filter(|b| b.geometry.area() < threshold)
            .map(|b| b.id)
            .collect();
    }
}
