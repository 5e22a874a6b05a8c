//! Canvas integration: shape handles and their binding to stored boxes.
//!
//! The engine does not draw. The host's canvas draws rectangles and hands
//! back opaque [`ShapeHandle`]s; this module keeps the two-way association
//! between those handles and [`BoxId`]s so pointer events on shapes can be
//! routed to the right annotation and store changes can be pushed back to
//! the right shape.

use std::collections::HashMap;

use crate::model::{BoxGeometry, BoxId};
use crate::state::AnnotationStore;
use crate::taxonomy::{ClassTaxonomy, Rgb, color_for};

/// Opaque identifier of a drawn rectangle, issued by the host canvas.
pub type ShapeHandle = u64;

/// Drawing operations the host canvas provides.
pub trait RenderSurface {
    /// Draw a rectangle and return its handle.
    fn draw_box(&mut self, geometry: BoxGeometry, color: Rgb, label: &str) -> ShapeHandle;

    /// Move or resize an existing rectangle.
    fn update_box(&mut self, handle: ShapeHandle, geometry: BoxGeometry);

    /// Remove a rectangle from the canvas.
    fn remove_box(&mut self, handle: ShapeHandle);
}

/// Two-way map between canvas shapes and stored boxes.
#[derive(Debug, Default)]
pub struct SurfaceBinding {
    /// Box id for each shape handle
    by_handle: HashMap<ShapeHandle, BoxId>,
    /// Shape handle for each box id
    by_box: HashMap<BoxId, ShapeHandle>,
}

impl SurfaceBinding {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate a shape with a box, dropping any stale pair either key
    /// had before.
    pub fn bind(&mut self, handle: ShapeHandle, id: BoxId) {
        if let Some(old_id) = self.by_handle.insert(handle, id) {
            if old_id != id {
                self.by_box.remove(&old_id);
            }
        }
        if let Some(old_handle) = self.by_box.insert(id, handle) {
            if old_handle != handle {
                self.by_handle.remove(&old_handle);
            }
        }
    }

    /// Box behind a canvas shape.
    pub fn box_for(&self, handle: ShapeHandle) -> Option<BoxId> {
        self.by_handle.get(&handle).copied()
    }

    /// Canvas shape for a box.
    pub fn handle_for(&self, id: BoxId) -> Option<ShapeHandle> {
        self.by_box.get(&id).copied()
    }

    /// Drop the pair for a box. Returns the freed handle so the host can
    /// remove the shape.
    pub fn unbind_box(&mut self, id: BoxId) -> Option<ShapeHandle> {
        let handle = self.by_box.remove(&id)?;
        self.by_handle.remove(&handle);
        Some(handle)
    }

    /// Drop the pair for a shape.
    pub fn unbind_handle(&mut self, handle: ShapeHandle) -> Option<BoxId> {
        let id = self.by_handle.remove(&handle)?;
        self.by_box.remove(&id);
        Some(id)
    }

    /// Drop all pairs (e.g., when a new image is installed).
    pub fn clear(&mut self) {
        let count = self.by_handle.len();
        self.by_handle.clear();
        self.by_box.clear();
        if count > 0 {
            log::debug!("Cleared {count} shape binding(s)");
        }
    }

    pub fn len(&self) -> usize {
        self.by_handle.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_handle.is_empty()
    }

    /// Reconcile the canvas with the store: draw boxes that have no
    /// shape yet, push current geometry to bound ones, and remove shapes
    /// whose box is gone.
    pub fn sync(
        &mut self,
        surface: &mut dyn RenderSurface,
        store: &AnnotationStore,
        taxonomy: &ClassTaxonomy,
    ) {
        for label_box in store.boxes() {
            match self.handle_for(label_box.id) {
                Some(handle) => surface.update_box(handle, label_box.geometry),
                None => {
                    let handle = surface.draw_box(
                        label_box.geometry,
                        color_for(&label_box.class_id),
                        &taxonomy.display_name(&label_box.class_id),
                    );
                    self.bind(handle, label_box.id);
                }
            }
        }

        let orphans: Vec<ShapeHandle> = self
            .by_box
            .iter()
            .filter(|(id, _)| store.get(**id).is_none())
            .map(|(_, handle)| *handle)
            .collect();
        for handle in orphans {
            self.unbind_handle(handle);
            surface.remove_box(handle);
        }
    }
}
