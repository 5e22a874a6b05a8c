//! Pointer-driven editing: drawing new boxes, selection, clipboard.
//!
//! The host translates its raw input into calls here, already in image
//! coordinates; pans and zooms never reach this layer. Drawing is a
//! two-phase flow: a drag produces a draft rectangle, and the draft only
//! becomes a stored box once [`InteractionController::commit_draft`]
//! gets a valid class id for it. The draft survives rejected input, so a
//! typo in the class prompt does not throw away the drawn rectangle.

use thiserror::Error;

use crate::config::EngineConfig;
use crate::constants::{MIN_BOX_SIZE, PASTE_OFFSET};
use crate::model::{BoxGeometry, BoxId, Point};
use crate::state::Session;
use crate::surface::{ShapeHandle, SurfaceBinding};
use crate::taxonomy::{ClassIdError, validate_class_input};

/// What pointer gestures on the canvas mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractionMode {
    /// Drags draw new boxes.
    #[default]
    Draw,
    /// Drags move and resize existing shapes (routed by the host).
    Edit,
}

/// In-progress drag, if any.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
enum DrawGesture {
    #[default]
    Idle,
    Drawing {
        start: Point,
        current: Point,
    },
}

/// One copied box, held until pasted.
#[derive(Debug, Clone)]
struct ClipboardBox {
    geometry: BoxGeometry,
    class_id: String,
}

/// Why a draft could not be committed.
#[derive(Error, Debug)]
pub enum DraftError {
    #[error("No box has been drawn")]
    NoDraft,

    #[error(transparent)]
    InvalidClass(#[from] ClassIdError),
}

/// Pointer and clipboard state for the annotation canvas.
pub struct InteractionController {
    mode: InteractionMode,
    gesture: DrawGesture,
    draft: Option<BoxGeometry>,
    clipboard: Vec<ClipboardBox>,
    binding: SurfaceBinding,
    last_pointer: Point,
    min_box_size: f64,
    paste_offset: f64,
}

impl InteractionController {
    pub fn new() -> Self {
        Self {
            mode: InteractionMode::default(),
            gesture: DrawGesture::default(),
            draft: None,
            clipboard: Vec::new(),
            binding: SurfaceBinding::new(),
            last_pointer: Point::default(),
            min_box_size: MIN_BOX_SIZE,
            paste_offset: PASTE_OFFSET,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            min_box_size: config.min_box_size,
            paste_offset: config.paste_offset,
            ..Self::new()
        }
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    /// Switch interaction mode, cancelling any drawing in progress.
    pub fn set_mode(&mut self, mode: InteractionMode) {
        if mode != self.mode {
            self.gesture = DrawGesture::Idle;
            self.draft = None;
        }
        self.mode = mode;
        log::debug!("🖌️ Interaction mode: {mode:?}");
    }

    // === Drawing ===========================================================

    /// Begin a drag. Ignored while panning, outside Draw mode, or with no
    /// image on screen.
    pub fn pointer_down(&mut self, session: &Session, at: Point, panning: bool) {
        self.last_pointer = at;
        if panning || self.mode != InteractionMode::Draw {
            return;
        }
        if session.active_image().is_none() {
            log::debug!("✏️ Ignoring draw: no image loaded");
            return;
        }

        self.gesture = DrawGesture::Drawing {
            start: at,
            current: at,
        };
        log::debug!("✏️ Started box at ({:.1}, {:.1})", at.x, at.y);
    }

    pub fn pointer_move(&mut self, at: Point) {
        self.last_pointer = at;
        if let DrawGesture::Drawing { current, .. } = &mut self.gesture {
            *current = at;
        }
    }

    /// End the drag. Returns the draft rectangle, or `None` when the drag
    /// was too small to mean anything.
    pub fn pointer_up(&mut self, at: Point) -> Option<BoxGeometry> {
        self.last_pointer = at;
        let DrawGesture::Drawing { start, .. } = std::mem::take(&mut self.gesture) else {
            return None;
        };

        let rect = BoxGeometry::from_corners(start, at);
        if rect.width < self.min_box_size && rect.height < self.min_box_size {
            log::debug!(
                "✏️ Discarding {:.1}x{:.1} drag as an accidental click",
                rect.width,
                rect.height
            );
            return None;
        }

        self.draft = Some(rect);
        Some(rect)
    }

    /// Rectangle of the drag currently under the pointer.
    pub fn preview_rect(&self) -> Option<BoxGeometry> {
        match self.gesture {
            DrawGesture::Drawing { start, current } => {
                Some(BoxGeometry::from_corners(start, current))
            }
            DrawGesture::Idle => None,
        }
    }

    /// The drawn rectangle awaiting a class id.
    pub fn draft(&self) -> Option<BoxGeometry> {
        self.draft
    }

    /// Turn the draft into a stored box with the given class.
    ///
    /// The class input is validated first; on rejection the draft stays,
    /// so the user can correct the input and commit again.
    pub fn commit_draft(
        &mut self,
        session: &mut Session,
        raw_class: &str,
    ) -> Result<BoxId, DraftError> {
        let class_id = validate_class_input(raw_class)?;
        let geometry = self.draft.take().ok_or(DraftError::NoDraft)?;

        let id = session.add_box(geometry, class_id.clone());
        log::info!("✅ Created box {id} (class={class_id})");
        Ok(id)
    }

    /// Throw away the in-progress drag and any pending draft.
    pub fn cancel_draft(&mut self) {
        self.gesture = DrawGesture::Idle;
        self.draft = None;
        log::debug!("❌ Drawing cancelled");
    }

    // === Shape routing =====================================================

    /// Record the canvas shape drawn for a box.
    pub fn bind_shape(&mut self, handle: ShapeHandle, id: BoxId) {
        self.binding.bind(handle, id);
    }

    pub fn binding(&self) -> &SurfaceBinding {
        &self.binding
    }

    pub fn binding_mut(&mut self) -> &mut SurfaceBinding {
        &mut self.binding
    }

    /// Drop per-image state when a different image is installed. The
    /// clipboard survives, so boxes can be pasted across images.
    pub fn reset_for_new_image(&mut self) {
        self.gesture = DrawGesture::Idle;
        self.draft = None;
        self.binding.clear();
    }

    /// A click landed on a canvas shape: update the selection.
    pub fn select_click(
        &mut self,
        session: &mut Session,
        handle: ShapeHandle,
        additive: bool,
    ) -> bool {
        let Some(id) = self.binding.box_for(handle) else {
            return false;
        };
        if additive {
            session.toggle_selected(id);
        } else {
            session.select_only(id);
        }
        log::debug!("🔍 Selected box {id}");
        true
    }

    /// The host moved or resized a shape: write the geometry back.
    pub fn on_box_changed(
        &mut self,
        session: &mut Session,
        handle: ShapeHandle,
        geometry: BoxGeometry,
    ) -> bool {
        let Some(id) = self.binding.box_for(handle) else {
            log::warn!("Geometry change for unbound shape {handle}");
            return false;
        };
        session.set_box_geometry(id, geometry.normalized());
        true
    }

    // === Clipboard =========================================================

    /// Copy the selected boxes. An empty selection leaves the previous
    /// clipboard in place.
    pub fn copy_selection(&mut self, session: &Session) -> usize {
        let copied: Vec<ClipboardBox> = session
            .store()
            .selected_boxes()
            .map(|b| ClipboardBox {
                geometry: b.geometry,
                class_id: b.class_id.clone(),
            })
            .collect();

        if copied.is_empty() {
            return 0;
        }
        let count = copied.len();
        self.clipboard = copied;
        log::debug!("📋 Copied {count} box(es)");
        count
    }

    /// Paste the clipboard near the pointer, preserving the copied
    /// layout, and select the new boxes.
    ///
    /// Pasted boxes are fresh annotations: they never inherit the source
    /// rows of the boxes they were copied from.
    pub fn paste(&mut self, session: &mut Session) -> Vec<BoxId> {
        if self.clipboard.is_empty() {
            return Vec::new();
        }
        let Some(active) = session.active_image() else {
            log::debug!("📋 Paste ignored: no image loaded");
            return Vec::new();
        };
        let bounds = (f64::from(active.width), f64::from(active.height));

        let anchor = self.clipboard[0].geometry;
        let dx = self.last_pointer.x + self.paste_offset - anchor.left;
        let dy = self.last_pointer.y + self.paste_offset - anchor.top;

        let mut pasted = Vec::with_capacity(self.clipboard.len());
        for item in &self.clipboard {
            let geometry = item.geometry.translated(dx, dy).clamped_to(bounds.0, bounds.1);
            pasted.push(session.add_box(geometry, item.class_id.clone()));
        }

        session.clear_selection();
        for id in &pasted {
            session.toggle_selected(*id);
        }
        log::info!("📋 Pasted {} box(es)", pasted.len());
        pasted
    }

    // === Bulk edits ========================================================

    /// Reassign every selected box to the given class.
    pub fn reclass_selection(
        &mut self,
        session: &mut Session,
        raw_class: &str,
    ) -> Result<usize, ClassIdError> {
        let class_id = validate_class_input(raw_class)?;
        let ids = session.store().selected_ids();
        for id in &ids {
            session.set_box_class(*id, class_id.clone());
        }
        log::info!("🏷️ Reclassed {} box(es) to {class_id}", ids.len());
        Ok(ids.len())
    }

    /// Delete the selected boxes. Returns the freed shape handles so the
    /// host can remove them from the canvas.
    pub fn delete_selection(&mut self, session: &mut Session) -> Vec<ShapeHandle> {
        let ids = session.store().selected_ids();
        let count = ids.len();
        let mut handles = Vec::new();
        for id in ids {
            session.remove_box(id);
            if let Some(handle) = self.binding.unbind_box(id) {
                handles.push(handle);
            }
        }
        if count > 0 {
            log::info!("🗑️ Deleted {count} box(es), {} shape(s) freed", handles.len());
        }
        handles
    }
}

impl Default for InteractionController {
    fn default() -> Self {
        Self::new()
    }
}
