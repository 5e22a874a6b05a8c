//! Load/save orchestration for the annotation session.
//!
//! The [`Session`] is the single explicit owner of editing state: folder
//! bindings, the annotation store, the active image, the class taxonomy
//! and the autosave schedule. The host drives it from its event loop:
//! navigation calls [`Session::open_image`], every frame calls
//! [`Session::tick`] and reacts to the returned events.
//!
//! Image loads are asynchronous. Every load request carries a token from a
//! monotonic counter; by the time a decoded result comes back the user may
//! have navigated on, so results are applied only if their token is still
//! the current one. Superseded results are dropped silently: that is the
//! normal outcome of fast navigation, not an error.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::config::EngineConfig;
use crate::files::{FileError, ImageEntry, ImageFolder, LabelFolder, label_file_name};
use crate::format::auto_save::AutoSaveManager;
use crate::format::yolo;
use crate::model::{BoxGeometry, BoxId};
use crate::state::loader::{ImageLoadWorker, LoadRequest, LoadedImage};
use crate::state::store::{AnnotationStore, StoreError};
use crate::taxonomy::{self, ClassTaxonomy};

/// Why a save was requested. Manual saves warn about missing
/// preconditions; automatic ones must stay quiet about conditions the
/// user cannot control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveTrigger {
    /// The user asked for a save.
    Manual,
    /// The autosave debounce window elapsed.
    AutoSave,
    /// Labels flushed before navigating to another image.
    ImageSwitch,
}

/// Lifecycle of the session around the active image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No image loaded yet.
    #[default]
    Idle,
    /// A load is in flight for the current token.
    Loading,
    /// An image is installed and editable.
    Ready,
    /// Labels are being written out.
    Saving,
}

/// The currently displayed image. All box geometry is relative to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveImage {
    pub name: String,
    pub width: u32,
    pub height: u32,
}

/// Severity of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeSeverity {
    Info,
    Warning,
    Error,
}

/// A transient message for the host to surface (toast, status bar).
#[derive(Debug, Clone)]
pub struct Notice {
    pub severity: NoticeSeverity,
    pub message: String,
}

impl Notice {
    pub fn new(message: impl Into<String>, severity: NoticeSeverity) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(message, NoticeSeverity::Info)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(message, NoticeSeverity::Warning)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(message, NoticeSeverity::Error)
    }
}

/// Host-visible outcomes drained from [`Session::tick`].
#[derive(Debug)]
pub enum SessionEvent {
    /// A new image was installed; pixels are RGBA8 for display.
    ImageReady(LoadedImage),
    /// The current load failed.
    ImageFailed { name: String, message: String },
    /// The label document for the active image was read into the store.
    LabelsLoaded { name: String, boxes: usize },
    /// The store was written out for the named image.
    LabelsSaved { name: String, trigger: SaveTrigger },
    /// Something the user should see.
    Notice(Notice),
}

/// The annotation editing session.
pub struct Session {
    images: Option<Arc<dyn ImageFolder>>,
    labels: Option<Arc<dyn LabelFolder>>,
    loader: Option<ImageLoadWorker>,
    store: AnnotationStore,
    taxonomy: ClassTaxonomy,
    auto_save: AutoSaveManager,
    active: Option<ActiveImage>,
    state: SessionState,
    load_token: u64,
    has_labels: HashMap<String, bool>,
    events: Vec<SessionEvent>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            images: None,
            labels: None,
            loader: None,
            store: AnnotationStore::new(),
            taxonomy: ClassTaxonomy::new(),
            auto_save: AutoSaveManager::new(),
            active: None,
            state: SessionState::Idle,
            load_token: 0,
            has_labels: HashMap::new(),
            events: Vec::new(),
        }
    }

    /// Apply persisted preferences to the session.
    pub fn apply_config(&mut self, config: &EngineConfig) {
        self.auto_save = AutoSaveManager::new()
            .with_debounce_delay(Duration::from_millis(config.autosave_debounce_ms));
        self.auto_save.set_enabled(config.autosave_enabled);
    }

    // === Bindings ==========================================================

    /// Bind the image folder and spawn the loader over it.
    ///
    /// Replaces any previous binding: the active image, the store and the
    /// per-image flags belong to the old folder and are dropped.
    pub fn bind_image_folder(&mut self, folder: Arc<dyn ImageFolder>) {
        self.load_token += 1; // anything in flight is now stale
        self.loader = match ImageLoadWorker::spawn(Arc::clone(&folder)) {
            Ok(worker) => Some(worker),
            Err(message) => {
                log::error!("{message}");
                self.push_notice(Notice::error(message));
                None
            }
        };
        self.images = Some(folder);
        self.active = None;
        self.store.clear();
        self.auto_save.reset();
        self.has_labels.clear();
        self.state = SessionState::Idle;
        log::info!("Image folder bound");
    }

    /// Bind the label folder used for reading and writing label documents.
    pub fn bind_label_folder(&mut self, folder: Arc<dyn LabelFolder>) {
        self.labels = Some(folder);
        log::info!("Label folder bound");
    }

    pub fn has_label_folder(&self) -> bool {
        self.labels.is_some()
    }

    /// List annotatable images in the bound folder.
    pub fn list_images(&self) -> Result<Vec<ImageEntry>, FileError> {
        match &self.images {
            Some(folder) => folder.list_images(),
            None => Err(FileError::NoBinding),
        }
    }

    // === Load / save =======================================================

    /// Start loading an image, superseding any load in flight.
    ///
    /// If autosave is enabled and an image is active, its labels are
    /// written out first, before anything about the old image is
    /// replaced, so a quick navigation can never lose edits.
    pub fn open_image(&mut self, name: &str) {
        if self.auto_save.is_enabled() && self.active.is_some() {
            self.save_labels(SaveTrigger::ImageSwitch);
        }
        // A pending debounce was armed for the old image; drop it.
        self.auto_save.reset();

        let Some(loader) = &self.loader else {
            self.push_notice(Notice::warning("Open an image folder first"));
            return;
        };

        self.load_token += 1;
        let token = self.load_token;
        log::info!("Loading image {name:?} (token {token})");
        loader.request(LoadRequest {
            name: name.to_string(),
            token,
        });
        self.state = SessionState::Loading;
    }

    /// Drive pending work and drain events.
    ///
    /// Call once per host frame: applies finished decodes (current token
    /// only), reads the matching label document, and fires the autosave
    /// when its window has elapsed.
    pub fn tick(&mut self) -> Vec<SessionEvent> {
        self.poll_loader();

        if self.auto_save.should_save() {
            log::debug!("Autosave window elapsed");
            self.save_labels(SaveTrigger::AutoSave);
        }

        std::mem::take(&mut self.events)
    }

    fn poll_loader(&mut self) {
        loop {
            let Some(result) = self
                .loader
                .as_ref()
                .and_then(ImageLoadWorker::take_one_result)
            else {
                break;
            };

            match result {
                Ok(done) => {
                    // Stale guard: a newer open_image superseded this
                    // load while it was in flight.
                    if done.token != self.load_token {
                        log::debug!(
                            "Discarding stale load of {:?} (token {}, current {})",
                            done.name,
                            done.token,
                            self.load_token
                        );
                        continue;
                    }
                    self.install_image(done);
                }
                Err(failure) => {
                    if failure.token != self.load_token {
                        log::debug!("Discarding stale load failure of {:?}", failure.name);
                        continue;
                    }
                    log::error!("Failed to load {:?}: {}", failure.name, failure.message);
                    self.state = if self.active.is_some() {
                        SessionState::Ready
                    } else {
                        SessionState::Idle
                    };
                    self.push_notice(Notice::error(format!(
                        "Could not load {}: {}",
                        failure.name, failure.message
                    )));
                    self.events.push(SessionEvent::ImageFailed {
                        name: failure.name,
                        message: failure.message,
                    });
                }
            }
        }
    }

    /// Install a decoded image as active and load its labels.
    fn install_image(&mut self, done: LoadedImage) {
        let name = done.name.clone();
        let (width, height) = (done.width, done.height);

        self.active = Some(ActiveImage {
            name: name.clone(),
            width,
            height,
        });
        self.store.clear();
        // Edits made to the previous image while this load was in flight
        // either already autosaved or were flushed on open; the pending
        // window must not fire against the fresh store.
        self.auto_save.reset();
        self.state = SessionState::Ready;
        log::info!("Installed image {name:?} ({width}x{height})");

        self.events.push(SessionEvent::ImageReady(done));
        self.load_labels(&name, width, height);
    }

    /// Read and decode the label document for the just-installed image.
    fn load_labels(&mut self, name: &str, width: u32, height: u32) {
        let Some(labels) = self.labels.clone() else {
            log::debug!("No label folder bound; starting with an empty set");
            return;
        };

        let file = label_file_name(name);
        match labels.read_text(&file) {
            Ok(text) => {
                self.has_labels
                    .insert(name.to_string(), !text.trim().is_empty());
                let rows = yolo::decode_document(&text, f64::from(width), f64::from(height));
                for row in rows {
                    self.store
                        .add_pristine(row.geometry, row.class_id, row.original_row);
                }
                log::info!("Loaded {} box(es) from {file:?}", self.store.len());
                self.events.push(SessionEvent::LabelsLoaded {
                    name: name.to_string(),
                    boxes: self.store.len(),
                });
            }
            Err(err) if err.is_not_found() => {
                // No label file just means no labels yet; it gets created
                // on the first save.
                self.has_labels.insert(name.to_string(), false);
                log::debug!("No label file {file:?} yet");
                self.events.push(SessionEvent::LabelsLoaded {
                    name: name.to_string(),
                    boxes: 0,
                });
            }
            Err(err) => {
                log::error!("Failed to read {file:?}: {err}");
                self.push_notice(Notice::error(format!(
                    "Could not read labels for {name}: {err}"
                )));
            }
        }
    }

    /// Write the current annotation set to the active image's label file.
    ///
    /// Missing preconditions (no active image, no label folder) warn on
    /// manual triggers and no-op silently on automatic ones. I/O failures
    /// are reported and leave the session retryable.
    pub fn save_labels(&mut self, trigger: SaveTrigger) {
        let Some(active) = self.active.clone() else {
            if trigger == SaveTrigger::Manual {
                self.push_notice(Notice::warning("No image loaded; nothing to save"));
            }
            return;
        };
        let Some(labels) = self.labels.clone() else {
            if trigger == SaveTrigger::Manual {
                self.push_notice(Notice::warning("Open a label folder to save annotations"));
            }
            return;
        };

        let resume_state = self.state;
        self.state = SessionState::Saving;

        let snapshot = self.store.all();
        let text = yolo::encode_set(&snapshot, f64::from(active.width), f64::from(active.height));
        let file = label_file_name(&active.name);

        match labels.write_text(&file, &text) {
            Ok(()) => {
                self.has_labels.insert(active.name.clone(), !text.is_empty());
                self.auto_save.mark_saved();
                log::info!("Saved {} box(es) to {file:?} ({trigger:?})", snapshot.len());
                self.events.push(SessionEvent::LabelsSaved {
                    name: active.name,
                    trigger,
                });
            }
            Err(err) => {
                self.auto_save.mark_save_failed();
                log::error!("Failed to write {file:?}: {err}");
                self.push_notice(Notice::error(format!(
                    "Could not save labels for {}: {err}",
                    active.name
                )));
            }
        }

        self.state = resume_state;
    }

    /// Rebuild the class taxonomy from the label folder's definition
    /// document.
    pub fn reload_class_definitions(&mut self) {
        let Some(labels) = self.labels.clone() else {
            self.push_notice(Notice::warning(
                "Open a label folder to load class definitions",
            ));
            return;
        };

        match labels.read_class_definitions() {
            Ok(document) => {
                let stats = self.taxonomy.load_definitions(&document);
                log::info!(
                    "Loaded {} class definition(s), {} line(s) skipped",
                    stats.defined,
                    stats.skipped
                );
                if stats.skipped > 0 {
                    self.push_notice(Notice::info(format!(
                        "{} class definition line(s) skipped",
                        stats.skipped
                    )));
                }
            }
            Err(err) if err.is_not_found() => {
                log::debug!("No class definition document");
            }
            Err(err) => {
                log::error!("Failed to read class definitions: {err}");
                self.push_notice(Notice::error(format!(
                    "Could not read class definitions: {err}"
                )));
            }
        }
    }

    // === Mutations =========================================================
    //
    // Mutations go through the session rather than the store directly so
    // that every one of them arms the autosave debounce.

    /// Add a freshly drawn box.
    pub fn add_box(&mut self, geometry: BoxGeometry, class_id: impl Into<String>) -> BoxId {
        let id = self.store.add(geometry, class_id);
        self.touch();
        id
    }

    /// Remove a box; absent ids are a no-op.
    pub fn remove_box(&mut self, id: BoxId) {
        if self.store.remove(id) {
            self.touch();
        }
    }

    /// Move or resize a box.
    pub fn set_box_geometry(&mut self, id: BoxId, geometry: BoxGeometry) {
        if self.store.set_geometry(id, geometry) {
            self.touch();
        }
    }

    /// Reassign a box's class.
    pub fn set_box_class(&mut self, id: BoxId, class_id: impl Into<String>) {
        if self.store.set_class(id, class_id) {
            self.touch();
        }
    }

    /// Move a box within the z-order.
    pub fn reorder_boxes(&mut self, from: usize, to: usize) -> Result<(), StoreError> {
        self.store.reorder(from, to)?;
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.auto_save.mark_dirty();
    }

    // === Selection (derived state, does not arm autosave) ==================

    pub fn select_only(&mut self, id: BoxId) {
        self.store.select_only(id);
    }

    pub fn toggle_selected(&mut self, id: BoxId) {
        self.store.toggle_selected(id);
    }

    pub fn select_all(&mut self) {
        self.store.select_all();
    }

    pub fn clear_selection(&mut self) {
        self.store.clear_selection();
    }

    // === Accessors =========================================================

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn taxonomy(&self) -> &ClassTaxonomy {
        &self.taxonomy
    }

    pub fn active_image(&self) -> Option<&ActiveImage> {
        self.active.as_ref()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether the named image has a non-empty label document, as of the
    /// last load or save that touched it. Drives the list badges.
    pub fn has_labels(&self, name: &str) -> bool {
        self.has_labels.get(name).copied().unwrap_or(false)
    }

    /// Default class id offered when tagging a new box: the first id not
    /// in use on this image, counting up from 0.
    pub fn next_free_class_id(&self) -> String {
        taxonomy::next_free_class_id(self.store.class_ids())
    }

    pub fn autosave(&self) -> &AutoSaveManager {
        &self.auto_save
    }

    pub fn set_autosave_enabled(&mut self, enabled: bool) {
        self.auto_save.set_enabled(enabled);
    }

    fn push_notice(&mut self, notice: Notice) {
        self.events.push(SessionEvent::Notice(notice));
    }

    #[cfg(test)]
    pub(crate) fn force_active(&mut self, name: &str, width: u32, height: u32) {
        self.active = Some(ActiveImage {
            name: name.to_string(),
            width,
            height,
        });
        self.state = SessionState::Ready;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
