//! Shared in-memory fixtures for state tests.


use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::files::{
    CLASS_DEFINITIONS_FILE, FileError, ImageEntry, ImageFolder, LabelFolder, is_image_filename,
    natural_cmp,
};
use crate::state::session::{Session, SessionEvent, SessionState};

/// Image folder backed by a map of name to encoded bytes.
pub(crate) struct MemImageFolder {
    files: HashMap<String, Vec<u8>>,
}

impl MemImageFolder {
    pub(crate) fn new<'a>(entries: impl IntoIterator<Item = (&'a str, Vec<u8>)>) -> Self {
        let files = entries
            .into_iter()
            .map(|(name, bytes)| (name.to_string(), bytes))
            .collect();
        Self { files }
    }
}

impl ImageFolder for MemImageFolder {
    fn list_images(&self) -> Result<Vec<ImageEntry>, FileError> {
        let mut names: Vec<&String> = self
            .files
            .keys()
            .filter(|name| is_image_filename(name))
            .collect();
        names.sort_by(|a, b| natural_cmp(a, b));
        Ok(names
            .into_iter()
            .map(|name| ImageEntry { name: name.clone() })
            .collect())
    }

    fn read_image(&self, name: &str) -> Result<Vec<u8>, FileError> {
        self.files
            .get(name)
            .cloned()
            .ok_or_else(|| FileError::not_found(name))
    }
}

/// Label folder backed by a map of file name to text, with a switch to
/// make writes fail.
pub(crate) struct MemLabelFolder {
    files: Mutex<HashMap<String, String>>,
    classes: Option<String>,
    fail_writes: AtomicBool,
}

impl MemLabelFolder {
    pub(crate) fn new() -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
            classes: None,
            fail_writes: AtomicBool::new(false),
        }
    }

    pub(crate) fn with_file(self, name: &str, text: &str) -> Self {
        self.files
            .lock()
            .unwrap()
            .insert(name.to_string(), text.to_string());
        self
    }

    pub(crate) fn with_classes(mut self, text: &str) -> Self {
        self.classes = Some(text.to_string());
        self
    }

    /// Current text of a written file, if any.
    pub(crate) fn contents(&self, name: &str) -> Option<String> {
        self.files.lock().unwrap().get(name).cloned()
    }

    pub(crate) fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl LabelFolder for MemLabelFolder {
    fn read_text(&self, file_name: &str) -> Result<String, FileError> {
        self.files
            .lock()
            .unwrap()
            .get(file_name)
            .cloned()
            .ok_or_else(|| FileError::not_found(file_name))
    }

    fn write_text(&self, file_name: &str, text: &str) -> Result<(), FileError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(FileError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "writes disabled",
            )));
        }
        self.files
            .lock()
            .unwrap()
            .insert(file_name.to_string(), text.to_string());
        Ok(())
    }

    fn read_class_definitions(&self) -> Result<String, FileError> {
        self.classes
            .clone()
            .ok_or_else(|| FileError::not_found(CLASS_DEFINITIONS_FILE))
    }
}

/// Route `log` output to the test harness. Safe to call from every test.
pub(crate) fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Minimal valid PNG of the given size, for feeding the decode path.
pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let pixels = image::RgbaImage::new(width, height);
    let mut bytes = Vec::new();
    pixels
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("encode test png");
    bytes
}

/// Tick the session until the in-flight load settles, collecting every
/// event emitted on the way.
pub(crate) fn tick_until_settled(session: &mut Session) -> Vec<SessionEvent> {
    let deadline = Instant::now() + Duration::from_secs(5);
    let mut events = Vec::new();
    loop {
        events.extend(session.tick());
        if session.state() != SessionState::Loading {
            return events;
        }
        assert!(Instant::now() < deadline, "load never settled");
        std::thread::sleep(Duration::from_millis(2));
    }
}
