//! File-access collaborators: image and label folder bindings.
//!
//! The engine never touches the filesystem directly. It goes through the
//! [`ImageFolder`] and [`LabelFolder`] traits, which the host binds to
//! whatever the user picked: a local directory here, a sandboxed handle or
//! HTTP shim elsewhere. The directory-backed implementations in this
//! module cover the native case.

use std::cmp::Ordering;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// File extensions recognized as images when listing a folder.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "tiff", "tif"];

/// Name of the class-definition document inside the label folder.
pub const CLASS_DEFINITIONS_FILE: &str = "classes.txt";

/// Errors from folder bindings.
#[derive(Error, Debug)]
pub enum FileError {
    /// The named entry does not exist. For label files this is not a
    /// failure: it means "no labels yet".
    #[error("Not found: {name}")]
    NotFound { name: String },

    /// No folder has been bound for this operation.
    #[error("No folder bound")]
    NoBinding,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FileError {
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Whether this error means "the entry is absent" rather than a real
    /// I/O failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// One image available for annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageEntry {
    pub name: String,
}

/// Source of image bytes. Shared with the background decode thread, hence
/// `Send + Sync`.
pub trait ImageFolder: Send + Sync {
    /// List annotatable images, natural-sorted by name.
    fn list_images(&self) -> Result<Vec<ImageEntry>, FileError>;

    /// Read the raw bytes of one image.
    fn read_image(&self, name: &str) -> Result<Vec<u8>, FileError>;
}

/// Store of label text documents, one per image, plus the optional
/// class-definition document.
pub trait LabelFolder: Send + Sync {
    /// Read a label document by file name.
    fn read_text(&self, file_name: &str) -> Result<String, FileError>;

    /// Write a label document, creating the file if needed.
    fn write_text(&self, file_name: &str, text: &str) -> Result<(), FileError>;

    /// Read the class-definition document.
    fn read_class_definitions(&self) -> Result<String, FileError>;
}

/// Whether a file name looks like a supported image.
pub fn is_image_filename(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// Label file name for an image: extension replaced with `.txt`.
pub fn label_file_name(image_name: &str) -> String {
    match image_name.rsplit_once('.') {
        Some((stem, _)) => format!("{stem}.txt"),
        None => format!("{image_name}.txt"),
    }
}

/// Numeric-aware name ordering, so `img2.png` sorts before `img10.png`.
///
/// Digit runs compare by value (leading zeros ignored), everything else
/// compares case-insensitively byte by byte.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let a = a.as_bytes();
    let b = b.as_bytes();
    let (mut i, mut j) = (0, 0);

    while i < a.len() && j < b.len() {
        if a[i].is_ascii_digit() && b[j].is_ascii_digit() {
            let run_a = digit_run(a, &mut i);
            let run_b = digit_run(b, &mut j);
            let ordering = run_a
                .len()
                .cmp(&run_b.len())
                .then_with(|| run_a.cmp(run_b));
            if ordering != Ordering::Equal {
                return ordering;
            }
        } else {
            let ordering = a[i]
                .to_ascii_lowercase()
                .cmp(&b[j].to_ascii_lowercase());
            if ordering != Ordering::Equal {
                return ordering;
            }
            i += 1;
            j += 1;
        }
    }

    (a.len() - i).cmp(&(b.len() - j))
}

/// Consume a run of digits starting at `*index`, returning it with leading
/// zeros stripped.
fn digit_run<'a>(bytes: &'a [u8], index: &mut usize) -> &'a [u8] {
    let start = *index;
    while *index < bytes.len() && bytes[*index].is_ascii_digit() {
        *index += 1;
    }
    let run = &bytes[start..*index];
    let significant = run.iter().position(|b| *b != b'0').unwrap_or(run.len());
    &run[significant..]
}

fn map_read_error(err: std::io::Error, name: &str) -> FileError {
    if err.kind() == ErrorKind::NotFound {
        FileError::not_found(name)
    } else {
        FileError::Io(err)
    }
}

/// Image folder backed by a local directory.
#[derive(Debug, Clone)]
pub struct DirImageFolder {
    root: PathBuf,
}

impl DirImageFolder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ImageFolder for DirImageFolder {
    fn list_images(&self) -> Result<Vec<ImageEntry>, FileError> {
        let mut names: Vec<String> = fs::read_dir(&self.root)?
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| is_image_filename(name))
            .collect();

        names.sort_by(|a, b| natural_cmp(a, b));
        log::debug!("Listed {} image(s) in {:?}", names.len(), self.root);

        Ok(names.into_iter().map(|name| ImageEntry { name }).collect())
    }

    fn read_image(&self, name: &str) -> Result<Vec<u8>, FileError> {
        fs::read(self.root.join(name)).map_err(|e| map_read_error(e, name))
    }
}

/// Label folder backed by a local directory.
#[derive(Debug, Clone)]
pub struct DirLabelFolder {
    root: PathBuf,
}

impl DirLabelFolder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl LabelFolder for DirLabelFolder {
    fn read_text(&self, file_name: &str) -> Result<String, FileError> {
        fs::read_to_string(self.root.join(file_name)).map_err(|e| map_read_error(e, file_name))
    }

    fn write_text(&self, file_name: &str, text: &str) -> Result<(), FileError> {
        fs::write(self.root.join(file_name), text)?;
        Ok(())
    }

    fn read_class_definitions(&self) -> Result<String, FileError> {
        self.read_text(CLASS_DEFINITIONS_FILE)
    }
}
