//! Class taxonomy: stable colors, display names, and id validation.
//!
//! Class ids are string-encoded non-negative integers. Colors come from a
//! fixed palette indexed by `id mod len`, so the same class keeps the same
//! color across images and sessions. Display names are optional and come
//! from a line-oriented `id: name` document.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::constants::MAX_CLASS_ID;

/// An RGB color triple.
pub type Rgb = [u8; 3];

/// Color used for ids that do not map into the palette (negative or
/// unparseable).
pub const SENTINEL_COLOR: Rgb = [0, 0, 0];

/// Fixed palette of visually distinct class colors.
///
/// Order matters: `color_for` indexes into it modulo its length, and
/// annotations drawn in earlier sessions must keep their colors.
pub const CLASS_PALETTE: [Rgb; 30] = [
    [230, 25, 75],   // red
    [60, 180, 75],   // green
    [255, 225, 25],  // yellow
    [0, 130, 200],   // blue
    [245, 130, 48],  // orange
    [145, 30, 180],  // purple
    [70, 240, 240],  // cyan
    [240, 50, 230],  // magenta
    [210, 245, 60],  // lime
    [250, 190, 212], // pink
    [0, 128, 128],   // teal
    [220, 190, 255], // lavender
    [170, 110, 40],  // brown
    [255, 250, 200], // beige
    [128, 0, 0],     // maroon
    [170, 255, 195], // mint
    [128, 128, 0],   // olive
    [255, 215, 180], // apricot
    [0, 0, 128],     // navy
    [128, 128, 128], // grey
    [255, 99, 71],   // tomato
    [154, 205, 50],  // yellow-green
    [65, 105, 225],  // royal blue
    [255, 140, 0],   // dark orange
    [186, 85, 211],  // orchid
    [32, 178, 170],  // light sea green
    [255, 20, 147],  // deep pink
    [139, 69, 19],   // saddle brown
    [100, 149, 237], // cornflower
    [46, 139, 87],   // sea green
];

/// Validation failures for user-entered class ids.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassIdError {
    #[error("Class id is empty")]
    EmptyInput,

    #[error("Class id is not an integer: {input:?}")]
    NotAnInteger { input: String },

    #[error("Class id {value} is outside 0..={max}")]
    OutOfRange { value: i64, max: i64 },
}

/// Totals from one pass over a class-definition document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DefinitionStats {
    /// Definitions accepted.
    pub defined: usize,
    /// Lines skipped as malformed.
    pub skipped: usize,
}

/// Stable color lookup for a class id.
///
/// Pure in the id: negative or unparseable ids always yield
/// [`SENTINEL_COLOR`], everything else indexes the palette modulo its
/// length.
pub fn color_for(class_id: &str) -> Rgb {
    match class_id.trim().parse::<u64>() {
        Ok(value) => CLASS_PALETTE[(value % CLASS_PALETTE.len() as u64) as usize],
        Err(_) => SENTINEL_COLOR,
    }
}

/// Validate a user-entered class id.
///
/// Trims, requires an integer in `0..=MAX_CLASS_ID`, and returns the
/// canonical decimal form (no sign, no leading zeros).
pub fn validate_class_input(raw: &str) -> Result<String, ClassIdError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ClassIdError::EmptyInput);
    }

    let value: i64 = trimmed.parse().map_err(|_| ClassIdError::NotAnInteger {
        input: trimmed.to_string(),
    })?;

    if !(0..=MAX_CLASS_ID).contains(&value) {
        return Err(ClassIdError::OutOfRange {
            value,
            max: MAX_CLASS_ID,
        });
    }

    Ok(value.to_string())
}

/// Smallest unused class id, the default offered when tagging a new box.
///
/// Counts up from 0 and returns the first id not in use, so an id freed
/// by deleting its boxes is offered again. `"0"` when nothing is tagged
/// yet.
pub fn next_free_class_id<'a>(used: impl IntoIterator<Item = &'a str>) -> String {
    let used: HashSet<&str> = used.into_iter().collect();

    let mut candidate = 0u64;
    while used.contains(candidate.to_string().as_str()) {
        candidate += 1;
    }
    candidate.to_string()
}

/// Mapping from class id to human-readable name.
#[derive(Debug, Clone, Default)]
pub struct ClassTaxonomy {
    names: HashMap<String, String>,
}

impl ClassTaxonomy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the taxonomy wholesale from an `id: name` document.
    ///
    /// Blank lines and `#` comments are skipped. A line is accepted only
    /// if the id parses as an integer and the name is non-empty after
    /// trimming; everything else is counted as skipped, never fatal. Ids
    /// are stored canonically, so `07: dog` defines class `"7"`.
    pub fn load_definitions(&mut self, document: &str) -> DefinitionStats {
        let mut names = HashMap::new();
        let mut skipped = 0usize;

        for line in document.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let parsed = line.split_once(':').and_then(|(id_part, name_part)| {
                let id = id_part.trim().parse::<i64>().ok()?;
                let name = name_part.trim();
                (!name.is_empty()).then(|| (id.to_string(), name.to_string()))
            });

            match parsed {
                Some((id, name)) => {
                    names.insert(id, name);
                }
                None => {
                    log::debug!("Skipping class definition line: {line:?}");
                    skipped += 1;
                }
            }
        }

        let stats = DefinitionStats {
            defined: names.len(),
            skipped,
        };
        self.names = names;
        stats
    }

    /// Drop all definitions.
    pub fn clear(&mut self) {
        self.names.clear();
    }

    /// The defined name for a class id, if any.
    pub fn name_of(&self, class_id: &str) -> Option<&str> {
        self.names.get(class_id).map(String::as_str)
    }

    /// Display string for a class id: `"{id}: {name}"` when a name is
    /// defined, else the bare id.
    pub fn display_name(&self, class_id: &str) -> String {
        match self.names.get(class_id) {
            Some(name) => format!("{class_id}: {name}"),
            None => class_id.to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }
}
