//! YOLO normalized bounding-box text codec.
//!
//! One row per box: `<classId> <xCenter> <yCenter> <width> <height>`, all
//! spatial fields relative to the image dimensions. Decoding keeps each
//! source row verbatim so that untouched boxes re-serialize with the exact
//! bytes the file had; only mutated boxes get their row recomputed.

use crate::constants::YOLO_FRACTION_DIGITS;
use crate::format::error::LabelFormatError;
use crate::model::{BoxGeometry, LabelBox};

/// Fields parsed from one label row, before the store assigns an id.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRow {
    /// Class field exactly as it appeared in the file.
    pub class_id: String,

    /// Pixel-space geometry derived from the normalized fields.
    pub geometry: BoxGeometry,

    /// The whitespace-trimmed source line, kept for verbatim re-encoding.
    pub original_row: String,
}

/// Decode one label row into pixel-space geometry.
///
/// The row must have at least five whitespace-separated fields; extra
/// fields are tolerated and survive round-trips through the verbatim row.
/// The four spatial fields must parse as finite numbers.
pub fn decode_row(
    line: &str,
    image_width: f64,
    image_height: f64,
) -> Result<ParsedRow, LabelFormatError> {
    let trimmed = line.trim();
    let fields: Vec<&str> = trimmed.split_whitespace().collect();
    if fields.len() < 5 {
        return Err(LabelFormatError::malformed_row(format!(
            "expected 5 fields, got {}",
            fields.len()
        )));
    }

    let x_center = parse_spatial_field(fields[1], "x_center")?;
    let y_center = parse_spatial_field(fields[2], "y_center")?;
    let norm_width = parse_spatial_field(fields[3], "width")?;
    let norm_height = parse_spatial_field(fields[4], "height")?;

    let width = norm_width * image_width;
    let height = norm_height * image_height;
    let left = x_center * image_width - width / 2.0;
    let top = y_center * image_height - height / 2.0;

    Ok(ParsedRow {
        class_id: fields[0].to_string(),
        geometry: BoxGeometry::new(left, top, width, height),
        original_row: trimmed.to_string(),
    })
}

fn parse_spatial_field(token: &str, name: &str) -> Result<f64, LabelFormatError> {
    let value: f64 = token.parse().map_err(|_| {
        LabelFormatError::malformed_row(format!("{name} is not a number: {token:?}"))
    })?;
    if !value.is_finite() {
        return Err(LabelFormatError::malformed_row(format!(
            "{name} is not finite: {token:?}"
        )));
    }
    Ok(value)
}

/// Serialize one box as a YOLO row.
///
/// A pristine box (source row still cached) is echoed back verbatim so
/// unchanged files never produce spurious diffs. A mutated box is
/// recomputed from its pixel geometry with [`YOLO_FRACTION_DIGITS`]
/// fractional digits.
///
/// Recomputed values are not clamped to `[0, 1]`: a box dragged outside
/// the image serializes with out-of-range coordinates. Possibly a latent
/// bug, but downstream tooling sees these rows today; do not clamp here
/// without checking the consumers.
pub fn encode_box(label_box: &LabelBox, image_width: f64, image_height: f64) -> String {
    if let Some(row) = &label_box.original_row {
        return row.clone();
    }

    let center = label_box.geometry.center();
    let x_center = center.x / image_width;
    let y_center = center.y / image_height;
    let width = label_box.geometry.width / image_width;
    let height = label_box.geometry.height / image_height;

    format!(
        "{} {:.p$} {:.p$} {:.p$} {:.p$}",
        label_box.class_id,
        x_center,
        y_center,
        width,
        height,
        p = YOLO_FRACTION_DIGITS
    )
}

/// Serialize a whole annotation set, one row per box in set order.
///
/// Trailing whitespace is trimmed from the document and a single final
/// newline appended; an empty set yields an empty string.
pub fn encode_set(boxes: &[LabelBox], image_width: f64, image_height: f64) -> String {
    let rows: Vec<String> = boxes
        .iter()
        .map(|b| encode_box(b, image_width, image_height))
        .collect();

    let mut text = rows.join("\n").trim_end().to_string();
    if !text.is_empty() {
        text.push('\n');
    }
    text
}

/// Decode a whole label document, best effort.
///
/// Blank lines are discarded; a malformed row is skipped with a warning
/// (row number and reason) rather than aborting the document.
pub fn decode_document(text: &str, image_width: f64, image_height: f64) -> Vec<ParsedRow> {
    let mut rows = Vec::new();
    for (index, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match decode_row(line, image_width, image_height) {
            Ok(row) => rows.push(row),
            Err(err) => {
                log::warn!("Skipping label row {}: {}", index + 1, err);
            }
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LabelBox;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_decode_row_computes_pixel_geometry() {
        let row = decode_row("2 0.5 0.5 0.25 0.25", 800.0, 600.0).expect("row should parse");
        assert_eq!(row.class_id, "2");
        assert!(approx(row.geometry.left, 300.0));
        assert!(approx(row.geometry.top, 225.0));
        assert!(approx(row.geometry.width, 200.0));
        assert!(approx(row.geometry.height, 150.0));
        assert_eq!(row.original_row, "2 0.5 0.5 0.25 0.25");
    }

    #[test]
    fn test_decode_row_trims_surrounding_whitespace() {
        let row = decode_row("  1 0.5 0.5 0.1 0.1 \r", 100.0, 100.0).expect("row should parse");
        assert_eq!(row.original_row, "1 0.5 0.5 0.1 0.1");
    }

    #[test]
    fn test_decode_row_rejects_short_rows() {
        let err = decode_row("2 0.5 0.5 0.25", 800.0, 600.0).unwrap_err();
        assert!(err.to_string().contains("expected 5 fields"));
    }

    #[test]
    fn test_decode_row_rejects_non_numeric_fields() {
        assert!(decode_row("2 abc 0.5 0.25 0.25", 800.0, 600.0).is_err());
        assert!(decode_row("2 0.5 0.5 0.25 nan", 800.0, 600.0).is_err());
        assert!(decode_row("2 inf 0.5 0.25 0.25", 800.0, 600.0).is_err());
    }

    #[test]
    fn test_decode_row_tolerates_extra_fields() {
        let row = decode_row("2 0.5 0.5 0.25 0.25 0.97", 800.0, 600.0).expect("row should parse");
        assert_eq!(row.original_row, "2 0.5 0.5 0.25 0.25 0.97");
    }

    #[test]
    fn test_pristine_box_encodes_verbatim() {
        let row = decode_row("3 0.123456789 0.5 0.1 0.1", 640.0, 480.0).expect("row should parse");
        let label_box = LabelBox::from_file(1, row.geometry, row.class_id, row.original_row);
        assert_eq!(encode_box(&label_box, 640.0, 480.0), "3 0.123456789 0.5 0.1 0.1");
    }

    #[test]
    fn test_mutated_box_encodes_fifteen_digits() {
        let geometry = BoxGeometry::new(300.0, 225.0, 200.0, 150.0);
        let label_box = LabelBox::new(1, geometry, "2");
        assert_eq!(
            encode_box(&label_box, 800.0, 600.0),
            "2 0.500000000000000 0.500000000000000 0.250000000000000 0.250000000000000"
        );
    }

    #[test]
    fn test_out_of_bounds_geometry_is_not_clamped() {
        // Dragged past the left edge: the x center recomputes negative and
        // is written as-is.
        let geometry = BoxGeometry::new(-400.0, 0.0, 200.0, 150.0);
        let label_box = LabelBox::new(1, geometry, "0");
        let row = encode_box(&label_box, 800.0, 600.0);
        assert!(row.starts_with("0 -0.375"), "unexpected row: {row}");
    }

    #[test]
    fn test_roundtrip_preserves_bytes() {
        // Mixed formatting: short decimals, long decimals, double spaces,
        // scientific notation. All of it must survive untouched.
        let document = "0 0.5 0.5 0.25 0.25\n7  0.123456789 0.5 0.1 0.1\n1 5e-1 0.5 2.5e-1 0.25\n";
        let rows = decode_document(document, 800.0, 600.0);
        assert_eq!(rows.len(), 3);

        let boxes: Vec<LabelBox> = rows
            .into_iter()
            .enumerate()
            .map(|(i, r)| LabelBox::from_file(i as u64, r.geometry, r.class_id, r.original_row))
            .collect();
        assert_eq!(encode_set(&boxes, 800.0, 600.0), document);
    }

    #[test]
    fn test_roundtrip_normalizes_trailing_newlines() {
        let document = "2 0.5 0.5 0.25 0.25";
        let rows = decode_document(document, 800.0, 600.0);
        let boxes: Vec<LabelBox> = rows
            .into_iter()
            .map(|r| LabelBox::from_file(0, r.geometry, r.class_id, r.original_row))
            .collect();
        assert_eq!(encode_set(&boxes, 800.0, 600.0), "2 0.5 0.5 0.25 0.25\n");
    }

    #[test]
    fn test_decode_document_skips_blank_and_malformed_lines() {
        let document = "0 0.5 0.5 0.25 0.25\n\n   \nnot a row\n1 0.2 0.2 0.1 0.1\n";
        let rows = decode_document(document, 800.0, 600.0);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].class_id, "0");
        assert_eq!(rows[1].class_id, "1");
    }

    #[test]
    fn test_encode_empty_set_is_empty() {
        assert_eq!(encode_set(&[], 800.0, 600.0), "");
    }
}
