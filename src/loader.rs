//! Delimited numeric matrix loader

use crate::structs::{DataMatrix, Result, RunError};
use csv::{ByteRecord, ReaderBuilder, Trim};
use log::debug;
use ndarray::Array2;
use std::path::Path;

/// Load a delimited numeric matrix.
///
/// The first `skip_header_rows` records are discarded; the first of them, if any,
/// supplies channel names. When `column_filter` is given only those columns are
/// materialised, in filter order.
///
/// # Errors
/// * `NotFound` if `path` does not exist
/// * `Malformed` on ragged rows or non-numeric fields
/// * `IndexOutOfRange` if a filter index exceeds the row width
pub fn load(
    path: &Path,
    delimiter: u8,
    skip_header_rows: usize,
    column_filter: Option<&[usize]>,
) -> Result<DataMatrix> {
    if !path.exists() {
        return Err(RunError::NotFound(path.to_path_buf()));
    }

    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .trim(Trim::All)
        .comment(Some(b'#'))
        .from_path(path)?;

    let mut header: Option<Vec<String>> = None;
    let mut width: Option<usize> = None;
    let mut flat: Vec<f64> = Vec::new();
    let mut n_rows = 0usize;
    let mut seen = 0usize;
    let mut record = ByteRecord::new();

    while reader.read_byte_record(&mut record)? {
        seen += 1;
        let line = record.position().map_or(seen as u64, csv::Position::line);

        if seen <= skip_header_rows {
            if header.is_none() {
                header = Some(
                    record
                        .iter()
                        .map(|f| String::from_utf8_lossy(f).into_owned())
                        .collect(),
                );
            }
            continue;
        }

        let expected = *width.get_or_insert(record.len());
        if record.len() != expected {
            return Err(RunError::Malformed {
                line,
                reason: format!("expected {expected} fields, found {}", record.len()),
            });
        }

        match column_filter {
            Some(filter) => {
                for &col in filter {
                    let field = record.get(col).ok_or(RunError::IndexOutOfRange {
                        index: col,
                        columns: expected,
                    })?;
                    flat.push(parse_field(field, line, col)?);
                }
            }
            None => {
                for (col, field) in record.iter().enumerate() {
                    flat.push(parse_field(field, line, col)?);
                }
            }
        }
        n_rows += 1;
    }

    let n_columns = column_filter.map_or_else(|| width.unwrap_or(0), <[usize]>::len);
    let values = Array2::from_shape_vec((n_rows, n_columns), flat).map_err(|e| {
        RunError::Malformed {
            line: 0,
            reason: format!("cannot shape {n_rows} x {n_columns} matrix: {e}"),
        }
    })?;

    debug!(
        "Parsed {} data rows from {} ({} records read)",
        n_rows,
        path.display(),
        seen
    );

    let matrix = DataMatrix::new(values);
    Ok(match header {
        Some(names) => matrix.with_names(header_names(names, width, column_filter)),
        None => matrix,
    })
}

/// Channel names for the materialised columns, empty if the header does not line up
/// with the data
fn header_names(
    names: Vec<String>,
    width: Option<usize>,
    column_filter: Option<&[usize]>,
) -> Vec<String> {
    if width.is_some_and(|w| w != names.len()) {
        return Vec::new();
    }
    match column_filter {
        Some(filter) => filter
            .iter()
            .map(|&i| names.get(i).cloned())
            .collect::<Option<Vec<_>>>()
            .unwrap_or_default(),
        None => names,
    }
}

fn parse_field(field: &[u8], line: u64, column: usize) -> Result<f64> {
    let text = std::str::from_utf8(field).map_err(|_| RunError::Malformed {
        line,
        reason: format!("column {column}: field is not valid UTF-8"),
    })?;
    text.parse::<f64>().map_err(|_| RunError::Malformed {
        line,
        reason: format!("column {column}: '{text}' is not a number"),
    })
}
