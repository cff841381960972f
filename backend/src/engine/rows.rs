//! Turns the raw 2-D grid read from the spreadsheet into ordered row
//! records, and resolves placeholder names to row values.
//!
//! Resolution never fails: a placeholder whose header (or mapped column)
//! cannot be found resolves to the empty string, so downstream slide text
//! never ends up with an unresolved token silently rendered as a debug
//! artifact. Missing data is not an error, it is an empty cell.

use common::model::row::{ColumnMapping, RowData};

/// Splits a grid into its header row and the retained data rows.
///
/// Row 0 is the header. A data row is dropped only when every one of its
/// cells is empty; sparse rows with at least one value are kept. `row_index`
/// is assigned relative to the first data row, counting dropped rows too, so
/// it always points back at the source spreadsheet row.
pub fn extract_rows(grid: &[Vec<String>]) -> (Vec<String>, Vec<RowData>) {
    let Some((header, data)) = grid.split_first() else {
        return (Vec::new(), Vec::new());
    };

    let rows = data
        .iter()
        .enumerate()
        .filter(|(_, cells)| cells.iter().any(|c| !c.trim().is_empty()))
        .map(|(i, cells)| RowData {
            row_index: i,
            cells: cells.clone(),
        })
        .collect();

    (header.clone(), rows)
}

/// Resolves `placeholder` to a value from `row`.
///
/// With a mapping entry, the mapped column name is matched against the
/// trimmed headers (case-sensitive exact match); without one, the
/// placeholder itself is matched the same way. Missing header or empty cell
/// both degrade to `""`.
pub fn resolve(
    placeholder: &str,
    mapping: Option<&ColumnMapping>,
    headers: &[String],
    row: &RowData,
) -> String {
    let target = mapping
        .and_then(|m| m.column_for(placeholder))
        .unwrap_or(placeholder);

    match headers.iter().position(|h| h.trim() == target.trim()) {
        Some(idx) => row.cell(idx).to_string(),
        None => String::new(),
    }
}
