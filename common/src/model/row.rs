use serde::{Deserialize, Serialize};

/// One data row of the source spreadsheet, aligned to the job's header
/// snapshot.
///
/// `row_index` is 0-based and relative to the first data row (the header row
/// is not counted). It is assigned when the grid is read and never changes;
/// human-facing error messages report `row_index + 2` to account for the
/// 1-based spreadsheet numbering plus the header row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowData {
    pub row_index: usize,
    pub cells: Vec<String>,
}

impl RowData {
    /// The cell at `index`, or `""` when the row is sparse or the cell is
    /// empty. Rows never expose missing data as an error.
    pub fn cell(&self, index: usize) -> &str {
        self.cells.get(index).map(String::as_str).unwrap_or("")
    }
}

/// Explicit placeholder → column-name mapping supplied by the user.
///
/// Serialized as an array so insertion order survives the round trip through
/// the API and the database; order matters because the dynamic layout is
/// synthesized one element per entry, in this order.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ColumnMapping(pub Vec<ColumnMappingEntry>);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnMappingEntry {
    pub placeholder: String,
    pub column: String,
}

impl ColumnMapping {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnMappingEntry> {
        self.0.iter()
    }

    /// The column name mapped to `placeholder`, if any.
    pub fn column_for(&self, placeholder: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|e| e.placeholder == placeholder)
            .map(|e| e.column.as_str())
    }
}
