use serde::{Deserialize, Serialize};

/// Matching strategy used by the resync differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResyncMode {
    /// Replace any `{{header}}` / `{header}` tokens still present in the
    /// presentation with the first data row's values.
    Placeholders,
    /// Compare dataset values against the presentation and replace only the
    /// columns whose token text is still present un-substituted.
    Enrichment,
}

impl ResyncMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResyncMode::Placeholders => "placeholders",
            ResyncMode::Enrichment => "enrichment",
        }
    }
}

/// Result of a resync run. Zero applied operations is a valid terminal
/// outcome ("already synchronized"), not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResyncReport {
    pub operations_applied: usize,
    pub slide_count: usize,
    pub mode: ResyncMode,
    pub sincronizado: bool,
}
