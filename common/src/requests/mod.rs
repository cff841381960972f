use crate::model::resync::ResyncMode;
use crate::model::row::ColumnMapping;
use serde::{Deserialize, Serialize};

/// Request payload for `POST /api/generation/start`.
///
/// `range` defaults to the whole first sheet when absent. A non-empty
/// `column_mapping` overrides `template_type`; when both are absent the
/// request is rejected before any job is created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartGenerationRequest {
    pub spreadsheet_id: String,
    pub presentation_id: String,
    pub range: Option<String>,
    pub project_id: Option<String>,
    pub template_type: Option<String>,
    pub column_mapping: Option<ColumnMapping>,
    pub slide_template_id: Option<String>,
}

/// Request payload for `POST /api/resync/run`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResyncRequest {
    pub presentation_id: String,
    pub spreadsheet_id: String,
    pub range: Option<String>,
    pub mode: ResyncMode,
}
