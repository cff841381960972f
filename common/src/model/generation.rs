use crate::model::row::{ColumnMapping, RowData};
use serde::{Deserialize, Serialize};

/// Overall state of a generation job. Transitions only move forward
/// (`Pendiente → Procesando → Completado`), never backward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    Pendiente,
    Procesando,
    Completado,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pendiente => "pendiente",
            JobState::Procesando => "procesando",
            JobState::Completado => "completado",
        }
    }

    pub fn parse(s: &str) -> Option<JobState> {
        match s {
            "pendiente" => Some(JobState::Pendiente),
            "procesando" => Some(JobState::Procesando),
            "completado" => Some(JobState::Completado),
            _ => None,
        }
    }
}

/// State of a single row's work item. Only `Pendiente` items are selected
/// when a job is (re)started, which is what makes an interrupted job
/// resumable without redoing completed rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemState {
    Pendiente,
    Procesando,
    Completado,
    Error,
}

impl ItemState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemState::Pendiente => "pendiente",
            ItemState::Procesando => "procesando",
            ItemState::Completado => "completado",
            ItemState::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<ItemState> {
        match s {
            "pendiente" => Some(ItemState::Pendiente),
            "procesando" => Some(ItemState::Procesando),
            "completado" => Some(ItemState::Completado),
            "error" => Some(ItemState::Error),
            _ => None,
        }
    }
}

/// A per-row error as reported to the user. `row` is the human-facing
/// spreadsheet row number (`row_index + 2`: 1-based rows plus the header).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowError {
    pub row: usize,
    pub message: String,
}

/// One "produce N slides" request, persisted as the durable record of its
/// own progress.
///
/// Invariant: `filas_procesadas + filas_error <= total_rows` at every
/// observation point. The engine is the only writer; status pollers and the
/// UI only ever read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationJob {
    pub id: String,
    pub presentation_id: String,
    pub spreadsheet_id: String,
    /// Owning project record, target of the completion notification.
    pub project_id: Option<String>,
    pub template_type: Option<String>,
    pub column_mapping: Option<ColumnMapping>,
    /// Template slide to duplicate; resolved from the presentation's first
    /// slide when absent.
    pub slide_template_id: Option<String>,
    /// Header row captured at job creation. Placeholder resolution always
    /// runs against this snapshot, not a re-read of the sheet.
    pub headers: Vec<String>,
    pub state: JobState,
    pub total_rows: usize,
    pub filas_procesadas: usize,
    pub filas_error: usize,
    pub errores: Vec<RowError>,
    pub created_at: String,
    pub updated_at: String,
}

/// Per-row unit of work. Created in bulk with the job (one per retained data
/// row), mutated only by the engine, deleted only by the job's cascade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationJobItem {
    pub id: String,
    pub job_id: String,
    pub row_index: usize,
    pub row_data: RowData,
    pub state: ItemState,
    pub result_slide_id: Option<String>,
    pub error_message: Option<String>,
}

impl GenerationJobItem {
    /// Human-facing spreadsheet row number for error reporting.
    pub fn display_row(&self) -> usize {
        self.row_index + 2
    }
}

/// Final outcome of a generation run. Partial success is the expected common
/// case: the job completes even when some rows failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationSummary {
    pub generadas: usize,
    pub fallidas: usize,
    pub errores: Vec<RowError>,
}
