//! Creates a generation job and schedules its background run.
//!
//! The handler does the fatal-failure work synchronously — reading the
//! spreadsheet and validating the layout source — so the caller learns about
//! an unreadable sheet or an unknown template type before any job exists.
//! Everything row-by-row happens afterwards in a blocking task, reporting
//! progress through the job controller's channel.

use crate::engine::generation::GenerationJobEngine;
use crate::engine::layout::LayoutResolver;
use crate::engine::rows;
use crate::engine::slide_builder::{JobProgress, SpreadsheetReader};
use crate::engine::store::JobStore;
use crate::job_controller::state::{JobUpdate, JobsState};
use crate::services::AppContext;
use actix_web::{web, HttpResponse, Responder};
use common::jobs::JobStatus;
use common::model::generation::{
    GenerationJob, GenerationJobItem, GenerationSummary, ItemState, JobState,
};
use common::requests::StartGenerationRequest;
use log::info;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

const DEFAULT_RANGE: &str = "A1:ZZ1000";

/// Whether a scheduled run is a fresh start or a recovery of an
/// interrupted job.
#[derive(Clone, Copy)]
pub(crate) enum RunKind {
    Start,
    Resume,
}

pub(crate) async fn process(
    state: web::Data<JobsState>,
    ctx: web::Data<AppContext>,
    payload: web::Json<StartGenerationRequest>,
) -> impl Responder {
    let job_id = match create_generation_job(&ctx, payload.into_inner()) {
        Ok(job_id) => job_id,
        Err(err) => return HttpResponse::BadRequest().body(err),
    };
    schedule_run(state, ctx, job_id.clone(), RunKind::Start).await;
    HttpResponse::Ok().json(serde_json::json!({ "job_id": job_id }))
}

/// Reads the grid, validates the layout source and persists the job with
/// one item per retained data row. Nothing is persisted when any of these
/// steps fail.
fn create_generation_job(
    ctx: &AppContext,
    req: StartGenerationRequest,
) -> Result<String, String> {
    let range = req.range.as_deref().unwrap_or(DEFAULT_RANGE);
    let grid = ctx
        .sheets
        .read_grid(&req.spreadsheet_id, range)
        .map_err(|e| format!("No se pudo leer la hoja de cálculo: {e}"))?;

    let (headers, data_rows) = rows::extract_rows(&grid);
    if headers.is_empty() {
        return Err("La hoja de cálculo no tiene fila de cabeceras".to_string());
    }

    // Fail on an unresolvable layout now, before creating anything.
    let source =
        LayoutResolver::source(req.template_type.as_deref(), req.column_mapping.as_ref())
            .map_err(|e| e.to_string())?;
    LayoutResolver::default()
        .resolve(&source)
        .map_err(|e| e.to_string())?;

    let job_id = Uuid::new_v4().to_string();
    let job = GenerationJob {
        id: job_id.clone(),
        presentation_id: req.presentation_id,
        spreadsheet_id: req.spreadsheet_id,
        project_id: req.project_id,
        template_type: req.template_type,
        column_mapping: req.column_mapping,
        slide_template_id: req.slide_template_id,
        headers,
        state: JobState::Pendiente,
        total_rows: data_rows.len(),
        filas_procesadas: 0,
        filas_error: 0,
        errores: Vec::new(),
        created_at: String::new(),
        updated_at: String::new(),
    };
    let items: Vec<GenerationJobItem> = data_rows
        .into_iter()
        .map(|row| GenerationJobItem {
            id: Uuid::new_v4().to_string(),
            job_id: job_id.clone(),
            row_index: row.row_index,
            row_data: row,
            state: ItemState::Pendiente,
            result_slide_id: None,
            error_message: None,
        })
        .collect();

    ctx.store
        .create_job(&job, &items)
        .map_err(|e| e.to_string())?;
    info!("job {} creado con {} filas", job_id, job.total_rows);
    Ok(job_id)
}

/// Registers the job as `Pending` and spawns its background run. Shared by
/// the start and resume endpoints.
pub(crate) async fn schedule_run(
    state: web::Data<JobsState>,
    ctx: web::Data<AppContext>,
    job_id: String,
    kind: RunKind,
) {
    state
        .jobs
        .write()
        .await
        .insert(job_id.clone(), JobStatus::Pending);

    let tx = state.tx.clone();
    let ctx = ctx.into_inner();

    tokio::spawn(async move {
        let tx_block = tx.clone();
        let job_for_blocking = job_id.clone();
        let ctx_for_blocking = Arc::clone(&ctx);

        let handle = tokio::task::spawn_blocking(move || {
            run_generation_blocking(ctx_for_blocking, job_for_blocking, kind, tx_block)
        });

        let status = match handle.await {
            Ok(Ok(summary)) => {
                let body = serde_json::to_string(&summary).unwrap_or_default();
                JobStatus::Completed(body)
            }
            Ok(Err(e)) => JobStatus::Failed(e),
            Err(join_err) => JobStatus::Failed(format!("Task join error: {}", join_err)),
        };
        let _ = tx.send(JobUpdate::new(job_id, status)).await;
    });
}

fn run_generation_blocking(
    ctx: Arc<AppContext>,
    job_id: String,
    kind: RunKind,
    tx: mpsc::Sender<JobUpdate>,
) -> Result<GenerationSummary, String> {
    let progress = ChannelProgress {
        tx,
        job_id: job_id.clone(),
    };
    let engine = GenerationJobEngine::new(&*ctx.store, &*ctx.slides, ctx.config.clone())
        .with_notifier(&*ctx.store)
        .with_progress(&progress);

    let result = match kind {
        RunKind::Start => engine.start(&job_id),
        RunKind::Resume => engine.resume(&job_id),
    };
    result.map_err(|e| e.to_string())
}

/// Bridges the engine's per-item callback onto the job controller channel,
/// translating row counts into a completion percentage.
struct ChannelProgress {
    tx: mpsc::Sender<JobUpdate>,
    job_id: String,
}

impl JobProgress for ChannelProgress {
    fn on_item(&self, processed: usize, errored: usize, total: usize) {
        let progress = if total > 0 {
            ((processed + errored) as f32 / total as f32 * 100.0) as u32
        } else {
            100
        };
        let _ = self.tx.blocking_send(JobUpdate::new(
            self.job_id.clone(),
            JobStatus::InProgress(progress),
        ));
    }
}
